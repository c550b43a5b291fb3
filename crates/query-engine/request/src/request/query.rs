//! One layer of a resource query: filtering, sorting and field selection
//! for a single resource type, with nested layers for included
//! relationships.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::expression::Filter;

/// A query over one resource type. Nested layers appear in the selection's
/// relationship map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct QueryLayer {
    pub resource_type: String,
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub sort: Option<Vec<SortElement>>,
    #[serde(default)]
    pub selection: Option<FieldSelection>,
    /// Present only so the engine can reject it: pagination is
    /// categorically unimplemented.
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// The fields requested for one layer. An empty attribute list, or a
/// selection containing only relationships, means "select the whole row".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldSelection {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub relationships: IndexMap<String, QueryLayer>,
}

/// One term of a sort clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SortElement {
    pub target: SortTarget,
    pub ascending: bool,
}

/// What a sort term orders by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SortTarget {
    /// An attribute, optionally reached through a chain of to-one
    /// relationships.
    Attribute {
        #[serde(default)]
        path: Vec<String>,
        field: String,
    },
    /// The number of related resources in a to-many relationship, reached
    /// through a chain whose leading segments are to-one.
    Count { path: Vec<String> },
}

/// Page-based pagination. Never honored; see the unsupported-feature error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Pagination {
    pub number: u32,
    pub size: u32,
}

impl QueryLayer {
    /// A layer fetching whole rows of a resource type, without constraints.
    pub fn for_resource(resource_type: impl Into<String>) -> Self {
        QueryLayer {
            resource_type: resource_type.into(),
            ..QueryLayer::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_layers_round_trip_through_json() {
        let mut layer = QueryLayer::for_resource("articles");
        layer.sort = Some(vec![SortElement {
            target: SortTarget::Count {
                path: vec!["comments".to_string()],
            },
            ascending: false,
        }]);
        let mut selection = FieldSelection {
            attributes: vec!["title".to_string()],
            relationships: IndexMap::new(),
        };
        selection
            .relationships
            .insert("comments".to_string(), QueryLayer::for_resource("comments"));
        layer.selection = Some(selection);

        let json = serde_json::to_string(&layer).unwrap();
        let back: QueryLayer = serde_json::from_str(&json).unwrap();
        assert_eq!(layer, back);
    }
}
