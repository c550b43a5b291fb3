//! Filter expression trees, as produced by the query-string parser.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A boolean-valued filter over one resource query layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    Comparison {
        target: ComparisonTarget,
        operator: ComparisonOperator,
        value: ComparisonValue,
    },
    Logical {
        operator: LogicalOperator,
        terms: Vec<Filter>,
    },
    Not {
        term: Box<Filter>,
    },
    In {
        target: ComparisonTarget,
        values: Vec<serde_json::Value>,
    },
    MatchText {
        target: ComparisonTarget,
        pattern: String,
        kind: TextMatchKind,
    },
    /// `has(relationship)` — at least one related resource exists,
    /// optionally constrained by a nested filter.
    Has {
        path: Vec<String>,
        #[serde(default)]
        filter: Option<Box<Filter>>,
    },
    /// `isType(derivedType)` — resource type inheritance narrowing.
    /// Recognized so the engine can reject it explicitly.
    IsType {
        derived_type: String,
    },
}

/// What the left-hand side of a comparison refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparisonTarget {
    /// An attribute, optionally reached through a chain of to-one
    /// relationships.
    Attribute {
        #[serde(default)]
        path: Vec<String>,
        field: String,
    },
    /// The number of related resources in a to-many relationship.
    Count { path: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Equals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum LogicalOperator {
    And,
    Or,
}

/// The right-hand side of a comparison. `Null` is a distinguished literal,
/// not a JSON value, so null handling stays explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparisonValue {
    Literal { value: serde_json::Value },
    Null,
    Target { target: ComparisonTarget },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TextMatchKind {
    Contains,
    StartsWith,
    EndsWith,
}
