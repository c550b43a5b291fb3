//! Metadata information regarding the database and tracked resource types.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mapping from a resource type name to its table mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResourceGraph(pub BTreeMap<String, ResourceInfo>);

/// Information about the table backing one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceInfo {
    #[serde(default)]
    pub schema_name: Option<String>,
    pub table_name: String,
    /// The public field name of the identity column.
    pub id_column: String,
    /// Columns keyed by their public field name.
    pub columns: BTreeMap<String, ColumnInfo>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipInfo>,
}

/// Can this column contain null values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

impl Nullable {
    pub fn is_nullable(self) -> bool {
        self == Nullable::Nullable
    }
}

/// The semantic kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ColumnKind {
    Id,
    Attribute,
    ForeignKey,
}

/// Information about a database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    /// The persisted column name, as materialized in result sets.
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub nullable: Nullable,
    /// Computed or otherwise read-only attributes force whole-row selection.
    #[serde(default)]
    pub readonly: bool,
}

/// The cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RelationshipKind {
    ToOne,
    ToMany,
}

/// Which table holds the foreign key column of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ForeignKeySide {
    /// The key lives on the table declaring the relationship.
    Referencing,
    /// The key lives on the related (target) table.
    Target,
}

/// A foreign key constraint backing a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    /// The persisted name of the key column.
    pub column: String,
    pub on: ForeignKeySide,
    #[serde(default)]
    pub nullable: Nullable,
}

/// A relationship from one resource type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipInfo {
    pub target: String,
    pub kind: RelationshipKind,
    pub foreign_key: ForeignKey,
}

/// A structural problem in a resource graph.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Resource '{0}' does not declare its id column '{1}'.")]
    MissingIdColumn(String, String),
    #[error("Relationship '{0}' on resource '{1}' targets unknown resource '{2}'.")]
    UnknownRelationshipTarget(String, String, String),
    #[error("Relationship '{0}' on resource '{1}' names foreign key column '{2}' which is not mapped on the '{3}' side.")]
    UnknownForeignKeyColumn(String, String, String, String),
}

impl ResourceGraph {
    pub fn empty() -> Self {
        ResourceGraph(BTreeMap::new())
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceInfo> {
        self.0.get(resource_type)
    }

    /// Check referential integrity of the graph itself: relationship targets
    /// must exist and foreign key columns must be mapped on the side that
    /// holds them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (resource_name, resource) in &self.0 {
            if !resource.columns.contains_key(&resource.id_column) {
                return Err(ValidationError::MissingIdColumn(
                    resource_name.clone(),
                    resource.id_column.clone(),
                ));
            }
            for (relationship_name, relationship) in &resource.relationships {
                let target = self.0.get(&relationship.target).ok_or_else(|| {
                    ValidationError::UnknownRelationshipTarget(
                        relationship_name.clone(),
                        resource_name.clone(),
                        relationship.target.clone(),
                    )
                })?;
                let (holder_name, holder) = match relationship.foreign_key.on {
                    ForeignKeySide::Referencing => (resource_name, resource),
                    ForeignKeySide::Target => (&relationship.target, target),
                };
                let mapped = holder
                    .columns
                    .values()
                    .any(|column| column.name == relationship.foreign_key.column);
                if !mapped {
                    return Err(ValidationError::UnknownForeignKeyColumn(
                        relationship_name.clone(),
                        resource_name.clone(),
                        relationship.foreign_key.column.clone(),
                        holder_name.clone(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl ResourceInfo {
    /// Lookup a column by its public field name.
    pub fn column(&self, field_name: &str) -> Option<&ColumnInfo> {
        self.columns.get(field_name)
    }

    /// Lookup a relationship by its public name.
    pub fn relationship(&self, relationship_name: &str) -> Option<&RelationshipInfo> {
        self.relationships.get(relationship_name)
    }

    /// The column info of the identity column.
    pub fn id(&self) -> Option<&ColumnInfo> {
        self.columns.get(&self.id_column)
    }

    /// Lookup a column by its persisted name rather than its field name.
    pub fn column_by_persisted_name(&self, column_name: &str) -> Option<&ColumnInfo> {
        self.columns.values().find(|info| info.name == column_name)
    }
}
