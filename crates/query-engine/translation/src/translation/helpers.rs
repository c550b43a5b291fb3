//! Helpers for looking up metadata while building SQL.

use query_engine_metadata::metadata;
use query_engine_sql::sql;

use super::error::Error;

/// Static information from the resource graph, shared by every builder of
/// one statement.
pub struct Env<'a> {
    graph: &'a metadata::ResourceGraph,
}

impl<'a> Env<'a> {
    pub fn new(graph: &'a metadata::ResourceGraph) -> Env<'a> {
        Env { graph }
    }

    /// Lookup a resource type's table mapping in the graph.
    pub fn lookup_resource(&self, resource_type: &str) -> Result<&'a metadata::ResourceInfo, Error> {
        self.graph
            .get(resource_type)
            .ok_or_else(|| Error::ResourceTypeNotFound(resource_type.to_string()))
    }

    /// Lookup a column by public field name on a resource type.
    pub fn lookup_column(
        &self,
        resource_type: &str,
        field: &str,
    ) -> Result<&'a metadata::ColumnInfo, Error> {
        self.lookup_resource(resource_type)?
            .column(field)
            .ok_or_else(|| Error::FieldUnavailable {
                resource_type: resource_type.to_string(),
                field: field.to_string(),
            })
    }

    /// Lookup a relationship by public name on a resource type.
    pub fn lookup_relationship(
        &self,
        resource_type: &str,
        relationship: &str,
    ) -> Result<&'a metadata::RelationshipInfo, Error> {
        self.lookup_resource(resource_type)?
            .relationship(relationship)
            .ok_or_else(|| Error::RelationshipUnavailable {
                resource_type: resource_type.to_string(),
                relationship: relationship.to_string(),
            })
    }

    /// The identity column of a resource type. Graph validation guarantees
    /// it is mapped, so a miss is a compiler bug.
    pub fn id_column(&self, resource_type: &str) -> Result<&'a metadata::ColumnInfo, Error> {
        self.lookup_resource(resource_type)?.id().ok_or_else(|| {
            Error::InvariantBroken(format!(
                "resource '{resource_type}' has no mapped id column"
            ))
        })
    }

    /// The table name of a resource type.
    pub fn table_name(&self, resource: &metadata::ResourceInfo) -> sql::ast::TableName {
        sql::ast::TableName {
            schema: resource.schema_name.clone(),
            name: resource.table_name.clone(),
        }
    }
}

/// Map a metadata column kind onto the AST's column kind.
pub fn column_kind(kind: metadata::ColumnKind) -> sql::ast::ColumnKind {
    match kind {
        metadata::ColumnKind::Id => sql::ast::ColumnKind::Id,
        metadata::ColumnKind::Attribute => sql::ast::ColumnKind::Attribute,
        metadata::ColumnKind::ForeignKey => sql::ast::ColumnKind::ForeignKey,
    }
}
