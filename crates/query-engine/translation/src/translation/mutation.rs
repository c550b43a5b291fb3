//! Translate insert, update and delete requests into SQL statements.
//!
//! Mutations are structurally flat: one table, no joins, no rewriting.
//! Each statement gets a fresh naming context, so parameters restart at
//! `p0`.

use indexmap::IndexMap;

use query_engine_metadata::metadata;
use query_engine_sql::sql::ast::*;

use super::context::NameContext;
use super::error::Error;
use super::helpers::Env;

/// Build an INSERT for one resource, assigning the given field values in
/// request order.
///
/// The id is omitted when its value is the type's default (null, zero, an
/// empty string or false), in which case the database generates it and the
/// statement is marked to return it. A client-generated id is written like
/// any other column. Readonly columns are computed in the database and are
/// never assigned.
pub fn translate_insert(
    graph: &metadata::ResourceGraph,
    resource_type: &str,
    values: &IndexMap<String, serde_json::Value>,
) -> Result<Insert, Error> {
    let env = Env::new(graph);
    let mut context = NameContext::new();
    let resource = env.lookup_resource(resource_type)?;
    let id = env.id_column(resource_type)?;

    let mut assignments = vec![];
    let mut id_assigned = false;
    for (field, value) in values {
        let column = lookup_assignable(resource, resource_type, field)?;
        if column.readonly {
            continue;
        }
        if column.kind == metadata::ColumnKind::Id {
            if is_type_default(value) {
                continue;
            }
            id_assigned = true;
        }
        assignments.push((column.name.clone(), context.next_parameter(value.clone())));
    }

    let statement = Insert {
        table: env.table_name(resource),
        assignments,
        returning: (!id_assigned).then(|| id.name.clone()),
    };
    tracing::debug!("SQL AST: {:?}", statement);
    Ok(statement)
}

/// Build an UPDATE of one resource row, identified by its id. Assignment
/// parameters come first, the id parameter last.
pub fn translate_update(
    graph: &metadata::ResourceGraph,
    resource_type: &str,
    id_value: &serde_json::Value,
    values: &IndexMap<String, serde_json::Value>,
) -> Result<Update, Error> {
    let env = Env::new(graph);
    let mut context = NameContext::new();
    let resource = env.lookup_resource(resource_type)?;
    let id = env.id_column(resource_type)?;

    let mut assignments = vec![];
    for (field, value) in values {
        let column = lookup_assignable(resource, resource_type, field)?;
        if column.readonly || column.kind == metadata::ColumnKind::Id {
            continue;
        }
        assignments.push((column.name.clone(), context.next_parameter(value.clone())));
    }

    let statement = Update {
        table: env.table_name(resource),
        assignments,
        where_: MutationFilter {
            column: id.name.clone(),
            values: vec![context.next_parameter(id_value.clone())],
        },
    };
    tracing::debug!("SQL AST: {:?}", statement);
    Ok(statement)
}

/// Build a DELETE of one or more resource rows by id. The renderer picks
/// `=` for a single id and `IN` for several.
pub fn translate_delete(
    graph: &metadata::ResourceGraph,
    resource_type: &str,
    ids: &[serde_json::Value],
) -> Result<Delete, Error> {
    let env = Env::new(graph);
    let id = env.id_column(resource_type)?;
    delete_where(graph, resource_type, &id.name, ids)
}

/// Build a DELETE filtered on an arbitrary mapped column, as used for
/// clearing the dependent side of a one-to-one relationship.
pub fn translate_delete_by_column(
    graph: &metadata::ResourceGraph,
    resource_type: &str,
    field: &str,
    values: &[serde_json::Value],
) -> Result<Delete, Error> {
    let env = Env::new(graph);
    let column = env.lookup_column(resource_type, field)?;
    delete_where(graph, resource_type, &column.name, values)
}

fn delete_where(
    graph: &metadata::ResourceGraph,
    resource_type: &str,
    column_name: &str,
    values: &[serde_json::Value],
) -> Result<Delete, Error> {
    if values.is_empty() {
        return Err(Error::InvariantBroken(
            "delete requested without any key values".to_string(),
        ));
    }
    let env = Env::new(graph);
    let mut context = NameContext::new();
    let resource = env.lookup_resource(resource_type)?;

    let statement = Delete {
        table: env.table_name(resource),
        where_: MutationFilter {
            column: column_name.to_string(),
            values: values
                .iter()
                .map(|value| context.next_parameter(value.clone()))
                .collect(),
        },
    };
    tracing::debug!("SQL AST: {:?}", statement);
    Ok(statement)
}

/// Resolve an assignable field: a mapped column directly, or a to-one
/// relationship held on this side, which assigns its foreign key column.
fn lookup_assignable(
    resource: &metadata::ResourceInfo,
    resource_type: &str,
    field: &str,
) -> Result<AssignableColumn, Error> {
    if let Some(column) = resource.column(field) {
        return Ok(AssignableColumn {
            name: column.name.clone(),
            kind: column.kind,
            readonly: column.readonly,
        });
    }
    if let Some(relationship) = resource.relationship(field) {
        if relationship.kind == metadata::RelationshipKind::ToOne
            && relationship.foreign_key.on == metadata::ForeignKeySide::Referencing
        {
            return Ok(AssignableColumn {
                name: relationship.foreign_key.column.clone(),
                kind: metadata::ColumnKind::ForeignKey,
                readonly: false,
            });
        }
    }
    Err(Error::FieldUnavailable {
        resource_type: resource_type.to_string(),
        field: field.to_string(),
    })
}

struct AssignableColumn {
    name: String,
    kind: metadata::ColumnKind,
    readonly: bool,
}

/// Whether a JSON value is the default of its type, meaning the client left
/// the field unset rather than chose the value.
fn is_type_default(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::Number(number) => {
            number.as_f64().is_some_and(|number| number == 0.0)
        }
        serde_json::Value::String(text) => text.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}
