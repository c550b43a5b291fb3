//! Turning relationship traversals into joins and correlation conditions.

use query_engine_metadata::metadata;
use query_engine_sql::sql::ast::*;
use query_engine_sql::sql::helpers as sql_helpers;

use crate::translation::error::Error;
use crate::translation::helpers::Env;

use super::builder::{Accessor, AccessorSource, SelectBuilder, SelectShape};

/// Follow a chain of to-one relationships from a starting accessor, joining
/// each target once, and return the accessor and resource type at the end
/// of the chain. Hitting a to-many segment is a client error.
///
/// Every left-joined target contributes an IS NULL guard, since a missing
/// related row makes any predicate over the chain non-true rather than
/// false.
pub fn traverse_to_one(
    builder: &mut SelectBuilder,
    start_alias: &TableAlias,
    start_type: &str,
    path: &[String],
    guards: &mut Vec<Expression>,
) -> Result<(TableAlias, String), Error> {
    let mut alias = start_alias.clone();
    let mut resource_type = start_type.to_string();
    for segment in path {
        let relationship = builder.env.lookup_relationship(&resource_type, segment)?;
        if relationship.kind == metadata::RelationshipKind::ToMany {
            return Err(Error::ToManyTraversal {
                resource_type,
                relationship: segment.clone(),
            });
        }
        let (target_alias, kind) = join_relationship(builder, &alias, &resource_type, segment)?;
        if kind == JoinKind::LeftOuter {
            let target_id = builder.env.id_column(&relationship.target)?;
            let guard = sql_helpers::is_null(ColumnReference::TableColumn {
                table: target_alias.clone(),
                name: target_id.name.clone(),
                kind: ColumnKind::Id,
            });
            if !guards.contains(&guard) {
                guards.push(guard);
            }
        }
        alias = target_alias;
        resource_type = relationship.target.clone();
    }
    Ok((alias, resource_type))
}

/// Join a relationship target into the current statement scope, reusing an
/// existing join for the same source and relationship. Returns the target
/// accessor and the join kind used.
pub fn join_relationship(
    builder: &mut SelectBuilder,
    source_alias: &TableAlias,
    source_type: &str,
    relationship_name: &str,
) -> Result<(TableAlias, JoinKind), Error> {
    let relationship = builder.env.lookup_relationship(source_type, relationship_name)?;
    let kind = join_kind(relationship);

    if let Some(existing) = builder.existing_relationship_join(source_alias, relationship_name) {
        return Ok((existing, kind));
    }

    let target = builder.env.lookup_resource(&relationship.target)?;
    let table = builder.env.table_name(target);
    let alias = builder.context.next_table_alias();
    let on = relationship_condition(builder.env, source_alias, source_type, &alias, relationship)?;
    builder.register_join(
        alias.clone(),
        Accessor {
            resource_type: relationship.target.clone(),
            source: AccessorSource::Table(table),
            join: Some((kind, on)),
            parent: Some(source_alias.clone()),
            to_many: relationship.kind == metadata::RelationshipKind::ToMany,
        },
    );
    builder.remember_relationship_join(
        source_alias.clone(),
        relationship_name.to_string(),
        alias.clone(),
    );
    Ok((alias, kind))
}

/// A join can only be INNER when a matching row is guaranteed: a to-one
/// relationship through a non-nullable foreign key held on the referencing
/// side. Everything else left-joins, so unrelated rows survive.
pub fn join_kind(relationship: &metadata::RelationshipInfo) -> JoinKind {
    let fk = &relationship.foreign_key;
    if relationship.kind == metadata::RelationshipKind::ToOne
        && fk.on == metadata::ForeignKeySide::Referencing
        && !fk.nullable.is_nullable()
    {
        JoinKind::Inner
    } else {
        JoinKind::LeftOuter
    }
}

/// The equality tying a relationship target to its source, usable both as a
/// join ON condition and as the correlation of a sub-select.
pub fn relationship_condition(
    env: &Env,
    source_alias: &TableAlias,
    source_type: &str,
    target_alias: &TableAlias,
    relationship: &metadata::RelationshipInfo,
) -> Result<Expression, Error> {
    let source_id = env.id_column(source_type)?;
    let target_id = env.id_column(&relationship.target)?;
    let fk = &relationship.foreign_key;
    let condition = match fk.on {
        metadata::ForeignKeySide::Referencing => sql_helpers::column_equals(
            ColumnReference::TableColumn {
                table: source_alias.clone(),
                name: fk.column.clone(),
                kind: ColumnKind::ForeignKey,
            },
            ColumnReference::TableColumn {
                table: target_alias.clone(),
                name: target_id.name.clone(),
                kind: ColumnKind::Id,
            },
        ),
        metadata::ForeignKeySide::Target => sql_helpers::column_equals(
            ColumnReference::TableColumn {
                table: target_alias.clone(),
                name: fk.column.clone(),
                kind: ColumnKind::ForeignKey,
            },
            ColumnReference::TableColumn {
                table: source_alias.clone(),
                name: source_id.name.clone(),
                kind: ColumnKind::Id,
            },
        ),
    };
    Ok(condition)
}

/// A correlated `SELECT COUNT(*)` over the to-many relationship at the end
/// of a path whose leading segments are to-one.
pub fn count_select(
    builder: &mut SelectBuilder,
    start_alias: &TableAlias,
    start_type: &str,
    path: &[String],
    guards: &mut Vec<Expression>,
) -> Result<Select, Error> {
    let (last, leading) = path.split_last().ok_or_else(|| {
        Error::InvariantBroken("count target with an empty relationship path".to_string())
    })?;
    let (alias, resource_type) =
        traverse_to_one(builder, start_alias, start_type, leading, guards)?;
    let sub_builder = SelectBuilder::new(builder.env, &mut *builder.context);
    sub_builder.build_correlated(&alias, &resource_type, last, None, SelectShape::Count)
}
