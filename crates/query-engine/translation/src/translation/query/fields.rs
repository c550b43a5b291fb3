//! Translate field selections into selectors and include joins.

use query_engine_metadata::metadata;
use query_engine_request::request;
use query_engine_sql::sql::ast::*;

use crate::translation::error::Error;

use super::builder::{Accessor, AccessorSource, SelectBuilder};
use super::relationships;

/// Record the columns one layer asks for and join its included
/// relationships, recursing into nested layers.
pub fn translate_selection(
    builder: &mut SelectBuilder,
    accessor: &TableAlias,
    resource_type: &str,
    layer: &request::QueryLayer,
) -> Result<(), Error> {
    request_attributes(builder, accessor, resource_type, layer.selection.as_ref())?;

    if let Some(selection) = &layer.selection {
        for (name, nested) in &selection.relationships {
            translate_include(builder, accessor, resource_type, name, nested)?;
        }
    }
    Ok(())
}

/// Request the attribute columns of one accessor. The id column is always
/// fetched, whether asked for or not; an absent or empty attribute list
/// selects the whole row.
fn request_attributes(
    builder: &mut SelectBuilder,
    accessor: &TableAlias,
    resource_type: &str,
    selection: Option<&request::FieldSelection>,
) -> Result<(), Error> {
    let resource = builder.env.lookup_resource(resource_type)?;
    let id = builder.env.id_column(resource_type)?;
    builder.request_column(builder.column_reference(accessor, id));

    let sparse = match selection {
        Some(selection) if !selection.attributes.is_empty() => {
            let columns = selection
                .attributes
                .iter()
                .map(|field| builder.env.lookup_column(resource_type, field))
                .collect::<Result<Vec<_>, Error>>()?;
            // A readonly column is computed in the database; a selection
            // naming one falls back to the whole row.
            if columns.iter().any(|column| column.readonly) {
                None
            } else {
                Some(columns)
            }
        }
        _ => None,
    };
    match sparse {
        Some(columns) => {
            for column in columns {
                builder.request_column(builder.column_reference(accessor, column));
            }
        }
        None => {
            for column in resource.columns.values() {
                builder.request_column(builder.column_reference(accessor, column));
            }
        }
    }
    Ok(())
}

/// Join one included relationship and recurse into its layer.
///
/// An unconstrained include becomes a plain join. An include carrying its
/// own filter becomes a left-joined derived table so the filter constrains
/// only the included rows; clauses outside it keep referencing the inner
/// accessors, which the scope rewriter repairs via the alias map.
fn translate_include(
    builder: &mut SelectBuilder,
    source_alias: &TableAlias,
    source_type: &str,
    relationship_name: &str,
    nested: &request::QueryLayer,
) -> Result<(), Error> {
    if nested.pagination.is_some() {
        return Err(Error::PaginationNotSupported);
    }
    let relationship = builder.env.lookup_relationship(source_type, relationship_name)?;

    let target_alias = if nested.filter.is_some() {
        derived_include(builder, source_alias, source_type, relationship_name, nested)?
    } else {
        let (alias, _) =
            relationships::join_relationship(builder, source_alias, source_type, relationship_name)?;
        if let Some(sort) = &nested.sort {
            super::sorting::translate_sort(builder, &alias, &relationship.target, sort)?;
        }
        alias
    };

    request_attributes(
        builder,
        &target_alias,
        &relationship.target,
        nested.selection.as_ref(),
    )?;
    if let Some(selection) = &nested.selection {
        for (name, deeper) in &selection.relationships {
            translate_include(builder, &target_alias, &relationship.target, name, deeper)?;
        }
    }
    Ok(())
}

/// Build a filtered include as a derived table and left-join it. Returns
/// the inner primary accessor: callers keep addressing the included
/// resource through it, and the repair pass redirects those references to
/// the derived table.
fn derived_include(
    builder: &mut SelectBuilder,
    source_alias: &TableAlias,
    source_type: &str,
    relationship_name: &str,
    nested: &request::QueryLayer,
) -> Result<TableAlias, Error> {
    let relationship = builder.env.lookup_relationship(source_type, relationship_name)?;

    let sub_builder = SelectBuilder::new(builder.env, &mut *builder.context);
    let derived = sub_builder.build_derived(nested)?;

    let derived_alias = builder.context.next_table_alias();
    for inner in &derived.inner_aliases {
        builder
            .context
            .record_folded_alias(inner.clone(), derived_alias.clone());
    }

    let on = relationships::relationship_condition(
        builder.env,
        source_alias,
        source_type,
        &derived.primary,
        relationship,
    )?;
    builder.register_join(
        derived_alias.clone(),
        Accessor {
            resource_type: relationship.target.clone(),
            source: AccessorSource::Derived(derived.select),
            join: Some((JoinKind::LeftOuter, on)),
            parent: Some(source_alias.clone()),
            to_many: relationship.kind == metadata::RelationshipKind::ToMany,
        },
    );
    builder.remember_relationship_join(
        source_alias.clone(),
        relationship_name.to_string(),
        derived_alias.clone(),
    );

    Ok(derived.primary)
}
