//! The read statement builder: lowers one resource query layer into a
//! Select AST, spawning nested builders for correlated sub-selects.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use query_engine_metadata::metadata;
use query_engine_request::request;
use query_engine_sql::sql::ast::*;
use query_engine_sql::sql::helpers as sql_helpers;

use crate::translation::context::NameContext;
use crate::translation::error::Error;
use crate::translation::helpers::{column_kind, Env};

use super::{fields, filtering, sorting};

/// What the select list of a built statement contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectShape {
    /// Plain columns; the normal case.
    Columns,
    /// `COUNT(*)`, for count sub-selects.
    Count,
    /// The literal `1`, for EXISTS sub-selects.
    One,
}

/// How a table entered the statement scope.
#[derive(Debug)]
pub struct Accessor {
    pub resource_type: String,
    pub source: AccessorSource,
    /// None for the primary (FROM) accessor.
    pub join: Option<(JoinKind, Expression)>,
    pub parent: Option<TableAlias>,
    /// Whether the edge from the parent is a to-many relationship.
    pub to_many: bool,
}

#[derive(Debug)]
pub enum AccessorSource {
    Table(TableName),
    Derived(Select),
}

/// The result of building a filtered nested layer into a derived table.
pub struct DerivedTable {
    pub select: Select,
    /// The inner primary accessor. Outer clauses keep referencing it and
    /// are repaired against the alias map afterwards.
    pub primary: TableAlias,
    pub inner_aliases: Vec<TableAlias>,
}

/// A fresh builder is constructed per statement; nested sub-builders share
/// only the naming context with their parent.
pub struct SelectBuilder<'a, 'ctx> {
    pub env: &'a Env<'a>,
    pub context: &'ctx mut NameContext,
    accessors: IndexMap<TableAlias, Accessor>,
    /// (source accessor, relationship name) -> joined accessor, so that
    /// repeated references reuse the join instead of duplicating it.
    relationship_joins: BTreeMap<(TableAlias, String), TableAlias>,
    /// Unique output name assigned to each column of this statement.
    column_names: BTreeMap<ColumnKey, String>,
    used_selector_names: BTreeSet<String>,
    /// The columns the caller asked for, in request order.
    selected: Vec<ColumnReference>,
    where_terms: Vec<Expression>,
    order_elements: Vec<OrderByElement>,
}

impl<'a, 'ctx> SelectBuilder<'a, 'ctx> {
    pub fn new(env: &'a Env<'a>, context: &'ctx mut NameContext) -> SelectBuilder<'a, 'ctx> {
        SelectBuilder {
            env,
            context,
            accessors: IndexMap::new(),
            relationship_joins: BTreeMap::new(),
            column_names: BTreeMap::new(),
            used_selector_names: BTreeSet::new(),
            selected: vec![],
            where_terms: vec![],
            order_elements: vec![],
        }
    }

    /// Build the top-level statement for a query layer.
    pub fn build_root(mut self, layer: &request::QueryLayer) -> Result<Select, Error> {
        self.build_layer(layer)?;

        // A to-many join duplicates primary rows. When the layer also
        // carries its own filter, the primary scope is folded into a
        // derived table so the filter constrains each primary row exactly
        // once; the ORDER BY stays on the outer statement. Column
        // references left behind by the fold are repaired afterwards.
        let needs_fold = layer.filter.is_some() && self.has_to_many_join();
        if needs_fold {
            self.fold_primary_scope()
        } else {
            self.finish(SelectShape::Columns)
        }
    }

    /// Visit one query layer: primary accessor, filter, sort, selection.
    pub fn build_layer(&mut self, layer: &request::QueryLayer) -> Result<(), Error> {
        let primary = self.build_scope(layer)?;

        if let Some(sort) = &layer.sort {
            sorting::translate_sort(self, &primary, &layer.resource_type, sort)?;
        }

        fields::translate_selection(self, &primary, &layer.resource_type, layer)?;

        Ok(())
    }

    /// Register a layer's primary accessor and translate its filter. The
    /// filter may join further accessors for the to-one paths it traverses.
    fn build_scope(&mut self, layer: &request::QueryLayer) -> Result<TableAlias, Error> {
        if layer.pagination.is_some() {
            return Err(Error::PaginationNotSupported);
        }

        let resource = self.env.lookup_resource(&layer.resource_type)?;
        let table = self.env.table_name(resource);
        let primary = self.register_primary(&layer.resource_type, table)?;

        if let Some(filter) = &layer.filter {
            let mut guards = vec![];
            let expression = filtering::translate_filter(
                self,
                &primary,
                &layer.resource_type,
                filter,
                &mut guards,
            )?;
            self.where_terms.push(expression);
        }

        Ok(primary)
    }

    /// Build this builder into a correlated sub-select over a relationship
    /// target, constrained by the correlation condition and an optional
    /// inner filter.
    pub fn build_correlated(
        mut self,
        outer_alias: &TableAlias,
        outer_type: &str,
        relationship_name: &str,
        filter: Option<&request::Filter>,
        shape: SelectShape,
    ) -> Result<Select, Error> {
        let relationship = self.env.lookup_relationship(outer_type, relationship_name)?;
        let resource = self.env.lookup_resource(&relationship.target)?;
        let table = self.env.table_name(resource);
        let primary = self.register_primary(&relationship.target, table)?;

        let correlation = super::relationships::relationship_condition(
            self.env,
            outer_alias,
            outer_type,
            &primary,
            relationship,
        )?;
        self.where_terms.push(correlation);
        if let Some(filter) = filter {
            let mut guards = vec![];
            let expression = filtering::translate_filter(
                &mut self,
                &primary,
                &relationship.target,
                filter,
                &mut guards,
            )?;
            self.where_terms.push(expression);
        }

        self.finish(shape)
    }

    /// Build this builder into a derived table for a filtered nested layer.
    /// Only the layer's own scope goes inside: its table and the joins its
    /// filter traverses. The inner sort is dropped and every column of
    /// every inner accessor is projected, so the outer scope can address
    /// any of them. The layer's selection, including deeper includes, stays
    /// with the caller, which keeps addressing the returned primary alias.
    pub fn build_derived(mut self, layer: &request::QueryLayer) -> Result<DerivedTable, Error> {
        let primary = self.build_scope(layer)?;
        let inner_aliases = self.accessor_aliases();

        let select_list = self.all_columns_selectors(&inner_aliases)?;
        let where_ = Where(sql_helpers::and(std::mem::take(&mut self.where_terms)));
        let (from, joins) = self.accessors_into_from_and_joins(inner_aliases.clone())?;
        let select = Select {
            select_list,
            from,
            joins,
            where_,
            order_by: sql_helpers::empty_order_by(),
        };

        Ok(DerivedTable {
            select,
            primary,
            inner_aliases,
        })
    }

    // -- accessor management --

    /// Register the FROM target. Registering it twice is a builder bug.
    pub fn register_primary(
        &mut self,
        resource_type: &str,
        table: TableName,
    ) -> Result<TableAlias, Error> {
        if !self.accessors.is_empty() {
            return Err(Error::InvariantBroken(
                "primary table registered twice".to_string(),
            ));
        }
        let alias = self.context.next_table_alias();
        self.accessors.insert(
            alias.clone(),
            Accessor {
                resource_type: resource_type.to_string(),
                source: AccessorSource::Table(table),
                join: None,
                parent: None,
                to_many: false,
            },
        );
        Ok(alias)
    }

    pub fn register_join(&mut self, alias: TableAlias, accessor: Accessor) {
        self.accessors.insert(alias, accessor);
    }

    pub fn accessor(&self, alias: &TableAlias) -> Result<&Accessor, Error> {
        self.accessors.get(alias).ok_or_else(|| {
            Error::InvariantBroken(format!("selector scope '{}' was never registered", alias.0))
        })
    }

    pub fn accessor_aliases(&self) -> Vec<TableAlias> {
        self.accessors.keys().cloned().collect()
    }

    pub fn existing_relationship_join(
        &self,
        source: &TableAlias,
        relationship: &str,
    ) -> Option<TableAlias> {
        self.relationship_joins
            .get(&(source.clone(), relationship.to_string()))
            .cloned()
    }

    pub fn remember_relationship_join(
        &mut self,
        source: TableAlias,
        relationship: String,
        target: TableAlias,
    ) {
        self.relationship_joins
            .insert((source, relationship), target);
    }

    // -- selection --

    /// Record a column the caller asked for.
    pub fn request_column(&mut self, column: ColumnReference) {
        if !self.selected.iter().any(|c| c.key() == column.key()) {
            self.selected.push(column);
        }
    }

    pub fn push_order_element(&mut self, element: OrderByElement) {
        self.order_elements.push(element);
    }

    /// The unique selector name assigned to a column within this statement.
    /// Collisions are resolved by appending `0` until unique.
    pub fn selector_name_for(&mut self, column: &ColumnReference) -> String {
        let key = column.key();
        if let Some(name) = self.column_names.get(&key) {
            return name.clone();
        }
        let mut name = column.persisted_name().to_string();
        while !self.used_selector_names.insert(name.clone()) {
            name.push('0');
        }
        self.column_names.insert(key, name.clone());
        name
    }

    /// A column reference for a mapped column of a table accessor.
    pub fn column_reference(
        &self,
        accessor: &TableAlias,
        column: &metadata::ColumnInfo,
    ) -> ColumnReference {
        ColumnReference::TableColumn {
            table: accessor.clone(),
            name: column.name.clone(),
            kind: column_kind(column.kind),
        }
    }

    // -- assembly --

    fn has_to_many_join(&self) -> bool {
        self.accessors.values().any(|accessor| accessor.to_many)
    }

    /// Assemble the accumulated state into a Select of the given shape.
    pub fn finish(mut self, shape: SelectShape) -> Result<Select, Error> {
        let select_list = match shape {
            SelectShape::Columns => self.ordered_selectors()?,
            SelectShape::Count => vec![Selector::CountStar],
            SelectShape::One => vec![Selector::One],
        };
        let order_by = OrderBy {
            elements: std::mem::take(&mut self.order_elements),
        };
        let where_ = Where(sql_helpers::and(std::mem::take(&mut self.where_terms)));
        let (from, joins) = self.accessors_into_from_and_joins(self.accessor_aliases())?;
        Ok(Select {
            select_list,
            from,
            joins,
            where_,
            order_by,
        })
    }

    /// Fold the primary scope (FROM, non-to-many joins, WHERE) into a
    /// derived table, leaving to-many joins and the ORDER BY outside.
    /// Inside the derived table every column of every folded accessor is
    /// selected so outer references can address any of them; the alias map
    /// records how to reach them.
    fn fold_primary_scope(mut self) -> Result<Select, Error> {
        let outside = self.aliases_behind_to_many_edges();
        let inside: Vec<TableAlias> = self
            .accessors
            .keys()
            .filter(|alias| !outside.contains(alias))
            .cloned()
            .collect();

        let inner_list = self.all_columns_selectors(&inside)?;
        let select_list = self.ordered_selectors()?;
        let order_by = OrderBy {
            elements: std::mem::take(&mut self.order_elements),
        };
        let inner_where = Where(sql_helpers::and(std::mem::take(&mut self.where_terms)));
        let (inner_from, inner_joins) = self.accessors_into_from_and_joins(inside.clone())?;
        let inner_select = Select {
            select_list: inner_list,
            from: inner_from,
            joins: inner_joins,
            where_: inner_where,
            order_by: sql_helpers::empty_order_by(),
        };

        let derived_alias = self.context.next_table_alias();
        for alias in &inside {
            self.context
                .record_folded_alias(alias.clone(), derived_alias.clone());
        }

        // The outer statement: the derived table plus the to-many joins.
        // Their ON conditions, the select list, and the ORDER BY still
        // reference folded aliases; the scope rewriter repairs them.
        let outside_aliases: Vec<TableAlias> = self
            .accessors
            .keys()
            .filter(|alias| outside.contains(alias))
            .cloned()
            .collect();
        let mut joins = vec![];
        for alias in outside_aliases {
            let accessor = self.accessors.shift_remove(&alias).ok_or_else(|| {
                Error::InvariantBroken(format!("selector scope '{}' was never registered", alias.0))
            })?;
            joins.push(accessor_into_join(alias, accessor)?);
        }

        Ok(Select {
            select_list,
            from: From {
                source: TableSource::Select(Box::new(inner_select)),
                alias: derived_alias,
            },
            joins,
            where_: sql_helpers::empty_where(),
            order_by,
        })
    }

    /// Aliases reachable from the primary only by crossing a to-many edge.
    fn aliases_behind_to_many_edges(&self) -> BTreeSet<TableAlias> {
        let mut outside = BTreeSet::new();
        for (alias, accessor) in &self.accessors {
            let parent_outside = accessor
                .parent
                .as_ref()
                .is_some_and(|parent| outside.contains(parent));
            if accessor.to_many || parent_outside {
                outside.insert(alias.clone());
            }
        }
        outside
    }

    /// Deterministic select list for the requested columns: accessors in
    /// registration order; within a table accessor the id column first and
    /// the rest ordered by name; within a derived accessor the original
    /// request order is preserved. A requested column may still reference
    /// an alias folded into a derived table; the alias map tells us which
    /// accessor it belongs to.
    fn ordered_selectors(&mut self) -> Result<Vec<Selector>, Error> {
        let selected = self.selected.clone();
        let alias_map = self.context.alias_map.clone();
        let resolve = |alias: &TableAlias| {
            let mut current = alias.clone();
            while let Some(outer) = alias_map.get(&current) {
                current = outer.clone();
            }
            current
        };
        let mut ordered = vec![];
        for alias in self.accessor_aliases() {
            let is_derived = matches!(
                self.accessor(&alias)?.source,
                AccessorSource::Derived(_)
            );
            let mut of_accessor: Vec<ColumnReference> = selected
                .iter()
                .filter(|column| resolve(column.table_alias()) == alias)
                .cloned()
                .collect();
            if !is_derived {
                of_accessor.sort_by(|left, right| {
                    let id_first = |column: &ColumnReference| {
                        !matches!(
                            column,
                            ColumnReference::TableColumn {
                                kind: ColumnKind::Id,
                                ..
                            }
                        )
                    };
                    (id_first(left), left.name().to_string())
                        .cmp(&(id_first(right), right.name().to_string()))
                });
            }
            ordered.extend(of_accessor);
        }
        Ok(ordered
            .into_iter()
            .map(|column| {
                let name = self.selector_name_for(&column);
                let alias = (name != column.name()).then_some(name);
                Selector::Column { column, alias }
            })
            .collect())
    }

    /// Every column of every listed accessor, as selectors with unique
    /// names: mapped columns for table accessors (id first, then by name),
    /// projected output names for derived accessors (original order).
    fn all_columns_selectors(&mut self, aliases: &[TableAlias]) -> Result<Vec<Selector>, Error> {
        let mut columns: Vec<ColumnReference> = vec![];
        for alias in aliases {
            let accessor = self.accessor(alias)?;
            match &accessor.source {
                AccessorSource::Table(_) => {
                    let resource = self.env.lookup_resource(&accessor.resource_type)?;
                    let mut infos: Vec<&metadata::ColumnInfo> = resource.columns.values().collect();
                    infos.sort_by_key(|info| {
                        (info.kind != metadata::ColumnKind::Id, info.name.clone())
                    });
                    for info in infos {
                        columns.push(self.column_reference(alias, info));
                    }
                }
                AccessorSource::Derived(select) => {
                    for selector in &select.select_list {
                        if let Selector::Column { column, alias: out } = selector {
                            let name = out.clone().unwrap_or_else(|| column.name().to_string());
                            columns.push(ColumnReference::SelectColumn {
                                table: alias.clone(),
                                name,
                                persisted: column.persisted_name().to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(columns
            .into_iter()
            .map(|column| {
                let name = self.selector_name_for(&column);
                let alias = (name != column.name()).then_some(name);
                Selector::Column { column, alias }
            })
            .collect())
    }

    /// Drain the listed accessors into a FROM (the first, which must be the
    /// primary) and JOIN clauses (the rest).
    fn accessors_into_from_and_joins(
        &mut self,
        aliases: Vec<TableAlias>,
    ) -> Result<(From, Vec<Join>), Error> {
        let mut from = None;
        let mut joins = vec![];
        for alias in aliases {
            let accessor = self.accessors.shift_remove(&alias).ok_or_else(|| {
                Error::InvariantBroken(format!("selector scope '{}' was never registered", alias.0))
            })?;
            match accessor.join {
                None => {
                    from = Some(From {
                        source: accessor_source(accessor.source),
                        alias,
                    });
                }
                Some(_) => joins.push(accessor_into_join(alias, accessor)?),
            }
        }
        from.map(|from| (from, joins)).ok_or_else(|| {
            Error::InvariantBroken("statement has no primary table accessor".to_string())
        })
    }
}

fn accessor_source(source: AccessorSource) -> TableSource {
    match source {
        AccessorSource::Table(name) => TableSource::Table(name),
        AccessorSource::Derived(select) => TableSource::Select(Box::new(select)),
    }
}

fn accessor_into_join(alias: TableAlias, accessor: Accessor) -> Result<Join, Error> {
    let (kind, on) = accessor.join.ok_or_else(|| {
        Error::InvariantBroken(format!("accessor '{}' joined without a join condition", alias.0))
    })?;
    Ok(Join {
        kind,
        source: accessor_source(accessor.source),
        alias,
        on,
    })
}
