//! Drop derived-table selectors nothing references.
//!
//! Derived tables are built projecting every column of every table they
//! enclose, so the outer scope can address any of them during repair. Once
//! repair has run, most of those projections are dead weight; this pass
//! removes the ones no clause of the final statement refers to. Pruning one
//! layer can orphan projections a layer deeper, so the pass runs to a
//! fixpoint.

use std::collections::BTreeSet;

use query_engine_sql::sql::ast::*;

pub fn prune(select: &mut Select) {
    loop {
        let mut used = BTreeSet::new();
        used_in_select(select, &mut used);
        if !prune_select(select, &used) {
            break;
        }
    }
}

/// Remove unreferenced column selectors from every derived table below
/// `select` (never from `select`'s own list). Returns whether anything was
/// removed.
fn prune_select(select: &mut Select, used: &BTreeSet<ColumnKey>) -> bool {
    let mut changed = false;
    if let TableSource::Select(inner) = &mut select.from.source {
        changed |= prune_derived(inner, &select.from.alias, used);
        changed |= prune_select(inner, used);
    }
    for join in &mut select.joins {
        if let TableSource::Select(inner) = &mut join.source {
            changed |= prune_derived(inner, &join.alias, used);
            changed |= prune_select(inner, used);
        }
    }
    changed
}

fn prune_derived(derived: &mut Select, alias: &TableAlias, used: &BTreeSet<ColumnKey>) -> bool {
    let keep = |selector: &Selector| match selector.output_name() {
        Some(name) => used.contains(&ColumnKey(alias.clone(), name.to_string())),
        None => true,
    };
    let before = derived.select_list.len();
    let mut retained: Vec<Selector> = derived
        .select_list
        .iter()
        .filter(|selector| keep(selector))
        .cloned()
        .collect();
    // A select list must not end up empty; fall back to the id projection,
    // or failing that the first one.
    if retained.is_empty() {
        let keeper = derived
            .select_list
            .iter()
            .find(|selector| {
                matches!(
                    selector,
                    Selector::Column {
                        column: ColumnReference::TableColumn {
                            kind: ColumnKind::Id,
                            ..
                        },
                        ..
                    }
                )
            })
            .or_else(|| derived.select_list.first());
        retained.extend(keeper.cloned());
    }
    let changed = retained.len() != before;
    derived.select_list = retained;
    changed
}

// -- reference collection --

fn used_in_select(select: &Select, used: &mut BTreeSet<ColumnKey>) {
    for selector in &select.select_list {
        if let Selector::Column { column, .. } = selector {
            used.insert(column.key());
        }
    }
    if let TableSource::Select(inner) = &select.from.source {
        used_in_select(inner, used);
    }
    for join in &select.joins {
        if let TableSource::Select(inner) = &join.source {
            used_in_select(inner, used);
        }
        used_in_expression(&join.on, used);
    }
    if let Some(expression) = &select.where_.0 {
        used_in_expression(expression, used);
    }
    for element in &select.order_by.elements {
        match &element.target {
            OrderByTarget::Column(column) => {
                used.insert(column.key());
            }
            OrderByTarget::CountSelect(inner) => used_in_select(inner, used),
        }
    }
}

fn used_in_expression(expression: &Expression, used: &mut BTreeSet<ColumnKey>) {
    match expression {
        Expression::Comparison { left, right, .. } => {
            used_in_operand(left, used);
            used_in_operand(right, used);
        }
        Expression::Logical { terms, .. } => {
            for term in terms {
                used_in_expression(term, used);
            }
        }
        Expression::Not(inner) => used_in_expression(inner, used),
        Expression::In { left, values } => {
            used_in_operand(left, used);
            for value in values {
                used_in_operand(value, used);
            }
        }
        Expression::Like { column, .. } => {
            used.insert(column.key());
        }
        Expression::Exists(inner) => used_in_select(inner, used),
    }
}

fn used_in_operand(operand: &Operand, used: &mut BTreeSet<ColumnKey>) {
    match operand {
        Operand::Column(column) => {
            used.insert(column.key());
        }
        Operand::Count(inner) => used_in_select(inner, used),
        Operand::Parameter(_) | Operand::Null => {}
    }
}
