//! Repair column references that outlived the scope they were built in.
//!
//! When a statement scope is folded into a derived table, clauses built
//! earlier (join conditions, order-by count correlations, requested
//! selectors) still address the original table aliases, which are no longer
//! visible. The alias map records where each folded alias went; this pass
//! redirects every such reference at the derived table's projection of the
//! same column, adding a pass-through selector to the derived table when it
//! does not already project it.

use std::collections::{BTreeMap, BTreeSet};

use query_engine_sql::sql::ast::*;

use crate::translation::error::Error;

/// Repair all stale references in `select` against the alias map. Folds can
/// nest, so the pass repeats until a walk finds nothing stale; failing to
/// converge within one pass per mapping is a compiler bug.
pub fn repair(
    select: &mut Select,
    alias_map: &BTreeMap<TableAlias, TableAlias>,
) -> Result<(), Error> {
    if alias_map.is_empty() {
        return Ok(());
    }
    for _ in 0..=alias_map.len() {
        let mut stale = vec![];
        collect_select(select, alias_map, &BTreeSet::new(), &mut stale);
        if stale.is_empty() {
            return Ok(());
        }

        let mut replacements: BTreeMap<ColumnKey, ColumnReference> = BTreeMap::new();
        for reference in stale {
            let key = reference.key();
            if replacements.contains_key(&key) {
                continue;
            }
            let target = alias_map.get(reference.table_alias()).ok_or_else(|| {
                Error::InvariantBroken(format!(
                    "alias '{}' is stale but not in the alias map",
                    reference.table_alias().0
                ))
            })?;
            let name = ensure_projection(select, target, &reference).ok_or_else(|| {
                Error::InvariantBroken(format!(
                    "derived table '{}' not found while repairing '{}'",
                    target.0, reference.table_alias().0
                ))
            })?;
            replacements.insert(
                key,
                ColumnReference::SelectColumn {
                    table: target.clone(),
                    name,
                    persisted: reference.persisted_name().to_string(),
                },
            );
        }

        substitute_select(select, &replacements, &BTreeSet::new());
    }
    Err(Error::InvariantBroken(
        "cross-scope reference repair did not converge".to_string(),
    ))
}

// -- phase 1: find references to aliases that are mapped away and not
// visible in their scope chain --

fn collect_select(
    select: &Select,
    alias_map: &BTreeMap<TableAlias, TableAlias>,
    ancestors: &BTreeSet<TableAlias>,
    stale: &mut Vec<ColumnReference>,
) {
    let visible = visible_in(select, ancestors);

    for selector in &select.select_list {
        if let Selector::Column { column, .. } = selector {
            collect_reference(column, alias_map, &visible, stale);
        }
    }
    if let TableSource::Select(inner) = &select.from.source {
        collect_select(inner, alias_map, &visible, stale);
    }
    for join in &select.joins {
        if let TableSource::Select(inner) = &join.source {
            collect_select(inner, alias_map, &visible, stale);
        }
        collect_expression(&join.on, alias_map, &visible, stale);
    }
    if let Some(expression) = &select.where_.0 {
        collect_expression(expression, alias_map, &visible, stale);
    }
    for element in &select.order_by.elements {
        match &element.target {
            OrderByTarget::Column(column) => {
                collect_reference(column, alias_map, &visible, stale);
            }
            OrderByTarget::CountSelect(inner) => {
                collect_select(inner, alias_map, &visible, stale);
            }
        }
    }
}

fn collect_expression(
    expression: &Expression,
    alias_map: &BTreeMap<TableAlias, TableAlias>,
    visible: &BTreeSet<TableAlias>,
    stale: &mut Vec<ColumnReference>,
) {
    match expression {
        Expression::Comparison { left, right, .. } => {
            collect_operand(left, alias_map, visible, stale);
            collect_operand(right, alias_map, visible, stale);
        }
        Expression::Logical { terms, .. } => {
            for term in terms {
                collect_expression(term, alias_map, visible, stale);
            }
        }
        Expression::Not(inner) => collect_expression(inner, alias_map, visible, stale),
        Expression::In { left, values } => {
            collect_operand(left, alias_map, visible, stale);
            for value in values {
                collect_operand(value, alias_map, visible, stale);
            }
        }
        Expression::Like { column, .. } => collect_reference(column, alias_map, visible, stale),
        Expression::Exists(inner) => collect_select(inner, alias_map, visible, stale),
    }
}

fn collect_operand(
    operand: &Operand,
    alias_map: &BTreeMap<TableAlias, TableAlias>,
    visible: &BTreeSet<TableAlias>,
    stale: &mut Vec<ColumnReference>,
) {
    match operand {
        Operand::Column(column) => collect_reference(column, alias_map, visible, stale),
        Operand::Count(inner) => collect_select(inner, alias_map, visible, stale),
        Operand::Parameter(_) | Operand::Null => {}
    }
}

fn collect_reference(
    reference: &ColumnReference,
    alias_map: &BTreeMap<TableAlias, TableAlias>,
    visible: &BTreeSet<TableAlias>,
    stale: &mut Vec<ColumnReference>,
) {
    let alias = reference.table_alias();
    if alias_map.contains_key(alias) && !visible.contains(alias) {
        stale.push(reference.clone());
    }
}

// -- phase 2: make sure the derived table projects the referenced column --

/// Find the derived table registered under `target` anywhere in the tree
/// and return the output name under which it projects `reference`, adding a
/// pass-through selector (with a collision-free name) when it does not.
fn ensure_projection(
    select: &mut Select,
    target: &TableAlias,
    reference: &ColumnReference,
) -> Option<String> {
    if select.from.alias == *target {
        if let TableSource::Select(inner) = &mut select.from.source {
            return Some(project(inner, reference));
        }
    }
    if let TableSource::Select(inner) = &mut select.from.source {
        if let Some(name) = ensure_projection(inner, target, reference) {
            return Some(name);
        }
    }
    for join in &mut select.joins {
        if join.alias == *target {
            if let TableSource::Select(inner) = &mut join.source {
                return Some(project(inner, reference));
            }
        }
        if let TableSource::Select(inner) = &mut join.source {
            if let Some(name) = ensure_projection(inner, target, reference) {
                return Some(name);
            }
        }
    }
    None
}

fn project(derived: &mut Select, reference: &ColumnReference) -> String {
    for selector in &derived.select_list {
        if let Selector::Column { column, .. } = selector {
            if column.key() == reference.key() {
                if let Some(name) = selector.output_name() {
                    return name.to_string();
                }
            }
        }
    }
    let used: BTreeSet<&str> = derived
        .select_list
        .iter()
        .filter_map(Selector::output_name)
        .collect();
    let mut name = reference.persisted_name().to_string();
    while used.contains(name.as_str()) {
        name.push('0');
    }
    derived.select_list.push(Selector::Column {
        column: reference.clone(),
        alias: (name != reference.name()).then(|| name.clone()),
    });
    name
}

// -- phase 3: swap the stale references for derived-table projections --

fn substitute_select(
    select: &mut Select,
    replacements: &BTreeMap<ColumnKey, ColumnReference>,
    ancestors: &BTreeSet<TableAlias>,
) {
    let visible = visible_in(select, ancestors);

    for selector in &mut select.select_list {
        if let Selector::Column { column, .. } = selector {
            substitute_reference(column, replacements, &visible);
        }
    }
    if let TableSource::Select(inner) = &mut select.from.source {
        substitute_select(inner, replacements, &visible);
    }
    for join in &mut select.joins {
        if let TableSource::Select(inner) = &mut join.source {
            substitute_select(inner, replacements, &visible);
        }
        substitute_expression(&mut join.on, replacements, &visible);
    }
    if let Some(expression) = &mut select.where_.0 {
        substitute_expression(expression, replacements, &visible);
    }
    for element in &mut select.order_by.elements {
        match &mut element.target {
            OrderByTarget::Column(column) => {
                substitute_reference(column, replacements, &visible);
            }
            OrderByTarget::CountSelect(inner) => {
                substitute_select(inner, replacements, &visible);
            }
        }
    }
}

fn substitute_expression(
    expression: &mut Expression,
    replacements: &BTreeMap<ColumnKey, ColumnReference>,
    visible: &BTreeSet<TableAlias>,
) {
    match expression {
        Expression::Comparison { left, right, .. } => {
            substitute_operand(left, replacements, visible);
            substitute_operand(right, replacements, visible);
        }
        Expression::Logical { terms, .. } => {
            for term in terms {
                substitute_expression(term, replacements, visible);
            }
        }
        Expression::Not(inner) => substitute_expression(inner, replacements, visible),
        Expression::In { left, values } => {
            substitute_operand(left, replacements, visible);
            for value in values {
                substitute_operand(value, replacements, visible);
            }
        }
        Expression::Like { column, .. } => substitute_reference(column, replacements, visible),
        Expression::Exists(inner) => substitute_select(inner, replacements, visible),
    }
}

fn substitute_operand(
    operand: &mut Operand,
    replacements: &BTreeMap<ColumnKey, ColumnReference>,
    visible: &BTreeSet<TableAlias>,
) {
    match operand {
        Operand::Column(column) => substitute_reference(column, replacements, visible),
        Operand::Count(inner) => substitute_select(inner, replacements, visible),
        Operand::Parameter(_) | Operand::Null => {}
    }
}

fn substitute_reference(
    reference: &mut ColumnReference,
    replacements: &BTreeMap<ColumnKey, ColumnReference>,
    visible: &BTreeSet<TableAlias>,
) {
    if visible.contains(reference.table_alias()) {
        return;
    }
    if let Some(replacement) = replacements.get(&reference.key()) {
        *reference = replacement.clone();
    }
}

fn visible_in(select: &Select, ancestors: &BTreeSet<TableAlias>) -> BTreeSet<TableAlias> {
    let mut visible = ancestors.clone();
    visible.insert(select.from.alias.clone());
    for join in &select.joins {
        visible.insert(join.alias.clone());
    }
    visible
}
