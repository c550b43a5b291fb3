//! Collapse nested logical chains: `AND(a, AND(b, c))` becomes
//! `AND(a, b, c)`, and a logical node with a single remaining term is
//! replaced by that term.

use query_engine_sql::sql::ast::*;

pub fn flatten_select(select: &mut Select) {
    if let TableSource::Select(inner) = &mut select.from.source {
        flatten_select(inner);
    }
    for join in &mut select.joins {
        if let TableSource::Select(inner) = &mut join.source {
            flatten_select(inner);
        }
        flatten_expression(&mut join.on);
    }
    if let Some(expression) = &mut select.where_.0 {
        flatten_expression(expression);
    }
    for element in &mut select.order_by.elements {
        if let OrderByTarget::CountSelect(inner) = &mut element.target {
            flatten_select(inner);
        }
    }
}

pub fn flatten_expression(expression: &mut Expression) {
    match expression {
        Expression::Logical { operator, terms } => {
            for term in terms.iter_mut() {
                flatten_expression(term);
            }
            let operator = *operator;
            let mut flattened = Vec::with_capacity(terms.len());
            for term in std::mem::take(terms) {
                match term {
                    Expression::Logical {
                        operator: inner_operator,
                        terms: inner_terms,
                    } if inner_operator == operator => flattened.extend(inner_terms),
                    other => flattened.push(other),
                }
            }
            *terms = flattened;
        }
        Expression::Not(inner) => flatten_expression(inner),
        Expression::Exists(select) => flatten_select(select),
        Expression::Comparison { left, right, .. } => {
            flatten_operand(left);
            flatten_operand(right);
        }
        Expression::In { left, values } => {
            flatten_operand(left);
            for value in values {
                flatten_operand(value);
            }
        }
        Expression::Like { .. } => {}
    }
    if let Expression::Logical { terms, .. } = expression {
        if terms.len() == 1 {
            let only = terms.remove(0);
            *expression = only;
        }
    }
}

fn flatten_operand(operand: &mut Operand) {
    if let Operand::Count(select) = operand {
        flatten_select(select);
    }
}
