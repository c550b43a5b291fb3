//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// An empty `WHERE` clause.
pub fn empty_where() -> Where {
    Where(None)
}

/// A table name without a schema qualifier.
pub fn unqualified_table(name: impl Into<String>) -> TableName {
    TableName {
        schema: None,
        name: name.into(),
    }
}

/// Build a simple select with a select list and a from, and the rest empty.
pub fn simple_select(select_list: Vec<Selector>, from: From) -> Select {
    Select {
        select_list,
        from,
        joins: vec![],
        where_: empty_where(),
        order_by: empty_order_by(),
    }
}

/// Combine expressions under one operator, flattening single terms.
pub fn fold_logical(operator: LogicalOperator, mut terms: Vec<Expression>) -> Option<Expression> {
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(Expression::Logical { operator, terms }),
    }
}

/// Conjoin expressions, dropping the node when fewer than two remain.
pub fn and(terms: Vec<Expression>) -> Option<Expression> {
    fold_logical(LogicalOperator::And, terms)
}

/// Disjoin expressions, dropping the node when fewer than two remain.
pub fn or(terms: Vec<Expression>) -> Option<Expression> {
    fold_logical(LogicalOperator::Or, terms)
}

/// An equality between two columns, as used in join conditions.
pub fn column_equals(left: ColumnReference, right: ColumnReference) -> Expression {
    Expression::Comparison {
        left: Operand::Column(left),
        operator: ComparisonOperator::Equals,
        right: Operand::Column(right),
    }
}

/// An `IS NULL` check on a column.
pub fn is_null(column: ColumnReference) -> Expression {
    Expression::Comparison {
        left: Operand::Column(column),
        operator: ComparisonOperator::Equals,
        right: Operand::Null,
    }
}
