//! Translate filter expression trees into SQL predicates.

use query_engine_request::request;
use query_engine_sql::sql::ast::*;
use query_engine_sql::sql::helpers as sql_helpers;

use crate::translation::error::Error;

use super::builder::{SelectBuilder, SelectShape};
use super::relationships;

/// Translate a filter over one statement scope into a predicate.
///
/// While translating, `guards` collects the IS NULL checks for every place
/// the predicate can evaluate to unknown instead of false: nullable
/// attribute columns and left-joined to-one targets. The guards matter only
/// under negation, where "not matching" must also cover rows the predicate
/// cannot see.
pub fn translate_filter(
    builder: &mut SelectBuilder,
    current_alias: &TableAlias,
    current_type: &str,
    filter: &request::Filter,
    guards: &mut Vec<Expression>,
) -> Result<Expression, Error> {
    match filter {
        request::Filter::Comparison {
            target,
            operator,
            value,
        } => {
            // An IS NULL comparison is three-valued-safe on its own, so its
            // target contributes no guards.
            let mut target_guards = vec![];
            let left =
                translate_target(builder, current_alias, current_type, target, &mut target_guards)?;
            let right = translate_value(builder, current_alias, current_type, value, guards)?;
            if !matches!(value, request::ComparisonValue::Null) {
                for guard in target_guards {
                    if !guards.contains(&guard) {
                        guards.push(guard);
                    }
                }
            }
            Ok(Expression::Comparison {
                left,
                operator: translate_operator(*operator),
                right,
            })
        }
        request::Filter::Logical { operator, terms } => {
            let operator = match operator {
                request::LogicalOperator::And => LogicalOperator::And,
                request::LogicalOperator::Or => LogicalOperator::Or,
            };
            let terms = terms
                .iter()
                .map(|term| translate_filter(builder, current_alias, current_type, term, guards))
                .collect::<Result<Vec<_>, Error>>()?;
            sql_helpers::fold_logical(operator, terms).ok_or_else(|| {
                Error::InvariantBroken("logical filter without terms".to_string())
            })
        }
        request::Filter::Not { term } => {
            // The negated predicate keeps its own guards; they are folded
            // into the negation here and must not leak to an outer NOT.
            let mut inner_guards = vec![];
            let inner =
                translate_filter(builder, current_alias, current_type, term, &mut inner_guards)?;
            let mut terms = vec![Expression::Not(Box::new(inner))];
            for guard in inner_guards {
                if !terms.contains(&guard) {
                    terms.push(guard);
                }
            }
            sql_helpers::or(terms).ok_or_else(|| {
                Error::InvariantBroken("negation produced no predicate".to_string())
            })
        }
        request::Filter::In { target, values } => {
            if values.is_empty() {
                return Err(Error::InvariantBroken(
                    "IN filter with an empty value list".to_string(),
                ));
            }
            let left = translate_target(builder, current_alias, current_type, target, guards)?;
            let values = values
                .iter()
                .map(|value| Operand::Parameter(builder.context.next_parameter(value.clone())))
                .collect();
            Ok(Expression::In { left, values })
        }
        request::Filter::MatchText {
            target,
            pattern,
            kind,
        } => {
            let column = match translate_target(builder, current_alias, current_type, target, guards)?
            {
                Operand::Column(column) => column,
                _ => {
                    return Err(Error::InvariantBroken(
                        "text match against a non-column target".to_string(),
                    ))
                }
            };
            let pattern = builder
                .context
                .next_parameter(serde_json::Value::String(pattern.clone()));
            let kind = match kind {
                request::TextMatchKind::Contains => TextMatchKind::Contains,
                request::TextMatchKind::StartsWith => TextMatchKind::StartsWith,
                request::TextMatchKind::EndsWith => TextMatchKind::EndsWith,
            };
            Ok(Expression::Like {
                column,
                pattern,
                kind,
            })
        }
        request::Filter::Has { path, filter } => {
            let (last, leading) = path.split_last().ok_or_else(|| {
                Error::InvariantBroken("has() with an empty relationship path".to_string())
            })?;
            let (alias, resource_type) =
                relationships::traverse_to_one(builder, current_alias, current_type, leading, guards)?;
            let sub_builder = SelectBuilder::new(builder.env, &mut *builder.context);
            let select = sub_builder.build_correlated(
                &alias,
                &resource_type,
                last,
                filter.as_deref(),
                SelectShape::One,
            )?;
            Ok(Expression::Exists(Box::new(select)))
        }
        request::Filter::IsType { .. } => Err(Error::TypeNarrowingNotSupported),
    }
}

/// Translate a comparison target into an operand: a (possibly traversed)
/// attribute column, or a correlated COUNT sub-select.
pub fn translate_target(
    builder: &mut SelectBuilder,
    current_alias: &TableAlias,
    current_type: &str,
    target: &request::ComparisonTarget,
    guards: &mut Vec<Expression>,
) -> Result<Operand, Error> {
    match target {
        request::ComparisonTarget::Attribute { path, field } => {
            let column =
                attribute_column(builder, current_alias, current_type, path, field, guards)?;
            Ok(Operand::Column(column))
        }
        request::ComparisonTarget::Count { path } => {
            let select =
                relationships::count_select(builder, current_alias, current_type, path, guards)?;
            Ok(Operand::Count(Box::new(select)))
        }
    }
}

fn translate_value(
    builder: &mut SelectBuilder,
    current_alias: &TableAlias,
    current_type: &str,
    value: &request::ComparisonValue,
    guards: &mut Vec<Expression>,
) -> Result<Operand, Error> {
    match value {
        request::ComparisonValue::Literal { value } => Ok(Operand::Parameter(
            builder.context.next_parameter(value.clone()),
        )),
        request::ComparisonValue::Null => Ok(Operand::Null),
        request::ComparisonValue::Target { target } => {
            translate_target(builder, current_alias, current_type, target, guards)
        }
    }
}

/// Resolve an attribute target to a column reference, joining any to-one
/// path in front of it. A nullable column contributes an IS NULL guard.
pub fn attribute_column(
    builder: &mut SelectBuilder,
    current_alias: &TableAlias,
    current_type: &str,
    path: &[String],
    field: &str,
    guards: &mut Vec<Expression>,
) -> Result<ColumnReference, Error> {
    let (alias, resource_type) =
        relationships::traverse_to_one(builder, current_alias, current_type, path, guards)?;
    let column = builder.env.lookup_column(&resource_type, field)?;
    let reference = builder.column_reference(&alias, column);
    if column.nullable.is_nullable() {
        let guard = sql_helpers::is_null(reference.clone());
        if !guards.contains(&guard) {
            guards.push(guard);
        }
    }
    Ok(reference)
}

fn translate_operator(operator: request::ComparisonOperator) -> ComparisonOperator {
    match operator {
        request::ComparisonOperator::Equals => ComparisonOperator::Equals,
        request::ComparisonOperator::GreaterThan => ComparisonOperator::GreaterThan,
        request::ComparisonOperator::GreaterOrEqual => ComparisonOperator::GreaterThanOrEqualTo,
        request::ComparisonOperator::LessThan => ComparisonOperator::LessThan,
        request::ComparisonOperator::LessOrEqual => ComparisonOperator::LessThanOrEqualTo,
    }
}
