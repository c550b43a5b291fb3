//! Translate sort clauses into ORDER BY elements.

use query_engine_request::request;
use query_engine_sql::sql::ast::*;

use crate::translation::error::Error;

use super::builder::SelectBuilder;
use super::{filtering, relationships};

/// Translate a layer's sort elements onto the statement being built. Sort
/// never filters, so the guards collected while resolving targets are
/// discarded.
pub fn translate_sort(
    builder: &mut SelectBuilder,
    current_alias: &TableAlias,
    current_type: &str,
    sort: &[request::SortElement],
) -> Result<(), Error> {
    for element in sort {
        let mut guards = vec![];
        let target = match &element.target {
            request::SortTarget::Attribute { path, field } => {
                let column = filtering::attribute_column(
                    builder,
                    current_alias,
                    current_type,
                    path,
                    field,
                    &mut guards,
                )?;
                OrderByTarget::Column(column)
            }
            request::SortTarget::Count { path } => {
                let select = relationships::count_select(
                    builder,
                    current_alias,
                    current_type,
                    path,
                    &mut guards,
                )?;
                OrderByTarget::CountSelect(Box::new(select))
            }
        };
        let direction = if element.ascending {
            OrderByDirection::Asc
        } else {
            OrderByDirection::Desc
        };
        builder.push_order_element(OrderByElement { target, direction });
    }
    Ok(())
}
