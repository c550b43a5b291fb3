//! Translate an incoming resource query into a Select AST.

pub mod builder;
pub mod fields;
pub mod filtering;
pub mod relationships;
pub mod sorting;

use query_engine_metadata::metadata;
use query_engine_request::request;
use query_engine_sql::sql;

use super::context::NameContext;
use super::error::Error;
use super::helpers::Env;
use super::rewrite;
use builder::SelectBuilder;

/// Translate a resource query to a Select AST ready for rendering.
///
/// This is the top-level entry point: it builds the statement, runs the
/// post-processing rewriters, and re-aliases the final select list so that
/// result columns materialize under their persisted names, which is how the
/// data-mapping layer matches them to target fields.
pub fn translate(
    graph: &metadata::ResourceGraph,
    layer: &request::QueryLayer,
) -> Result<sql::ast::Select, Error> {
    let env = Env::new(graph);
    let mut context = NameContext::new();

    let builder = SelectBuilder::new(&env, &mut context);
    let mut select = builder.build_root(layer)?;

    rewrite::logical::flatten_select(&mut select);
    rewrite::scope::repair(&mut select, &context.alias_map)?;
    realias_to_persisted(&mut select);
    rewrite::prune::prune(&mut select);

    tracing::debug!("SQL AST: {:?}", select);
    Ok(select)
}

/// Rename every top-level selector to the column's real materialization
/// name. An inner sub-select's synthetic `Id0` becomes `Id0 AS Id` when it
/// is, in fact, the persisted `Id` column. The renderer drops the alias
/// again when it matches the referenced name.
fn realias_to_persisted(select: &mut sql::ast::Select) {
    for selector in &mut select.select_list {
        if let sql::ast::Selector::Column { column, alias } = selector {
            *alias = Some(column.persisted_name().to_string());
        }
    }
}
