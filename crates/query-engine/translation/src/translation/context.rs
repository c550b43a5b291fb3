//! Shared naming state for one top-level statement build.

use std::collections::BTreeMap;

use query_engine_sql::sql::ast::{Parameter, ParameterName, TableAlias};

/// Produces collision-free table aliases and parameter names, and records
/// which inner aliases have been folded into derived tables.
///
/// One context lives exactly as long as one top-level build call; nested
/// sub-builders borrow it, so identifiers stay unique across the whole
/// statement including all nested sub-selects.
#[derive(Debug, Default)]
pub struct NameContext {
    table_counter: u32,
    parameter_counter: u32,
    /// folded inner table alias -> the derived table alias that now
    /// projects its columns.
    pub alias_map: BTreeMap<TableAlias, TableAlias>,
}

impl NameContext {
    pub fn new() -> Self {
        NameContext::default()
    }

    /// The next table alias: `t1`, `t2`, ...
    pub fn next_table_alias(&mut self) -> TableAlias {
        self.table_counter += 1;
        TableAlias(format!("t{}", self.table_counter))
    }

    /// The next parameter: `p0`, `p1`, ...
    pub fn next_parameter(&mut self, value: serde_json::Value) -> Parameter {
        let name = ParameterName(format!("p{}", self.parameter_counter));
        self.parameter_counter += 1;
        Parameter { name, value }
    }

    /// Record that `inner` is no longer directly reachable and must be
    /// addressed through the derived table `outer`.
    pub fn record_folded_alias(&mut self, inner: TableAlias, outer: TableAlias) {
        self.alias_map.insert(inner, outer);
    }
}
