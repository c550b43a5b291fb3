//! Type definitions of a low-level SQL string representation.

use indexmap::IndexMap;

use super::ast::{Parameter, ParameterName, TableAlias};
use super::dialect::Dialect;

/// Accumulates parameterized SQL text for one target dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SQL {
    pub sql: String,
    /// Parameters keyed by name, in first-reference order.
    pub params: IndexMap<ParameterName, serde_json::Value>,
    pub dialect: Dialect,
}

impl SQL {
    pub fn new(dialect: Dialect) -> SQL {
        SQL {
            sql: String::new(),
            params: IndexMap::new(),
            dialect,
        }
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append an identifier wrapped in the dialect's quote pair.
    pub fn append_identifier(&mut self, identifier: &str) {
        let (open, close) = self.dialect.quote_pair();
        self.sql.push(open);
        self.sql.push_str(identifier);
        self.sql.push(close);
    }

    /// Table aliases are generated names and render unquoted.
    pub fn append_table_alias(&mut self, alias: &TableAlias) {
        self.sql.push_str(&alias.0);
    }

    /// Append a parameter reference and record its value. Re-visiting the
    /// same name is idempotent.
    pub fn append_param(&mut self, param: &Parameter) {
        self.append_param_value(&param.name, param.value.clone());
    }

    /// Like `append_param`, but with a value computed at render time (used
    /// for LIKE patterns, whose escaping is dialect-specific).
    pub fn append_param_value(&mut self, name: &ParameterName, value: serde_json::Value) {
        self.sql.push_str(&name.0);
        self.params.entry(name.clone()).or_insert(value);
    }
}
