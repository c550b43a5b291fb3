//! The SQL dialects the renderer can target. The dialect is chosen at
//! render time; the AST itself is dialect-agnostic.

use enum_iterator::Sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Sequence)]
pub enum Dialect {
    PostgreSql,
    MySql,
    SqlServer,
}

impl Dialect {
    /// The identifier quoting character pair.
    pub fn quote_pair(self) -> (char, char) {
        match self {
            Dialect::PostgreSql => ('"', '"'),
            Dialect::MySql => ('`', '`'),
            Dialect::SqlServer => ('[', ']'),
        }
    }

    /// Whether a just-inserted, database-generated id is retrieved with a
    /// `RETURNING` clause (true) or a trailing identity query (false).
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::PostgreSql)
    }

    /// The trailing statement retrieving the generated id, for dialects
    /// without `RETURNING`.
    pub fn identity_query(self) -> &'static str {
        match self {
            Dialect::PostgreSql => "",
            Dialect::MySql => "; SELECT LAST_INSERT_ID();",
            Dialect::SqlServer => "; SELECT SCOPE_IDENTITY();",
        }
    }

    /// The characters that carry wildcard meaning inside a LIKE pattern.
    pub fn like_special_characters(self) -> &'static [char] {
        match self {
            Dialect::PostgreSql | Dialect::MySql => &['%', '_'],
            // Square brackets open character ranges in T-SQL patterns.
            Dialect::SqlServer => &['%', '_', '['],
        }
    }

    /// The `ESCAPE` clause appended when a pattern needed escaping. The
    /// escape character itself is a backslash; MySQL string literals
    /// require it doubled.
    pub fn like_escape_clause(self) -> &'static str {
        match self {
            Dialect::PostgreSql | Dialect::SqlServer => " ESCAPE '\\'",
            Dialect::MySql => " ESCAPE '\\\\'",
        }
    }
}

pub const LIKE_ESCAPE_CHARACTER: char = '\\';
