//! The relational AST produced by query translation, and its rendering to
//! dialect-specific parameterized SQL text.

pub mod sql;
