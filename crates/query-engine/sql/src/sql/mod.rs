//! Relational AST types, construction helpers, dialects, and the
//! SQL string renderer.

pub mod ast;
pub mod convert;
pub mod dialect;
pub mod helpers;
pub mod string;
