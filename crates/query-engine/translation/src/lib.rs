//! Translate an incoming resource query or mutation request into a SQL AST.

pub mod translation;
