//! Translate incoming resource queries and mutations to SQL ASTs to be
//! rendered and run against the database.

pub mod context;
pub mod error;
pub mod helpers;
pub mod mutation;
pub mod query;
pub mod rewrite;
