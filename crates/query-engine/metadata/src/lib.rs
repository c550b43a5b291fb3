//! Metadata describing how resource types map onto database tables.
//! This is the data model service consumed by the query translation crate.

pub mod metadata;

pub use metadata::*;
