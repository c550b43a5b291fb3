//! Metadata information regarding the resource-to-table mappings.

pub mod database;

// re-export without modules
pub use database::*;
