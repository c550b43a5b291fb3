//! Type definitions of the resource query model.

pub mod expression;
pub mod query;

pub use expression::*;
pub use query::*;
