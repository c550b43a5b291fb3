//! The resource query model: what a caller asks the engine to fetch,
//! independent of SQL. Instances of these types are produced by the
//! query-string parser, which lives outside this workspace.

pub mod request;

pub use request::*;
