//! Post-processing passes over a built Select, applied in order: logical
//! flattening, cross-scope reference repair, selector pruning.

pub mod logical;
pub mod prune;
pub mod scope;
