//! Node template catalogue

pub mod registry;

pub use registry::{has_namespace, lookup, paths, NodeTemplate};
