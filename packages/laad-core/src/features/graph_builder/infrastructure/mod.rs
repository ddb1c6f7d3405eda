pub mod builder;
pub mod edge_resolver;
