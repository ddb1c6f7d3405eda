//! Feature modules (one per compiler stage)

pub mod attributes;
pub mod desugar;
pub mod emit;
pub mod graph_builder;
pub mod parsing;
pub mod reachability;
pub mod templates;
pub mod type_inference;
