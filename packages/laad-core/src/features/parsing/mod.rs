//! Parsing feature: source text to AST

pub mod domain;
pub mod infrastructure;

pub use domain::ast::Program;
pub use infrastructure::parser::{parse, Parser, MAX_NESTING};
