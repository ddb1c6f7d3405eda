//! Desugaring
//!
//! Lowers the sugar vertices left by the graph builder (conditionals,
//! `while`, range-`for`, generic `for`) into primitive template wiring.

pub mod domain;
pub mod infrastructure;

pub use domain::{LoweringContext, Pin, Segment, SugarLowering};
pub use infrastructure::desugarer::{desugar, DesugarSummary, Desugarer};
