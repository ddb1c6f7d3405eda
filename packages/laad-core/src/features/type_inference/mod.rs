//! Type inference
//!
//! Hindley-Milner style unification over the graph IR. Connected components
//! are solved independently and merged back in component order.

pub mod domain;
pub mod infrastructure;

pub use domain::lattice::{can_cast, is_assignable, lub, Lub};
pub use infrastructure::inference_engine::{infer, InferenceEngine, InferenceSummary};
