//! Shared module - Common types and utilities
//!
//! Types shared by every compiler stage: source spans, the type model and
//! the graph arena.

pub mod models;
pub mod utils;

// Re-exports for convenience
pub use models::*;
pub use utils::scope_stack::ScopeStack;
