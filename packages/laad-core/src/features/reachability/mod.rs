//! Reachability
//!
//! Dead-vertex elimination by forward mark/sweep from input-less roots,
//! followed by the required-input check on what survives.

pub mod infrastructure;

pub use infrastructure::sweeper::{check_bindings, mark, ReachabilityPass, ReachabilitySummary};
