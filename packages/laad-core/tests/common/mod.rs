//! Common test utilities for laad-core
//!
//! Shared source fixtures and LNJ document assertions for the integration
//! tests.

#![allow(dead_code)]

mod assertions;
mod fixtures;

pub use assertions::*;
pub use fixtures::*;
