//! Shared utilities

pub mod scope_stack;
