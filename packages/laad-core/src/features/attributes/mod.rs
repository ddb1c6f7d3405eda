//! Node attributes
//!
//! `#[key(args)]` annotations on node definitions. Each key is handled by a
//! registered hook that validates its arguments and marks the vertex.

pub mod registry;

pub use registry::{AttributeHook, AttributeRegistry, NoRemoveHook, NullableHook};
