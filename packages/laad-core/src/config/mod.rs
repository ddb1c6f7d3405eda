//! Compiler configuration
//!
//! Loaded from YAML (schema version 1). Every field has a default, so an
//! empty document is a valid configuration.

pub mod compiler_config;
pub mod error;

pub use compiler_config::{CompilerConfig, EmitConfig, InferenceConfig, ReachabilityConfig};
pub use error::{ConfigError, ConfigResult};
