/*
 * LaaD compiler core
 *
 * Feature-first layout:
 * - shared/      : Common models (Span, Type, Graph)
 * - features/    : One slice per stage (parsing -> graph_builder -> type_inference
 *                  -> desugar -> reachability -> emit)
 * - pipeline/    : Orchestration
 * - config/      : YAML compiler configuration
 */

#![allow(clippy::module_inception)]
#![allow(clippy::new_without_default)]

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Compiler stages
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration (YAML schema v1)
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{CompilerConfig, ConfigError};
pub use errors::{CompileError, ErrorKind, Result, TypeConflict};
pub use features::emit::LnjDocument;
pub use features::parsing::parse;
pub use pipeline::{compile, CompileOutput, Compiler, StageId};
