//! Pipeline orchestration
//!
//! parse -> build -> infer -> desugar -> reachability -> emit

pub mod orchestrator;
pub mod stages;

pub use orchestrator::{compile, CompileOutput, Compiler};
pub use stages::{CompileContext, GraphStage, MetricValue, StageId, StageResult};
