//! Compiler - runs the stages in order over one source text
//!
//! Fails fast: the first stage error is returned and nothing after it runs.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::stages::{
    BuildStage, CompileContext, DesugarStage, EmitStage, GraphStage, InferStage, ParseStage,
    ReachabilityStage, StageId, StageResult,
};
use crate::config::CompilerConfig;
use crate::errors::{CompileError, Result};
use crate::features::attributes::AttributeRegistry;
use crate::features::emit::LnjDocument;
use crate::shared::models::{Graph, Span};

/// Final graph, its LNJ rendering and per-stage results
#[derive(Debug)]
pub struct CompileOutput {
    pub graph: Graph,
    pub document: LnjDocument,
    pub stages: Vec<StageResult>,
}

impl CompileOutput {
    pub fn stage(&self, id: StageId) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage_id == id)
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        self.document.to_json(pretty)
    }
}

pub struct Compiler {
    config: CompilerConfig,
    attributes: AttributeRegistry,
    stages: Vec<Box<dyn GraphStage>>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_attributes(config, AttributeRegistry::new())
    }

    /// Compiler with a caller-supplied attribute hook set
    pub fn with_attributes(config: CompilerConfig, attributes: AttributeRegistry) -> Self {
        Self {
            config,
            attributes,
            stages: vec![
                Box::new(ParseStage),
                Box::new(BuildStage),
                Box::new(InferStage),
                Box::new(DesugarStage),
                Box::new(ReachabilityStage),
                Box::new(EmitStage),
            ],
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(&self, source: &str) -> Result<CompileOutput> {
        let start = Instant::now();
        let mut ctx = CompileContext::new(source, &self.config, &self.attributes);
        let mut results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            debug!(stage = stage.name(), "{}", stage.stage_id().description());
            let result = stage.execute(&mut ctx)?;
            debug!(
                stage = stage.name(),
                items = result.items_processed,
                elapsed_us = result.duration.as_micros() as u64,
                "stage complete"
            );
            results.push(result);
        }

        let (Some(graph), Some(document)) = (ctx.graph, ctx.document) else {
            return Err(CompileError::syntax(
                Span::zero(),
                "pipeline finished without producing a document",
            ));
        };
        info!(
            vertices = document.vertices.len(),
            edges = document.edges.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "compiled"
        );
        Ok(CompileOutput {
            graph,
            document,
            stages: results,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

/// Compile with the default configuration
pub fn compile(source: &str) -> Result<CompileOutput> {
    Compiler::default().compile(source)
}
