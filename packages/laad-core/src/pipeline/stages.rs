//! Pipeline stages
//!
//! Every stage implements [`GraphStage`] and reads its input from, and
//! writes its output to, the shared [`CompileContext`].

use std::time::{Duration, Instant};

use crate::config::CompilerConfig;
use crate::errors::{CompileError, Result};
use crate::features::attributes::AttributeRegistry;
use crate::features::desugar::desugar;
use crate::features::emit::{Emitter, LnjDocument};
use crate::features::graph_builder::build;
use crate::features::parsing::{parse, Program};
use crate::features::reachability::ReachabilityPass;
use crate::features::type_inference::InferenceEngine;
use crate::shared::models::{Graph, Span};

/// Stage identifier, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    Parse,
    Build,
    Infer,
    Desugar,
    Reachability,
    Emit,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Parse,
        StageId::Build,
        StageId::Infer,
        StageId::Desugar,
        StageId::Reachability,
        StageId::Emit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Build => "build",
            Self::Infer => "infer",
            Self::Desugar => "desugar",
            Self::Reachability => "reachability",
            Self::Emit => "emit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Parse => "Tokenize and parse source text into the AST",
            Self::Build => "Build the graph IR and resolve names",
            Self::Infer => "Infer types per connected component",
            Self::Desugar => "Lower control-flow constructs to flow nodes",
            Self::Reachability => "Remove dead vertices and check required inputs",
            Self::Emit => "Serialize the graph to an LNJ document",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Bool(bool),
}

/// Outcome of one successful stage
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage_id: StageId,
    pub duration: Duration,
    pub items_processed: usize,
    pub metrics: Vec<(String, MetricValue)>,
}

impl StageResult {
    pub fn success(stage_id: StageId, duration: Duration, items_processed: usize) -> Self {
        Self {
            stage_id,
            duration,
            items_processed,
            metrics: Vec::new(),
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: MetricValue) -> Self {
        self.metrics.push((key.into(), value));
        self
    }

    pub fn metric(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// State threaded through the stages of one compilation
pub struct CompileContext<'a> {
    pub source: &'a str,
    pub config: &'a CompilerConfig,
    pub attributes: &'a AttributeRegistry,
    pub program: Option<Program>,
    pub graph: Option<Graph>,
    pub document: Option<LnjDocument>,
}

impl<'a> CompileContext<'a> {
    pub fn new(source: &'a str, config: &'a CompilerConfig, attributes: &'a AttributeRegistry) -> Self {
        Self {
            source,
            config,
            attributes,
            program: None,
            graph: None,
            document: None,
        }
    }

    fn graph_mut(&mut self, stage: StageId) -> Result<&mut Graph> {
        self.graph.as_mut().ok_or_else(|| missing_input(stage))
    }
}

fn missing_input(stage: StageId) -> CompileError {
    CompileError::syntax(
        Span::zero(),
        format!("{} stage ran before its input was produced", stage),
    )
}

/// One pipeline stage
pub trait GraphStage: Send + Sync {
    fn stage_id(&self) -> StageId;

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult>;

    fn name(&self) -> &'static str {
        self.stage_id().name()
    }
}

pub struct ParseStage;

impl GraphStage for ParseStage {
    fn stage_id(&self) -> StageId {
        StageId::Parse
    }

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult> {
        let start = Instant::now();
        let program = parse(ctx.source)?;
        let statements = program.statements.len();
        ctx.program = Some(program);
        Ok(StageResult::success(self.stage_id(), start.elapsed(), statements))
    }
}

/// Builds the graph and runs the attribute `prepare` hooks; drops the AST
pub struct BuildStage;

impl GraphStage for BuildStage {
    fn stage_id(&self) -> StageId {
        StageId::Build
    }

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult> {
        let start = Instant::now();
        let program = ctx.program.take().ok_or_else(|| missing_input(self.stage_id()))?;
        let mut graph = build(&program, ctx.attributes, &ctx.config.inference)?;
        ctx.attributes.prepare(&mut graph);
        let result = StageResult::success(self.stage_id(), start.elapsed(), graph.vertex_count())
            .with_metric("edges", MetricValue::Int(graph.edge_count() as i64));
        ctx.graph = Some(graph);
        Ok(result)
    }
}

pub struct InferStage;

impl GraphStage for InferStage {
    fn stage_id(&self) -> StageId {
        StageId::Infer
    }

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult> {
        let start = Instant::now();
        let config = ctx.config;
        let graph = ctx.graph_mut(self.stage_id())?;
        let summary = InferenceEngine::new(&config.inference).run(graph)?;
        Ok(
            StageResult::success(self.stage_id(), start.elapsed(), summary.components)
                .with_metric("parallel", MetricValue::Bool(summary.parallel))
                .with_metric(
                    "value_conditionals",
                    MetricValue::Int(summary.value_conditionals as i64),
                )
                .with_metric(
                    "statement_conditionals",
                    MetricValue::Int(summary.statement_conditionals as i64),
                ),
        )
    }
}

pub struct DesugarStage;

impl GraphStage for DesugarStage {
    fn stage_id(&self) -> StageId {
        StageId::Desugar
    }

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult> {
        let start = Instant::now();
        let graph = ctx.graph_mut(self.stage_id())?;
        let summary = desugar(graph)?;
        Ok(
            StageResult::success(self.stage_id(), start.elapsed(), summary.lowered)
                .with_metric("created", MetricValue::Int(summary.created as i64)),
        )
    }
}

pub struct ReachabilityStage;

impl GraphStage for ReachabilityStage {
    fn stage_id(&self) -> StageId {
        StageId::Reachability
    }

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult> {
        let start = Instant::now();
        let (config, attributes) = (ctx.config, ctx.attributes);
        let graph = ctx.graph_mut(self.stage_id())?;
        let summary = ReachabilityPass::new(attributes, &config.reachability).run(graph)?;
        Ok(
            StageResult::success(self.stage_id(), start.elapsed(), summary.reachable)
                .with_metric("removed", MetricValue::Int(summary.removed as i64))
                .with_metric("pinned", MetricValue::Int(summary.pinned as i64)),
        )
    }
}

pub struct EmitStage;

impl GraphStage for EmitStage {
    fn stage_id(&self) -> StageId {
        StageId::Emit
    }

    fn execute(&self, ctx: &mut CompileContext<'_>) -> Result<StageResult> {
        let start = Instant::now();
        let graph = ctx.graph.as_ref().ok_or_else(|| missing_input(self.stage_id()))?;
        let document = Emitter::new(&ctx.config.emit).emit(graph)?;
        let vertices = document.vertices.len();
        ctx.document = Some(document);
        Ok(StageResult::success(self.stage_id(), start.elapsed(), vertices))
    }
}
