//! Desugaring driver
//!
//! Sugar vertices are lowered in ascending id order, so an enclosing
//! construct is rewritten before the constructs nested in its blocks. Edges
//! the outer lowering attaches to a nested sugar vertex are moved again when
//! that vertex is lowered.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::conditional::ConditionalLowering;
use super::loops::{GenericForLowering, RangeForLowering, WhileLowering};
use crate::errors::{CompileError, Result};
use crate::features::desugar::domain::{LoweringContext, SugarLowering};
use crate::shared::models::{Graph, SugarKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesugarSummary {
    /// Sugar vertices lowered
    pub lowered: usize,
    /// Primitive vertices created
    pub created: usize,
}

pub struct Desugarer {
    lowerings: FxHashMap<SugarKind, Box<dyn SugarLowering>>,
}

impl Desugarer {
    pub fn new() -> Self {
        let mut desugarer = Self {
            lowerings: FxHashMap::default(),
        };
        desugarer.register(Box::new(ConditionalLowering));
        desugarer.register(Box::new(WhileLowering));
        desugarer.register(Box::new(RangeForLowering));
        desugarer.register(Box::new(GenericForLowering));
        desugarer
    }

    pub fn register(&mut self, lowering: Box<dyn SugarLowering>) {
        self.lowerings.insert(lowering.kind(), lowering);
    }

    pub fn run(&self, graph: &mut Graph) -> Result<DesugarSummary> {
        let sugar: Vec<_> = graph
            .vertices()
            .filter_map(|v| v.sugar_kind().map(|kind| (v.id, kind, v.span)))
            .collect();

        let mut ctx = LoweringContext::new(graph);
        for (id, kind, span) in &sugar {
            let lowering = self.lowerings.get(kind).ok_or_else(|| {
                CompileError::syntax(*span, format!("no lowering for `{}`", kind.as_str()))
            })?;
            trace!(vertex = %id, kind = kind.as_str(), "lowering");
            lowering.lower(&mut ctx, *id)?;
        }

        let summary = DesugarSummary {
            lowered: sugar.len(),
            created: ctx.created,
        };
        debug!(lowered = summary.lowered, created = summary.created, "desugared");
        Ok(summary)
    }
}

impl Default for Desugarer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower every sugar vertex in the graph
pub fn desugar(graph: &mut Graph) -> Result<DesugarSummary> {
    Desugarer::new().run(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceConfig;
    use crate::features::attributes::AttributeRegistry;
    use crate::features::graph_builder::build;
    use crate::features::parsing::parse;
    use crate::features::templates::paths;
    use crate::features::type_inference::infer;
    use crate::shared::models::{Literal, PortKind, Primitive, Type, Vertex, VertexId};

    fn lower(source: &str) -> Graph {
        let config = InferenceConfig::default();
        let registry = AttributeRegistry::new();
        let mut graph = build(&parse(source).unwrap(), &registry, &config).unwrap();
        registry.prepare(&mut graph);
        infer(&mut graph, &config).unwrap();
        desugar(&mut graph).unwrap();
        graph
    }

    fn only<'g>(graph: &'g Graph, path: &'g str) -> &'g Vertex {
        let found: Vec<_> = graph.find_by_template(path).collect();
        assert_eq!(found.len(), 1, "expected one `{}`", path);
        found[0]
    }

    fn logs(graph: &Graph) -> Vec<VertexId> {
        graph
            .find_by_template("logix.actions.log")
            .map(|v| v.id)
            .collect()
    }

    fn pulses(graph: &Graph, src: VertexId, port: &str) -> Vec<(VertexId, String)> {
        graph
            .outgoing(src, port)
            .filter(|e| e.kind == PortKind::Impulse)
            .map(|e| (e.dst, e.dst_port.clone()))
            .collect()
    }

    fn drives(graph: &Graph, src: VertexId, port: &str, dst: VertexId, dst_port: &str) -> bool {
        pulses(graph, src, port) == vec![(dst, dst_port.to_string())]
    }

    #[test]
    fn test_no_sugar_remains() {
        let graph = lower("c = true\nx = if c then 1 else 2\nx -> display\nu = logix.events.update\nu -> while c {\n}");
        assert!(graph.vertices().all(|v| v.sugar_kind().is_none()));
    }

    #[test]
    fn test_value_conditional_single_select() {
        let graph = lower("c = true\nx = if c then 1 else 2\nx -> display");
        let select = only(&graph, paths::CONDITIONAL);
        assert_eq!(select.params[0].bound, Some(Type::int()));
        assert_eq!(graph.find_by_template(paths::FLOW_IF).count(), 0);
        for port in ["condition", "on_true", "on_false"] {
            assert!(graph.is_bound(select.id, port), "{} unbound", port);
        }
        let display = graph.find_by_template("logix.display").next().unwrap();
        let feed = graph.incoming(display.id, "value").next().unwrap();
        assert_eq!((feed.src, feed.src_port.as_str()), (select.id, "result"));
    }

    #[test]
    fn test_value_conditional_elseif_nests() {
        let graph = lower("c = true\nd = false\nx = if c then 1 elseif d then 2 else 3\nx -> display");
        let selects: Vec<_> = graph.find_by_template(paths::CONDITIONAL).collect();
        assert_eq!(selects.len(), 2);
        let inner = graph.incoming(selects[0].id, "on_false").next().unwrap();
        assert_eq!((inner.src, inner.src_port.as_str()), (selects[1].id, "result"));
    }

    #[test]
    fn test_value_conditional_widens_arm() {
        let graph = lower("c = true\nx = if c then 1 else 2.5\nx -> display");
        let cast = only(&graph, paths::CAST);
        assert_eq!(cast.params[0].bound, Some(Type::int()));
        assert_eq!(cast.params[1].bound, Some(Type::float()));
        let select = only(&graph, paths::CONDITIONAL);
        let on_true = graph.incoming(select.id, "on_true").next().unwrap();
        assert_eq!(on_true.src, cast.id);
    }

    #[test]
    fn test_statement_conditional_routes_trigger() {
        let graph = lower("c = true\nu = logix.events.update\nu -> if c then \"a\" -> logix.actions.log end");
        let branch = only(&graph, paths::FLOW_IF);
        let update = graph.find_by_name("u").unwrap();
        let log = logs(&graph)[0];
        assert!(drives(&graph, update.id, "pulse", branch.id, "trigger"));
        assert!(drives(&graph, branch.id, "true", log, "trigger"));
        assert!(graph.is_bound(branch.id, "condition"));
        assert!(pulses(&graph, branch.id, "false").is_empty());
    }

    #[test]
    fn test_statement_elseif_chains_through_false() {
        let source = "c = true\nd = false\nu = logix.events.update\nu -> if c then \"a\" -> logix.actions.log elseif d then \"b\" -> logix.actions.log else \"c\" -> logix.actions.log end";
        let graph = lower(source);
        let branches: Vec<_> = graph.find_by_template(paths::FLOW_IF).map(|v| v.id).collect();
        assert_eq!(branches.len(), 2);
        let logs = logs(&graph);
        assert!(drives(&graph, branches[0], "false", branches[1], "trigger"));
        assert!(drives(&graph, branches[0], "true", logs[0], "trigger"));
        assert!(drives(&graph, branches[1], "true", logs[1], "trigger"));
        assert!(drives(&graph, branches[1], "false", logs[2], "trigger"));
    }

    #[test]
    fn test_while_body_is_sequenced() {
        let source = "c = true\nu = logix.events.update\nu -> while c {\n  \"a\" -> logix.actions.log\n  \"b\" -> logix.actions.log\n}";
        let graph = lower(source);
        let looped = only(&graph, paths::FLOW_WHILE);
        let logs = logs(&graph);
        assert_eq!(logs.len(), 2);
        assert!(drives(&graph, looped.id, "body", logs[0], "trigger"));
        assert!(drives(&graph, logs[0], "next", logs[1], "trigger"));
        assert!(drives(&graph, logs[1], "next", looped.id, "iterate"));
        assert!(graph.is_bound(looped.id, "trigger"));
    }

    #[test]
    fn test_range_for_wiring() {
        let source = "u = logix.events.update\nu -> for (i in 0..10) {\n  i -> logix.actions.log\n}";
        let graph = lower(source);
        let counter = graph.find_by_name("i").unwrap().id;
        let looped = only(&graph, paths::FLOW_WHILE).id;
        let check = only(&graph, paths::LT).id;
        let increment = only(&graph, paths::ADD).id;
        let writes: Vec<_> = graph.find_by_template(paths::WRITE).map(|v| v.id).collect();
        assert_eq!(writes.len(), 2);
        let (init_write, step) = (writes[0], writes[1]);
        assert!(graph.vertex(init_write).unwrap().name.ends_with("_init"));
        let log = logs(&graph)[0];

        let update = graph.find_by_name("u").unwrap().id;
        assert!(drives(&graph, update, "pulse", init_write, "trigger"));
        assert!(drives(&graph, init_write, "next", looped, "trigger"));
        assert!(drives(&graph, looped, "body", log, "trigger"));
        assert!(drives(&graph, log, "next", step, "trigger"));
        assert!(drives(&graph, step, "next", looped, "iterate"));

        let cond = graph.incoming(looped, "condition").next().unwrap();
        assert_eq!(cond.src, check);
        for target in [init_write, step] {
            let e = graph.incoming(target, "target").next().unwrap();
            assert_eq!((e.src, e.src_port.as_str()), (counter, "field"));
            assert_eq!(e.ty, Some(Type::field(Type::int())));
        }
        let one = graph
            .vertices()
            .find(|v| v.value == Some(Literal::Int(1)) && v.name.ends_with("_one"))
            .unwrap();
        assert!(graph.outgoing(one.id, "value").any(|e| e.dst == increment));
    }

    #[test]
    fn test_range_for_follows_counter_type() {
        let source = "u = logix.events.update\nu -> for (i in 0..(5 as long)) {\n  i -> logix.actions.log\n}";
        let graph = lower(source);
        let check = only(&graph, paths::LT);
        assert_eq!(check.params[0].bound, Some(Type::Primitive(Primitive::I64)));
    }

    #[test]
    fn test_fractional_range_steps_by_float_one() {
        let source = "u = logix.events.update\nu -> for (i in 0.0..5.0) {\n  i -> logix.actions.log\n}";
        let graph = lower(source);
        let one = graph
            .vertices()
            .find(|v| v.name.ends_with("_one"))
            .unwrap();
        assert_eq!(one.value, Some(Literal::Float(1.0)));
        assert_eq!(one.params[0].bound, Some(Type::float()));
    }

    #[test]
    fn test_generic_for_wiring() {
        let source = "c = true\nu = logix.events.update\nu -> for (\"s\" -> logix.actions.log, c, \"e\" -> logix.actions.log) {\n  \"b\" -> logix.actions.log\n}";
        let graph = lower(source);
        let looped = only(&graph, paths::FLOW_WHILE).id;
        let logs = logs(&graph);
        assert_eq!(logs.len(), 3);
        let (start, end, body) = (logs[0], logs[1], logs[2]);
        let update = graph.find_by_name("u").unwrap().id;
        assert!(drives(&graph, update, "pulse", start, "trigger"));
        assert!(drives(&graph, start, "next", looped, "trigger"));
        assert!(drives(&graph, looped, "body", body, "trigger"));
        assert!(drives(&graph, body, "next", end, "trigger"));
        assert!(drives(&graph, end, "next", looped, "iterate"));
    }

    #[test]
    fn test_synthetic_names() {
        let graph = lower("c = true\nu = logix.events.update\nu -> while c {\n}");
        let looped = only(&graph, paths::FLOW_WHILE);
        assert!(looped.name.starts_with("__while"));
        assert!(looped.name.ends_with("_loop"));
    }
}
