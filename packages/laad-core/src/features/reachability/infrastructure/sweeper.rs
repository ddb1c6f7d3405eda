//! Mark/sweep over the final graph
//!
//! Roots are vertices without input ports that drive at least one edge.
//! Pinned vertices (`#[no_remove]` and any retaining hook) are kept and
//! also seed the traversal. A vertex connected to nothing is never a root.
//!
//! Required inputs are checked before the sweep on every vertex that is
//! connected or kept, so an unreachable vertex cannot hide an unbound input.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::config::ReachabilityConfig;
use crate::errors::{CompileError, Result};
use crate::features::attributes::AttributeRegistry;
use crate::shared::models::{Graph, Vertex, VertexId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachabilitySummary {
    pub roots: usize,
    pub pinned: usize,
    pub reachable: usize,
    pub removed: usize,
}

/// Vertices reachable from a root or a pinned vertex
///
/// BFS over all edges, data and impulse alike.
pub fn mark(graph: &Graph, attributes: &AttributeRegistry) -> (FxHashSet<VertexId>, ReachabilitySummary) {
    let mut successors: FxHashMap<VertexId, Vec<VertexId>> = FxHashMap::default();
    for edge in graph.edges() {
        successors.entry(edge.src).or_default().push(edge.dst);
    }

    let mut summary = ReachabilitySummary::default();
    let mut reached = FxHashSet::default();
    let mut queue = VecDeque::new();
    for vertex in graph.vertices() {
        let root = !vertex.has_inputs() && successors.contains_key(&vertex.id);
        let pinned = attributes.retains(vertex);
        summary.roots += usize::from(root);
        summary.pinned += usize::from(pinned);
        if (root || pinned) && reached.insert(vertex.id) {
            queue.push_back(vertex.id);
        }
    }

    while let Some(current) = queue.pop_front() {
        for next in successors.get(&current).into_iter().flatten() {
            if reached.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    summary.reachable = reached.len();
    (reached, summary)
}

/// Every required input of every vertex selected by `checked` has an edge
pub fn check_bindings(graph: &Graph, checked: impl Fn(&Vertex) -> bool) -> Result<()> {
    for vertex in graph.vertices().filter(|v| checked(*v)) {
        for port in vertex.inputs().filter(|p| p.required) {
            if !graph.is_bound(vertex.id, &port.name) {
                return Err(CompileError::port_binding(
                    vertex.span,
                    &vertex.name,
                    &port.name,
                    "required input is not bound",
                ));
            }
        }
    }
    Ok(())
}

pub struct ReachabilityPass<'a> {
    attributes: &'a AttributeRegistry,
    config: &'a ReachabilityConfig,
}

impl<'a> ReachabilityPass<'a> {
    pub fn new(attributes: &'a AttributeRegistry, config: &'a ReachabilityConfig) -> Self {
        Self { attributes, config }
    }

    pub fn run(&self, graph: &mut Graph) -> Result<ReachabilitySummary> {
        let (reached, mut summary) = mark(graph, self.attributes);

        let connected: FxHashSet<VertexId> =
            graph.edges().iter().flat_map(|e| [e.src, e.dst]).collect();
        let sweep = self.config.enabled;
        check_bindings(graph, |v| {
            !sweep || connected.contains(&v.id) || self.attributes.retains(v)
        })?;

        if sweep {
            for id in graph.vertex_ids() {
                if !reached.contains(&id) {
                    if let Some(vertex) = graph.remove_vertex(id) {
                        trace!(vertex = %vertex.name, "unreachable");
                        summary.removed += 1;
                    }
                }
            }
        }
        debug!(
            roots = summary.roots,
            pinned = summary.pinned,
            removed = summary.removed,
            "reachability"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::features::templates::lookup;
    use crate::shared::models::{Attribute, Edge, PortKind, Span};

    fn add(graph: &mut Graph, path: &str, name: &str) -> VertexId {
        let template = lookup(path).unwrap();
        graph.add_vertex(template.instantiate(name, Span::zero()))
    }

    fn data(graph: &mut Graph, src: VertexId, sp: &str, dst: VertexId, dp: &str) {
        graph.add_edge(Edge::new(src, sp, dst, dp, PortKind::Data));
    }

    fn run(graph: &mut Graph) -> Result<ReachabilitySummary> {
        let registry = AttributeRegistry::new();
        let config = ReachabilityConfig::default();
        ReachabilityPass::new(&registry, &config).run(graph)
    }

    #[test]
    fn test_isolated_root_removed() {
        let mut g = Graph::new();
        add(&mut g, "logix.world.local_user", "u");
        let summary = run(&mut g).unwrap();
        assert_eq!(summary.removed, 1);
        assert_eq!(g.vertex_count(), 0);
    }

    #[test]
    fn test_pinned_vertex_kept() {
        let mut g = Graph::new();
        let u = add(&mut g, "logix.world.local_user", "u");
        if let Some(v) = g.vertex_mut(u) {
            v.attributes.push(Attribute::new("no_remove"));
        }
        run(&mut g).unwrap();
        assert!(g.vertex(u).is_some());
    }

    #[test]
    fn test_forward_chain_kept() {
        let mut g = Graph::new();
        let s = add(&mut g, "logix.world.root_slot", "s");
        let n = add(&mut g, "logix.world.slot_name", "n");
        let d = add(&mut g, "logix.display", "d");
        data(&mut g, s, "slot", n, "slot");
        data(&mut g, n, "name", d, "value");
        let summary = run(&mut g).unwrap();
        assert_eq!(summary.roots, 1);
        assert_eq!(summary.reachable, 3);
        assert_eq!(g.vertex_count(), 3);
    }

    #[test]
    fn test_isolated_vertex_with_unbound_input_is_swept() {
        let mut g = Graph::new();
        add(&mut g, "logix.world.slot_name", "n");
        assert!(run(&mut g).is_ok());
        assert!(g.find_by_name("n").is_none());
    }

    #[test]
    fn test_unreachable_connected_vertex_needs_required_inputs() {
        // n has no root upstream, so the sweep would remove both vertices
        let mut g = Graph::new();
        let n = add(&mut g, "logix.world.slot_name", "n");
        let d = add(&mut g, "logix.display", "d");
        data(&mut g, n, "name", d, "value");
        let err = run(&mut g).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PortBinding);
        assert!(err.to_string().contains("n.slot"));
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn test_unswept_vertex_needs_required_inputs() {
        let mut g = Graph::new();
        add(&mut g, "logix.world.slot_name", "n");
        let registry = AttributeRegistry::new();
        let config = ReachabilityConfig { enabled: false };
        let err = ReachabilityPass::new(&registry, &config).run(&mut g).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PortBinding);
    }

    #[test]
    fn test_pinned_vertex_seeds_traversal() {
        let mut g = Graph::new();
        let n = add(&mut g, "logix.world.slot_name", "n");
        let d = add(&mut g, "logix.display", "d");
        data(&mut g, n, "name", d, "value");
        if let Some(v) = g.vertex_mut(n) {
            v.pinned = true;
        }
        let (reached, _) = mark(&g, &AttributeRegistry::new());
        assert!(reached.contains(&n));
        assert!(reached.contains(&d));
    }

    #[test]
    fn test_reachable_vertex_needs_required_inputs() {
        let mut g = Graph::new();
        let s = add(&mut g, "logix.world.root_slot", "s");
        let c = add(&mut g, "logix.references.compare", "c");
        let id = add(&mut g, "logix.references.reference_id", "id");
        data(&mut g, s, "slot", id, "target");
        data(&mut g, id, "id", c, "a");
        let err = run(&mut g).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PortBinding);
        assert!(err.to_string().contains("c.b"));
    }

    #[test]
    fn test_sweep_can_be_disabled() {
        let mut g = Graph::new();
        add(&mut g, "logix.world.local_user", "u");
        let registry = AttributeRegistry::new();
        let config = ReachabilityConfig { enabled: false };
        let summary = ReachabilityPass::new(&registry, &config).run(&mut g).unwrap();
        assert_eq!(summary.removed, 0);
        assert_eq!(g.vertex_count(), 1);
    }
}
