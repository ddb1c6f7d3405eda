// Edge Resolver - `a -> b` links to port-level edges
//
// Picks the source and destination ports of a link:
// - an explicit `node.port` names the port
// - impulse edge when the source has an impulse output and the destination
//   an impulse input
// - otherwise source's first data output to destination's first unbound
//   data input
//
// A data input takes one edge and an impulse output drives one edge.

use crate::errors::{CompileError, Result};
use crate::shared::models::{
    Edge, Graph, Port, PortDirection, PortKind, Span, SugarKind, Vertex, VertexId,
};

/// One side of a link: a vertex, optionally narrowed to a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub vertex: VertexId,
    pub port: Option<String>,
}

impl Endpoint {
    pub fn vertex(vertex: VertexId) -> Self {
        Self { vertex, port: None }
    }

    pub fn port(vertex: VertexId, port: impl Into<String>) -> Self {
        Self {
            vertex,
            port: Some(port.into()),
        }
    }
}

fn lookup(graph: &Graph, id: VertexId, span: Span) -> Result<&Vertex> {
    graph
        .vertex(id)
        .ok_or_else(|| CompileError::scope(span, format!("reference to removed vertex {}", id)))
}

fn named_port<'v>(
    vertex: &'v Vertex,
    name: &str,
    direction: PortDirection,
    span: Span,
) -> Result<&'v Port> {
    let port = vertex.port(name).ok_or_else(|| {
        CompileError::scope(span, format!("`{}` has no port `{}`", vertex.name, name))
    })?;
    if port.direction != direction {
        let expected = match direction {
            PortDirection::In => "an input",
            PortDirection::Out => "an output",
        };
        return Err(CompileError::port_binding(
            span,
            &vertex.name,
            name,
            format!("port is not {}", expected),
        ));
    }
    Ok(port)
}

/// A pending conditional acts as a value source until something triggers it
fn drives_impulses(graph: &Graph, vertex: &Vertex) -> bool {
    if vertex.sugar_kind() == Some(SugarKind::Conditional) && !graph.is_bound(vertex.id, "trigger")
    {
        return false;
    }
    vertex
        .first_port(PortDirection::Out, PortKind::Impulse)
        .is_some()
}

fn default_output(vertex: &Vertex, kind: PortKind, span: Span) -> Result<&Port> {
    vertex.first_port(PortDirection::Out, kind).ok_or_else(|| {
        CompileError::port_binding(
            span,
            &vertex.name,
            "*",
            format!("has no {} output to connect", kind.as_str()),
        )
    })
}

fn default_input<'v>(
    graph: &Graph,
    vertex: &'v Vertex,
    kind: PortKind,
    span: Span,
) -> Result<&'v Port> {
    if kind == PortKind::Impulse {
        return vertex
            .first_port(PortDirection::In, PortKind::Impulse)
            .ok_or_else(|| {
                CompileError::port_binding(span, &vertex.name, "*", "has no impulse input")
            });
    }
    if vertex.sugar_kind().is_some() {
        return Err(CompileError::port_binding(
            span,
            &vertex.name,
            "*",
            "control-flow construct takes no positional data input",
        ));
    }
    vertex
        .ports_of(PortDirection::In, PortKind::Data)
        .find(|p| !graph.is_bound(vertex.id, &p.name))
        .ok_or_else(|| {
            CompileError::port_binding(span, &vertex.name, "*", "has no unbound data input")
        })
}

/// Resolve a link into an edge without adding it to the graph
pub fn resolve(graph: &Graph, src: &Endpoint, dst: &Endpoint, span: Span) -> Result<Edge> {
    let sv = lookup(graph, src.vertex, span)?;
    let dv = lookup(graph, dst.vertex, span)?;

    let explicit_src = match &src.port {
        Some(name) => Some(named_port(sv, name, PortDirection::Out, span)?),
        None => None,
    };
    let explicit_dst = match &dst.port {
        Some(name) => Some(named_port(dv, name, PortDirection::In, span)?),
        None => None,
    };

    let (sp, dp) = match (explicit_src, explicit_dst) {
        (Some(s), Some(d)) => (s, d),
        (Some(s), None) => (s, default_input(graph, dv, s.kind, span)?),
        (None, Some(d)) => (default_output(sv, d.kind, span)?, d),
        (None, None) => {
            let kind = if drives_impulses(graph, sv)
                && dv.first_port(PortDirection::In, PortKind::Impulse).is_some()
            {
                PortKind::Impulse
            } else {
                PortKind::Data
            };
            (
                default_output(sv, kind, span)?,
                default_input(graph, dv, kind, span)?,
            )
        }
    };

    if sp.kind != dp.kind {
        return Err(CompileError::port_binding(
            span,
            &dv.name,
            &dp.name,
            format!(
                "cannot connect {} output `{}.{}` to a {} input",
                sp.kind.as_str(),
                sv.name,
                sp.name,
                dp.kind.as_str()
            ),
        ));
    }
    if dp.kind == PortKind::Data && graph.is_bound(dv.id, &dp.name) {
        return Err(CompileError::port_binding(
            span,
            &dv.name,
            &dp.name,
            "data input is already bound",
        ));
    }
    if sp.kind == PortKind::Impulse && graph.is_driven(sv.id, &sp.name) {
        return Err(CompileError::port_binding(
            span,
            &sv.name,
            &sp.name,
            "impulse output already drives another input",
        ));
    }

    Ok(Edge::new(sv.id, &sp.name, dv.id, &dp.name, sp.kind).with_span(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::templates::lookup;

    fn add(graph: &mut Graph, path: &str, name: &str) -> VertexId {
        let template = lookup(path).unwrap();
        graph.add_vertex(template.instantiate(name, Span::zero()))
    }

    #[test]
    fn test_impulse_preferred() {
        let mut g = Graph::new();
        let update = add(&mut g, "logix.events.update", "u");
        let log = add(&mut g, "logix.actions.log", "l");
        let e = resolve(&g, &Endpoint::vertex(update), &Endpoint::vertex(log), Span::zero()).unwrap();
        assert_eq!(e.kind, PortKind::Impulse);
        assert_eq!((e.src_port.as_str(), e.dst_port.as_str()), ("pulse", "trigger"));
    }

    #[test]
    fn test_data_fills_first_unbound_input() {
        let mut g = Graph::new();
        let a = add(&mut g, "logix.input.value", "a");
        let b = add(&mut g, "logix.input.value", "b");
        let sum = add(&mut g, "logix.operators.add", "s");
        let first = resolve(&g, &Endpoint::vertex(a), &Endpoint::vertex(sum), Span::zero()).unwrap();
        assert_eq!(first.dst_port, "a");
        g.add_edge(first);
        let second = resolve(&g, &Endpoint::vertex(b), &Endpoint::vertex(sum), Span::zero()).unwrap();
        assert_eq!(second.dst_port, "b");
    }

    #[test]
    fn test_double_binding_rejected() {
        let mut g = Graph::new();
        let a = add(&mut g, "logix.input.value", "a");
        let b = add(&mut g, "logix.input.value", "b");
        let d = add(&mut g, "logix.display", "d");
        let e = resolve(&g, &Endpoint::vertex(a), &Endpoint::vertex(d), Span::zero()).unwrap();
        g.add_edge(e);
        let err = resolve(&g, &Endpoint::vertex(b), &Endpoint::port(d, "value"), Span::zero())
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::PortBinding);
    }

    #[test]
    fn test_impulse_fan_out_rejected() {
        let mut g = Graph::new();
        let u = add(&mut g, "logix.events.update", "u");
        let l1 = add(&mut g, "logix.actions.log", "l1");
        let l2 = add(&mut g, "logix.actions.log", "l2");
        let e = resolve(&g, &Endpoint::vertex(u), &Endpoint::vertex(l1), Span::zero()).unwrap();
        g.add_edge(e);
        let err = resolve(&g, &Endpoint::vertex(u), &Endpoint::vertex(l2), Span::zero()).unwrap_err();
        assert!(err.to_string().contains("u.pulse"));
    }

    #[test]
    fn test_explicit_port_direction_checked() {
        let mut g = Graph::new();
        let a = add(&mut g, "logix.input.value", "a");
        let d = add(&mut g, "logix.display", "d");
        let err = resolve(&g, &Endpoint::port(d, "value"), &Endpoint::vertex(a), Span::zero())
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::PortBinding);
    }

    #[test]
    fn test_unknown_port_is_scope_error() {
        let mut g = Graph::new();
        let a = add(&mut g, "logix.input.value", "a");
        let d = add(&mut g, "logix.display", "d");
        let err = resolve(&g, &Endpoint::vertex(a), &Endpoint::port(d, "nope"), Span::zero())
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Scope);
    }
}
