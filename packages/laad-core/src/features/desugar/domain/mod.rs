//! Desugaring domain - lowering port and shared rewrite context

use crate::errors::{CompileError, Result};
use crate::features::templates;
use crate::shared::models::{
    ArmBody, BlockChain, ConditionalRole, Edge, Graph, Literal, PortDirection, PortKind, Span,
    SugarKind, Type, Vertex, VertexId,
};

/// A vertex port used as one end of a synthesized edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub vertex: VertexId,
    pub port: String,
}

impl Pin {
    pub fn new(vertex: VertexId, port: impl Into<String>) -> Self {
        Self {
            vertex,
            port: port.into(),
        }
    }
}

/// Entry and exit impulse ports of a sequenced block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub entry: Pin,
    pub exit: Option<Pin>,
}

/// Sugar lowering trait (port)
///
/// Replaces one sugar vertex by primitive template vertices, moving every
/// edge that touched the sugar vertex onto its replacement.
pub trait SugarLowering: Send + Sync {
    fn kind(&self) -> SugarKind;

    fn lower(&self, ctx: &mut LoweringContext<'_>, id: VertexId) -> Result<()>;
}

/// Shared state while one sugar vertex is rewritten
pub struct LoweringContext<'g> {
    pub graph: &'g mut Graph,
    /// Synthetic vertices created so far
    pub created: usize,
}

impl<'g> LoweringContext<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self { graph, created: 0 }
    }

    pub fn sugar(&self, id: VertexId) -> Result<&Vertex> {
        self.graph.vertex(id).ok_or_else(|| {
            CompileError::scope(Span::zero(), format!("sugar vertex {} was removed", id))
        })
    }

    /// `__<kind><n>_<role>`
    pub fn synthetic_name(kind: SugarKind, id: VertexId, role: &str) -> String {
        format!("__{}{}_{}", kind.as_str(), id.0, role)
    }

    /// Instantiate a template with its type parameters bound
    pub fn spawn(&mut self, path: &str, name: String, span: Span, params: &[Type]) -> Result<VertexId> {
        let template = templates::lookup(path)
            .ok_or_else(|| CompileError::scope(span, format!("unknown template `{}`", path)))?;
        let mut vertex = template.instantiate(name, span);
        for (param, ty) in vertex.params.iter_mut().zip(params) {
            param.bound = Some(ty.clone());
        }
        self.created += 1;
        Ok(self.graph.add_vertex(vertex))
    }

    /// Constant vertex carrying `value`
    pub fn spawn_constant(&mut self, name: String, span: Span, ty: Type, value: Literal) -> Result<VertexId> {
        let id = self.spawn(templates::paths::VALUE, name, span, &[ty])?;
        if let Some(vertex) = self.graph.vertex_mut(id) {
            vertex.value = Some(value);
        }
        Ok(id)
    }

    /// Add a typed edge; the kind follows the type
    pub fn wire(&mut self, src: &Pin, dst: &Pin, ty: Type, span: Span) {
        let kind = if ty == Type::Impulse {
            PortKind::Impulse
        } else {
            PortKind::Data
        };
        self.graph.add_edge(
            Edge::new(src.vertex, &src.port, dst.vertex, &dst.port, kind)
                .with_span(span)
                .with_type(ty),
        );
    }

    pub fn pulse(&mut self, src: &Pin, dst: &Pin, span: Span) {
        self.wire(src, dst, Type::Impulse, span);
    }

    /// Target of the edge leaving an impulse output, removing that edge
    pub fn take_continuation(&mut self, id: VertexId, port: &str) -> Option<Pin> {
        self.graph
            .take_outgoing(id, port)
            .into_iter()
            .next()
            .map(|e| Pin::new(e.dst, e.dst_port))
    }

    /// Impulse input that starts a chain
    ///
    /// Chains led by an event (impulse out, no impulse in) run on their own
    /// and are not sequenced. Chains without impulse ports are data wiring.
    pub fn chain_entry(&self, chain: &BlockChain) -> Option<Pin> {
        let head = chain.vertices.first().and_then(|id| self.graph.vertex(*id))?;
        let has = |v: &Vertex, direction| v.first_port(direction, PortKind::Impulse).is_some();
        if has(head, PortDirection::Out) && !has(head, PortDirection::In) {
            return None;
        }
        chain
            .vertices
            .iter()
            .filter_map(|id| self.graph.vertex(*id))
            .filter(|v| v.conditional_role() != Some(ConditionalRole::Value))
            .find_map(|v| {
                v.first_port(PortDirection::In, PortKind::Impulse)
                    .map(|p| Pin::new(v.id, &p.name))
            })
    }

    /// Undriven impulse output at the tail of a chain
    pub fn chain_exit(&self, chain: &BlockChain) -> Option<Pin> {
        let tail = chain
            .vertices
            .iter()
            .rev()
            .filter_map(|id| self.graph.vertex(*id))
            .filter(|v| v.conditional_role() != Some(ConditionalRole::Value))
            .find(|v| v.first_port(PortDirection::Out, PortKind::Impulse).is_some())?;
        tail.ports_of(PortDirection::Out, PortKind::Impulse)
            .find(|p| !self.graph.is_driven(tail.id, &p.name))
            .map(|p| Pin::new(tail.id, &p.name))
    }

    /// Chain the impulse lines of a block, each tail driving the next head
    pub fn sequence(&mut self, body: &ArmBody, span: Span) -> Option<Segment> {
        let segments: Vec<Segment> = body
            .chains
            .iter()
            .filter_map(|chain| {
                let entry = self.chain_entry(chain)?;
                Some(Segment {
                    entry,
                    exit: self.chain_exit(chain),
                })
            })
            .collect();

        for pair in segments.windows(2) {
            if let Some(exit) = &pair[0].exit {
                self.pulse(exit, &pair[1].entry, span);
            }
        }
        let first = segments.first()?;
        Some(Segment {
            entry: first.entry.clone(),
            exit: segments.last().and_then(|s| s.exit.clone()),
        })
    }

    /// Run `bodies` one after another starting from `source`, then continue
    /// into `sink`. Empty bodies are skipped.
    pub fn thread(&mut self, source: Pin, bodies: &[&ArmBody], sink: Option<&Pin>, span: Span) {
        let mut current = Some(source);
        for body in bodies {
            if let Some(segment) = self.sequence(body, span) {
                if let Some(from) = &current {
                    self.pulse(from, &segment.entry, span);
                }
                current = segment.exit;
            }
        }
        if let (Some(from), Some(to)) = (current, sink) {
            self.pulse(&from, to, span);
        }
    }
}
