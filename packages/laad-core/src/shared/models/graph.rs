//! Graph IR
//!
//! Flat arena of vertices keyed by [`VertexId`] with edges stored as index
//! tuples. Removing a vertex leaves a tombstone so ids stay stable across
//! passes, and cyclic loop wiring needs no special handling.

use serde::{Deserialize, Serialize};

use super::attribute::{Attribute, Literal};
use super::span::Span;
use super::types::{ClassHierarchy, Type, TypeClass};

/// Arena index of a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
}

impl PortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortDirection::In => "in",
            PortDirection::Out => "out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Data,
    /// Happens-before ordering; carries no value
    Impulse,
}

impl PortKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortKind::Data => "data",
            PortKind::Impulse => "impulse",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    /// Schema type; may reference the vertex's type parameters
    pub ty: Type,
    /// Must be bound by an edge once the graph is final
    pub required: bool,
}

impl Port {
    /// Required data input
    pub fn input(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::In,
            kind: PortKind::Data,
            ty,
            required: true,
        }
    }

    pub fn output(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Out,
            kind: PortKind::Data,
            ty,
            required: false,
        }
    }

    pub fn impulse_in(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::In,
            kind: PortKind::Impulse,
            ty: Type::Impulse,
            required: false,
        }
    }

    pub fn impulse_out(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Out,
            kind: PortKind::Impulse,
            ty: Type::Impulse,
            required: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::In
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Out
    }
}

/// Per-vertex type parameter, instantiated once per vertex during inference
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub class: TypeClass,
    /// Used when nothing else fixes the parameter (numeric literals)
    pub default: Option<Type>,
    /// Known before inference (casts, annotated literals) or solved by it
    pub bound: Option<Type>,
}

impl TypeParam {
    pub fn new(class: TypeClass) -> Self {
        Self {
            class,
            default: None,
            bound: None,
        }
    }

    pub fn with_default(mut self, ty: Type) -> Self {
        self.default = Some(ty);
        self
    }

    pub fn bound_to(mut self, ty: Type) -> Self {
        self.bound = Some(ty);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SugarKind {
    Conditional,
    While,
    RangeFor,
    GenericFor,
}

impl SugarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SugarKind::Conditional => "if",
            SugarKind::While => "while",
            SugarKind::RangeFor => "for",
            SugarKind::GenericFor => "loop",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VertexClass {
    /// Instance of a built-in node template, by dotted path
    Template(String),
    /// Instance of a user class definition
    Class(String),
    /// Control-flow construct awaiting desugaring
    Sugar(SugarKind),
}

impl VertexClass {
    pub fn label(&self) -> String {
        match self {
            VertexClass::Template(path) => path.clone(),
            VertexClass::Class(name) => name.clone(),
            VertexClass::Sugar(kind) => format!("<{}>", kind.as_str()),
        }
    }
}

/// How a conditional is lowered; decided by type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalRole {
    Pending,
    /// Produces a value through `logix.operators.conditional`
    Value,
    /// Routes an impulse through `logix.flow.if`
    Statement,
}

/// Vertices of one statement inside a block, in chain order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockChain {
    pub vertices: Vec<VertexId>,
}

/// Statements of a `{ ... }` body or conditional arm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmBody {
    pub chains: Vec<BlockChain>,
}

impl ArmBody {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Structure of a sugar vertex that ports alone cannot express
#[derive(Debug, Clone, PartialEq)]
pub enum SugarMeta {
    Conditional {
        arms: Vec<ArmBody>,
        otherwise: Option<ArmBody>,
        role: ConditionalRole,
    },
    While {
        body: ArmBody,
    },
    RangeFor {
        /// `logix.variables.local` vertex holding the induction variable
        counter: VertexId,
        body: ArmBody,
    },
    GenericFor {
        start: ArmBody,
        end: ArmBody,
        body: ArmBody,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub name: String,
    pub class: VertexClass,
    pub ports: Vec<Port>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
    /// Payload of literal vertices
    pub value: Option<Literal>,
    pub params: Vec<TypeParam>,
    /// Declared type of the first data output (`x: T = ...`)
    pub annotation: Option<Type>,
    /// Kept by reachability regardless of connectivity
    pub pinned: bool,
    /// Object-reference inputs accept `null`
    pub nullable: bool,
    pub sugar: Option<SugarMeta>,
}

impl Vertex {
    pub fn new(name: impl Into<String>, class: VertexClass, ports: Vec<Port>, span: Span) -> Self {
        Self {
            id: VertexId(u32::MAX),
            name: name.into(),
            class,
            ports,
            attributes: Vec::new(),
            span,
            value: None,
            params: Vec::new(),
            annotation: None,
            pinned: false,
            nullable: false,
            sugar: None,
        }
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_input())
    }

    pub fn has_inputs(&self) -> bool {
        self.inputs().next().is_some()
    }

    pub fn ports_of(&self, direction: PortDirection, kind: PortKind) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(move |p| p.direction == direction && p.kind == kind)
    }

    pub fn first_port(&self, direction: PortDirection, kind: PortKind) -> Option<&Port> {
        self.ports_of(direction, kind).next()
    }

    pub fn template_path(&self) -> Option<&str> {
        match &self.class {
            VertexClass::Template(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_template(&self, path: &str) -> bool {
        self.template_path() == Some(path)
    }

    pub fn sugar_kind(&self) -> Option<SugarKind> {
        match self.class {
            VertexClass::Sugar(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn conditional_role(&self) -> Option<ConditionalRole> {
        match &self.sugar {
            Some(SugarMeta::Conditional { role, .. }) => Some(*role),
            _ => None,
        }
    }

    /// Substitute solved type parameters into a port schema
    pub fn resolve_schema(&self, ty: &Type) -> Type {
        match ty {
            Type::Param(i) => self
                .params
                .get(*i as usize)
                .and_then(|p| p.bound.clone())
                .unwrap_or(Type::Param(*i)),
            Type::Field(inner) => Type::field(self.resolve_schema(inner)),
            other => other.clone(),
        }
    }

    /// Port type with solved parameters substituted
    pub fn port_type(&self, name: &str) -> Option<Type> {
        self.port(name).map(|p| self.resolve_schema(&p.ty))
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a.key == key)
    }
}

/// Directed connection `(src, src_port) -> (dst, dst_port)`
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub src: VertexId,
    pub src_port: String,
    pub dst: VertexId,
    pub dst_port: String,
    pub kind: PortKind,
    /// Solved type at this connection site
    pub ty: Option<Type>,
    pub span: Span,
}

impl Edge {
    pub fn new(
        src: VertexId,
        src_port: impl Into<String>,
        dst: VertexId,
        dst_port: impl Into<String>,
        kind: PortKind,
    ) -> Self {
        Self {
            src,
            src_port: src_port.into(),
            dst,
            dst_port: dst_port.into(),
            kind,
            ty: None,
            span: Span::zero(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn starts_at(&self, v: VertexId, port: &str) -> bool {
        self.src == v && self.src_port == port
    }

    pub fn ends_at(&self, v: VertexId, port: &str) -> bool {
        self.dst == v && self.dst_port == port
    }

    pub fn touches(&self, v: VertexId) -> bool {
        self.src == v || self.dst == v
    }
}

/// The compiled program
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Option<Vertex>>,
    edges: Vec<Edge>,
    pub classes: ClassHierarchy,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            classes: ClassHierarchy::new(),
        }
    }

    /// Reserve an id whose vertex is inserted later with [`Graph::insert`]
    pub fn reserve(&mut self) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(None);
        id
    }

    /// Fill a reserved slot
    pub fn insert(&mut self, id: VertexId, mut vertex: Vertex) {
        vertex.id = id;
        if let Some(slot) = self.vertices.get_mut(id.index()) {
            *slot = Some(vertex);
        }
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = self.reserve();
        self.insert(id, vertex);
        id
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index()).and_then(Option::as_ref)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().flatten()
    }

    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices().map(|v| v.id).collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    /// Arena size including tombstones
    pub fn slot_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Vertex> {
        self.vertices().find(|v| v.name == name)
    }

    pub fn find_by_template<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Vertex> + 'a {
        self.vertices().filter(move |v| v.is_template(path))
    }

    /// Tombstone a vertex and drop every edge touching it
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<Vertex> {
        let removed = self.vertices.get_mut(id.index()).and_then(Option::take);
        if removed.is_some() {
            self.edges.retain(|e| !e.touches(id));
        }
        removed
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_edge(&mut self, edge: Edge) -> usize {
        self.edges.push(edge);
        self.edges.len() - 1
    }

    pub fn incoming<'a>(&'a self, v: VertexId, port: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.ends_at(v, port))
    }

    pub fn outgoing<'a>(&'a self, v: VertexId, port: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.starts_at(v, port))
    }

    pub fn is_bound(&self, v: VertexId, port: &str) -> bool {
        self.incoming(v, port).next().is_some()
    }

    pub fn is_driven(&self, v: VertexId, port: &str) -> bool {
        self.outgoing(v, port).next().is_some()
    }

    /// Move every edge ending at `(from, from_port)` to end at `(to, to_port)`
    pub fn redirect_inputs(&mut self, from: VertexId, from_port: &str, to: VertexId, to_port: &str) {
        for e in self.edges.iter_mut().filter(|e| e.ends_at(from, from_port)) {
            e.dst = to;
            e.dst_port = to_port.to_string();
        }
    }

    /// Move every edge starting at `(from, from_port)` to start at `(to, to_port)`
    pub fn redirect_outputs(&mut self, from: VertexId, from_port: &str, to: VertexId, to_port: &str) {
        for e in self.edges.iter_mut().filter(|e| e.starts_at(from, from_port)) {
            e.src = to;
            e.src_port = to_port.to_string();
        }
    }

    /// Remove and return every edge ending at `(v, port)`
    pub fn take_incoming(&mut self, v: VertexId, port: &str) -> Vec<Edge> {
        let (taken, kept) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.ends_at(v, port));
        self.edges = kept;
        taken
    }

    /// Remove and return every edge starting at `(v, port)`
    pub fn take_outgoing(&mut self, v: VertexId, port: &str) -> Vec<Edge> {
        let (taken, kept) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.starts_at(v, port));
        self.edges = kept;
        taken
    }

    /// Type of a port with the vertex's solved parameters substituted
    pub fn port_type(&self, v: VertexId, port: &str) -> Option<Type> {
        self.vertex(v).and_then(|vx| vx.port_type(port))
    }
}
