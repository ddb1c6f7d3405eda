//! LNJ document model and emitter
//!
//! ```json
//! {
//!   "format": "lnj",
//!   "version": 1,
//!   "vertices": [{ "id": 0, "name": "x", "class": "logix.input.value", ... }],
//!   "edges": [{ "from": { "vertex": 0, "port": "value" }, "to": { ... }, ... }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmitConfig;
use crate::errors::{CompileError, Result};
use crate::shared::models::{
    Attribute, Graph, Literal, PortDirection, PortKind, Span, Type, Vertex, VertexClass,
};

pub const LNJ_FORMAT: &str = "lnj";
pub const LNJ_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LnjDocument {
    pub format: String,
    pub version: u32,
    pub vertices: Vec<LnjVertex>,
    pub edges: Vec<LnjEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LnjVertexKind {
    Template,
    Class,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LnjVertex {
    pub id: u32,
    pub name: String,
    /// Template path or user class name
    pub class: String,
    pub kind: LnjVertexKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<Type>,
    pub ports: Vec<LnjPort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LnjPort {
    pub name: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    #[serde(rename = "type")]
    pub ty: Type,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LnjEndpoint {
    pub vertex: u32,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LnjEdge {
    pub from: LnjEndpoint,
    pub to: LnjEndpoint,
    pub kind: PortKind,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<Type>,
}

impl LnjDocument {
    pub fn new() -> Self {
        Self {
            format: LNJ_FORMAT.to_string(),
            version: LNJ_VERSION,
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn vertex(&self, id: u32) -> Option<&LnjVertex> {
        self.vertices.iter().find(|v| v.id == id)
    }
}

impl Default for LnjDocument {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Emitter<'a> {
    config: &'a EmitConfig,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a EmitConfig) -> Self {
        Self { config }
    }

    pub fn emit(&self, graph: &Graph) -> Result<LnjDocument> {
        let mut document = LnjDocument::new();
        for vertex in graph.vertices() {
            document.vertices.push(self.vertex(graph, vertex)?);
        }
        document.edges = graph
            .edges()
            .iter()
            .map(|e| LnjEdge {
                from: LnjEndpoint {
                    vertex: e.src.0,
                    port: e.src_port.clone(),
                },
                to: LnjEndpoint {
                    vertex: e.dst.0,
                    port: e.dst_port.clone(),
                },
                kind: e.kind,
                ty: e.ty.clone(),
            })
            .collect();
        debug!(
            vertices = document.vertices.len(),
            edges = document.edges.len(),
            "emitted LNJ"
        );
        Ok(document)
    }

    fn vertex(&self, graph: &Graph, vertex: &Vertex) -> Result<LnjVertex> {
        let (class, kind) = match &vertex.class {
            VertexClass::Template(path) => (path.clone(), LnjVertexKind::Template),
            VertexClass::Class(name) => (name.clone(), LnjVertexKind::Class),
            VertexClass::Sugar(kind) => {
                return Err(CompileError::syntax(
                    vertex.span,
                    format!("`{}` construct survived desugaring", kind.as_str()),
                ))
            }
        };
        let ports = vertex
            .ports
            .iter()
            .map(|port| LnjPort {
                name: port.name.clone(),
                direction: port.direction,
                kind: port.kind,
                ty: Self::port_type(graph, vertex, &port.name, &port.ty),
                required: port.required,
            })
            .collect();
        Ok(LnjVertex {
            id: vertex.id.0,
            name: vertex.name.clone(),
            class,
            kind,
            type_args: vertex.params.iter().filter_map(|p| p.bound.clone()).collect(),
            ports,
            attributes: vertex.attributes.clone(),
            value: vertex.value.clone(),
            span: self.config.include_spans.then_some(vertex.span),
        })
    }

    /// Solved port type; a dummy input takes the type of the edge bound to it
    fn port_type(graph: &Graph, vertex: &Vertex, port: &str, schema: &Type) -> Type {
        match schema {
            Type::Dummy => graph
                .incoming(vertex.id, port)
                .chain(graph.outgoing(vertex.id, port))
                .find_map(|e| e.ty.clone())
                .unwrap_or(Type::Object),
            other => vertex.resolve_schema(other),
        }
    }
}
