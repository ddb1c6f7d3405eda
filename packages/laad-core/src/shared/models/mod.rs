//! Shared models

mod attribute;
pub mod graph;
mod span;
pub mod types;

pub use attribute::{Attribute, Literal};
pub use graph::{
    ArmBody, BlockChain, ConditionalRole, Edge, Graph, Port, PortDirection, PortKind, SugarKind,
    SugarMeta, TypeParam, Vertex, VertexClass, VertexId,
};
pub use span::Span;
pub use types::{ClassHierarchy, Primitive, Type, TypeClass};
