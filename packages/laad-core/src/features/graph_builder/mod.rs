//! Graph builder: AST to graph IR
//!
//! Walks the program once, creating one vertex per node instance, literal,
//! operator and control-flow construct, and one edge per `->` link. Control
//! flow is left as sugar vertices for the desugaring pass.

pub mod infrastructure;

pub use infrastructure::builder::{build, GraphBuilder};
pub use infrastructure::edge_resolver::Endpoint;
