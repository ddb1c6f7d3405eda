//! LNJ emission
//!
//! Serializes the final graph to the JSON interchange document.

pub mod lnj;

pub use lnj::{
    Emitter, LnjDocument, LnjEdge, LnjEndpoint, LnjPort, LnjVertex, LnjVertexKind, LNJ_FORMAT,
    LNJ_VERSION,
};
