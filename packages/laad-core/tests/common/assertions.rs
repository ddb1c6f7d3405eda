//! Custom assertions over emitted LNJ documents

use laad_core::features::emit::{LnjDocument, LnjVertex};
use laad_core::{CompileError, ErrorKind};

/// Vertices whose class is `class`
pub fn vertices_of<'a>(doc: &'a LnjDocument, class: &'a str) -> Vec<&'a LnjVertex> {
    doc.vertices.iter().filter(|v| v.class == class).collect()
}

pub fn vertex_named<'a>(doc: &'a LnjDocument, name: &str) -> Option<&'a LnjVertex> {
    doc.vertices.iter().find(|v| v.name == name)
}

pub fn assert_class_count(doc: &LnjDocument, class: &str, expected: usize) {
    let found = vertices_of(doc, class).len();
    assert_eq!(
        found,
        expected,
        "Expected {expected} `{class}` vertices, got {found}. Classes: {:?}",
        doc.vertices.iter().map(|v| &v.class).collect::<Vec<_>>()
    );
}

/// Exactly one edge `src.src_port -> dst.dst_port`, by vertex id
pub fn assert_edge(doc: &LnjDocument, src: u32, src_port: &str, dst: u32, dst_port: &str) {
    let count = doc
        .edges
        .iter()
        .filter(|e| {
            e.from.vertex == src && e.from.port == src_port && e.to.vertex == dst && e.to.port == dst_port
        })
        .count();
    assert_eq!(
        count, 1,
        "Expected one edge {src}.{src_port} -> {dst}.{dst_port}, found {count}"
    );
}

/// Every edge endpoint names a vertex present in the document
pub fn assert_edges_closed(doc: &LnjDocument) {
    for edge in &doc.edges {
        assert!(doc.vertex(edge.from.vertex).is_some(), "dangling source {:?}", edge.from);
        assert!(doc.vertex(edge.to.vertex).is_some(), "dangling target {:?}", edge.to);
    }
}

pub fn assert_error_kind<T: std::fmt::Debug>(result: Result<T, CompileError>, kind: ErrorKind) -> CompileError {
    match result {
        Err(err) => {
            assert_eq!(err.kind(), kind, "unexpected error: {err}");
            err
        }
        Ok(value) => panic!("expected {kind}, compiled to {value:?}"),
    }
}
