//! End-to-end compilation tests
//!
//! Source text in, LNJ document out, through every stage.

mod common;

use common::*;
use laad_core::config::CompilerConfig;
use laad_core::features::emit::LnjDocument;
use laad_core::features::templates::paths;
use laad_core::shared::models::{Literal, Primitive, Type};
use laad_core::{compile, Compiler, ErrorKind};
use pretty_assertions::assert_eq;

fn document(source: &str) -> LnjDocument {
    match compile(source) {
        Ok(output) => output.document,
        Err(err) => panic!("failed to compile:\n{source}\n{err}"),
    }
}

fn source_of(doc: &LnjDocument, dst: u32, port: &str) -> u32 {
    doc.edges
        .iter()
        .find(|e| e.to.vertex == dst && e.to.port == port)
        .map(|e| e.from.vertex)
        .unwrap_or_else(|| panic!("{dst}.{port} is unbound"))
}

// ============================================================================
// Basic compilation
// ============================================================================

#[test]
fn test_hello_world() {
    let doc = document(HELLO_WORLD);
    assert_eq!(doc.vertices.len(), 2);
    assert_eq!(doc.edges.len(), 1);

    let literal = &vertices_of(&doc, paths::VALUE)[0];
    assert_eq!(literal.value, Some(Literal::String("Hello, World!".to_string())));
    assert_eq!(literal.type_args, vec![Type::string()]);
    let display = &vertices_of(&doc, "logix.display")[0];
    assert_edge(&doc, literal.id, "value", display.id, "value");
    assert_eq!(doc.edges[0].ty, Some(Type::string()));
}

#[test]
fn test_output_is_deterministic() {
    let source = independent_sums(12);
    let first = compile(&source).unwrap().to_json(false).unwrap();
    let second = compile(&source).unwrap().to_json(false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let source = independent_sums(24);
    let mut parallel = CompilerConfig::default();
    parallel.inference.min_parallel_components = 1;
    let mut sequential = CompilerConfig::default();
    sequential.inference.parallel = false;

    let a = Compiler::new(parallel).compile(&source).unwrap();
    let b = Compiler::new(sequential).compile(&source).unwrap();
    assert_eq!(a.document, b.document);
}

#[test]
fn test_impulse_chain_sequenced() {
    let doc = document(&log_chain(3));
    assert_class_count(&doc, "logix.actions.log", 3);
    let l0 = vertex_named(&doc, "l0").unwrap().id;
    let l1 = vertex_named(&doc, "l1").unwrap().id;
    assert_edge(&doc, l0, "next", l1, "trigger");
    assert_edges_closed(&doc);
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_same_type_conditional_is_single_select() {
    let doc = document(VALUE_CONDITIONAL);
    assert_class_count(&doc, paths::CONDITIONAL, 1);
    assert_class_count(&doc, paths::FLOW_IF, 0);
    let select = vertices_of(&doc, paths::CONDITIONAL)[0];
    assert_eq!(select.type_args, vec![Type::int()]);
    let display = vertices_of(&doc, "logix.display")[0];
    assert_edge(&doc, select.id, "result", display.id, "value");
}

#[test]
fn test_object_lub_conditional_is_flow_branch() {
    let doc = document(OBJECT_LUB_CONDITIONAL);
    assert_class_count(&doc, paths::CONDITIONAL, 0);
    assert_class_count(&doc, paths::FLOW_IF, 1);
}

#[test]
fn test_missing_else_conditional_is_flow_branch() {
    let doc = document(MISSING_ELSE_CONDITIONAL);
    assert_class_count(&doc, paths::CONDITIONAL, 0);
    let branch = vertices_of(&doc, paths::FLOW_IF)[0];
    let update = vertex_named(&doc, "u").unwrap();
    assert_edge(&doc, update.id, "pulse", branch.id, "trigger");
}

#[test]
fn test_nested_value_conditionals_lower_to_selects() {
    for source in [
        "c = true\ny = if c then (if c then 1 else 2) else 3\ny -> display",
        "c = true\nx = if c then 1 else 2\ny = if c then x else 3\ny -> display",
    ] {
        let doc = document(source);
        assert_class_count(&doc, paths::CONDITIONAL, 2);
        assert_class_count(&doc, paths::FLOW_IF, 0);
        assert_edges_closed(&doc);
    }
}

#[test]
fn test_multiline_conditional_needs_end() {
    let err = assert_error_kind(compile(MULTILINE_WITHOUT_END), ErrorKind::Syntax);
    assert!(err.to_string().contains("end"));

    let doc = document(MULTILINE_WITH_END);
    assert_class_count(&doc, paths::CONDITIONAL, 1);
}

#[test]
fn test_conditional_used_as_value_without_else() {
    let err = assert_error_kind(
        compile("c = true\nx = if c then 1\nx -> display"),
        ErrorKind::Type,
    );
    assert!(err.to_string().contains("no else branch"));
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_range_for_lowering() {
    let doc = document(&range_for(0, 5));
    assert_class_count(&doc, paths::FLOW_WHILE, 1);
    assert_class_count(&doc, paths::WRITE, 2);
    assert_class_count(&doc, paths::LT, 1);
    assert_class_count(&doc, paths::ADD, 1);

    let counter = vertex_named(&doc, "i").unwrap();
    assert_eq!(counter.class, paths::LOCAL);
    let looped = vertices_of(&doc, paths::FLOW_WHILE)[0].id;
    let check = vertices_of(&doc, paths::LT)[0].id;
    let increment = vertices_of(&doc, paths::ADD)[0].id;
    let writes = vertices_of(&doc, paths::WRITE);
    let init = writes.iter().find(|w| w.name.ends_with("_init")).unwrap().id;
    let step = writes.iter().find(|w| w.name.ends_with("_step")).unwrap().id;

    // i = 0
    let from = doc.vertex(source_of(&doc, init, "value")).unwrap();
    assert_eq!(from.value, Some(Literal::Int(0)));
    assert_edge(&doc, counter.id, "field", init, "target");
    assert_edge(&doc, init, "next", looped, "trigger");

    // i < 5
    assert_edge(&doc, counter.id, "value", check, "a");
    let to = doc.vertex(source_of(&doc, check, "b")).unwrap();
    assert_eq!(to.value, Some(Literal::Int(5)));
    assert_edge(&doc, check, "result", looped, "condition");

    // i = i + 1, back into the condition
    assert_edge(&doc, counter.id, "value", increment, "a");
    assert_edge(&doc, increment, "result", step, "value");
    assert_edge(&doc, counter.id, "field", step, "target");
    assert_edge(&doc, step, "next", looped, "iterate");

    let log = vertices_of(&doc, "logix.actions.log")[0].id;
    assert_edge(&doc, looped, "body", log, "trigger");
    assert_edge(&doc, log, "next", step, "trigger");
}

#[test]
fn test_while_loop_lowering() {
    let source = "c = true\nu = logix.events.update\nu -> while c {\n  \"tick\" -> logix.actions.log\n}";
    let doc = document(source);
    let looped = vertices_of(&doc, paths::FLOW_WHILE)[0].id;
    let log = vertices_of(&doc, "logix.actions.log")[0].id;
    assert_edge(&doc, looped, "body", log, "trigger");
    assert_edge(&doc, log, "next", looped, "iterate");
    assert_edges_closed(&doc);
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_string_division_is_type_error() {
    let err = assert_error_kind(compile("q = \"a\" / \"b\"\nq -> display"), ErrorKind::Type);
    assert!(err.to_string().contains("numeric"));
}

#[test]
fn test_object_to_numeric_cast_is_type_error() {
    assert_error_kind(
        compile("s = logix.world.root_slot\nn = s as int\nn -> display"),
        ErrorKind::Type,
    );
}

#[test]
fn test_null_needs_nullable_target() {
    assert_error_kind(
        compile("d = logix.actions.destroy\nnull -> d.target"),
        ErrorKind::Type,
    );
    let doc = document("#[nullable]\nd = logix.actions.destroy\nnull -> d.target");
    assert!(vertex_named(&doc, "d").is_some());
}

#[test]
fn test_dummy_ports_take_edge_types() {
    let doc = document("\"a\" -> logix.actions.log\n1 -> logix.actions.log");
    let types: Vec<_> = vertices_of(&doc, "logix.actions.log")
        .iter()
        .map(|v| v.ports.iter().find(|p| p.name == "message").unwrap().ty.clone())
        .collect();
    assert_eq!(types, vec![Type::string(), Type::int()]);
}

// ============================================================================
// Bindings and reachability
// ============================================================================

#[test]
fn test_impulse_fan_out_rejected() {
    let source = "u = logix.events.update\na = logix.actions.log\nb = logix.actions.log\nu -> a\nu -> b";
    let err = assert_error_kind(compile(source), ErrorKind::PortBinding);
    assert!(err.to_string().contains("u.pulse"));
}

#[test]
fn test_required_input_unbound() {
    let source = "s = logix.world.root_slot\nid = logix.references.reference_id\nc = logix.references.compare\ns -> id\nid -> c";
    let err = assert_error_kind(compile(source), ErrorKind::PortBinding);
    assert!(err.to_string().contains("c.b"));
}

#[test]
fn test_unreachable_vertex_still_needs_required_inputs() {
    let err = assert_error_kind(
        compile("n = logix.world.slot_name\nn -> display"),
        ErrorKind::PortBinding,
    );
    assert!(err.to_string().contains("n.slot"));
}

#[test]
fn test_undeclared_identifier() {
    assert_error_kind(compile("ghost -> display"), ErrorKind::Scope);
}

#[test]
fn test_unconnected_vertex_removed_unless_pinned() {
    let doc = document("u = logix.world.local_user\n\"x\" -> display");
    assert!(vertex_named(&doc, "u").is_none());

    let doc = document("#[no_remove]\nu = logix.world.local_user\n\"x\" -> display");
    let user = vertex_named(&doc, "u").unwrap();
    assert_eq!(user.attributes[0].key, "no_remove");
}

// ============================================================================
// Nesting
// ============================================================================

#[test]
fn test_long_operator_chain_compiles() {
    let doc = document(&long_sum(2000));
    assert_class_count(&doc, paths::ADD, 1999);
    let x = vertex_named(&doc, "x").unwrap();
    assert_eq!(x.class, paths::ADD);
    assert_edges_closed(&doc);
}

#[test]
fn test_nesting_limit_is_syntax_error() {
    let err = assert_error_kind(compile(&nested_parens(400)), ErrorKind::Syntax);
    assert!(err.to_string().contains("nesting"));

    let doc = document(&nested_parens(16));
    assert_class_count(&doc, "logix.display", 1);
}

// ============================================================================
// Output and configuration
// ============================================================================

#[test]
fn test_lnj_json_round_trip() {
    let doc = document(&range_for(0, 3));
    for pretty in [false, true] {
        let json = doc.to_json(pretty).unwrap();
        assert_eq!(LnjDocument::from_json(&json).unwrap(), doc);
    }
}

#[test]
fn test_config_from_yaml_drives_compilation() {
    let config = CompilerConfig::from_yaml_str(
        "version: 1\ninference:\n  default_integer: i64\nemit:\n  include_spans: false\n",
    )
    .unwrap();
    let output = Compiler::new(config).compile("x = 1\nx -> display").unwrap();
    let x = vertex_named(&output.document, "x").unwrap();
    assert_eq!(x.type_args, vec![Type::Primitive(Primitive::I64)]);
    assert!(output.document.vertices.iter().all(|v| v.span.is_none()));
}

#[test]
fn test_sweep_disabled_keeps_unconnected_vertices() {
    let config = CompilerConfig::from_yaml_str("reachability:\n  enabled: false").unwrap();
    let output = Compiler::new(config)
        .compile("u = logix.world.local_user\n\"x\" -> display")
        .unwrap();
    assert!(vertex_named(&output.document, "u").is_some());
}
