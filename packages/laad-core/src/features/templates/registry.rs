//! Built-in node templates
//!
//! Every dotted path a program may instantiate, with its ports and type
//! parameters. Port schemas refer to parameters with `Type::Param(i)`;
//! `Type::Dummy` ports are generic per connection.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::shared::models::{
    Port, Primitive, Span, Type, TypeClass, TypeParam, Vertex, VertexClass,
};

/// Paths the compiler itself instantiates
pub mod paths {
    /// Namespace single-segment names resolve against
    pub const ROOT: &str = "logix";
    pub const FLOW_IF: &str = "logix.flow.if";
    pub const FLOW_WHILE: &str = "logix.flow.while";
    pub const WRITE: &str = "logix.actions.write";
    pub const LOCAL: &str = "logix.variables.local";
    pub const VALUE: &str = "logix.input.value";
    pub const NULL: &str = "logix.input.null";
    pub const CONDITIONAL: &str = "logix.operators.conditional";
    pub const CAST: &str = "logix.operators.cast";
    pub const LT: &str = "logix.operators.lt";
    pub const ADD: &str = "logix.operators.add";
}

#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub path: &'static str,
    pub ports: Vec<Port>,
    pub params: Vec<TypeParam>,
}

impl NodeTemplate {
    fn new(path: &'static str) -> Self {
        Self {
            path,
            ports: Vec::new(),
            params: Vec::new(),
        }
    }

    fn param(mut self, class: TypeClass) -> Self {
        self.params.push(TypeParam::new(class));
        self
    }

    fn impulse_in(mut self, name: &str) -> Self {
        self.ports.push(Port::impulse_in(name));
        self
    }

    fn impulse_out(mut self, name: &str) -> Self {
        self.ports.push(Port::impulse_out(name));
        self
    }

    fn input(mut self, name: &str, ty: Type) -> Self {
        self.ports.push(Port::input(name, ty));
        self
    }

    fn output(mut self, name: &str, ty: Type) -> Self {
        self.ports.push(Port::output(name, ty));
        self
    }

    /// Fresh vertex for this template; the graph assigns its id
    pub fn instantiate(&self, name: impl Into<String>, span: Span) -> Vertex {
        let mut vertex = Vertex::new(
            name,
            VertexClass::Template(self.path.to_string()),
            self.ports.clone(),
            span,
        );
        vertex.params = self.params.clone();
        vertex
    }
}

fn binary(path: &'static str, class: TypeClass, result: Type) -> NodeTemplate {
    NodeTemplate::new(path)
        .param(class)
        .input("a", Type::Param(0))
        .input("b", Type::Param(0))
        .output("result", result)
}

fn unary(path: &'static str, class: TypeClass) -> NodeTemplate {
    NodeTemplate::new(path)
        .param(class)
        .input("a", Type::Param(0))
        .output("result", Type::Param(0))
}

fn builtin_templates() -> Vec<NodeTemplate> {
    let slot = || Type::object("Slot");
    let user = || Type::object("User");

    vec![
        // ═══════════════════════════════════════════════════════════
        // Events (roots)
        // ═══════════════════════════════════════════════════════════
        NodeTemplate::new("logix.events.update").impulse_out("pulse"),
        NodeTemplate::new("logix.events.start").impulse_out("pulse"),
        NodeTemplate::new("logix.events.button")
            .impulse_out("pressed")
            .output("user", user()),
        // ═══════════════════════════════════════════════════════════
        // Flow
        // ═══════════════════════════════════════════════════════════
        NodeTemplate::new(paths::FLOW_IF)
            .impulse_in("trigger")
            .input("condition", Type::bool())
            .impulse_out("true")
            .impulse_out("false"),
        NodeTemplate::new(paths::FLOW_WHILE)
            .impulse_in("trigger")
            .impulse_in("iterate")
            .input("condition", Type::bool())
            .impulse_out("body")
            .impulse_out("after"),
        NodeTemplate::new("logix.flow.sequence")
            .impulse_in("trigger")
            .impulse_out("first")
            .impulse_out("second"),
        // ═══════════════════════════════════════════════════════════
        // Actions and sinks
        // ═══════════════════════════════════════════════════════════
        NodeTemplate::new(paths::WRITE)
            .param(TypeClass::EQUATABLE)
            .impulse_in("trigger")
            .input("target", Type::field(Type::Param(0)))
            .input("value", Type::Param(0))
            .impulse_out("next"),
        NodeTemplate::new("logix.actions.log")
            .impulse_in("trigger")
            .input("message", Type::Dummy)
            .impulse_out("next"),
        NodeTemplate::new("logix.actions.destroy")
            .impulse_in("trigger")
            .input("target", slot())
            .impulse_out("next"),
        NodeTemplate::new("logix.display").input("value", Type::Dummy),
        // ═══════════════════════════════════════════════════════════
        // Variables and constants
        // ═══════════════════════════════════════════════════════════
        NodeTemplate::new(paths::LOCAL)
            .param(TypeClass::EQUATABLE)
            .output("value", Type::Param(0))
            .output("field", Type::field(Type::Param(0))),
        NodeTemplate::new(paths::VALUE)
            .param(TypeClass::EQUATABLE)
            .output("value", Type::Param(0)),
        NodeTemplate::new(paths::NULL).output("value", Type::Null),
        // ═══════════════════════════════════════════════════════════
        // World access
        // ═══════════════════════════════════════════════════════════
        NodeTemplate::new("logix.world.root_slot").output("slot", slot()),
        NodeTemplate::new("logix.world.local_user").output("user", user()),
        NodeTemplate::new("logix.world.slot_name")
            .input("slot", slot())
            .output("name", Type::string()),
        NodeTemplate::new("logix.world.user_name")
            .input("user", user())
            .output("name", Type::string()),
        // ═══════════════════════════════════════════════════════════
        // References
        // ═══════════════════════════════════════════════════════════
        NodeTemplate::new("logix.references.reference_id")
            .input("target", Type::object("IWorldElement"))
            .output("id", Type::RefId),
        NodeTemplate::new("logix.references.compare")
            .input("a", Type::RefId)
            .input("b", Type::RefId)
            .output("equal", Type::bool()),
        // ═══════════════════════════════════════════════════════════
        // Operators
        // ═══════════════════════════════════════════════════════════
        binary(paths::ADD, TypeClass::ADDABLE, Type::Param(0)),
        binary("logix.operators.sub", TypeClass::NUMERIC, Type::Param(0)),
        binary("logix.operators.mul", TypeClass::NUMERIC, Type::Param(0)),
        binary("logix.operators.div", TypeClass::NUMERIC, Type::Param(0)),
        binary("logix.operators.rem", TypeClass::NUMERIC, Type::Param(0)),
        NodeTemplate::new("logix.operators.shl")
            .param(TypeClass::INTEGRAL_ONLY)
            .input("a", Type::Param(0))
            .input("b", Type::Primitive(Primitive::I32))
            .output("result", Type::Param(0)),
        NodeTemplate::new("logix.operators.shr")
            .param(TypeClass::INTEGRAL_ONLY)
            .input("a", Type::Param(0))
            .input("b", Type::Primitive(Primitive::I32))
            .output("result", Type::Param(0)),
        binary("logix.operators.and", TypeClass::LOGICAL, Type::Param(0)),
        binary("logix.operators.or", TypeClass::LOGICAL, Type::Param(0)),
        binary("logix.operators.xor", TypeClass::LOGICAL, Type::Param(0)),
        NodeTemplate::new("logix.operators.logical_and")
            .input("a", Type::bool())
            .input("b", Type::bool())
            .output("result", Type::bool()),
        NodeTemplate::new("logix.operators.logical_or")
            .input("a", Type::bool())
            .input("b", Type::bool())
            .output("result", Type::bool()),
        binary(paths::LT, TypeClass::COMPARABLE, Type::bool()),
        binary("logix.operators.le", TypeClass::COMPARABLE, Type::bool()),
        binary("logix.operators.gt", TypeClass::COMPARABLE, Type::bool()),
        binary("logix.operators.ge", TypeClass::COMPARABLE, Type::bool()),
        binary("logix.operators.eq", TypeClass::EQUATABLE, Type::bool()),
        binary("logix.operators.ne", TypeClass::EQUATABLE, Type::bool()),
        binary("logix.operators.spaceship", TypeClass::COMPARABLE, Type::int()),
        unary("logix.operators.neg", TypeClass::NUMERIC),
        unary("logix.operators.not", TypeClass::LOGICAL),
        NodeTemplate::new(paths::CONDITIONAL)
            .param(TypeClass::EQUATABLE)
            .input("condition", Type::bool())
            .input("on_true", Type::Param(0))
            .input("on_false", Type::Param(0))
            .output("result", Type::Param(0)),
        NodeTemplate::new(paths::CAST)
            .param(TypeClass::EQUATABLE)
            .param(TypeClass::EQUATABLE)
            .input("a", Type::Param(0))
            .output("result", Type::Param(1)),
    ]
}

lazy_static! {
    /// Built-in templates by dotted path
    static ref TEMPLATES: FxHashMap<&'static str, NodeTemplate> = builtin_templates()
        .into_iter()
        .map(|t| (t.path, t))
        .collect();
}

pub fn lookup(path: &str) -> Option<&'static NodeTemplate> {
    TEMPLATES.get(path)
}

pub fn exists(path: &str) -> bool {
    TEMPLATES.contains_key(path)
}

/// True when `prefix` names a template or a namespace containing one
pub fn has_namespace(prefix: &str) -> bool {
    exists(prefix)
        || TEMPLATES
            .keys()
            .any(|p| p.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.')))
}

/// All template paths, sorted
pub fn all_paths() -> Vec<&'static str> {
    let mut paths: Vec<_> = TEMPLATES.keys().copied().collect();
    paths.sort_unstable();
    paths
}
