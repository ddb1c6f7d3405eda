// Graph Builder - Main Entry Point
//
// Two passes over the program:
// 1. Class prepass: register top-level class definitions so class names are
//    usable as types anywhere in the program
// 2. Statement walk: imports, node definitions and connection chains in
//    source order, with one lexical scope per `{ ... }` block

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::edge_resolver::{self, Endpoint};
use crate::config::InferenceConfig;
use crate::errors::{CompileError, Result};
use crate::features::attributes::AttributeRegistry;
use crate::features::parsing::domain::ast::{
    Block, ClassDef, Expr, ExprKind, Ident, IfExpr, Import, NodeBinding, NodeDef, NodePath,
    Program, Statement, TypeName,
};
use crate::features::parsing::MAX_NESTING;
use crate::features::templates::{self, paths, NodeTemplate};
use crate::shared::models::{
    ArmBody, BlockChain, ConditionalRole, Graph, Literal, Port, PortDirection, PortKind, Span,
    SugarKind, SugarMeta, Type, TypeClass, TypeParam, Vertex, VertexClass, VertexId,
};
use crate::shared::ScopeStack;

pub struct GraphBuilder<'a> {
    attributes: &'a AttributeRegistry,
    config: &'a InferenceConfig,
    graph: Graph,
    scopes: ScopeStack<Endpoint>,
    /// Import alias -> template path or namespace
    aliases: FxHashMap<String, String>,
    /// Flow statements of each open block, innermost last
    blocks: Vec<Vec<BlockChain>>,
    anonymous: u32,
    depth: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(attributes: &'a AttributeRegistry, config: &'a InferenceConfig) -> Self {
        Self {
            attributes,
            config,
            graph: Graph::new(),
            scopes: ScopeStack::new(),
            aliases: FxHashMap::default(),
            blocks: Vec::new(),
            anonymous: 0,
            depth: 0,
        }
    }

    pub fn build(mut self, program: &Program) -> Result<Graph> {
        self.declare_classes(&program.statements)?;
        self.statements(&program.statements)?;
        debug!(
            vertices = self.graph.vertex_count(),
            edges = self.graph.edge_count(),
            "graph built"
        );
        Ok(self.graph)
    }

    // ============================================================
    // Classes
    // ============================================================

    fn declare_classes(&mut self, statements: &[Statement]) -> Result<()> {
        let classes: Vec<(&NodeDef, &ClassDef)> = statements
            .iter()
            .filter_map(|s| match s {
                Statement::NodeDef(d) => match &d.binding {
                    NodeBinding::Class(c) => Some((d, c)),
                    _ => None,
                },
                _ => None,
            })
            .collect();

        for (def, class) in &classes {
            let parent = class.extends.as_ref().map(|e| e.name.as_str());
            if !self.graph.classes.declare(&def.name.name, parent) {
                return Err(CompileError::scope(
                    def.name.span,
                    format!("class `{}` is already defined", def.name.name),
                ));
            }
        }
        for (_, class) in &classes {
            if let Some(parent) = &class.extends {
                if !self.graph.classes.contains(&parent.name) {
                    return Err(CompileError::scope(
                        parent.span,
                        format!("unknown base class `{}`", parent.name),
                    ));
                }
            }
        }
        if let Some(name) = self.graph.classes.find_cycle() {
            let span = classes
                .iter()
                .find(|(d, _)| d.name.name == name)
                .map(|(d, _)| d.span)
                .unwrap_or_default();
            return Err(CompileError::scope(
                span,
                format!("inheritance cycle through class `{}`", name),
            ));
        }
        Ok(())
    }

    fn class_instance(&mut self, name: &Ident, class: &ClassDef, span: Span) -> Result<Endpoint> {
        let mut ports: Vec<Port> = Vec::with_capacity(class.ports.len() + 1);
        for decl in &class.ports {
            let port_name = &decl.name.name;
            if port_name == "self" || ports.iter().any(|p| &p.name == port_name) {
                return Err(CompileError::scope(
                    decl.name.span,
                    format!("port `{}` is already defined on `{}`", port_name, name.name),
                ));
            }
            let ty = self.resolve_type(&decl.ty)?;
            ports.push(match (decl.direction, ty) {
                (PortDirection::In, Type::Impulse) => Port::impulse_in(port_name),
                (PortDirection::Out, Type::Impulse) => Port::impulse_out(port_name),
                (PortDirection::In, ty) => Port::input(port_name, ty),
                (PortDirection::Out, ty) => Port::output(port_name, ty),
            });
        }
        ports.push(Port::output("self", Type::object(&name.name)));

        let vertex = Vertex::new(
            &name.name,
            VertexClass::Class(name.name.clone()),
            ports,
            span,
        );
        Ok(Endpoint::vertex(self.graph.add_vertex(vertex)))
    }

    fn resolve_type(&self, name: &TypeName) -> Result<Type> {
        let args = name
            .args
            .iter()
            .map(|a| self.resolve_type(a))
            .collect::<Result<Vec<_>>>()?;
        Type::from_name(&name.name, &args, &self.graph.classes)
            .ok_or_else(|| CompileError::scope(name.span, format!("unknown type `{}`", name)))
    }

    // ============================================================
    // Statements
    // ============================================================

    /// Lower statements in order; returns the endpoint of the last one when
    /// it is an expression
    fn statements(&mut self, statements: &[Statement]) -> Result<Option<Endpoint>> {
        let mut last = None;
        for statement in statements {
            match statement {
                Statement::Comment { .. } => {}
                Statement::Import(import) => {
                    self.import(import)?;
                    last = None;
                }
                Statement::NodeDef(def) => {
                    self.node_def(def)?;
                    last = None;
                }
                Statement::Expression(expr) => {
                    last = Some(self.statement_expr(expr)?);
                }
            }
        }
        Ok(last)
    }

    fn statement_expr(&mut self, expr: &Expr) -> Result<Endpoint> {
        if expr.is_flow() {
            let (endpoint, chain) = self.flow(expr)?;
            if let Some(block) = self.blocks.last_mut() {
                block.push(BlockChain { vertices: chain });
            }
            Ok(endpoint)
        } else {
            self.expr(expr)
        }
    }

    fn import(&mut self, import: &Import) -> Result<()> {
        let target = import.path.dotted();
        if !templates::has_namespace(&target) {
            return Err(CompileError::scope(
                import.path.span,
                format!("unknown template `{}`", target),
            ));
        }
        let alias = match &import.alias {
            Some(alias) => alias.name.clone(),
            None => import
                .path
                .segments
                .last()
                .map(|s| s.name.clone())
                .unwrap_or_default(),
        };
        if self.aliases.contains_key(&alias) {
            return Err(CompileError::scope(
                import.span,
                format!("import alias `{}` is already defined", alias),
            ));
        }
        trace!(alias = %alias, target = %target, "import");
        self.aliases.insert(alias, target);
        Ok(())
    }

    fn node_def(&mut self, def: &NodeDef) -> Result<()> {
        let name = &def.name.name;
        if self.scopes.is_declared_here(name) {
            return Err(CompileError::scope(
                def.name.span,
                format!("`{}` is already defined in this scope", name),
            ));
        }
        for attr in &def.attributes {
            self.attributes.validate(attr)?;
        }

        let first_new = self.graph.slot_count();
        let endpoint = match &def.binding {
            NodeBinding::Class(class) => self.class_instance(&def.name, class, def.span)?,
            NodeBinding::Path(path) => self.reference(path)?,
            NodeBinding::Expression(expr) => self.statement_expr(expr)?,
        };
        let annotation = match &def.annotation {
            Some(ty) => Some(self.resolve_type(ty)?),
            None => None,
        };

        if let Some(vertex) = self.graph.vertex_mut(endpoint.vertex) {
            if endpoint.vertex.index() >= first_new && vertex.name.starts_with("__") {
                vertex.name = name.clone();
            }
            vertex.attributes.extend(def.attributes.iter().cloned());
            if annotation.is_some() {
                vertex.annotation = annotation;
            }
        }
        self.scopes.declare(name.clone(), endpoint);
        Ok(())
    }

    /// Lower a block in its own scope; returns its flow chains and the
    /// endpoint of its trailing expression
    fn block(&mut self, block: &Block) -> Result<(ArmBody, Option<Endpoint>)> {
        self.scopes.push();
        self.blocks.push(Vec::new());
        let result = self.statements(&block.statements);
        let chains = self.blocks.pop().unwrap_or_default();
        self.scopes.pop();
        Ok((ArmBody { chains }, result?))
    }

    // ============================================================
    // Expressions
    // ============================================================

    fn anonymous_name(&mut self, stem: &str) -> String {
        self.anonymous += 1;
        format!("__{}{}", stem, self.anonymous)
    }

    fn template(&self, path: &str, span: Span) -> Result<&'static NodeTemplate> {
        templates::lookup(path)
            .ok_or_else(|| CompileError::scope(span, format!("unknown template `{}`", path)))
    }

    fn instantiate(&mut self, template: &NodeTemplate, span: Span) -> VertexId {
        let stem = template.path.rsplit('.').next().unwrap_or(template.path);
        let name = self.anonymous_name(stem);
        self.graph.add_vertex(template.instantiate(name, span))
    }

    fn connect(&mut self, src: &Endpoint, dst: &Endpoint, span: Span) -> Result<()> {
        let edge = edge_resolver::resolve(&self.graph, src, dst, span)?;
        self.graph.add_edge(edge);
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<Endpoint> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::syntax(
                expr.span,
                format!("expression nesting exceeds {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let endpoint = self.lower_expr(expr);
        self.depth -= 1;
        endpoint
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<Endpoint> {
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal(literal, expr.span),
            ExprKind::Path(path) => self.reference(path),
            ExprKind::Cast { expr: inner, ty } => {
                let source = self.expr(inner)?;
                let target = self.resolve_type(ty)?;
                let template = self.template(paths::CAST, expr.span)?;
                let id = self.instantiate(template, expr.span);
                if let Some(param) = self.graph.vertex_mut(id).and_then(|v| v.params.get_mut(1)) {
                    param.bound = Some(target);
                }
                self.connect(&source, &Endpoint::port(id, "a"), inner.span)?;
                Ok(Endpoint::vertex(id))
            }
            ExprKind::Unary { op, operand } => {
                let a = self.expr(operand)?;
                let template = self.template(op.template(), expr.span)?;
                let id = self.instantiate(template, expr.span);
                self.connect(&a, &Endpoint::port(id, "a"), operand.span)?;
                Ok(Endpoint::vertex(id))
            }
            ExprKind::Binary { .. } => self.binary_chain(expr),
            ExprKind::Connection(elements) => Ok(self.connection(elements)?.0),
            ExprKind::If(conditional) => self.conditional(conditional, expr.span),
            ExprKind::While { condition, body } => self.while_loop(condition, body, expr.span),
            ExprKind::RangeFor {
                var,
                from,
                to,
                body,
            } => self.range_for(var, from, to, body, expr.span),
            ExprKind::GenericFor {
                start,
                condition,
                end,
                body,
            } => self.generic_for(start, condition, end, body, expr.span),
        }
    }

    /// Operator chains nest on the left (`a + b + c`), so walk the left
    /// spine with a loop and only recurse into right operands
    fn binary_chain(&mut self, expr: &Expr) -> Result<Endpoint> {
        let mut spine = Vec::new();
        let mut leftmost = expr;
        while let ExprKind::Binary { lhs, .. } = &leftmost.kind {
            spine.push(leftmost);
            leftmost = &**lhs;
        }

        let mut acc = self.expr(leftmost)?;
        for node in spine.into_iter().rev() {
            let ExprKind::Binary { op, lhs, rhs } = &node.kind else {
                continue;
            };
            let b = self.expr(rhs)?;
            let template = self.template(op.template(), node.span)?;
            let id = self.instantiate(template, node.span);
            self.connect(&acc, &Endpoint::port(id, "a"), lhs.span)?;
            self.connect(&b, &Endpoint::port(id, "b"), rhs.span)?;
            acc = Endpoint::vertex(id);
        }
        Ok(acc)
    }

    /// Lower a flow expression; returns its endpoint and the vertices that
    /// make up its chain
    fn flow(&mut self, expr: &Expr) -> Result<(Endpoint, Vec<VertexId>)> {
        match &expr.kind {
            ExprKind::Connection(elements) => self.connection(elements),
            _ => {
                let endpoint = self.expr(expr)?;
                let chain = vec![endpoint.vertex];
                Ok((endpoint, chain))
            }
        }
    }

    fn connection(&mut self, elements: &[Expr]) -> Result<(Endpoint, Vec<VertexId>)> {
        let mut chain = Vec::with_capacity(elements.len());
        let mut previous: Option<Endpoint> = None;
        for element in elements {
            let next = self.expr(element)?;
            if let Some(prev) = &previous {
                self.connect(prev, &next, element.span)?;
            }
            chain.push(next.vertex);
            previous = Some(self.as_source(next));
        }
        previous
            .map(|endpoint| (endpoint, chain))
            .ok_or_else(|| CompileError::syntax(Span::zero(), "empty connection chain"))
    }

    /// A `node.input` that received the previous link feeds the next one
    /// from the node's default output
    fn as_source(&self, endpoint: Endpoint) -> Endpoint {
        let is_input = endpoint.port.as_deref().is_some_and(|port| {
            self.graph
                .vertex(endpoint.vertex)
                .and_then(|v| v.port(port))
                .is_some_and(|p| p.is_input())
        });
        if is_input {
            Endpoint::vertex(endpoint.vertex)
        } else {
            endpoint
        }
    }

    fn literal(&mut self, literal: &Literal, span: Span) -> Result<Endpoint> {
        let path = match literal {
            Literal::Null => paths::NULL,
            _ => paths::VALUE,
        };
        let template = self.template(path, span)?;
        let id = self.instantiate(template, span);
        let param = match literal {
            Literal::Int(_) => {
                Some(TypeParam::new(TypeClass::NUMERIC).with_default(self.config.integer_type()))
            }
            Literal::Float(_) => Some(
                TypeParam::new(TypeClass::FRACTIONAL_ONLY).with_default(self.config.float_type()),
            ),
            Literal::Bool(_) | Literal::String(_) => literal
                .fixed_type()
                .map(|ty| TypeParam::new(TypeClass::EQUATABLE).bound_to(ty)),
            Literal::Null => None,
        };
        if let Some(vertex) = self.graph.vertex_mut(id) {
            vertex.value = Some(literal.clone());
            if let Some(param) = param {
                vertex.params = vec![param];
            }
        }
        Ok(Endpoint::vertex(id))
    }

    /// Resolve a dotted path: a declared node (optionally `.port`), then an
    /// import alias, then a template path (absolute or relative to `logix`)
    fn reference(&mut self, path: &NodePath) -> Result<Endpoint> {
        if let Some(endpoint) = self.scopes.lookup(path.head()).cloned() {
            return match path.segments.as_slice() {
                [_] => Ok(endpoint),
                [_, port] if endpoint.port.is_none() => {
                    let has_port = self
                        .graph
                        .vertex(endpoint.vertex)
                        .is_some_and(|v| v.port(&port.name).is_some());
                    if !has_port {
                        return Err(CompileError::scope(
                            port.span,
                            format!("`{}` has no port `{}`", path.head(), port.name),
                        ));
                    }
                    Ok(Endpoint::port(endpoint.vertex, port.name.clone()))
                }
                _ => Err(CompileError::scope(
                    path.span,
                    format!("`{}` does not name a node or port", path.dotted()),
                )),
            };
        }

        let template = self.resolve_template(path)?;
        let id = self.instantiate(template, path.span);
        Ok(Endpoint::vertex(id))
    }

    fn resolve_template(&self, path: &NodePath) -> Result<&'static NodeTemplate> {
        if let Some(prefix) = self.aliases.get(path.head()) {
            let rest: Vec<&str> = path.segments[1..].iter().map(|s| s.name.as_str()).collect();
            let full = if rest.is_empty() {
                prefix.clone()
            } else {
                format!("{}.{}", prefix, rest.join("."))
            };
            if let Some(template) = templates::lookup(&full) {
                return Ok(template);
            }
        }
        let dotted = path.dotted();
        if let Some(template) = templates::lookup(&dotted)
            .or_else(|| templates::lookup(&format!("{}.{}", paths::ROOT, dotted)))
        {
            return Ok(template);
        }
        let message = if path.segments.len() == 1 {
            format!("undeclared identifier `{}`", dotted)
        } else {
            format!("unknown template `{}`", dotted)
        };
        Err(CompileError::scope(path.span, message))
    }

    // ============================================================
    // Control flow (sugar vertices)
    // ============================================================

    fn sugar(
        &mut self,
        kind: SugarKind,
        ports: Vec<Port>,
        params: Vec<TypeParam>,
        span: Span,
    ) -> VertexId {
        let id = self.graph.reserve();
        let mut vertex = Vertex::new(
            format!("__{}{}", kind.as_str(), id.0),
            VertexClass::Sugar(kind),
            ports,
            span,
        );
        vertex.params = params;
        self.graph.insert(id, vertex);
        id
    }

    fn set_sugar(&mut self, id: VertexId, meta: SugarMeta) {
        if let Some(vertex) = self.graph.vertex_mut(id) {
            vertex.sugar = Some(meta);
        }
    }

    fn conditional(&mut self, conditional: &IfExpr, span: Span) -> Result<Endpoint> {
        let mut ports = vec![Port::impulse_in("trigger"), Port::impulse_out("next")];
        for i in 0..conditional.branches.len() {
            ports.push(Port::input(format!("cond{}", i), Type::bool()));
            ports.push(Port::input(format!("arm{}", i), Type::Dummy).optional());
        }
        if conditional.otherwise.is_some() {
            ports.push(Port::input("else", Type::Dummy).optional());
        }
        ports.push(Port::output("value", Type::Param(0)));
        let id = self.sugar(
            SugarKind::Conditional,
            ports,
            vec![TypeParam::new(TypeClass::EQUATABLE)],
            span,
        );

        let mut arms = Vec::with_capacity(conditional.branches.len());
        for (i, (condition, block)) in conditional.branches.iter().enumerate() {
            let c = self.expr(condition)?;
            self.connect(&c, &Endpoint::port(id, format!("cond{}", i)), condition.span)?;
            arms.push(self.arm(block, id, &format!("arm{}", i))?);
        }
        let otherwise = match &conditional.otherwise {
            Some(block) => Some(self.arm(block, id, "else")?),
            None => None,
        };

        self.set_sugar(
            id,
            SugarMeta::Conditional {
                arms,
                otherwise,
                role: ConditionalRole::Pending,
            },
        );
        Ok(Endpoint::vertex(id))
    }

    /// Lower one arm; its trailing expression, if it yields data, feeds the
    /// conditional's arm port
    fn arm(&mut self, block: &Block, id: VertexId, port: &str) -> Result<ArmBody> {
        let (body, value) = self.block(block)?;
        if let Some(value) = value {
            if self.yields_data(&value) {
                self.connect(&value, &Endpoint::port(id, port), block.span)?;
            }
        }
        Ok(body)
    }

    fn yields_data(&self, endpoint: &Endpoint) -> bool {
        let Some(vertex) = self.graph.vertex(endpoint.vertex) else {
            return false;
        };
        match &endpoint.port {
            Some(port) => vertex
                .port(port)
                .is_some_and(|p| p.is_output() && p.kind == PortKind::Data),
            None => vertex
                .first_port(PortDirection::Out, PortKind::Data)
                .is_some(),
        }
    }

    fn while_loop(&mut self, condition: &Expr, body: &Block, span: Span) -> Result<Endpoint> {
        let ports = vec![
            Port::impulse_in("trigger"),
            Port::input("condition", Type::bool()),
            Port::impulse_out("after"),
        ];
        let id = self.sugar(SugarKind::While, ports, Vec::new(), span);

        let c = self.expr(condition)?;
        self.connect(&c, &Endpoint::port(id, "condition"), condition.span)?;
        let (body, _) = self.block(body)?;

        self.set_sugar(id, SugarMeta::While { body });
        Ok(Endpoint::vertex(id))
    }

    fn range_for(
        &mut self,
        var: &Ident,
        from: &Expr,
        to: &Expr,
        body: &Block,
        span: Span,
    ) -> Result<Endpoint> {
        let ports = vec![
            Port::impulse_in("trigger"),
            Port::input("from", Type::Param(0)),
            Port::input("to", Type::Param(0)),
            Port::input("counter", Type::Param(0)).optional(),
            Port::impulse_out("after"),
        ];
        let param = TypeParam::new(TypeClass::NUMERIC).with_default(self.config.integer_type());
        let id = self.sugar(SugarKind::RangeFor, ports, vec![param], span);

        let start = self.expr(from)?;
        self.connect(&start, &Endpoint::port(id, "from"), from.span)?;
        let end = self.expr(to)?;
        self.connect(&end, &Endpoint::port(id, "to"), to.span)?;

        self.scopes.push();
        self.blocks.push(Vec::new());
        let result = self.range_body(id, var, body);
        let chains = self.blocks.pop().unwrap_or_default();
        self.scopes.pop();
        let counter = result?;

        self.set_sugar(
            id,
            SugarMeta::RangeFor {
                counter,
                body: ArmBody { chains },
            },
        );
        Ok(Endpoint::vertex(id))
    }

    /// Declare the induction variable in the body scope, then lower the body
    fn range_body(&mut self, id: VertexId, var: &Ident, body: &Block) -> Result<VertexId> {
        let template = self.template(paths::LOCAL, var.span)?;
        let counter = self
            .graph
            .add_vertex(template.instantiate(&var.name, var.span));
        self.scopes.declare(var.name.clone(), Endpoint::vertex(counter));
        self.connect(
            &Endpoint::port(counter, "value"),
            &Endpoint::port(id, "counter"),
            var.span,
        )?;
        self.statements(&body.statements)?;
        Ok(counter)
    }

    fn generic_for(
        &mut self,
        start: &Expr,
        condition: &Expr,
        end: &Expr,
        body: &Block,
        span: Span,
    ) -> Result<Endpoint> {
        let ports = vec![
            Port::impulse_in("trigger"),
            Port::input("condition", Type::bool()),
            Port::impulse_out("after"),
        ];
        let id = self.sugar(SugarKind::GenericFor, ports, Vec::new(), span);

        self.scopes.push();
        let result = self.generic_for_parts(id, start, condition, end, body);
        self.scopes.pop();
        let (start, end, body) = result?;

        self.set_sugar(id, SugarMeta::GenericFor { start, end, body });
        Ok(Endpoint::vertex(id))
    }

    fn generic_for_parts(
        &mut self,
        id: VertexId,
        start: &Expr,
        condition: &Expr,
        end: &Expr,
        body: &Block,
    ) -> Result<(ArmBody, ArmBody, ArmBody)> {
        let (_, start_chain) = self.flow(start)?;
        let c = self.expr(condition)?;
        self.connect(&c, &Endpoint::port(id, "condition"), condition.span)?;
        let (_, end_chain) = self.flow(end)?;
        let (body, _) = self.block(body)?;
        Ok((
            ArmBody {
                chains: vec![BlockChain {
                    vertices: start_chain,
                }],
            },
            ArmBody {
                chains: vec![BlockChain {
                    vertices: end_chain,
                }],
            },
            body,
        ))
    }
}

/// Build the graph IR for a parsed program
pub fn build(
    program: &Program,
    attributes: &AttributeRegistry,
    config: &InferenceConfig,
) -> Result<Graph> {
    GraphBuilder::new(attributes, config).build(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::features::parsing::parse;

    fn build_source(source: &str) -> Result<Graph> {
        let program = parse(source)?;
        build(&program, &AttributeRegistry::new(), &InferenceConfig::default())
    }

    fn edge_labels(graph: &Graph) -> Vec<String> {
        graph
            .edges()
            .iter()
            .map(|e| {
                let src = graph.vertex(e.src).map(|v| v.name.as_str()).unwrap_or("?");
                let dst = graph.vertex(e.dst).map(|v| v.name.as_str()).unwrap_or("?");
                format!("{}.{}->{}.{}", src, e.src_port, dst, e.dst_port)
            })
            .collect()
    }

    #[test]
    fn test_hello_world_chain() {
        let graph = build_source("\"Hello, World!\" -> display").unwrap();
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(edge_labels(&graph), vec!["__value1.value->__display2.value"]);
        assert_eq!(graph.edges()[0].kind, PortKind::Data);
    }

    #[test]
    fn test_impulse_and_data_into_same_sink() {
        let source = "log = logix.actions.log\nu = logix.events.update\nu -> log\n\"hi\" -> log";
        let graph = build_source(source).unwrap();
        let labels = edge_labels(&graph);
        assert_eq!(labels[0], "u.pulse->log.trigger");
        assert_eq!(graph.edges()[0].kind, PortKind::Impulse);
        assert!(labels[1].ends_with("->log.message"));
    }

    #[test]
    fn test_named_literal_takes_definition_name() {
        let graph = build_source("x = 5\nx -> logix.display").unwrap();
        let x = graph.find_by_name("x").unwrap();
        assert_eq!(x.value, Some(Literal::Int(5)));
        assert_eq!(x.params[0].default, Some(Type::int()));
        assert!(x.params[0].bound.is_none());
    }

    #[test]
    fn test_import_alias() {
        let graph =
            build_source("import logix.operators as ops\nx = ops.add\ny = 1 -> x.a").unwrap();
        assert!(graph.find_by_name("x").is_some_and(|v| v.is_template("logix.operators.add")));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_unknown_import_is_scope_error() {
        let err = build_source("import logix.nothing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scope);
    }

    #[test]
    fn test_duplicate_alias() {
        let err =
            build_source("import logix.operators.add\nimport logix.operators.sub as add").unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = build_source("nothing -> logix.display").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scope);
        assert!(err.to_string().contains("undeclared identifier `nothing`"));
    }

    #[test]
    fn test_duplicate_name_in_scope() {
        let err = build_source("x = 1\nx = 2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scope);
    }

    #[test]
    fn test_shadowing_in_block() {
        let source = "c = true\nx = 1\nwhile c {\n  x = 2\n  x -> logix.display\n}";
        let graph = build_source(source).unwrap();
        assert_eq!(graph.find_by_template("logix.input.value").count(), 3);
    }

    #[test]
    fn test_operator_ports() {
        let graph = build_source("s = 1 + 2").unwrap();
        let labels = edge_labels(&graph);
        assert_eq!(labels, vec!["__value1.value->s.a", "__value2.value->s.b"]);
    }

    #[test]
    fn test_operator_chain_lowered_left_to_right() {
        let graph = build_source("s = 1 + 2 + 3").unwrap();
        assert_eq!(
            edge_labels(&graph),
            vec![
                "__value1.value->__add3.a",
                "__value2.value->__add3.b",
                "__add3.result->s.a",
                "__value4.value->s.b",
            ]
        );

        let long = format!("x = {}\nx -> logix.display", vec!["1"; 1000].join(" + "));
        let graph = build_source(&long).unwrap();
        assert_eq!(graph.find_by_template(paths::ADD).count(), 999);
    }

    #[test]
    fn test_cast_chain_depth_limited() {
        let source = format!("x = 1{}", " as int".repeat(MAX_NESTING + 1));
        let err = build_source(&source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_cast_target_bound() {
        let graph = build_source("f = 1 as float").unwrap();
        let f = graph.find_by_name("f").unwrap();
        assert_eq!(f.params[1].bound, Some(Type::float()));
    }

    #[test]
    fn test_annotation_recorded() {
        let graph = build_source("x: long = 3").unwrap();
        let x = graph.find_by_name("x").unwrap();
        assert_eq!(x.annotation, Some(Type::Primitive(crate::shared::models::Primitive::I64)));
    }

    #[test]
    fn test_unknown_type() {
        let err = build_source("x: Widget = 3").unwrap_err();
        assert!(err.to_string().contains("unknown type `Widget`"));
    }

    #[test]
    fn test_class_instance_ports() {
        let source = "Door = class extends Slot {\n  in open: bool\n  out state: string\n}";
        let graph = build_source(source).unwrap();
        let door = graph.find_by_name("Door").unwrap();
        let names: Vec<_> = door.ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["open", "state", "self"]);
        assert!(graph.classes.is_subclass("Door", "IWorldElement"));
    }

    #[test]
    fn test_class_names_usable_before_definition() {
        let source = "x: Door = logix.world.root_slot\nDoor = class extends Slot {\n}";
        assert!(build_source(source).is_ok());
    }

    #[test]
    fn test_unknown_base_class() {
        let err = build_source("A = class extends Missing {\n}").unwrap_err();
        assert!(err.to_string().contains("unknown base class"));
    }

    #[test]
    fn test_inheritance_cycle() {
        let err = build_source("A = class extends B {\n}\nB = class extends A {\n}").unwrap_err();
        assert!(err.to_string().contains("inheritance cycle"));
    }

    #[test]
    fn test_explicit_port_selection() {
        let source = "seq = logix.flow.sequence\nu = logix.events.update\nu -> seq\nseq.second -> logix.actions.log";
        let graph = build_source(source).unwrap();
        let labels = edge_labels(&graph);
        assert!(labels[1].starts_with("seq.second->"));
        assert!(labels[1].ends_with(".trigger"));
    }

    #[test]
    fn test_port_of_unknown_name() {
        let err = build_source("d = logix.display\n1 -> d.nothing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scope);
    }

    #[test]
    fn test_conditional_sugar_ports() {
        let graph = build_source("c = true\nx = if c then 1 elseif c then 2 else 3").unwrap();
        let x = graph.find_by_name("x").unwrap();
        assert_eq!(x.sugar_kind(), Some(SugarKind::Conditional));
        for port in ["cond0", "arm0", "cond1", "arm1", "else"] {
            assert!(graph.is_bound(x.id, port), "{}", port);
        }
        assert_eq!(x.conditional_role(), Some(ConditionalRole::Pending));
    }

    #[test]
    fn test_statement_arm_has_no_value_edge() {
        let source = "c = true\nu = logix.events.update\nu -> if c then \"a\" -> logix.actions.log end";
        let graph = build_source(source).unwrap();
        let sugar = graph
            .vertices()
            .find(|v| v.sugar_kind() == Some(SugarKind::Conditional))
            .unwrap();
        assert!(!graph.is_bound(sugar.id, "arm0"));
        assert!(graph.is_bound(sugar.id, "trigger"));
    }

    #[test]
    fn test_range_for_declares_counter_in_body_scope() {
        let source = "u = logix.events.update\nu -> for (i in 0..10) {\n  i -> logix.actions.log\n}\ni -> logix.display";
        let err = build_source(source).unwrap_err();
        assert!(err.to_string().contains("undeclared identifier `i`"));
    }

    #[test]
    fn test_range_for_metadata() {
        let source = "u = logix.events.update\nu -> for (i in 0..3) {\n  i -> logix.actions.log\n}";
        let graph = build_source(source).unwrap();
        let sugar = graph
            .vertices()
            .find(|v| v.sugar_kind() == Some(SugarKind::RangeFor))
            .unwrap();
        let Some(SugarMeta::RangeFor { counter, body }) = &sugar.sugar else {
            panic!("expected range-for metadata");
        };
        assert_eq!(graph.vertex(*counter).map(|v| v.name.as_str()), Some("i"));
        assert_eq!(body.chains.len(), 1);
        assert!(graph.is_bound(sugar.id, "counter"));
    }

    #[test]
    fn test_sugar_is_not_positional_data_target() {
        let err = build_source("c = true\n1 -> while c {\n}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PortBinding);
    }

    #[test]
    fn test_attributes_attached() {
        let graph = build_source("#[no_remove]\nu = logix.world.local_user").unwrap();
        assert!(graph.find_by_name("u").unwrap().has_attribute("no_remove"));
    }

    #[test]
    fn test_attribute_validation() {
        let err = build_source("#[no_remove(x = 1)]\nu = logix.world.local_user").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}
