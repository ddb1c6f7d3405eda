//! Inference engine
//!
//! Per connected component:
//! 1. one variable per vertex type parameter, seeded with known bounds and
//!    annotations
//! 2. one `src <: dst` constraint per data edge, with a fresh variable for
//!    each `dummy` port at each connection site
//! 3. conditional classification worklist (value or statement role)
//! 4. literal defaults, `null` placement and cast checks
//!
//! Edges leaving a conditional's `value` port stay out of the solver until
//! the conditional's role is known.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use petgraph::unionfind::UnionFind;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use super::constraint_solver::{Constraint, ConstraintSolver, InferType, SolverError, TypeVarId};
use crate::config::InferenceConfig;
use crate::errors::{CompileError, Result, TypeConflict};
use crate::features::templates::paths;
use crate::features::type_inference::domain::lattice::{can_cast, lub, Lub};
use crate::shared::models::{
    ConditionalRole, Edge, Graph, PortDirection, PortKind, Span, SugarKind, SugarMeta, Type,
    TypeClass, Vertex, VertexId,
};

/// Vertices and edge indices of one connected component
#[derive(Debug, Clone, Default)]
struct Component {
    vertices: Vec<VertexId>,
    edges: Vec<usize>,
}

/// Solved types of one component, with component-local generic ids
#[derive(Debug, Default)]
struct ComponentSolution {
    params: Vec<(VertexId, Vec<Type>)>,
    edge_types: Vec<(usize, Type)>,
    roles: Vec<(VertexId, ConditionalRole)>,
    var_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceSummary {
    pub components: usize,
    pub parallel: bool,
    pub value_conditionals: usize,
    pub statement_conditionals: usize,
}

enum Decision {
    Value(Type),
    Statement(&'static str),
}

pub struct InferenceEngine<'a> {
    config: &'a InferenceConfig,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(config: &'a InferenceConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, graph: &mut Graph) -> Result<InferenceSummary> {
        let components = partition(graph);
        let parallel = cfg!(feature = "parallel")
            && self.config.parallel
            && components.len() >= self.config.min_parallel_components;
        debug!(components = components.len(), parallel, "type inference");

        let results = if parallel {
            solve_parallel(graph, &components)
        } else {
            components.iter().map(|c| solve_component(graph, c)).collect()
        };
        // First error in component order wins
        let solutions = results.into_iter().collect::<Result<Vec<_>>>()?;

        let mut summary = InferenceSummary {
            components: components.len(),
            parallel,
            ..Default::default()
        };
        let mut offset = 0u32;
        for solution in solutions {
            for (id, types) in solution.params {
                if let Some(vertex) = graph.vertex_mut(id) {
                    for (param, ty) in vertex.params.iter_mut().zip(types) {
                        param.bound = Some(shift_generics(&ty, offset));
                    }
                }
            }
            for (index, ty) in solution.edge_types {
                if let Some(edge) = graph.edges_mut().get_mut(index) {
                    edge.ty = Some(shift_generics(&ty, offset));
                }
            }
            for (id, decided) in solution.roles {
                match decided {
                    ConditionalRole::Value => summary.value_conditionals += 1,
                    _ => summary.statement_conditionals += 1,
                }
                if let Some(SugarMeta::Conditional { role, .. }) =
                    graph.vertex_mut(id).and_then(|v| v.sugar.as_mut())
                {
                    *role = decided;
                }
            }
            offset += solution.var_count;
        }
        Ok(summary)
    }
}

/// Infer types for the whole graph
pub fn infer(graph: &mut Graph, config: &InferenceConfig) -> Result<InferenceSummary> {
    InferenceEngine::new(config).run(graph)
}

#[cfg(feature = "parallel")]
fn solve_parallel(graph: &Graph, components: &[Component]) -> Vec<Result<ComponentSolution>> {
    components
        .par_iter()
        .map(|c| solve_component(graph, c))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn solve_parallel(graph: &Graph, components: &[Component]) -> Vec<Result<ComponentSolution>> {
    components.iter().map(|c| solve_component(graph, c)).collect()
}

/// Connected components over all edges, ordered by smallest vertex id
fn partition(graph: &Graph) -> Vec<Component> {
    let mut sets = UnionFind::<usize>::new(graph.slot_count());
    for edge in graph.edges() {
        sets.union(edge.src.index(), edge.dst.index());
    }

    let mut index_of_root: FxHashMap<usize, usize> = FxHashMap::default();
    let mut components: Vec<Component> = Vec::new();
    for vertex in graph.vertices() {
        let root = sets.find(vertex.id.index());
        let index = *index_of_root.entry(root).or_insert_with(|| {
            components.push(Component::default());
            components.len() - 1
        });
        components[index].vertices.push(vertex.id);
    }
    for (i, edge) in graph.edges().iter().enumerate() {
        if let Some(&index) = index_of_root.get(&sets.find(edge.src.index())) {
            components[index].edges.push(i);
        }
    }
    components
}

fn shift_generics(ty: &Type, offset: u32) -> Type {
    match ty {
        Type::Generic(id) => Type::Generic(id + offset),
        Type::Field(inner) => Type::field(shift_generics(inner, offset)),
        other => other.clone(),
    }
}

fn edge_label(graph: &Graph, edge: &Edge) -> String {
    let name = |id: VertexId| graph.vertex(id).map(|v| v.name.as_str()).unwrap_or("?");
    format!(
        "{}.{} -> {}.{}",
        name(edge.src),
        edge.src_port,
        name(edge.dst),
        edge.dst_port
    )
}

fn edge_error(graph: &Graph, edge: &Edge, err: SolverError) -> CompileError {
    let label = edge_label(graph, edge);
    match err {
        SolverError::TypeMismatch { expected, found } => CompileError::type_conflict(
            edge.span,
            format!("cannot connect {}: expected {}, found {}", label, expected, found),
            TypeConflict {
                edge: Some(label),
                expected,
                found,
            },
        ),
        other => CompileError::type_error(edge.span, format!("on {}: {}", label, other)),
    }
}

fn vertex_error(vertex: &Vertex, err: SolverError) -> CompileError {
    match err {
        SolverError::TypeMismatch { expected, found } => CompileError::type_conflict(
            vertex.span,
            format!("`{}`: expected {}, found {}", vertex.name, expected, found),
            TypeConflict {
                edge: None,
                expected,
                found,
            },
        ),
        other => CompileError::type_error(vertex.span, format!("`{}`: {}", vertex.name, other)),
    }
}

fn solve_component(graph: &Graph, component: &Component) -> Result<ComponentSolution> {
    let mut solver = ComponentSolver::new(graph);
    solver.seed(component)?;
    solver.constrain_edges(component)?;
    solver.classify_conditionals(component)?;
    solver.finish(component)
}

struct ComponentSolver<'g> {
    graph: &'g Graph,
    solver: ConstraintSolver<'g>,
    param_vars: FxHashMap<VertexId, Vec<TypeVarId>>,
    /// Source-side type of each solved data edge
    edge_types: FxHashMap<usize, InferType>,
    /// Destination-side type of each conditional arm port
    arm_types: FxHashMap<(VertexId, String), InferType>,
    /// Edges leaving a conditional's value port, held back until its role is known
    deferred: FxHashMap<VertexId, Vec<usize>>,
    released: FxHashSet<VertexId>,
    roles: Vec<(VertexId, ConditionalRole)>,
}

impl<'g> ComponentSolver<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            solver: ConstraintSolver::new(&graph.classes),
            param_vars: FxHashMap::default(),
            edge_types: FxHashMap::default(),
            arm_types: FxHashMap::default(),
            deferred: FxHashMap::default(),
            released: FxHashSet::default(),
            roles: Vec::new(),
        }
    }

    fn vertex(&self, id: VertexId) -> Result<&'g Vertex> {
        self.graph.vertex(id).ok_or_else(|| {
            CompileError::type_error(Span::zero(), format!("edge touches removed vertex {}", id))
        })
    }

    /// Port schema with parameters replaced by the vertex's variables and a
    /// fresh variable for each `dummy`
    fn instantiate(&mut self, vertex: &Vertex, schema: &Type) -> InferType {
        match schema {
            Type::Param(i) => match self
                .param_vars
                .get(&vertex.id)
                .and_then(|vars| vars.get(*i as usize))
            {
                Some(var) => InferType::Variable(*var),
                None => InferType::Variable(self.solver.fresh_var(TypeClass::EQUATABLE, None)),
            },
            Type::Dummy => InferType::Variable(self.solver.fresh_var(TypeClass::EQUATABLE, None)),
            Type::Field(inner) => match self.instantiate(vertex, inner) {
                InferType::Concrete(t) => InferType::Concrete(Type::field(t)),
                open => InferType::Field(Box::new(open)),
            },
            other => InferType::Concrete(other.clone()),
        }
    }

    fn port_type(&mut self, vertex: &Vertex, port: &str) -> InferType {
        let schema = vertex
            .port(port)
            .map(|p| p.ty.clone())
            .unwrap_or(Type::Dummy);
        self.instantiate(vertex, &schema)
    }

    /// Parameter variables, known bounds and annotations
    fn seed(&mut self, component: &Component) -> Result<()> {
        for &id in &component.vertices {
            let vertex = self.vertex(id)?;
            let vars: Vec<TypeVarId> = vertex
                .params
                .iter()
                .map(|p| self.solver.fresh_var(p.class, p.default.clone()))
                .collect();
            for (var, param) in vars.iter().zip(&vertex.params) {
                if let Some(bound) = &param.bound {
                    self.solver.add_constraint(Constraint::Equality(
                        InferType::Variable(*var),
                        InferType::Concrete(bound.clone()),
                    ));
                }
            }
            self.param_vars.insert(id, vars);
            self.solver.solve().map_err(|e| vertex_error(vertex, e))?;

            if let Some(annotation) = &vertex.annotation {
                let Some(port) = vertex.first_port(PortDirection::Out, PortKind::Data) else {
                    return Err(CompileError::type_error(
                        vertex.span,
                        format!("`{}` has no data output to annotate", vertex.name),
                    ));
                };
                let declared = self.port_type(vertex, &port.name);
                self.solver.add_constraint(Constraint::Equality(
                    declared,
                    InferType::Concrete(annotation.clone()),
                ));
                self.solver.solve().map_err(|e| vertex_error(vertex, e))?;
            }
        }
        Ok(())
    }

    fn constrain_edges(&mut self, component: &Component) -> Result<()> {
        for &index in &component.edges {
            let edge = &self.graph.edges()[index];
            if edge.kind == PortKind::Impulse {
                self.edge_types
                    .insert(index, InferType::Concrete(Type::Impulse));
                continue;
            }
            let src = self.vertex(edge.src)?;
            if src.sugar_kind() == Some(SugarKind::Conditional) && edge.src_port == "value" {
                self.deferred.entry(src.id).or_default().push(index);
                continue;
            }
            self.constrain_edge(index)?;
        }
        Ok(())
    }

    fn constrain_edge(&mut self, index: usize) -> Result<()> {
        let edge = &self.graph.edges()[index];
        let src = self.vertex(edge.src)?;
        let dst = self.vertex(edge.dst)?;
        let src_ty = self.port_type(src, &edge.src_port);
        let dst_ty = self.port_type(dst, &edge.dst_port);

        self.edge_types.insert(index, src_ty.clone());
        if dst.sugar_kind() == Some(SugarKind::Conditional)
            && (edge.dst_port.starts_with("arm") || edge.dst_port == "else")
        {
            // A null arm is settled late, so record it as null for the join
            let arm = match self.solver.resolve(&src_ty) {
                InferType::Concrete(Type::Null) => InferType::Concrete(Type::Null),
                _ => dst_ty.clone(),
            };
            self.arm_types.insert((dst.id, edge.dst_port.clone()), arm);
        }

        self.solver
            .add_constraint(Constraint::Subtype(src_ty, dst_ty));
        self.solver
            .solve()
            .map_err(|e| edge_error(self.graph, edge, e))
    }

    fn release(&mut self, conditional: VertexId) -> Result<()> {
        if !self.released.insert(conditional) {
            return Ok(());
        }
        let edges = self.deferred.get(&conditional).cloned().unwrap_or_default();
        trace!(vertex = %conditional, edges = edges.len(), "releasing conditional value edges");
        for index in edges {
            self.constrain_edge(index)?;
        }
        Ok(())
    }

    fn value_var(&self, conditional: VertexId) -> Option<InferType> {
        self.param_vars
            .get(&conditional)
            .and_then(|vars| vars.first())
            .map(|var| InferType::Variable(*var))
    }

    fn arm_ports(vertex: &Vertex) -> Vec<String> {
        vertex
            .ports
            .iter()
            .filter(|p| p.is_input() && (p.name.starts_with("arm") || p.name == "else"))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Conditional whose held-back value edge binds `port` of `vertex`
    fn pending_arm_source(&self, vertex: VertexId, port: &str) -> Option<VertexId> {
        self.deferred
            .iter()
            .filter(|(src, _)| !self.released.contains(*src))
            .find(|(_, edges)| {
                edges.iter().any(|&i| {
                    let edge = &self.graph.edges()[i];
                    edge.dst == vertex && edge.dst_port == port
                })
            })
            .map(|(src, _)| *src)
    }

    /// Decide the role if enough is known; `None` while arm types are open
    fn classify(&self, vertex: &Vertex) -> Option<Decision> {
        let Some(SugarMeta::Conditional { otherwise, .. }) = &vertex.sugar else {
            return Some(Decision::Statement("it is not a conditional"));
        };
        if otherwise.is_none() {
            return Some(Decision::Statement("it has no else branch"));
        }
        if self.graph.is_bound(vertex.id, "trigger") || self.graph.is_driven(vertex.id, "next") {
            return Some(Decision::Statement("it consumes an impulse"));
        }

        let mut types = Vec::new();
        for port in Self::arm_ports(vertex) {
            let Some(arm) = self.arm_types.get(&(vertex.id, port.clone())) else {
                if self.pending_arm_source(vertex.id, &port).is_some() {
                    return None;
                }
                return Some(Decision::Statement("a branch yields no value"));
            };
            match self.solver.resolve(arm) {
                InferType::Concrete(t) => types.push(t),
                _ => return None,
            }
        }
        match lub(&types, &self.graph.classes) {
            Lub::Type(t) => Some(Decision::Value(t)),
            Lub::Object => Some(Decision::Statement(
                "its branches share no type other than object",
            )),
            Lub::Undecidable => Some(Decision::Statement(
                "its branches have no unique common type",
            )),
        }
    }

    fn decide(&mut self, vertex: &Vertex, decision: Decision) -> Result<()> {
        match decision {
            Decision::Value(ty) => {
                trace!(vertex = %vertex.id, ty = %ty, "value conditional");
                if let Some(value) = self.value_var(vertex.id) {
                    self.solver
                        .add_constraint(Constraint::Subtype(InferType::Concrete(ty), value));
                    self.solver.solve().map_err(|e| vertex_error(vertex, e))?;
                }
                self.release(vertex.id)?;
                self.roles.push((vertex.id, ConditionalRole::Value));
            }
            Decision::Statement(reason) => {
                trace!(vertex = %vertex.id, reason, "statement conditional");
                if self.deferred.get(&vertex.id).is_some_and(|e| !e.is_empty()) {
                    return Err(CompileError::type_error(
                        vertex.span,
                        format!(
                            "conditional is used as a value, but {} so it can only be a statement",
                            reason
                        ),
                    ));
                }
                self.roles.push((vertex.id, ConditionalRole::Statement));
            }
        }
        Ok(())
    }

    /// Unblock a stalled conditional: first infer its type from downstream,
    /// then from nested conditionals feeding its arms, then push it into open
    /// arms, then fall back to literal defaults.
    /// Returns false when nothing more can be learned.
    fn unstick(&mut self, vertex: &Vertex) -> Result<bool> {
        if !self.released.contains(&vertex.id) {
            self.release(vertex.id)?;
            return Ok(true);
        }

        let upstream: Vec<VertexId> = Self::arm_ports(vertex)
            .iter()
            .filter_map(|port| self.pending_arm_source(vertex.id, port))
            .collect();
        if !upstream.is_empty() {
            for conditional in upstream {
                self.release(conditional)?;
            }
            return Ok(true);
        }

        let open_arms: Vec<InferType> = Self::arm_ports(vertex)
            .into_iter()
            .filter_map(|port| self.arm_types.get(&(vertex.id, port)).cloned())
            .filter(|arm| !self.solver.is_resolved(arm))
            .collect();
        if open_arms.is_empty() {
            return Ok(false);
        }

        let value = self.value_var(vertex.id);
        if let Some(value) = value.filter(|v| self.solver.is_resolved(v)) {
            for arm in open_arms {
                self.solver
                    .add_constraint(Constraint::Equality(arm, value.clone()));
            }
            self.solver.solve().map_err(|e| vertex_error(vertex, e))?;
            return Ok(true);
        }

        let mut changed = false;
        for arm in open_arms {
            if let InferType::Variable(var) = self.solver.resolve(&arm) {
                changed |= self
                    .solver
                    .apply_default(var)
                    .map_err(|e| vertex_error(vertex, e))?;
            }
        }
        Ok(changed)
    }

    fn classify_conditionals(&mut self, component: &Component) -> Result<()> {
        let mut pending: Vec<VertexId> = component
            .vertices
            .iter()
            .copied()
            .filter(|id| {
                self.graph
                    .vertex(*id)
                    .is_some_and(|v| v.sugar_kind() == Some(SugarKind::Conditional))
            })
            .collect();

        while !pending.is_empty() {
            let mut progress = false;
            let mut waiting = Vec::with_capacity(pending.len());
            for id in pending {
                let vertex = self.vertex(id)?;
                match self.classify(vertex) {
                    Some(decision) => {
                        self.decide(vertex, decision)?;
                        progress = true;
                    }
                    None => waiting.push(id),
                }
            }
            pending = waiting;
            if progress || pending.is_empty() {
                continue;
            }

            let first = self.vertex(pending[0])?;
            if !self.unstick(first)? {
                self.decide(first, Decision::Statement("its branch types cannot be determined"))?;
                pending.remove(0);
            }
        }
        Ok(())
    }

    fn finish(mut self, component: &Component) -> Result<ComponentSolution> {
        let anchor = component
            .vertices
            .first()
            .and_then(|id| self.graph.vertex(*id))
            .map(|v| v.span)
            .unwrap_or_default();
        self.solver
            .apply_defaults()
            .map_err(|e| CompileError::type_error(anchor, e.to_string()))?;
        self.check_nulls(component)?;
        self.solver
            .settle_nulls()
            .map_err(|e| CompileError::type_error(anchor, e.to_string()))?;
        self.check_casts(component)?;

        let mut solution = ComponentSolution::default();
        for &id in &component.vertices {
            if let Some(vars) = self.param_vars.get(&id) {
                if !vars.is_empty() {
                    let types = vars
                        .iter()
                        .map(|v| self.solver.to_type(&InferType::Variable(*v)))
                        .collect();
                    solution.params.push((id, types));
                }
            }
        }
        for &index in &component.edges {
            if let Some(ty) = self.edge_types.get(&index) {
                solution.edge_types.push((index, self.solver.to_type(ty)));
            }
        }
        solution.roles = std::mem::take(&mut self.roles);
        solution.var_count = self.solver.var_count();
        Ok(solution)
    }

    /// `null` may only reach per-connection generic ports and `#[nullable]`
    /// vertices
    fn check_nulls(&self, component: &Component) -> Result<()> {
        for &index in &component.edges {
            let Some(ty) = self.edge_types.get(&index) else {
                continue;
            };
            if self.solver.resolve(ty) != InferType::Concrete(Type::Null) {
                continue;
            }
            let edge = &self.graph.edges()[index];
            let dst = self.vertex(edge.dst)?;
            let accepts = dst.port(&edge.dst_port).is_some_and(|p| p.ty == Type::Dummy)
                || dst.sugar_kind().is_some()
                || dst.nullable;
            if !accepts {
                return Err(CompileError::type_error(
                    edge.span,
                    format!(
                        "null cannot flow into `{}.{}`; mark the node #[nullable]",
                        dst.name, edge.dst_port
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_casts(&self, component: &Component) -> Result<()> {
        for &id in &component.vertices {
            let vertex = self.vertex(id)?;
            if !vertex.is_template(paths::CAST) {
                continue;
            }
            let Some(vars) = self.param_vars.get(&id) else {
                continue;
            };
            let [from, to] = vars.as_slice() else {
                continue;
            };
            let from = self.solver.to_type(&InferType::Variable(*from));
            let to = self.solver.to_type(&InferType::Variable(*to));
            if !from.is_concrete() {
                return Err(CompileError::type_error(
                    vertex.span,
                    format!("cannot determine the source type of cast to {}", to),
                ));
            }
            if !can_cast(&from, &to, &self.graph.classes) {
                return Err(CompileError::type_conflict(
                    vertex.span,
                    format!("cannot cast {} to {}", from, to),
                    TypeConflict {
                        edge: None,
                        expected: to,
                        found: from,
                    },
                ));
            }
        }
        Ok(())
    }
}
