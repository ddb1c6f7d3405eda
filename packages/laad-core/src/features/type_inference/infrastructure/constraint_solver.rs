//! Constraint-Based Type Inference
//!
//! Hindley-Milner style unification over port types.
//!
//! - Equality constraints unify two types
//! - Subtype constraints accept class upcasts and `null` into references
//!   between concrete types, and unify otherwise
//! - Variables carry a type class; merging intersects classes, binding
//!   checks the class admits the type
//! - Occurs check on every binding
//!
//! One solver instance covers one connected component.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::type_inference::domain::lattice::is_assignable;
use crate::shared::models::{ClassHierarchy, Type, TypeClass};

/// Type variable ID
pub type TypeVarId = u32;

/// Type constraint kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// T1 = T2
    Equality(InferType, InferType),

    /// T1 <: T2 (value of T1 flows into a slot of T2)
    Subtype(InferType, InferType),
}

/// Inference type (type with variables)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InferType {
    Concrete(Type),
    Variable(TypeVarId),
    /// `Field<T>` whose element type is still open
    Field(Box<InferType>),
}

impl InferType {
    /// Get all free type variables
    pub fn free_vars(&self) -> FxHashSet<TypeVarId> {
        let mut vars = FxHashSet::default();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut FxHashSet<TypeVarId>) {
        match self {
            InferType::Variable(id) => {
                vars.insert(*id);
            }
            InferType::Field(inner) => inner.collect_vars(vars),
            InferType::Concrete(_) => {}
        }
    }
}

/// Substitution map: TypeVar → InferType
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: FxHashMap<TypeVarId, InferType>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, var: TypeVarId, ty: InferType) {
        self.map.insert(var, ty);
    }

    pub fn get(&self, var: TypeVarId) -> Option<&InferType> {
        self.map.get(&var)
    }

    /// Apply substitution to a type, folding closed fields into concrete types
    pub fn apply(&self, ty: &InferType) -> InferType {
        // variable chains grow with operator chains; follow them in a loop
        let mut current = ty;
        while let InferType::Variable(id) = current {
            match self.get(*id) {
                Some(substituted) => current = substituted,
                None => return current.clone(),
            }
        }
        match current {
            InferType::Field(inner) => match self.apply(inner) {
                InferType::Concrete(t) => InferType::Concrete(Type::field(t)),
                open => InferType::Field(Box::new(open)),
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct VarInfo {
    class: TypeClass,
    default: Option<Type>,
}

/// Constraint solver
pub struct ConstraintSolver<'h> {
    classes: &'h ClassHierarchy,
    vars: Vec<VarInfo>,
    constraints: Vec<Constraint>,
    substitution: Substitution,
    /// Variables that received `null`; settled once everything else is known
    deferred_nulls: Vec<InferType>,
}

impl<'h> ConstraintSolver<'h> {
    pub fn new(classes: &'h ClassHierarchy) -> Self {
        Self {
            classes,
            vars: Vec::new(),
            constraints: Vec::new(),
            substitution: Substitution::new(),
            deferred_nulls: Vec::new(),
        }
    }

    /// Generate a fresh type variable
    pub fn fresh_var(&mut self, class: TypeClass, default: Option<Type>) -> TypeVarId {
        let id = self.vars.len() as TypeVarId;
        self.vars.push(VarInfo { class, default });
        id
    }

    pub fn var_count(&self) -> u32 {
        self.vars.len() as u32
    }

    /// Add a constraint
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Solve all pending constraints
    pub fn solve(&mut self) -> Result<(), SolverError> {
        let constraints = std::mem::take(&mut self.constraints);
        for constraint in constraints {
            match constraint {
                Constraint::Equality(t1, t2) => self.unify(t1, t2)?,
                Constraint::Subtype(sub, sup) => self.solve_subtype(sub, sup)?,
            }
        }
        Ok(())
    }

    pub fn resolve(&self, ty: &InferType) -> InferType {
        self.substitution.apply(ty)
    }

    pub fn is_resolved(&self, ty: &InferType) -> bool {
        matches!(self.resolve(ty), InferType::Concrete(_))
    }

    /// Concrete type, or `Generic` for whatever is still open
    pub fn to_type(&self, ty: &InferType) -> Type {
        match self.resolve(ty) {
            InferType::Concrete(t) => t,
            InferType::Variable(id) => Type::Generic(id),
            InferType::Field(inner) => Type::field(self.to_type(&inner)),
        }
    }

    /// Bind the variable's representative to its literal default, if any
    pub fn apply_default(&mut self, var: TypeVarId) -> Result<bool, SolverError> {
        let InferType::Variable(root) = self.resolve(&InferType::Variable(var)) else {
            return Ok(false);
        };
        match self.vars[root as usize].default.clone() {
            Some(ty) => {
                self.bind(root, InferType::Concrete(ty))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply defaults to every open variable that has one
    pub fn apply_defaults(&mut self) -> Result<(), SolverError> {
        for var in 0..self.var_count() {
            self.apply_default(var)?;
        }
        Ok(())
    }

    /// Give `null` to variables nothing else fixed, and check the rest
    /// accept it
    pub fn settle_nulls(&mut self) -> Result<(), SolverError> {
        for target in std::mem::take(&mut self.deferred_nulls) {
            match self.resolve(&target) {
                InferType::Variable(id) => self.bind(id, InferType::Concrete(Type::Null))?,
                InferType::Concrete(t) if is_assignable(&Type::Null, &t, self.classes) => {}
                other => {
                    return Err(SolverError::TypeMismatch {
                        expected: self.to_type(&other),
                        found: Type::Null,
                    })
                }
            }
        }
        Ok(())
    }

    fn bind(&mut self, var: TypeVarId, ty: InferType) -> Result<(), SolverError> {
        if ty.free_vars().contains(&var) {
            return Err(SolverError::OccursCheck(var, self.to_type(&ty)));
        }
        let class = self.vars[var as usize].class;
        let admitted = match &ty {
            InferType::Concrete(t) => class.admits(t),
            InferType::Field(_) => class.admits(&Type::field(Type::Object)),
            InferType::Variable(_) => true,
        };
        if !admitted {
            return Err(SolverError::ClassViolation {
                ty: self.to_type(&ty),
                class,
            });
        }
        self.substitution.insert(var, ty);
        Ok(())
    }

    /// Merge `from` into `into`, intersecting classes
    fn merge(&mut self, from: TypeVarId, into: TypeVarId) -> Result<(), SolverError> {
        let left = self.vars[from as usize].clone();
        let right = self.vars[into as usize].clone();
        let class = left.class.meet(right.class);
        if class.is_empty() {
            return Err(SolverError::ClassConflict {
                left: left.class,
                right: right.class,
            });
        }
        let default = [right.default, left.default]
            .into_iter()
            .flatten()
            .find(|d| class.admits(d));
        self.vars[into as usize] = VarInfo { class, default };
        self.substitution.insert(from, InferType::Variable(into));
        Ok(())
    }

    /// Unify two types (W algorithm)
    fn unify(&mut self, t1: InferType, t2: InferType) -> Result<(), SolverError> {
        let t1 = self.resolve(&t1);
        let t2 = self.resolve(&t2);

        match (t1, t2) {
            (InferType::Variable(a), InferType::Variable(b)) if a == b => Ok(()),
            (InferType::Variable(a), InferType::Variable(b)) => self.merge(a, b),
            (InferType::Variable(id), t) | (t, InferType::Variable(id)) => self.bind(id, t),
            (InferType::Concrete(a), InferType::Concrete(b)) => {
                if a == b {
                    Ok(())
                } else {
                    Err(SolverError::TypeMismatch {
                        expected: b,
                        found: a,
                    })
                }
            }
            (InferType::Field(a), InferType::Field(b)) => self.unify(*a, *b),
            (InferType::Field(a), InferType::Concrete(Type::Field(b))) => {
                self.unify(*a, InferType::Concrete(*b))
            }
            (InferType::Concrete(Type::Field(a)), InferType::Field(b)) => {
                self.unify(InferType::Concrete(*a), *b)
            }
            (found, expected) => Err(SolverError::TypeMismatch {
                expected: self.to_type(&expected),
                found: self.to_type(&found),
            }),
        }
    }

    /// Solve subtype constraint: sub <: sup
    fn solve_subtype(&mut self, sub: InferType, sup: InferType) -> Result<(), SolverError> {
        let sub = self.resolve(&sub);
        let sup = self.resolve(&sup);

        match (&sub, &sup) {
            (InferType::Concrete(a), InferType::Concrete(b)) => {
                if is_assignable(a, b, self.classes) {
                    Ok(())
                } else {
                    Err(SolverError::TypeMismatch {
                        expected: b.clone(),
                        found: a.clone(),
                    })
                }
            }
            (InferType::Concrete(Type::Null), InferType::Variable(_)) => {
                self.deferred_nulls.push(sup);
                Ok(())
            }
            _ => self.unify(sub, sup),
        }
    }
}

/// Solver errors
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Type mismatch during unification
    TypeMismatch { expected: Type, found: Type },

    /// Occurs check failed (infinite type)
    OccursCheck(TypeVarId, Type),

    /// A type outside the variable's class
    ClassViolation { ty: Type, class: TypeClass },

    /// Two variables whose classes share no type
    ClassConflict { left: TypeClass, right: TypeClass },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            SolverError::OccursCheck(var, ty) => {
                write!(f, "infinite type: 't{} occurs in {}", var, ty)
            }
            SolverError::ClassViolation { ty, class } => {
                write!(f, "{} is not {}", ty, class)
            }
            SolverError::ClassConflict { left, right } => {
                write!(f, "no type is both {} and {}", left, right)
            }
        }
    }
}

impl std::error::Error for SolverError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Primitive;

    fn var(id: TypeVarId) -> InferType {
        InferType::Variable(id)
    }

    fn concrete(t: Type) -> InferType {
        InferType::Concrete(t)
    }

    #[test]
    fn test_fresh_var() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        assert_eq!(solver.fresh_var(TypeClass::ANY, None), 0);
        assert_eq!(solver.fresh_var(TypeClass::ANY, None), 1);
    }

    #[test]
    fn test_unify_variables() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let v1 = solver.fresh_var(TypeClass::ANY, None);
        let v2 = solver.fresh_var(TypeClass::ANY, None);

        solver.add_constraint(Constraint::Equality(var(v1), concrete(Type::int())));
        solver.add_constraint(Constraint::Equality(var(v2), var(v1)));
        solver.solve().unwrap();

        assert_eq!(solver.to_type(&var(v2)), Type::int());
    }

    #[test]
    fn test_occurs_check() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let v1 = solver.fresh_var(TypeClass::ANY, None);

        solver.add_constraint(Constraint::Equality(
            var(v1),
            InferType::Field(Box::new(var(v1))),
        ));
        assert!(matches!(solver.solve(), Err(SolverError::OccursCheck(..))));
    }

    #[test]
    fn test_class_violation() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let v = solver.fresh_var(TypeClass::NUMERIC, None);
        solver.add_constraint(Constraint::Subtype(concrete(Type::string()), var(v)));
        let err = solver.solve().unwrap_err();
        assert_eq!(err.to_string(), "string is not a numeric type");
    }

    #[test]
    fn test_merge_intersects_classes_and_keeps_admitted_default() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let int_lit = solver.fresh_var(TypeClass::NUMERIC, Some(Type::int()));
        let float_lit = solver.fresh_var(TypeClass::FRACTIONAL_ONLY, Some(Type::float()));
        solver.add_constraint(Constraint::Equality(var(int_lit), var(float_lit)));
        solver.solve().unwrap();
        solver.apply_defaults().unwrap();
        assert_eq!(solver.to_type(&var(int_lit)), Type::float());
    }

    #[test]
    fn test_class_conflict() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let a = solver.fresh_var(TypeClass::FRACTIONAL_ONLY, None);
        let b = solver.fresh_var(TypeClass::LOGICAL, None);
        solver.add_constraint(Constraint::Equality(var(a), var(b)));
        assert!(matches!(solver.solve(), Err(SolverError::ClassConflict { .. })));
    }

    #[test]
    fn test_subtype_class_hierarchy() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        solver.add_constraint(Constraint::Subtype(
            concrete(Type::object("Slot")),
            concrete(Type::object("IWorldElement")),
        ));
        assert!(solver.solve().is_ok());

        solver.add_constraint(Constraint::Subtype(
            concrete(Type::object("IWorldElement")),
            concrete(Type::object("Slot")),
        ));
        assert!(matches!(solver.solve(), Err(SolverError::TypeMismatch { .. })));
    }

    #[test]
    fn test_field_unification() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let v = solver.fresh_var(TypeClass::EQUATABLE, None);
        solver.add_constraint(Constraint::Equality(
            InferType::Field(Box::new(var(v))),
            concrete(Type::field(Type::Primitive(Primitive::F64))),
        ));
        solver.solve().unwrap();
        assert_eq!(solver.to_type(&var(v)), Type::Primitive(Primitive::F64));
        assert_eq!(
            solver.to_type(&InferType::Field(Box::new(var(v)))),
            Type::field(Type::Primitive(Primitive::F64))
        );
    }

    #[test]
    fn test_null_deferred_until_settled() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let v = solver.fresh_var(TypeClass::EQUATABLE, None);
        solver.add_constraint(Constraint::Subtype(concrete(Type::Null), var(v)));
        solver.add_constraint(Constraint::Subtype(concrete(Type::object("Slot")), var(v)));
        solver.solve().unwrap();
        solver.settle_nulls().unwrap();
        assert_eq!(solver.to_type(&var(v)), Type::object("Slot"));
    }

    #[test]
    fn test_null_into_primitive_rejected() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let v = solver.fresh_var(TypeClass::EQUATABLE, None);
        solver.add_constraint(Constraint::Subtype(concrete(Type::Null), var(v)));
        solver.add_constraint(Constraint::Equality(var(v), concrete(Type::int())));
        solver.solve().unwrap();
        assert!(solver.settle_nulls().is_err());
    }

    #[test]
    fn test_unresolved_is_generic() {
        let h = ClassHierarchy::new();
        let mut solver = ConstraintSolver::new(&h);
        let a = solver.fresh_var(TypeClass::ANY, None);
        let b = solver.fresh_var(TypeClass::ANY, None);
        solver.add_constraint(Constraint::Equality(var(a), var(b)));
        solver.solve().unwrap();
        assert_eq!(solver.to_type(&var(a)), Type::Generic(b));
    }
}
