//! Type lattice
//!
//! `Object` is the root. Below it sit the numeric widening DAG, the other
//! primitives, and the class hierarchy, with `null` below every object
//! reference.

use rustc_hash::FxHashSet;

use crate::shared::models::{ClassHierarchy, Primitive, Type};

/// Least upper bound of a set of types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lub {
    Type(Type),
    /// Only the lattice root is shared
    Object,
    /// Several minimal upper bounds
    Undecidable,
}

/// The primitive and everything it implicitly widens to
fn upper_bounds(p: Primitive) -> FxHashSet<Primitive> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![p];
    while let Some(current) = stack.pop() {
        if seen.insert(current) {
            stack.extend(current.widens_to().iter().copied());
        }
    }
    seen
}

fn primitive_lub(prims: &[Primitive]) -> Lub {
    let mut common = upper_bounds(prims[0]);
    for p in &prims[1..] {
        let bounds = upper_bounds(*p);
        common.retain(|c| bounds.contains(c));
    }
    let minimal: Vec<Primitive> = common
        .iter()
        .copied()
        .filter(|candidate| {
            !common
                .iter()
                .any(|other| other != candidate && upper_bounds(*other).contains(candidate))
        })
        .collect();
    match minimal.as_slice() {
        [] => Lub::Object,
        [single] => Lub::Type(Type::Primitive(*single)),
        _ => Lub::Undecidable,
    }
}

pub fn lub(types: &[Type], classes: &ClassHierarchy) -> Lub {
    let has_reference = types
        .iter()
        .any(|t| matches!(t, Type::ObjectRef(_) | Type::RefId));
    let types: Vec<&Type> = types
        .iter()
        .filter(|t| !(has_reference && **t == Type::Null))
        .collect();

    let Some(first) = types.first() else {
        return Lub::Undecidable;
    };
    if types.iter().all(|t| t == first) {
        return match first {
            Type::Object => Lub::Object,
            other => Lub::Type((*other).clone()),
        };
    }

    let prims: Option<Vec<Primitive>> = types.iter().map(|t| t.as_primitive()).collect();
    if let Some(prims) = prims {
        return primitive_lub(&prims);
    }

    let objects: Option<Vec<&str>> = types
        .iter()
        .map(|t| match t {
            Type::ObjectRef(class) => Some(class.as_str()),
            _ => None,
        })
        .collect();
    if let Some(objects) = objects {
        let mut ancestor = objects[0];
        for class in &objects[1..] {
            match classes.common_ancestor(ancestor, class) {
                Some(shared) => ancestor = shared,
                None => return Lub::Object,
            }
        }
        return Lub::Type(Type::object(ancestor));
    }

    Lub::Object
}

/// Whether a value of type `sub` may flow into a port of type `sup`
pub fn is_assignable(sub: &Type, sup: &Type, classes: &ClassHierarchy) -> bool {
    match (sub, sup) {
        _ if sub == sup => true,
        (Type::Impulse, _) | (_, Type::Impulse) => false,
        (_, Type::Object) => true,
        (Type::ObjectRef(a), Type::ObjectRef(b)) => classes.is_subclass(a, b),
        (Type::Null, Type::ObjectRef(_) | Type::RefId) => true,
        _ => false,
    }
}

/// Whether `logix.operators.cast` can convert `from` into `to`
pub fn can_cast(from: &Type, to: &Type, classes: &ClassHierarchy) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (Type::Impulse, _) | (_, Type::Impulse) => false,
        (Type::Primitive(a), Type::Primitive(b)) if a.is_numeric() && b.is_numeric() => true,
        (Type::Primitive(Primitive::Char), Type::Primitive(p))
        | (Type::Primitive(p), Type::Primitive(Primitive::Char)) => p.is_integral(),
        (_, Type::Primitive(Primitive::String)) => true,
        (Type::ObjectRef(a), Type::ObjectRef(b)) => {
            classes.is_subclass(a, b) || classes.is_subclass(b, a)
        }
        (Type::ObjectRef(_), Type::Object) | (Type::Object, Type::ObjectRef(_)) => true,
        (Type::Null, Type::ObjectRef(_) | Type::RefId) => true,
        _ => false,
    }
}
