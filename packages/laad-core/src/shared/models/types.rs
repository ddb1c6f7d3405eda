//! Type model
//!
//! Concrete types that may appear on ports and edges, the schema-only
//! placeholders used by node templates (`Param`, `Dummy`), type classes used
//! to restrict generic parameters, and the object class hierarchy.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Primitive value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    Char,
    String,
    Color,
    DateTime,
    Uri,
}

impl Primitive {
    pub const ALL: [Primitive; 17] = [
        Primitive::Bool,
        Primitive::I8,
        Primitive::U8,
        Primitive::I16,
        Primitive::U16,
        Primitive::I32,
        Primitive::U32,
        Primitive::I64,
        Primitive::U64,
        Primitive::F32,
        Primitive::F64,
        Primitive::Decimal,
        Primitive::Char,
        Primitive::String,
        Primitive::Color,
        Primitive::DateTime,
        Primitive::Uri,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::U8 => "u8",
            Primitive::I16 => "i16",
            Primitive::U16 => "u16",
            Primitive::I32 => "i32",
            Primitive::U32 => "u32",
            Primitive::I64 => "i64",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Decimal => "decimal",
            Primitive::Char => "char",
            Primitive::String => "string",
            Primitive::Color => "color",
            Primitive::DateTime => "datetime",
            Primitive::Uri => "uri",
        }
    }

    /// Resolve a source-level type name, including the C#-style aliases
    pub fn from_name(name: &str) -> Option<Self> {
        let p = match name {
            "bool" => Primitive::Bool,
            "i8" | "sbyte" => Primitive::I8,
            "u8" | "byte" => Primitive::U8,
            "i16" | "short" => Primitive::I16,
            "u16" | "ushort" => Primitive::U16,
            "i32" | "int" => Primitive::I32,
            "u32" | "uint" => Primitive::U32,
            "i64" | "long" => Primitive::I64,
            "u64" | "ulong" => Primitive::U64,
            "f32" | "float" => Primitive::F32,
            "f64" | "double" => Primitive::F64,
            "decimal" => Primitive::Decimal,
            "char" => Primitive::Char,
            "string" => Primitive::String,
            "color" => Primitive::Color,
            "datetime" => Primitive::DateTime,
            "uri" => Primitive::Uri,
            _ => return None,
        };
        Some(p)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Primitive::I8
                | Primitive::U8
                | Primitive::I16
                | Primitive::U16
                | Primitive::I32
                | Primitive::U32
                | Primitive::I64
                | Primitive::U64
        )
    }

    pub fn is_fractional(&self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64 | Primitive::Decimal)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_fractional()
    }

    /// Direct successors in the implicit widening order
    pub fn widens_to(&self) -> &'static [Primitive] {
        use Primitive::*;
        match self {
            I8 => &[I16],
            U8 => &[I16, U16],
            I16 => &[I32],
            U16 => &[I32, U32],
            I32 => &[I64],
            U32 => &[I64, U64],
            I64 => &[F32, Decimal],
            U64 => &[F32, Decimal],
            F32 => &[F64],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port and edge types
///
/// `Param` and `Dummy` only occur in port schemas; inference replaces them.
/// `Generic` is an unresolved inference variable left after solving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum Type {
    Primitive(Primitive),
    Impulse,
    /// Reference to an object of the given class
    ObjectRef(String),
    /// Opaque reference handle. Never arithmetic-capable and may dangle.
    RefId,
    /// Writable storage holding a value of the inner type
    Field(Box<Type>),
    Null,
    /// Root of the type lattice
    Object,
    Generic(u32),
    /// The vertex's n-th type parameter
    Param(u8),
    /// Generic per connection site
    Dummy,
}

impl Type {
    pub fn bool() -> Self {
        Type::Primitive(Primitive::Bool)
    }

    pub fn int() -> Self {
        Type::Primitive(Primitive::I32)
    }

    pub fn float() -> Self {
        Type::Primitive(Primitive::F32)
    }

    pub fn string() -> Self {
        Type::Primitive(Primitive::String)
    }

    pub fn object(class: impl Into<String>) -> Self {
        Type::ObjectRef(class.into())
    }

    pub fn field(inner: Type) -> Self {
        Type::Field(Box::new(inner))
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// True when the type contains no variables or schema placeholders
    pub fn is_concrete(&self) -> bool {
        match self {
            Type::Generic(_) | Type::Param(_) | Type::Dummy => false,
            Type::Field(inner) => inner.is_concrete(),
            _ => true,
        }
    }

    /// Types that can hold `null`
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::ObjectRef(_) | Type::RefId | Type::Null)
    }

    /// Parse a source-level type name such as `int`, `Slot` or `Field<float>`
    pub fn from_name(name: &str, args: &[Type], classes: &ClassHierarchy) -> Option<Self> {
        match (name, args) {
            ("Field" | "IField", [inner]) => return Some(Type::field(inner.clone())),
            (_, []) => {}
            _ => return None,
        }
        if let Some(p) = Primitive::from_name(name) {
            return Some(Type::Primitive(p));
        }
        match name {
            "impulse" => Some(Type::Impulse),
            "object" => Some(Type::Object),
            "refid" | "RefID" => Some(Type::RefId),
            _ if classes.contains(name) => Some(Type::object(name)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Impulse => f.write_str("impulse"),
            Type::ObjectRef(class) => f.write_str(class),
            Type::RefId => f.write_str("RefID"),
            Type::Field(inner) => write!(f, "Field<{}>", inner),
            Type::Null => f.write_str("null"),
            Type::Object => f.write_str("object"),
            Type::Generic(v) => write!(f, "'t{}", v),
            Type::Param(i) => write!(f, "T{}", i),
            Type::Dummy => f.write_str("dummy"),
        }
    }
}

// ============================================================
// Type classes
// ============================================================

/// Restriction on the types a generic parameter may take
///
/// Stored as a bitmask over type categories so that merging two variables
/// intersects their classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeClass(u8);

impl TypeClass {
    const INTEGRAL: u8 = 1;
    const FRACTIONAL: u8 = 1 << 1;
    const STRING: u8 = 1 << 2;
    const BOOL: u8 = 1 << 3;
    const CHAR: u8 = 1 << 4;
    const OTHER: u8 = 1 << 5;
    const IMPULSE: u8 = 1 << 6;

    pub const ANY: TypeClass = TypeClass(0x7f);
    pub const NONE: TypeClass = TypeClass(0);
    pub const NUMERIC: TypeClass = TypeClass(Self::INTEGRAL | Self::FRACTIONAL);
    pub const INTEGRAL_ONLY: TypeClass = TypeClass(Self::INTEGRAL);
    pub const FRACTIONAL_ONLY: TypeClass = TypeClass(Self::FRACTIONAL);
    /// Operands of `+`: numbers and string concatenation
    pub const ADDABLE: TypeClass = TypeClass(Self::INTEGRAL | Self::FRACTIONAL | Self::STRING);
    /// Operands of bitwise `& | ^`
    pub const LOGICAL: TypeClass = TypeClass(Self::INTEGRAL | Self::BOOL);
    pub const COMPARABLE: TypeClass = TypeClass(Self::INTEGRAL | Self::FRACTIONAL | Self::CHAR);
    /// Everything except impulses
    pub const EQUATABLE: TypeClass = TypeClass(0x7f & !Self::IMPULSE);

    fn category(ty: &Type) -> u8 {
        match ty {
            Type::Primitive(p) if p.is_integral() => Self::INTEGRAL,
            Type::Primitive(p) if p.is_fractional() => Self::FRACTIONAL,
            Type::Primitive(Primitive::String) => Self::STRING,
            Type::Primitive(Primitive::Bool) => Self::BOOL,
            Type::Primitive(Primitive::Char) => Self::CHAR,
            Type::Impulse => Self::IMPULSE,
            _ => Self::OTHER,
        }
    }

    pub fn admits(&self, ty: &Type) -> bool {
        self.0 & Self::category(ty) != 0
    }

    /// Intersection of two classes
    pub fn meet(self, other: TypeClass) -> TypeClass {
        TypeClass(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn describe(&self) -> &'static str {
        match *self {
            TypeClass::ANY => "any type",
            TypeClass::NUMERIC => "a numeric type",
            TypeClass::INTEGRAL_ONLY => "an integral type",
            TypeClass::FRACTIONAL_ONLY => "a fractional type",
            TypeClass::ADDABLE => "a numeric or string type",
            TypeClass::LOGICAL => "an integral or bool type",
            TypeClass::COMPARABLE => "a comparable type",
            TypeClass::EQUATABLE => "a value type",
            TypeClass::NONE => "no type",
            _ => "a restricted type",
        }
    }
}

impl Default for TypeClass {
    fn default() -> Self {
        TypeClass::ANY
    }
}

impl std::fmt::Display for TypeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

// ============================================================
// Class hierarchy
// ============================================================

/// Object classes and their single-inheritance parents
#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    parents: FxHashMap<String, Option<String>>,
}

impl ClassHierarchy {
    /// Empty hierarchy without the built-in world classes
    pub fn empty() -> Self {
        Self {
            parents: FxHashMap::default(),
        }
    }

    /// Hierarchy with the built-in world classes
    pub fn new() -> Self {
        let mut h = Self::empty();
        h.parents.insert("IWorldElement".to_string(), None);
        for (class, parent) in [
            ("Slot", "IWorldElement"),
            ("User", "IWorldElement"),
            ("IComponent", "IWorldElement"),
            ("AvatarAnchor", "IComponent"),
        ] {
            h.parents.insert(class.to_string(), Some(parent.to_string()));
        }
        h
    }

    pub fn contains(&self, class: &str) -> bool {
        self.parents.contains_key(class)
    }

    /// Register a class. Returns false if the name is already taken.
    pub fn declare(&mut self, class: &str, parent: Option<&str>) -> bool {
        if self.parents.contains_key(class) {
            return false;
        }
        self.parents
            .insert(class.to_string(), parent.map(str::to_string));
        true
    }

    pub fn parent(&self, class: &str) -> Option<&str> {
        self.parents.get(class).and_then(|p| p.as_deref())
    }

    /// The class followed by its ancestors, nearest first
    pub fn ancestors(&self, class: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.parents.get_key_value(class).map(|(k, _)| k.as_str());
        while let Some(c) = current {
            if chain.contains(&c) || chain.len() > self.parents.len() {
                break;
            }
            chain.push(c);
            current = self.parent(c);
        }
        chain
    }

    /// First class that appears twice on an ancestor chain, if any
    pub fn find_cycle(&self) -> Option<&str> {
        let mut names: Vec<&String> = self.parents.keys().collect();
        names.sort();
        for class in names {
            let mut seen = vec![class.as_str()];
            let mut current = self.parent(class);
            while let Some(c) = current {
                if seen.contains(&c) {
                    return Some(class.as_str());
                }
                seen.push(c);
                current = self.parent(c);
            }
        }
        None
    }

    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.ancestors(sub).contains(&sup)
    }

    /// Nearest common ancestor, or `None` when only `object` is shared
    pub fn common_ancestor(&self, a: &str, b: &str) -> Option<&str> {
        let b_chain = self.ancestors(b);
        self.ancestors(a).into_iter().find(|c| b_chain.contains(c))
    }
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_aliases() {
        assert_eq!(Primitive::from_name("int"), Some(Primitive::I32));
        assert_eq!(Primitive::from_name("double"), Some(Primitive::F64));
        assert_eq!(Primitive::from_name("ulong"), Some(Primitive::U64));
        assert_eq!(Primitive::from_name("Slot"), None);
    }

    #[test]
    fn test_type_class_meet() {
        let m = TypeClass::ADDABLE.meet(TypeClass::NUMERIC);
        assert_eq!(m, TypeClass::NUMERIC);
        assert!(!m.admits(&Type::string()));
        assert!(TypeClass::NUMERIC
            .meet(TypeClass::FRACTIONAL_ONLY)
            .admits(&Type::float()));
        assert!(TypeClass::INTEGRAL_ONLY
            .meet(TypeClass::FRACTIONAL_ONLY)
            .is_empty());
    }

    #[test]
    fn test_type_class_rejects_impulse() {
        assert!(!TypeClass::EQUATABLE.admits(&Type::Impulse));
        assert!(TypeClass::EQUATABLE.admits(&Type::RefId));
    }

    #[test]
    fn test_class_hierarchy_ancestors() {
        let h = ClassHierarchy::new();
        assert_eq!(
            h.ancestors("AvatarAnchor"),
            vec!["AvatarAnchor", "IComponent", "IWorldElement"]
        );
        assert!(h.is_subclass("Slot", "IWorldElement"));
        assert!(!h.is_subclass("IWorldElement", "Slot"));
    }

    #[test]
    fn test_common_ancestor() {
        let h = ClassHierarchy::new();
        assert_eq!(h.common_ancestor("Slot", "User"), Some("IWorldElement"));
        assert_eq!(h.common_ancestor("AvatarAnchor", "IComponent"), Some("IComponent"));
    }

    #[test]
    fn test_declare_and_cycle() {
        let mut h = ClassHierarchy::new();
        assert!(h.declare("A", Some("B")));
        assert!(h.declare("B", Some("A")));
        assert!(!h.declare("Slot", None));
        assert!(h.find_cycle().is_some());
    }

    #[test]
    fn test_type_from_name() {
        let h = ClassHierarchy::new();
        assert_eq!(Type::from_name("int", &[], &h), Some(Type::int()));
        assert_eq!(Type::from_name("Slot", &[], &h), Some(Type::object("Slot")));
        assert_eq!(
            Type::from_name("Field", &[Type::float()], &h),
            Some(Type::field(Type::float()))
        );
        assert_eq!(Type::from_name("Nope", &[], &h), None);
    }

    #[test]
    fn test_type_serde_shape() {
        let json = serde_json::to_string(&Type::field(Type::int())).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"field","of":{"kind":"primitive","of":"i32"}}"#
        );
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Type::field(Type::int()));
    }
}
