//! Literal values and node attributes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::span::Span;
use super::types::{Primitive, Type};

/// Literal value carried by a constant vertex or an attribute argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
}

impl Literal {
    /// The type a literal has before defaulting, if it is fixed by its syntax
    pub fn fixed_type(&self) -> Option<Type> {
        match self {
            Literal::Bool(_) => Some(Type::Primitive(Primitive::Bool)),
            Literal::String(_) => Some(Type::Primitive(Primitive::String)),
            Literal::Null => Some(Type::Null),
            Literal::Int(_) | Literal::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// `#[key(name = literal, ...)]` attached to a node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub args: BTreeMap<String, Literal>,
    #[serde(default)]
    pub span: Span,
}

impl Attribute {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: BTreeMap::new(),
            span: Span::zero(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: Literal) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    pub fn arg(&self, name: &str) -> Option<&Literal> {
        self.args.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_literal_types() {
        assert_eq!(Literal::Bool(true).fixed_type(), Some(Type::bool()));
        assert_eq!(Literal::Null.fixed_type(), Some(Type::Null));
        assert_eq!(Literal::Int(3).fixed_type(), None);
    }

    #[test]
    fn test_attribute_args() {
        let attr = Attribute::new("doc").with_arg("text", Literal::String("hi".into()));
        assert_eq!(attr.arg("text").and_then(Literal::as_str), Some("hi"));
        assert!(attr.arg("missing").is_none());
    }
}
