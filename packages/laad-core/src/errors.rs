//! Error types for laad-core
//!
//! Every stage fails fast with one of these; there are no warnings.

use thiserror::Error;

use crate::shared::models::{Span, Type};

/// Category of a compile error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Scope,
    Type,
    PortBinding,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Scope => "ScopeError",
            ErrorKind::Type => "TypeError",
            ErrorKind::PortBinding => "PortBindingError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two sides of a failed unification and where it happened
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConflict {
    /// `vertex.port -> vertex.port`, when the conflict is on an edge
    pub edge: Option<String>,
    pub expected: Type,
    pub found: Type,
}

impl std::fmt::Display for TypeConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.edge {
            Some(edge) => write!(f, "{} and {} on {}", self.found, self.expected, edge),
            None => write!(f, "{} and {}", self.found, self.expected),
        }
    }
}

/// Main error type for compilation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Malformed tokens or an unterminated multi-line conditional
    #[error("SyntaxError at {span}: {message}")]
    Syntax { span: Span, message: String },

    /// Undeclared identifier or duplicate definition
    #[error("ScopeError at {span}: {message}")]
    Scope { span: Span, message: String },

    /// Unification failure, impossible cast or invalid operand type
    #[error("TypeError at {span}: {message}")]
    Type {
        span: Span,
        message: String,
        conflict: Option<TypeConflict>,
    },

    /// Required input unbound, or a port bound more than once
    #[error("PortBindingError at {span}: {vertex}.{port}: {message}")]
    PortBinding {
        span: Span,
        vertex: String,
        port: String,
        message: String,
    },
}

impl CompileError {
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            span,
            message: message.into(),
        }
    }

    pub fn scope(span: Span, message: impl Into<String>) -> Self {
        CompileError::Scope {
            span,
            message: message.into(),
        }
    }

    pub fn type_error(span: Span, message: impl Into<String>) -> Self {
        CompileError::Type {
            span,
            message: message.into(),
            conflict: None,
        }
    }

    pub fn type_conflict(span: Span, message: impl Into<String>, conflict: TypeConflict) -> Self {
        CompileError::Type {
            span,
            message: message.into(),
            conflict: Some(conflict),
        }
    }

    pub fn port_binding(
        span: Span,
        vertex: impl Into<String>,
        port: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CompileError::PortBinding {
            span,
            vertex: vertex.into(),
            port: port.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Syntax { .. } => ErrorKind::Syntax,
            CompileError::Scope { .. } => ErrorKind::Scope,
            CompileError::Type { .. } => ErrorKind::Type,
            CompileError::PortBinding { .. } => ErrorKind::PortBinding,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Syntax { span, .. }
            | CompileError::Scope { span, .. }
            | CompileError::Type { span, .. }
            | CompileError::PortBinding { span, .. } => *span,
        }
    }
}

/// Result type alias for compilation
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompileError::syntax(Span::new(3, 5, 3, 9), "unexpected token");
        assert_eq!(err.to_string(), "SyntaxError at 3:5: unexpected token");
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_port_binding_display() {
        let err = CompileError::port_binding(Span::new(1, 1, 1, 4), "w", "value", "required input is unbound");
        assert_eq!(
            err.to_string(),
            "PortBindingError at 1:1: w.value: required input is unbound"
        );
    }

    #[test]
    fn test_conflict_display() {
        let c = TypeConflict {
            edge: Some("a.value -> b.a".into()),
            expected: Type::int(),
            found: Type::string(),
        };
        assert_eq!(c.to_string(), "string and i32 on a.value -> b.a");
    }
}
