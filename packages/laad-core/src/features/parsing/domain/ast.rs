//! Abstract syntax tree
//!
//! Built once by the parser and dropped after graph building.

use crate::shared::models::{Attribute, Literal, PortDirection, Span};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Comment { text: String, span: Span },
    Import(Import),
    NodeDef(NodeDef),
    Expression(Expr),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Comment { span, .. } => *span,
            Statement::Import(i) => i.span,
            Statement::NodeDef(d) => d.span,
            Statement::Expression(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Dotted identifier such as `logix.flow.while` or `node.port`
#[derive(Debug, Clone, PartialEq)]
pub struct NodePath {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl NodePath {
    pub fn head(&self) -> &str {
        self.segments.first().map(|s| s.name.as_str()).unwrap_or("")
    }

    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: NodePath,
    pub alias: Option<Ident>,
    pub span: Span,
}

/// Source-level type such as `int`, `Slot` or `Field<float>`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: String,
    pub args: Vec<TypeName>,
    pub span: Span,
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub annotation: Option<TypeName>,
    pub binding: NodeBinding,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeBinding {
    /// Template path or reference to an existing node
    Path(NodePath),
    Expression(Expr),
    Class(ClassDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub extends: Option<Ident>,
    pub ports: Vec<PortDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortDecl {
    pub direction: PortDirection,
    pub name: Ident,
    pub ty: TypeName,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Connection chains and control flow take part in block sequencing
    pub fn is_flow(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Connection(_)
                | ExprKind::If(_)
                | ExprKind::While { .. }
                | ExprKind::RangeFor { .. }
                | ExprKind::GenericFor { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Path(NodePath),
    Cast {
        expr: Box<Expr>,
        ty: TypeName,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `a -> b -> c`, at least two elements
    Connection(Vec<Expr>),
    If(IfExpr),
    While {
        condition: Box<Expr>,
        body: Block,
    },
    RangeFor {
        var: Ident,
        from: Box<Expr>,
        to: Box<Expr>,
        body: Block,
    },
    GenericFor {
        start: Box<Expr>,
        condition: Box<Expr>,
        end: Box<Expr>,
        body: Block,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    /// `if`/`elseif` conditions with their arms, in order
    pub branches: Vec<(Expr, Block)>,
    pub otherwise: Option<Block>,
    /// Closed by `end`/`endif`
    pub terminated: bool,
    pub multiline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Spaceship,
}

impl BinaryOp {
    /// Template implementing the operator
    pub fn template(&self) -> &'static str {
        match self {
            BinaryOp::Add => "logix.operators.add",
            BinaryOp::Sub => "logix.operators.sub",
            BinaryOp::Mul => "logix.operators.mul",
            BinaryOp::Div => "logix.operators.div",
            BinaryOp::Rem => "logix.operators.rem",
            BinaryOp::Shl => "logix.operators.shl",
            BinaryOp::Shr => "logix.operators.shr",
            BinaryOp::BitAnd => "logix.operators.and",
            BinaryOp::BitOr => "logix.operators.or",
            BinaryOp::BitXor => "logix.operators.xor",
            BinaryOp::And => "logix.operators.logical_and",
            BinaryOp::Or => "logix.operators.logical_or",
            BinaryOp::Lt => "logix.operators.lt",
            BinaryOp::Le => "logix.operators.le",
            BinaryOp::Gt => "logix.operators.gt",
            BinaryOp::Ge => "logix.operators.ge",
            BinaryOp::Eq => "logix.operators.eq",
            BinaryOp::Ne => "logix.operators.ne",
            BinaryOp::Spaceship => "logix.operators.spaceship",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Spaceship => "<=>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn template(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "logix.operators.neg",
            UnaryOp::Not => "logix.operators.not",
        }
    }
}
