//! Recursive-descent parser
//!
//! Statements are newline (or `;`) separated. Newlines are ignored inside
//! parentheses and after a binary operator or `->`.
//!
//! Operator precedence, lowest first:
//!
//! | level | operators            |
//! |-------|----------------------|
//! | chain | `->`                 |
//! | 0     | `\|\|`               |
//! | 1     | `&&`                 |
//! | 2     | `\|`                 |
//! | 3     | `^`                  |
//! | 4     | `&`                  |
//! | 5     | `==` `!=`            |
//! | 6     | `<` `<=` `>` `>=` `<=>` |
//! | 7     | `<<` `>>`            |
//! | 8     | `+` `-`              |
//! | 9     | `*` `/` `%`          |
//! | cast  | `as`                 |
//! | unary | `-` `!`              |
//!
//! A conditional that spans more than one line must be closed with `end` or
//! `endif`; a single-line conditional needs no terminator.

use std::collections::BTreeMap;

use crate::errors::{CompileError, Result};
use crate::features::parsing::domain::ast::*;
use crate::features::parsing::domain::token::{Token, TokenKind};
use crate::shared::models::{Attribute, Literal, PortDirection, Span};

const BINARY_LEVELS: usize = 10;

/// Deepest accepted nesting of parentheses, prefix operators, casts and
/// control-flow expressions
pub const MAX_NESTING: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting of `( ... )`; newlines are insignificant while > 0
    paren_depth: usize,
    /// Nesting of `{ ... }` and multi-line arms
    block_depth: usize,
    /// Expression nesting, bounded by [`MAX_NESTING`]
    nesting: usize,
    last_span: Span,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            paren_depth: 0,
            block_depth: 0,
            nesting: 0,
            last_span: Span::zero(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        self.parse_statements(&mut statements, |k| matches!(k, TokenKind::Eof), "end of input")?;
        Ok(Program { statements })
    }

    // ============================================================
    // Token cursor
    // ============================================================

    fn raw(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx].kind
    }

    fn skip_insignificant(&mut self) {
        if self.paren_depth > 0 {
            self.skip_newlines();
        }
    }

    fn peek(&mut self) -> &TokenKind {
        self.skip_insignificant();
        self.raw(0)
    }

    fn current_span(&mut self) -> Span {
        self.skip_insignificant();
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        self.tokens[idx].span
    }

    fn advance(&mut self) -> Token {
        self.skip_insignificant();
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        let token = self.tokens[idx].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.last_span = token.span;
        token
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().describe();
            Err(self.error(format!("expected {}, found {}", kind.describe(), found)))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.raw(0), TokenKind::Newline | TokenKind::Comment(_)) {
            self.pos += 1;
        }
    }

    /// Next significant token without consuming newlines
    fn peek_past_newlines(&self) -> &TokenKind {
        let mut idx = self.pos;
        while matches!(
            self.tokens.get(idx).map(|t| &t.kind),
            Some(TokenKind::Newline | TokenKind::Comment(_))
        ) {
            idx += 1;
        }
        let idx = idx.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx].kind
    }

    fn error(&mut self, message: impl Into<String>) -> CompileError {
        let span = self.current_span();
        CompileError::syntax(span, message)
    }

    fn enter(&mut self) -> Result<()> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error(format!(
                "expression nesting exceeds {} levels",
                MAX_NESTING
            )));
        }
        self.nesting += 1;
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok(Ident { name, span })
            }
            other => Err(self.error(format!("expected identifier, found {}", other.describe()))),
        }
    }

    // ============================================================
    // Statements
    // ============================================================

    fn parse_statements(
        &mut self,
        out: &mut Vec<Statement>,
        stop: fn(&TokenKind) -> bool,
        closing: &str,
    ) -> Result<()> {
        loop {
            let kind = self.raw(0).clone();
            match kind {
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.pos += 1;
                    continue;
                }
                TokenKind::Comment(text) => {
                    let span = self.tokens[self.pos].span;
                    self.pos += 1;
                    out.push(Statement::Comment { text, span });
                    continue;
                }
                ref k if stop(k) => return Ok(()),
                TokenKind::Eof => {
                    return Err(self.error(format!("unexpected end of input, expected {}", closing)))
                }
                _ => {}
            }

            let statement = self.parse_statement()?;
            out.push(statement);

            match self.raw(0) {
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comment(_) | TokenKind::Eof => {}
                k if stop(k) => {}
                other => {
                    let found = other.describe();
                    return Err(self.error(format!("expected end of statement, found {}", found)));
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.raw(0) {
            TokenKind::Import => self.parse_import().map(Statement::Import),
            TokenKind::AttrOpen | TokenKind::Var => self.parse_node_def().map(Statement::NodeDef),
            TokenKind::Ident(_) if matches!(self.raw(1), TokenKind::Colon | TokenKind::Assign) => {
                self.parse_node_def().map(Statement::NodeDef)
            }
            _ => self.parse_expr().map(Statement::Expression),
        }
    }

    fn parse_import(&mut self) -> Result<Import> {
        let start = self.expect(TokenKind::Import)?.span;
        let path = self.parse_path()?;
        let alias = if self.eat(&TokenKind::As) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        Ok(Import {
            path,
            alias,
            span: start.to(&self.last_span),
        })
    }

    fn parse_attributes(&mut self) -> Result<Vec<Attribute>> {
        let mut attributes = Vec::new();
        while self.check(&TokenKind::AttrOpen) {
            let start = self.advance().span;
            let key = self.expect_ident()?;
            let mut args = BTreeMap::new();
            if self.eat(&TokenKind::LParen) {
                self.paren_depth += 1;
                if !self.check(&TokenKind::RParen) {
                    loop {
                        let name = self.expect_ident()?;
                        self.expect(TokenKind::Assign)?;
                        let value = self.parse_literal_value()?;
                        if args.insert(name.name.clone(), value).is_some() {
                            return Err(CompileError::syntax(
                                name.span,
                                format!("duplicate attribute argument `{}`", name.name),
                            ));
                        }
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen)?;
                self.paren_depth -= 1;
            }
            self.expect(TokenKind::RBracket)?;
            attributes.push(Attribute {
                key: key.name,
                args,
                span: start.to(&self.last_span),
            });
            self.skip_newlines();
        }
        Ok(attributes)
    }

    fn parse_literal_value(&mut self) -> Result<Literal> {
        let negative = self.eat(&TokenKind::Minus);
        let literal = match self.peek().clone() {
            TokenKind::Int(v) => Literal::Int(if negative { -v } else { v }),
            TokenKind::Float(v) => Literal::Float(if negative { -v } else { v }),
            TokenKind::Str(s) if !negative => Literal::String(s),
            TokenKind::True if !negative => Literal::Bool(true),
            TokenKind::False if !negative => Literal::Bool(false),
            TokenKind::Null if !negative => Literal::Null,
            other => return Err(self.error(format!("expected literal, found {}", other.describe()))),
        };
        self.advance();
        Ok(literal)
    }

    fn parse_node_def(&mut self) -> Result<NodeDef> {
        let start = self.current_span();
        let attributes = self.parse_attributes()?;
        self.eat(&TokenKind::Var);
        let name = self.expect_ident()?;
        if name.name.starts_with("__") {
            return Err(CompileError::syntax(
                name.span,
                format!("identifiers starting with `__` are reserved: `{}`", name.name),
            ));
        }
        let annotation = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign)?;

        let binding = if self.check(&TokenKind::Class) {
            if self.block_depth > 0 {
                return Err(self.error("class definitions are only allowed at top level"));
            }
            NodeBinding::Class(self.parse_class_def()?)
        } else {
            let expr = self.parse_expr()?;
            match expr.kind {
                ExprKind::Path(path) => NodeBinding::Path(path),
                _ => NodeBinding::Expression(expr),
            }
        };

        Ok(NodeDef {
            attributes,
            name,
            annotation,
            binding,
            span: start.to(&self.last_span),
        })
    }

    fn parse_class_def(&mut self) -> Result<ClassDef> {
        let start = self.expect(TokenKind::Class)?.span;
        let extends = if self.eat(&TokenKind::Extends) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::LBrace)?;

        let mut ports = Vec::new();
        loop {
            while matches!(
                self.raw(0),
                TokenKind::Newline | TokenKind::Comment(_) | TokenKind::Comma
            ) {
                self.pos += 1;
            }
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            let port_start = self.current_span();
            let direction = match self.peek() {
                TokenKind::In => PortDirection::In,
                TokenKind::Out => PortDirection::Out,
                other => {
                    let found = other.describe();
                    return Err(self.error(format!("expected `in` or `out` port declaration, found {}", found)));
                }
            };
            self.advance();
            let name = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type_name()?;
            ports.push(PortDecl {
                direction,
                name,
                ty,
                span: port_start.to(&self.last_span),
            });
        }

        Ok(ClassDef {
            extends,
            ports,
            span: start.to(&self.last_span),
        })
    }

    fn parse_type_name(&mut self) -> Result<TypeName> {
        let name = self.expect_ident()?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::Lt) {
            loop {
                args.push(self.parse_type_name()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.close_angle()?;
        }
        Ok(TypeName {
            name: name.name,
            args,
            span: name.span.to(&self.last_span),
        })
    }

    /// Consume `>`; a `>>` closing two argument lists is split in place
    fn close_angle(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Gt) {
            return Ok(());
        }
        if self.check(&TokenKind::Shr) {
            let token = &mut self.tokens[self.pos];
            token.kind = TokenKind::Gt;
            token.span.start_col += 1;
            self.last_span = Span::new(
                token.span.start_line,
                token.span.start_col - 1,
                token.span.start_line,
                token.span.start_col,
            );
            return Ok(());
        }
        let found = self.peek().describe();
        Err(self.error(format!("expected `>`, found {}", found)))
    }

    fn parse_path(&mut self) -> Result<NodePath> {
        let first = self.expect_ident()?;
        let start = first.span;
        let mut segments = vec![first];
        while self.raw(0) == &TokenKind::Dot {
            self.advance();
            let token = self.advance();
            let name = match &token.kind {
                TokenKind::Ident(name) => name.clone(),
                other => match other.keyword_text() {
                    Some(kw) => kw.to_string(),
                    None => {
                        return Err(CompileError::syntax(
                            token.span,
                            format!("expected path segment after `.`, found {}", other.describe()),
                        ))
                    }
                },
            };
            segments.push(Ident {
                name,
                span: token.span,
            });
        }
        Ok(NodePath {
            segments,
            span: start.to(&self.last_span),
        })
    }

    // ============================================================
    // Expressions
    // ============================================================

    pub fn parse_expr(&mut self) -> Result<Expr> {
        let first = self.parse_binary(0)?;
        if !self.check(&TokenKind::Arrow) {
            return Ok(first);
        }
        let start = first.span;
        let mut items = vec![first];
        while self.eat(&TokenKind::Arrow) {
            self.skip_newlines();
            items.push(self.parse_binary(0)?);
        }
        Ok(Expr::new(ExprKind::Connection(items), start.to(&self.last_span)))
    }

    fn binary_op(kind: &TokenKind, level: usize) -> Option<BinaryOp> {
        let op = match (level, kind) {
            (0, TokenKind::PipePipe) => BinaryOp::Or,
            (1, TokenKind::AmpAmp) => BinaryOp::And,
            (2, TokenKind::Pipe) => BinaryOp::BitOr,
            (3, TokenKind::Caret) => BinaryOp::BitXor,
            (4, TokenKind::Amp) => BinaryOp::BitAnd,
            (5, TokenKind::EqEq) => BinaryOp::Eq,
            (5, TokenKind::NotEq) => BinaryOp::Ne,
            (6, TokenKind::Lt) => BinaryOp::Lt,
            (6, TokenKind::Le) => BinaryOp::Le,
            (6, TokenKind::Gt) => BinaryOp::Gt,
            (6, TokenKind::Ge) => BinaryOp::Ge,
            (6, TokenKind::Spaceship) => BinaryOp::Spaceship,
            (7, TokenKind::Shl) => BinaryOp::Shl,
            (7, TokenKind::Shr) => BinaryOp::Shr,
            (8, TokenKind::Plus) => BinaryOp::Add,
            (8, TokenKind::Minus) => BinaryOp::Sub,
            (9, TokenKind::Star) => BinaryOp::Mul,
            (9, TokenKind::Slash) => BinaryOp::Div,
            (9, TokenKind::Percent) => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expr> {
        if level == BINARY_LEVELS {
            return self.parse_cast();
        }
        let mut lhs = self.parse_binary(level + 1)?;
        while let Some(op) = Self::binary_op(self.peek(), level) {
            self.advance();
            self.skip_newlines();
            let rhs = self.parse_binary(level + 1)?;
            let span = lhs.span.to(&rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn parse_cast(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;
        let outer = self.nesting;
        while self.eat(&TokenKind::As) {
            self.enter()?;
            let ty = self.parse_type_name()?;
            let span = expr.span.to(&ty.span);
            expr = Expr::new(
                ExprKind::Cast {
                    expr: Box::new(expr),
                    ty,
                },
                span,
            );
        }
        self.nesting = outer;
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_prefixed()?;
        self.nesting -= 1;
        Ok(expr)
    }

    fn parse_prefixed(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.to(&operand.span);

        // fold negative numeric literals
        if op == UnaryOp::Neg {
            match operand.kind {
                ExprKind::Literal(Literal::Int(v)) => {
                    return Ok(Expr::new(ExprKind::Literal(Literal::Int(-v)), span))
                }
                ExprKind::Literal(Literal::Float(v)) => {
                    return Ok(Expr::new(ExprKind::Literal(Literal::Float(-v)), span))
                }
                _ => {}
            }
        }
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let literal = match self.peek().clone() {
            TokenKind::Int(v) => Some(Literal::Int(v)),
            TokenKind::Float(v) => Some(Literal::Float(v)),
            TokenKind::Str(s) => Some(Literal::String(s)),
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::Null => Some(Literal::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            let span = self.advance().span;
            return Ok(Expr::new(ExprKind::Literal(literal), span));
        }

        match self.peek().clone() {
            TokenKind::LParen => {
                let start = self.advance().span;
                self.paren_depth += 1;
                let mut inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.paren_depth -= 1;
                inner.span = start.to(&self.last_span);
                Ok(inner)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Ident(_) => {
                let path = self.parse_path()?;
                let span = path.span;
                Ok(Expr::new(ExprKind::Path(path), span))
            }
            other => Err(self.error(format!("expected expression, found {}", other.describe()))),
        }
    }

    /// `{ statements }` with newlines significant again
    fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let saved = std::mem::replace(&mut self.paren_depth, 0);
        self.block_depth += 1;
        let mut statements = Vec::new();
        self.parse_statements(&mut statements, |k| matches!(k, TokenKind::RBrace), "`}`")?;
        self.block_depth -= 1;
        self.expect(TokenKind::RBrace)?;
        self.paren_depth = saved;
        Ok(Block {
            statements,
            span: start.to(&self.last_span),
        })
    }

    fn parse_while(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::While)?.span;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Expr::new(
            ExprKind::While {
                condition: Box::new(condition),
                body,
            },
            start.to(&self.last_span),
        ))
    }

    fn parse_for(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;
        self.paren_depth += 1;

        let is_range = matches!(self.peek(), TokenKind::Ident(_)) && self.raw(1) == &TokenKind::In;
        let kind = if is_range {
            let var = self.expect_ident()?;
            self.expect(TokenKind::In)?;
            let from = self.parse_binary(0)?;
            self.expect(TokenKind::DotDot)?;
            let to = self.parse_binary(0)?;
            self.expect(TokenKind::RParen)?;
            self.paren_depth -= 1;
            let body = self.parse_block()?;
            ExprKind::RangeFor {
                var,
                from: Box::new(from),
                to: Box::new(to),
                body,
            }
        } else {
            let init = self.parse_expr()?;
            self.expect(TokenKind::Comma)?;
            let condition = self.parse_expr()?;
            self.expect(TokenKind::Comma)?;
            let end = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            self.paren_depth -= 1;
            let body = self.parse_block()?;
            ExprKind::GenericFor {
                start: Box::new(init),
                condition: Box::new(condition),
                end: Box::new(end),
                body,
            }
        };
        Ok(Expr::new(kind, start.to(&self.last_span)))
    }

    fn is_arm_terminator(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Else | TokenKind::Elseif | TokenKind::End | TokenKind::Endif
        )
    }

    fn parse_if(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::If)?.span;
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut terminated = false;

        let mut condition = self.parse_condition()?;
        loop {
            let arm = self.parse_arm()?;
            branches.push((condition, arm));
            match self.arm_follower() {
                TokenKind::Elseif => {
                    self.advance();
                    condition = self.parse_condition()?;
                }
                TokenKind::Else => {
                    self.advance();
                    otherwise = Some(self.parse_arm()?);
                    if matches!(self.arm_follower(), TokenKind::End | TokenKind::Endif) {
                        self.advance();
                        terminated = true;
                    }
                    break;
                }
                TokenKind::End | TokenKind::Endif => {
                    self.advance();
                    terminated = true;
                    break;
                }
                _ => break,
            }
        }

        let span = start.to(&self.last_span);
        let multiline = span.is_multiline();
        if multiline && !terminated {
            return Err(CompileError::syntax(
                span,
                "conditional spanning multiple lines must be closed with `end` or `endif`",
            ));
        }

        Ok(Expr::new(
            ExprKind::If(IfExpr {
                branches,
                otherwise,
                terminated,
                multiline,
            }),
            span,
        ))
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        Ok(condition)
    }

    /// Token following an arm. Newlines are crossed only when a
    /// continuation keyword comes next.
    fn arm_follower(&mut self) -> TokenKind {
        let next = self.peek().clone();
        if matches!(next, TokenKind::Newline | TokenKind::Comment(_)) {
            let beyond = self.peek_past_newlines().clone();
            if Self::is_arm_terminator(&beyond) {
                self.skip_newlines();
                return beyond;
            }
        }
        next
    }

    /// One arm: an expression on the same line, or statements on the
    /// following lines up to `else`/`elseif`/`end`
    fn parse_arm(&mut self) -> Result<Block> {
        let on_next_line = matches!(self.raw(0), TokenKind::Newline | TokenKind::Comment(_));
        let start = self.current_span();
        if on_next_line {
            let saved = std::mem::replace(&mut self.paren_depth, 0);
            self.block_depth += 1;
            let mut statements = Vec::new();
            self.parse_statements(
                &mut statements,
                Self::is_arm_terminator,
                "`else`, `elseif` or `end` to close the conditional",
            )?;
            self.block_depth -= 1;
            self.paren_depth = saved;
            return Ok(Block {
                statements,
                span: start.to(&self.last_span),
            });
        }

        if Self::is_arm_terminator(self.peek()) {
            return Ok(Block {
                statements: Vec::new(),
                span: start,
            });
        }

        let expr = self.parse_expr()?;
        let span = expr.span;
        Ok(Block {
            statements: vec![Statement::Expression(expr)],
            span,
        })
    }
}

/// Parse source text into a program
pub fn parse(source: &str) -> Result<Program> {
    let tokens = super::lexer::tokenize(source)?;
    Parser::new(tokens).parse_program()
}
