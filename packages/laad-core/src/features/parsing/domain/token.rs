//! Token model

use crate::shared::models::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // literals / identifiers
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // keywords
    If,
    Then,
    Else,
    Elseif,
    End,
    Endif,
    While,
    For,
    In,
    Out,
    As,
    Import,
    Class,
    Extends,
    True,
    False,
    Null,
    Var,

    // operators / punctuation
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Spaceship,
    Shl,
    Shr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Bang,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    DotDot,
    Arrow,
    /// `#[`
    AttrOpen,
    RBracket,

    // structural
    Comment(String),
    Newline,
    Eof,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kw = match word {
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "elseif" => TokenKind::Elseif,
            "end" => TokenKind::End,
            "endif" => TokenKind::Endif,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "out" => TokenKind::Out,
            "as" => TokenKind::As,
            "import" => TokenKind::Import,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "var" => TokenKind::Var,
            _ => return None,
        };
        Some(kw)
    }

    /// Source text of a keyword token; keywords are valid path segments
    /// after a dot (`logix.flow.if`)
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Elseif => "elseif",
            TokenKind::End => "end",
            TokenKind::Endif => "endif",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Out => "out",
            TokenKind::As => "as",
            TokenKind::Import => "import",
            TokenKind::Class => "class",
            TokenKind::Extends => "extends",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Var => "var",
            _ => return None,
        };
        Some(text)
    }

    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::Int(v) => format!("integer `{}`", v),
            TokenKind::Float(v) => format!("float `{}`", v),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Comment(_) => "comment".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => match other.keyword_text() {
                Some(kw) => format!("keyword `{}`", kw),
                None => format!("`{}`", other.symbol()),
            },
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Assign => "=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Spaceship => "<=>",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::AmpAmp => "&&",
            TokenKind::Pipe => "|",
            TokenKind::PipePipe => "||",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::Arrow => "->",
            TokenKind::AttrOpen => "#[",
            TokenKind::RBracket => "]",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
