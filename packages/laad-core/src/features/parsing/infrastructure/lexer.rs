//! Lexer
//!
//! Converts UTF-8 source text into tokens with 1-based line/column spans.
//! Newlines are significant and emitted as tokens; other whitespace is
//! skipped.

use crate::errors::{CompileError, Result};
use crate::features::parsing::domain::token::{Token, TokenKind};
use crate::shared::models::Span;

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            col: 1,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        if self.chars.peek() == Some(&'\u{feff}') {
            return Err(CompileError::syntax(
                Span::new(1, 1, 1, 1),
                "byte-order mark is not allowed; source must be UTF-8 without BOM",
            ));
        }

        while let Some(&c) = self.chars.peek() {
            let (line, col) = (self.line, self.col);
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    self.push(TokenKind::Newline, line, col);
                }
                '"' => self.lex_string()?,
                '0'..='9' => self.lex_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
                _ => self.lex_symbol()?,
            }
        }

        let (line, col) = (self.line, self.col);
        self.tokens
            .push(Token::new(TokenKind::Eof, Span::new(line, col, line, col)));
        Ok(self.tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, line: u32, col: u32) {
        let span = Span::new(line, col, self.line, self.col);
        self.tokens.push(Token::new(kind, span));
    }

    fn error_here(&self, line: u32, col: u32, message: impl Into<String>) -> CompileError {
        CompileError::syntax(Span::new(line, col, self.line, self.col), message)
    }

    fn lex_word(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
        self.push(kind, line, col);
    }

    fn lex_number(&mut self) -> Result<()> {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        // `1..5` is a range, `1.5` is a float
        let mut lookahead = self.chars.clone();
        let is_fraction = lookahead.next() == Some('.')
            && lookahead.next().is_some_and(|c| c.is_ascii_digit());
        if is_fraction {
            text.push('.');
            self.bump();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            let value: f64 = text
                .parse()
                .map_err(|_| self.error_here(line, col, format!("invalid float literal `{}`", text)))?;
            self.push(TokenKind::Float(value), line, col);
        } else {
            let value: i64 = text.parse().map_err(|_| {
                self.error_here(line, col, format!("integer literal `{}` is out of range", text))
            })?;
            self.push(TokenKind::Int(value), line, col);
        }
        Ok(())
    }

    fn lex_string(&mut self) -> Result<()> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(self.error_here(
                                line,
                                col,
                                format!("unknown escape sequence `\\{}`", other),
                            ))
                        }
                        None => return Err(self.error_here(line, col, "unterminated string literal")),
                    };
                    value.push(escaped);
                }
                Some('\n') | None => {
                    return Err(self.error_here(line, col, "unterminated string literal"))
                }
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), line, col);
        Ok(())
    }

    fn lex_comment(&mut self, line: u32, col: u32) {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        self.push(TokenKind::Comment(text.trim().to_string()), line, col);
    }

    fn lex_symbol(&mut self) -> Result<()> {
        let (line, col) = (self.line, self.col);
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(()),
        };
        let kind = match c {
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.eat('=') {
                    if self.eat('>') {
                        TokenKind::Spaceship
                    } else {
                        TokenKind::Le
                    }
                } else if self.eat('<') {
                    TokenKind::Shl
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else if self.eat('>') {
                    TokenKind::Shr
                } else {
                    TokenKind::Gt
                }
            }
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            '.' => {
                if self.eat('.') {
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '/' => {
                if self.eat('/') {
                    self.lex_comment(line, col);
                    return Ok(());
                }
                TokenKind::Slash
            }
            '#' => {
                if self.eat('[') {
                    TokenKind::AttrOpen
                } else {
                    return Err(self.error_here(line, col, "expected `[` after `#`"));
                }
            }
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            other => {
                return Err(self.error_here(line, col, format!("unexpected character `{}`", other)))
            }
        };
        self.push(kind, line, col);
        Ok(())
    }
}

/// Tokenize source text
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_connection_tokens() {
        assert_eq!(
            kinds("\"hi\" -> display"),
            vec![
                TokenKind::Str("hi".into()),
                TokenKind::Arrow,
                TokenKind::Ident("display".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_range_is_not_float() {
        assert_eq!(
            kinds("0..5 1.5"),
            vec![
                TokenKind::Int(0),
                TokenKind::DotDot,
                TokenKind::Int(5),
                TokenKind::Float(1.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("<=> <= << >= >> != == && ||"),
            vec![
                TokenKind::Spaceship,
                TokenKind::Le,
                TokenKind::Shl,
                TokenKind::Ge,
                TokenKind::Shr,
                TokenKind::NotEq,
                TokenKind::EqEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_comment() {
        assert_eq!(
            kinds("if x then // note\nend"),
            vec![
                TokenKind::If,
                TokenKind::Ident("x".into()),
                TokenKind::Then,
                TokenKind::Comment("note".into()),
                TokenKind::Newline,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!(tokens[0].span, Span::new(1, 1, 1, 2));
        assert_eq!(tokens[2].span, Span::new(2, 3, 2, 4));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n""#)[0],
            TokenKind::Str("a\"b\n".into())
        );
    }

    #[test]
    fn test_bom_rejected() {
        let err = tokenize("\u{feff}x = 1").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Syntax);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("\"abc\nx").is_err());
    }

    #[test]
    fn test_stray_character() {
        let err = tokenize("a $ b").unwrap_err();
        assert!(err.to_string().contains("unexpected character"));
    }
}
