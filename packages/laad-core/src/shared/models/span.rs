//! Source location types

use serde::{Deserialize, Serialize};

/// Span in source text, 1-based lines and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a zero span (0:0-0:0), used for synthesized items
    pub fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Span covering `self` through `other`
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start_line, self.start_col, other.end_line, other.end_col)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn contains(&self, other: &Span) -> bool {
        (self.start_line, self.start_col) <= (other.start_line, other.start_col)
            && (other.end_line, other.end_col) <= (self.end_line, self.end_col)
    }

    pub fn is_multiline(&self) -> bool {
        self.end_line > self.start_line
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_to() {
        let a = Span::new(1, 1, 1, 4);
        let b = Span::new(3, 2, 3, 9);
        assert_eq!(a.to(&b), Span::new(1, 1, 3, 9));
        assert!(a.to(&b).is_multiline());
    }

    #[test]
    fn test_span_contains() {
        let outer = Span::new(1, 1, 4, 1);
        assert!(outer.contains(&Span::new(2, 5, 2, 8)));
        assert!(!outer.contains(&Span::new(4, 1, 5, 1)));
    }

    #[test]
    fn test_display_is_start_position() {
        assert_eq!(Span::new(7, 3, 7, 9).to_string(), "7:3");
    }
}
