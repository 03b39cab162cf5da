//! Source location types
//!
//! Elements are located by line only; the lowering derives lines from the
//! parser's byte offsets.

use serde::{Deserialize, Serialize};

/// Line span of a program element in its compilation unit (1-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineSpan {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Create a zero span (0-0), used by fake elements
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn single_line(&self) -> bool {
        self.start_line == self.end_line
    }

    /// Render the span the way graph nodes print it: `5` or `3...7`
    pub fn render(&self) -> String {
        if self.single_line() {
            format!("{}", self.start_line)
        } else {
            format!("{}...{}", self.start_line, self.end_line)
        }
    }
}

impl Default for LineSpan {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_contains_line() {
        let span = LineSpan::new(10, 20);
        assert!(span.contains_line(10));
        assert!(span.contains_line(15));
        assert!(span.contains_line(20));
        assert!(!span.contains_line(9));
        assert!(!span.contains_line(21));
    }

    #[test]
    fn test_span_render() {
        assert_eq!(LineSpan::new(5, 5).render(), "5");
        assert_eq!(LineSpan::new(3, 7).render(), "3...7");
    }
}
