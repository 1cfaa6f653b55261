//! Source positions for diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl SourceLocation {
    /// Location at `line`, `column` and byte `offset`.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Location of the first character of a file.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source text. End columns point one past the
/// last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// First line, 1-indexed.
    pub start_line: usize,
    /// First column, 1-indexed.
    pub start_column: usize,
    /// Last line.
    pub end_line: usize,
    /// Column one past the end.
    pub end_column: usize,
    /// Byte offset of the start.
    pub start_offset: usize,
    /// Byte offset one past the end.
    pub end_offset: usize,
}

impl Span {
    /// Span without byte offsets.
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
            start_offset: 0,
            end_offset: 0,
        }
    }

    /// Span from `start` to `end`.
    pub fn from_locations(start: SourceLocation, end: SourceLocation) -> Self {
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            start_offset: start.offset,
            end_offset: end.offset,
        }
    }

    /// Span of generated code with no source.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Start location.
    pub fn start(&self) -> SourceLocation {
        SourceLocation::new(self.start_line, self.start_column, self.start_offset)
    }

    /// End location.
    pub fn end(&self) -> SourceLocation {
        SourceLocation::new(self.end_line, self.end_column, self.end_offset)
    }

    /// Smallest span covering both.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start_offset <= other.start_offset {
            self.start()
        } else {
            other.start()
        };
        let end = if self.end_offset >= other.end_offset {
            self.end()
        } else {
            other.end()
        };
        Span::from_locations(start, end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}-{}", self.start_line, self.start_column, self.end_column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
        }
    }
}

/// Render the source line of `span` with a caret underline.
pub fn excerpt(source: &str, span: &Span) -> Option<String> {
    let text = source.lines().nth(span.start_line.checked_sub(1)?)?;
    let width = if span.end_line == span.start_line {
        span.end_column.saturating_sub(span.start_column).max(1)
    } else {
        1
    };
    Some(format!(
        "{}\n{}{}",
        text,
        " ".repeat(span.start_column.saturating_sub(1)),
        "^".repeat(width)
    ))
}
