// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Byte spans and line/column locations.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Half-open byte range `[start, end)` into a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    /// Offset of the first byte.
    pub start: usize,
    /// Offset one past the last byte.
    pub end: usize,
}

impl Span {
    /// Create a span from two offsets.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Span used for synthesized nodes that have no source text.
    pub fn synthetic() -> Self {
        Self::default()
    }

    /// Whether the span has no extent.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// 1-based line/column range inside a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    /// File the location belongs to.
    pub file: PathBuf,
    /// 1-based start line.
    pub line: usize,
    /// 1-based start column.
    pub column: usize,
    /// 1-based end line.
    pub end_line: usize,
    /// 1-based end column (exclusive).
    pub end_column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Source text together with a precomputed line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Build a source file and index its line starts.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            path: path.into(),
            text,
            line_starts,
        }
    }

    /// Path the source was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text covered by `span`, or the empty string when out of range.
    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset.min(self.text.len()))
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line + 1, column + 1)
    }

    /// Resolve a span into a file location.
    pub fn location(&self, span: Span) -> Location {
        let (line, column) = self.line_col(span.start);
        let (end_line, end_column) = self.line_col(span.end);
        Location {
            file: self.path.clone(),
            line,
            column,
            end_line,
            end_column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let file = SourceFile::new("a.wf", "int x = 1;\nint y = 2;\n");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(4), (1, 5));
    }

    #[test]
    fn test_line_col_after_newline() {
        let file = SourceFile::new("a.wf", "int x = 1;\nint y = 2;\n");
        assert_eq!(file.line_col(11), (2, 1));
        assert_eq!(file.line_col(15), (2, 5));
    }

    #[test]
    fn test_location_display() {
        let file = SourceFile::new("svc.wf", "a\nbc");
        let loc = file.location(Span::new(3, 4));
        assert_eq!(loc.to_string(), "svc.wf:2:2");
        assert_eq!(loc.end_column, 3);
    }

    #[test]
    fn test_span_to() {
        let a = Span::new(4, 8);
        let b = Span::new(1, 5);
        assert_eq!(a.to(b), Span::new(1, 8));
    }
}
