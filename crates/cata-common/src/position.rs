//! Line/column resolution for byte offsets.
//!
//! Diagnostics render "line N, column M" plus the offending source line with
//! a caret. `LineMap` precomputes line-start offsets once per source buffer
//! so repeated lookups are a binary search.

use crate::span::Span;

/// A resolved source location (0-based line, 0-based column, both in bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// 1-based line number as shown to users.
    #[inline]
    pub const fn display_line(&self) -> u32 {
        self.line + 1
    }

    /// 1-based column number as shown to users.
    #[inline]
    pub const fn display_column(&self) -> u32 {
        self.column + 1
    }
}

/// Maps byte offsets to line/column pairs for one source buffer.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Byte offset of the start of each line. Always starts with 0.
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        LineMap { line_starts }
    }

    /// Resolve a byte offset into a `Location`.
    pub fn locate(&self, offset: u32) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        Location {
            line: line as u32,
            column: offset - self.line_starts[line],
        }
    }

    /// The span of the full line containing `offset` (without the newline).
    pub fn line_span(&self, text: &str, offset: u32) -> Span {
        let loc = self.locate(offset);
        let start = self.line_starts[loc.line as usize];
        let end = self
            .line_starts
            .get(loc.line as usize + 1)
            .map(|next| next.saturating_sub(1))
            .unwrap_or(text.len() as u32);
        Span::new(start, end)
    }

    /// Number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
