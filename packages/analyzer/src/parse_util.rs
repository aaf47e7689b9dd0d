//! Parse utilities
//!
//! Source files, locations and spans shared by the markup, script and CSS
//! parsers, plus the lexical/syntactic error record they all collect into.

use std::fmt;
use std::sync::Arc;

/// A parsed source file. Shared between every span pointing into it.
#[derive(Debug)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    /// Byte offset of the start of each line, in order.
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Arc<Self> {
        let content = content.into();
        let mut line_starts = vec![0usize];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Arc::new(SourceFile {
            path: path.into(),
            content,
            line_starts,
        })
    }

    /// 1-based (line, column) for a byte offset.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let col = offset - self.line_starts[line_idx];
        (line_idx as u32 + 1, col as u32 + 1)
    }

    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.content.len());
        let start = start.min(end);
        &self.content[start..end]
    }
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.content == other.content
    }
}

/// A half-open byte range into a source file.
#[derive(Clone)]
pub struct Span {
    pub file: Arc<SourceFile>,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(file: Arc<SourceFile>, start: usize, end: usize) -> Self {
        Span { file, start, end }
    }

    pub fn text(&self) -> &str {
        self.file.slice(self.start, self.end)
    }

    /// 1-based line/column of the span start.
    pub fn start_line_col(&self) -> (u32, u32) {
        self.file.line_col(self.start)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.start_line_col();
        write!(f, "{}@{}:{}", self.file.path, line, col)
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.file == other.file
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorLevel {
    Warning,
    Error,
}

/// A recoverable lexical or syntactic error with its source span.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub msg: String,
    pub level: ParseErrorLevel,
}

impl ParseError {
    pub fn new(span: Span, msg: impl Into<String>) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Error,
        }
    }

    pub fn warning(span: Span, msg: impl Into<String>) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Warning,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.span.start_line_col();
        let level = match self.level {
            ParseErrorLevel::Warning => "warning",
            ParseErrorLevel::Error => "error",
        };
        write!(
            f,
            "{}: {} ({}@{}:{})",
            level, self.msg, self.span.file.path, line, col
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compute_line_and_column_from_offset() {
        let file = SourceFile::new("a.js", "ab\ncd\nef");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(1), (1, 2));
        assert_eq!(file.line_col(3), (2, 1));
        assert_eq!(file.line_col(7), (3, 2));
    }

    #[test]
    fn should_slice_span_text() {
        let file = SourceFile::new("a.js", "hello world");
        let span = Span::new(file, 6, 11);
        assert_eq!(span.text(), "world");
        assert_eq!(span.len(), 5);
    }
}
