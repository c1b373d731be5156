//! positions, diagnostics and their textual rendering
//!
//! Diagnostics are accumulated values, not raised errors: every loader
//! operation returns its best-effort result together with all diagnostics
//! collected along the way, in the order they were found. Nothing in here is
//! deduplicated or dropped.
//!
//! The rendered form is a compatibility surface. A single diagnostic prints
//! as `<file>:<line>,<col>-<col>: <summary>; <detail>` and multiple
//! diagnostics join with `; `, so callers may match on the exact text.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

/// A span of source text, used to point a diagnostic at its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    /// Registry key of the file, relative to the loader base directory.
    pub filename: PathBuf,
    pub start: SourcePos,
    pub end: SourcePos,
}

impl SourceRange {
    pub fn new(filename: impl Into<PathBuf>, start: SourcePos, end: SourcePos) -> Self {
        Self {
            filename: filename.into(),
            start,
            end,
        }
    }

    /// Convert a byte span reported by the parser into line/column form.
    pub(crate) fn from_span(filename: impl Into<PathBuf>, src: &str, span: Range<usize>) -> Self {
        Self {
            filename: filename.into(),
            start: pos_at(src, span.start),
            end: pos_at(src, span.end),
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.filename.display(),
                self.start.line,
                self.start.column,
                self.end.column
            )
        } else {
            write!(
                f,
                "{}:{},{}-{},{}",
                self.filename.display(),
                self.start.line,
                self.start.column,
                self.end.line,
                self.end.column
            )
        }
    }
}

fn pos_at(src: &str, offset: usize) -> SourcePos {
    let bytes = &src.as_bytes()[..offset.min(src.len())];
    let line = bytes.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    SourcePos {
        line,
        column: bytes.len() - line_start + 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// `None` for failures with no source location, e.g. an unreadable root
    /// directory.
    pub range: Option<SourceRange>,
}

impl Diagnostic {
    pub fn error(
        summary: impl Into<String>,
        detail: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            range: Some(range),
        }
    }

    pub fn error_without_range(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            range: None,
        }
    }

    /// Diagnostic for a file the parser rejected outright.
    pub(crate) fn syntax_error(filename: &Path, err: &hcl_edit::parser::Error) -> Self {
        let location = err.location();
        let pos = SourcePos {
            line: location.line(),
            column: location.column(),
        };
        Self::error(
            "Invalid HCL syntax",
            err.message().to_string(),
            SourceRange::new(filename, pos, pos),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}: {}; {}", range, self.summary, self.detail),
            None => write!(f, "{}; {}", self.summary, self.detail),
        }
    }
}

/// Ordered diagnostic accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(%diagnostic, "diagnostic recorded");
        self.0.push(diagnostic);
    }

    /// Append all of `other`, preserving order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
