//! Diagnostics for the cata compiler.
//!
//! Every user-facing problem is a `Diagnostic` collected by a
//! `DiagnosticSink`. Errors increment a counter and mark the session
//! unsuccessful, but never short-circuit: resolution keeps going so one
//! invocation reports as many independent problems as possible.

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::position::LineMap;
use crate::span::Span;

/// The severity/kind of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Error,
    Warning,
    Info,
    Help,
    Debug,
}

impl DiagnosticKind {
    pub const fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
            DiagnosticKind::Help => "help",
            DiagnosticKind::Debug => "debug",
        }
    }
}

/// How diagnostics are rendered to the terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderFormat {
    #[default]
    Ascii,
    Color,
    Fancy,
}

/// A single diagnostic message, optionally anchored to a source span.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Byte span into the original source buffer, when known.
    pub span: Option<Span>,
    /// Short annotation printed next to the caret, e.g. "here".
    pub span_comment: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            span: None,
            span_comment: None,
        }
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_span_comment(mut self, comment: impl Into<String>) -> Self {
        self.span_comment = Some(comment.into());
        self
    }
}

/// Collects diagnostics and keeps error/warning counters.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    num_errors: usize,
    num_warnings: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        // resolution passes re-run to a fixed point; the same problem found
        // on a later iteration must not report twice
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        match diagnostic.kind {
            DiagnosticKind::Error => self.num_errors += 1,
            DiagnosticKind::Warning => self.num_warnings += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, span: Option<Span>) {
        let mut d = Diagnostic::new(DiagnosticKind::Error, message);
        d.span = span;
        self.push(d);
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Option<Span>) {
        let mut d = Diagnostic::new(DiagnosticKind::Warning, message);
        d.span = span;
        self.push(d);
    }

    pub fn info(&mut self, message: impl Into<String>, span: Option<Span>) {
        let mut d = Diagnostic::new(DiagnosticKind::Info, message);
        d.span = span;
        self.push(d);
    }

    pub fn help(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticKind::Help, message));
    }

    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render every collected diagnostic against `source`.
    pub fn render_all(&self, source: &str, format: RenderFormat) -> String {
        let map = LineMap::new(source);
        let mut out = String::new();
        for d in &self.diagnostics {
            out.push_str(&render(d, source, &map, format));
        }
        out
    }
}

/// Render one diagnostic: a `kind: message` header and, when the diagnostic
/// is anchored, the source line with a caret run underneath.
pub fn render(d: &Diagnostic, source: &str, map: &LineMap, format: RenderFormat) -> String {
    let mut out = String::new();

    let label = match (format, d.kind) {
        (RenderFormat::Ascii, _) => d.kind.label().to_string(),
        (_, DiagnosticKind::Error) => d.kind.label().red().bold().to_string(),
        (_, DiagnosticKind::Warning) => d.kind.label().yellow().bold().to_string(),
        (_, DiagnosticKind::Help) => d.kind.label().cyan().to_string(),
        (_, _) => d.kind.label().bold().to_string(),
    };
    out.push_str(&label);
    out.push_str(": ");
    out.push_str(&d.message);
    out.push('\n');

    if let Some(span) = d.span {
        if !span.is_dummy() {
            let loc = map.locate(span.start);
            let line_span = map.line_span(source, span.start);
            let gutter = if format == RenderFormat::Fancy {
                format!("{:>4} | ", loc.display_line())
            } else {
                String::new()
            };
            out.push_str(&format!(
                "  at line {}, column {}:\n",
                loc.display_line(),
                loc.display_column()
            ));
            out.push_str(&gutter);
            out.push_str(line_span.slice(source));
            out.push('\n');

            let caret_len = span.len().max(1).min(line_span.end - span.start) as usize;
            let mut underline = String::new();
            underline.push_str(&" ".repeat(gutter.len() + loc.column as usize));
            underline.push_str(&"^".repeat(caret_len));
            if let Some(comment) = &d.span_comment {
                underline.push(' ');
                underline.push_str(comment);
            }
            if format != RenderFormat::Ascii {
                underline = underline.green().to_string();
            }
            out.push_str(&underline);
            out.push('\n');
        }
    }

    out
}
