//! Rendering tests for the diagnostics machinery.

use cata_common::{Diagnostic, DiagnosticKind, DiagnosticSink, RenderFormat, Span};

const SRC: &str = "fn main() {\n    return x + 5\n}\n";

#[test]
fn render_points_at_the_offending_token() {
    let mut sink = DiagnosticSink::new();
    sink.push(
        Diagnostic::new(DiagnosticKind::Error, "Unknown identifier")
            .with_span(Span::new(23, 24))
            .with_span_comment("here"),
    );

    let out = sink.render_all(SRC, RenderFormat::Ascii);
    assert!(out.contains("error: Unknown identifier"), "{out}");
    assert!(out.contains("line 2, column 12"), "{out}");
    assert!(out.contains("    return x + 5"), "{out}");
    // caret sits under the `x`
    let caret_line = out
        .lines()
        .find(|l| l.trim_start().starts_with('^'))
        .expect("caret line");
    assert_eq!(caret_line.find('^'), Some(11));
    assert!(caret_line.ends_with("here"));
}

#[test]
fn unanchored_diagnostics_render_header_only() {
    let mut sink = DiagnosticSink::new();
    sink.help("Consider making types explicit.");
    let out = sink.render_all(SRC, RenderFormat::Ascii);
    assert_eq!(out, "help: Consider making types explicit.\n");
}

#[test]
fn fancy_format_shows_line_gutter() {
    let mut sink = DiagnosticSink::new();
    sink.error("bad", Some(Span::new(0, 2)));
    let out = sink.render_all(SRC, RenderFormat::Fancy);
    assert!(out.contains("   1 | fn main() {"), "{out}");
}

#[test]
fn error_count_marks_session_failed() {
    let mut sink = DiagnosticSink::new();
    assert_eq!(sink.num_errors(), 0);
    sink.error("one", None);
    sink.warning("two", None);
    assert_eq!(sink.num_errors(), 1);
    assert_eq!(sink.num_warnings(), 1);
}
