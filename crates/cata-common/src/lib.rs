//! Common types and utilities for the cata compiler.
//!
//! This crate provides foundational types used across all cata crates:
//! - Source spans (`Span`, `Spanned`)
//! - Line maps and source locations (`LineMap`, `Location`)
//! - Diagnostics (`Diagnostic`, `DiagnosticKind`, `DiagnosticSink`)
//! - Numeric literal folding

pub mod diagnostics;
pub mod numeric;
pub mod position;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, RenderFormat};
pub use position::{LineMap, Location};
pub use span::{Span, Spanned};
