//! AST definitions consumed by the cata compiler core.
//!
//! The parser (out of scope here) produces a `TranslationUnit`; the semantic
//! core walks it. Every node carries a `Span` into the original source
//! buffer for diagnostics. Nodes own their children.

pub mod decl;
pub mod expr;
pub mod stmt;
pub mod types;

pub use decl::{
    ClassDecl, Classifier, Decl, FnBody, FnDecl, FnParameter, IfaceDecl, NsDecl, StructDecl,
    VarDecl,
};
pub use expr::{
    BinaryArithOp, BinaryLogicalOp, Expr, NumericClassifier, NumericLiteral, UnaryArithOp,
};
pub use stmt::Statement;
pub use types::{QualifiedName, TypeRef};

use cata_common::Span;
use serde::{Deserialize, Serialize};

/// An identifier with its source span.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }

    /// A synthetic identifier with a dummy span.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Ident::new(name, Span::dummy())
    }
}

/// The root of a parsed source file: the declaration list plus the source
/// buffer the spans index into (kept for error pretty-printing).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub declarations: Vec<Decl>,
    pub source: String,
}

impl TranslationUnit {
    pub fn new(declarations: Vec<Decl>, source: impl Into<String>) -> Self {
        TranslationUnit {
            declarations,
            source: source.into(),
        }
    }
}
