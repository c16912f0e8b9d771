//! Type references as they appear in source: qualified names and function
//! type syntax. These are unresolved; the semantic core turns them into
//! `cata-sem` types.

use cata_common::Span;
use serde::{Deserialize, Serialize};

use crate::Ident;

/// A dotted name, e.g. `a.b.c`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    pub idents: Vec<Ident>,
    pub span: Span,
}

impl QualifiedName {
    pub fn new(idents: Vec<Ident>, span: Span) -> Self {
        QualifiedName { idents, span }
    }

    /// Single-segment name with a dummy span, for synthetic references.
    pub fn simple(name: impl Into<String>) -> Self {
        QualifiedName {
            idents: vec![Ident::synthetic(name)],
            span: Span::dummy(),
        }
    }

    /// Dot-join the segments back into a single string.
    pub fn to_dotted(&self) -> String {
        let mut out = String::new();
        for (i, ident) in self.idents.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&ident.name);
        }
        out
    }
}

/// A type reference in source position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    /// A (possibly qualified) named type: `i32`, `geometry.Point`.
    Name(QualifiedName),
    /// A function type: `fn(i32, f64) -> bool`.
    Function {
        parameters: Vec<TypeRef>,
        return_type: Box<TypeRef>,
        span: Span,
    },
}

impl TypeRef {
    /// Shorthand for a simple named type with a dummy span.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Name(QualifiedName::simple(name))
    }

    pub fn span(&self) -> Span {
        match self {
            TypeRef::Name(qn) => qn.span,
            TypeRef::Function { span, .. } => *span,
        }
    }
}
