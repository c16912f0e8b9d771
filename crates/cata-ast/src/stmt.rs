//! Statement nodes.

use cata_common::Span;
use serde::{Deserialize, Serialize};

use crate::decl::Decl;
use crate::expr::Expr;
use crate::Ident;

/// A statement inside a function body or block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// A nested declaration (local variable, local function).
    Decl(Decl),
    /// An expression evaluated for its side effects.
    Expr(Expr),
    /// `return` with an optional value.
    Return { expr: Option<Expr>, span: Span },
    /// `if cond { then } else { else_ }`.
    If {
        cond: Expr,
        then: Box<Statement>,
        else_: Option<Box<Statement>>,
        span: Span,
    },
    /// Range loop `for i in start..end step`. Accepted by the grammar; the
    /// emitter does not lower it.
    For {
        ident: Ident,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Box<Statement>,
        span: Span,
    },
    /// A braced statement list introducing a scope.
    Block {
        statements: Vec<Statement>,
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Decl(decl) => decl.span(),
            Statement::Expr(expr) => expr.span(),
            Statement::Return { span, .. } => *span,
            Statement::If { span, .. } => *span,
            Statement::For { span, .. } => *span,
            Statement::Block { span, .. } => *span,
        }
    }

    /// Shorthand for `return expr`.
    pub fn ret(expr: Expr) -> Self {
        Statement::Return {
            expr: Some(expr),
            span: Span::dummy(),
        }
    }
}
