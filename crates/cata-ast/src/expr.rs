//! Expression nodes.

use cata_common::numeric::Fraction;
use cata_common::Span;
use serde::{Deserialize, Serialize};

use crate::types::TypeRef;
use crate::Ident;

/// Suffix classifier on a numeric literal (`12u`, `3f32`, `7z`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericClassifier {
    #[default]
    None,
    /// `u`
    Unsigned,
    /// `i`
    Signed,
    /// `z`
    Size,
    Signed8,
    Unsigned8,
    Signed16,
    Unsigned16,
    Signed32,
    Unsigned32,
    Signed64,
    Unsigned64,
    Signed128,
    Unsigned128,
    /// `f`
    Float,
    Float16,
    Float32,
    Float64,
    Float80,
    Float128,
}

/// A numeric literal, decomposed by the parser into sign, integer part,
/// optional fraction, optional exponent, and optional suffix classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericLiteral {
    pub sign: i32,
    pub integer: u64,
    pub fraction: Option<Fraction>,
    pub exponent: Option<i16>,
    pub classifier: NumericClassifier,
    pub span: Span,
}

impl NumericLiteral {
    /// A bare integer literal with no suffix.
    pub fn int(value: i64) -> Self {
        NumericLiteral {
            sign: if value < 0 { -1 } else { 1 },
            integer: value.unsigned_abs(),
            fraction: None,
            exponent: None,
            classifier: NumericClassifier::None,
            span: Span::dummy(),
        }
    }

    /// A literal with a fractional part, e.g. `4.0`.
    pub fn float(integer: u64, fraction_digits: u64, fraction_width: u8) -> Self {
        NumericLiteral {
            sign: 1,
            integer,
            fraction: Some(Fraction::new(fraction_digits, fraction_width)),
            exponent: None,
            classifier: NumericClassifier::None,
            span: Span::dummy(),
        }
    }

    /// Whether the literal's written form makes it floating-point: it has a
    /// fraction or a negative exponent.
    pub fn is_float_form(&self) -> bool {
        self.fraction.is_some() || self.exponent.is_some_and(|e| e < 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryArithOp {
    Negate,
    Complement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryArithOp {
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    BitLsh,
    BitRsh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryLogicalOp {
    And,
    Or,
}

/// An expression node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Ident(Ident),
    LiteralBool {
        value: bool,
        span: Span,
    },
    LiteralNumeric(NumericLiteral),
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        span: Span,
    },
    MemberAccess {
        object: Box<Expr>,
        member: Ident,
        span: Span,
    },
    UnaryArith {
        op: UnaryArithOp,
        operand: Box<Expr>,
        span: Span,
    },
    BinaryArith {
        op: BinaryArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    BinaryLogical {
        op: BinaryLogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Cast {
        expr: Box<Expr>,
        target: TypeRef,
        span: Span,
    },
    Assignment {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(ident) => ident.span,
            Expr::LiteralBool { span, .. } => *span,
            Expr::LiteralNumeric(lit) => lit.span,
            Expr::Call { span, .. } => *span,
            Expr::MemberAccess { span, .. } => *span,
            Expr::UnaryArith { span, .. } => *span,
            Expr::BinaryArith { span, .. } => *span,
            Expr::BinaryLogical { span, .. } => *span,
            Expr::Cast { span, .. } => *span,
            Expr::Assignment { span, .. } => *span,
        }
    }

    /// Shorthand for an identifier expression.
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(Ident::synthetic(name))
    }

    /// Shorthand for `object.member` where the object is an identifier.
    pub fn member(object: impl Into<String>, member: impl Into<String>) -> Self {
        Expr::MemberAccess {
            object: Box::new(Expr::ident(object)),
            member: Ident::synthetic(member),
            span: Span::dummy(),
        }
    }

    /// Shorthand for a call with an identifier callee.
    pub fn call(callee: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(Expr::ident(callee)),
            arguments,
            span: Span::dummy(),
        }
    }

    /// Shorthand for a binary arithmetic expression.
    pub fn binary(lhs: Expr, op: BinaryArithOp, rhs: Expr) -> Self {
        Expr::BinaryArith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span: Span::dummy(),
        }
    }
}
