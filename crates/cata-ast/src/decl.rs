//! Declaration nodes: functions, variables, structs, classes, interfaces,
//! namespaces.

use cata_common::Span;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::stmt::Statement;
use crate::types::TypeRef;
use crate::Ident;

/// Classifier keywords attached to declarations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classifier {
    Public,
    Private,
    Protected,
    Virtual,
    Static,
    Abstract,
    Override,
}

impl Classifier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Classifier::Public => "public",
            Classifier::Private => "private",
            Classifier::Protected => "protected",
            Classifier::Virtual => "virtual",
            Classifier::Static => "static",
            Classifier::Abstract => "abstract",
            Classifier::Override => "override",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "public" => Classifier::Public,
            "private" => Classifier::Private,
            "protected" => Classifier::Protected,
            "virtual" => Classifier::Virtual,
            "static" => Classifier::Static,
            "abstract" => Classifier::Abstract,
            "override" => Classifier::Override,
            _ => return None,
        })
    }
}

/// A function parameter: `name: type`. The type annotation is syntactically
/// optional but its absence is a semantic error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FnParameter {
    pub ident: Ident,
    pub ty: Option<TypeRef>,
    pub span: Span,
}

impl FnParameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        FnParameter {
            ident: Ident::synthetic(name),
            ty: Some(ty),
            span: Span::dummy(),
        }
    }
}

/// A function body: either a statement block or a single expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FnBody {
    Block(Vec<Statement>),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub ident: Ident,
    pub parameters: Vec<FnParameter>,
    pub return_type: Option<TypeRef>,
    pub body: Option<FnBody>,
    pub classifiers: Vec<Classifier>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ident: Ident,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
    pub is_const: bool,
    pub classifiers: Vec<Classifier>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub ident: Ident,
    pub declarations: Vec<Decl>,
    pub classifiers: Vec<Classifier>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub ident: Ident,
    pub super_types: Vec<TypeRef>,
    pub declarations: Vec<Decl>,
    pub classifiers: Vec<Classifier>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfaceDecl {
    pub ident: Ident,
    pub super_types: Vec<TypeRef>,
    pub declarations: Vec<Decl>,
    pub classifiers: Vec<Classifier>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NsDecl {
    pub ident: Ident,
    pub declarations: Vec<Decl>,
    /// File-level `ns X`: the namespace's bare name becomes the FQN root.
    pub is_global: bool,
    pub classifiers: Vec<Classifier>,
    pub span: Span,
}

/// Any declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Fn(FnDecl),
    Var(VarDecl),
    Struct(StructDecl),
    Class(ClassDecl),
    Iface(IfaceDecl),
    Ns(NsDecl),
}

impl Decl {
    pub fn ident(&self) -> &Ident {
        match self {
            Decl::Fn(d) => &d.ident,
            Decl::Var(d) => &d.ident,
            Decl::Struct(d) => &d.ident,
            Decl::Class(d) => &d.ident,
            Decl::Iface(d) => &d.ident,
            Decl::Ns(d) => &d.ident,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Fn(d) => d.span,
            Decl::Var(d) => d.span,
            Decl::Struct(d) => d.span,
            Decl::Class(d) => d.span,
            Decl::Iface(d) => d.span,
            Decl::Ns(d) => d.span,
        }
    }

    pub fn classifiers(&self) -> &[Classifier] {
        match self {
            Decl::Fn(d) => &d.classifiers,
            Decl::Var(d) => &d.classifiers,
            Decl::Struct(d) => &d.classifiers,
            Decl::Class(d) => &d.classifiers,
            Decl::Iface(d) => &d.classifiers,
            Decl::Ns(d) => &d.classifiers,
        }
    }
}

/// Convenience constructors used heavily by tests and tools that build ASTs
/// without a parser.
impl FnDecl {
    pub fn new(name: impl Into<String>, parameters: Vec<FnParameter>, body: Vec<Statement>) -> Self {
        FnDecl {
            ident: Ident::synthetic(name),
            parameters,
            return_type: None,
            body: Some(FnBody::Block(body)),
            classifiers: Vec::new(),
            span: Span::dummy(),
        }
    }

    #[must_use]
    pub fn with_return_type(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    #[must_use]
    pub fn with_classifiers(mut self, classifiers: Vec<Classifier>) -> Self {
        self.classifiers = classifiers;
        self
    }
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: Option<TypeRef>, init: Option<Expr>) -> Self {
        VarDecl {
            ident: Ident::synthetic(name),
            ty,
            init,
            is_const: false,
            classifiers: Vec::new(),
            span: Span::dummy(),
        }
    }
}
