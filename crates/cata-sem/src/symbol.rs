//! Symbols: the binding of an FQN to a declaration site, an emitted LLIR
//! value, and a type.

use cata_common::Span;
use indexmap::IndexMap;

use crate::types::TypeId;

/// The emitted LLIR value backing a symbol, once emission produced one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolValue {
    Function(cata_llir::FuncId),
    Global(cata_llir::GlobalId),
    /// A stack slot or argument inside the current function.
    Local(cata_llir::ValueId),
}

/// One entry in the symbol table.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// Declaration site, for diagnostics.
    pub span: Span,
    /// Emitted value; `None` until the prototype pass or emitter produces
    /// one.
    pub value: Option<SymbolValue>,
    pub ty: TypeId,
    /// Loaded from a bundle rather than declared here; skipped when the
    /// session is re-serialised.
    pub imported: bool,
}

impl Symbol {
    pub fn new(span: Span, ty: TypeId) -> Self {
        Symbol {
            span,
            value: None,
            ty,
            imported: false,
        }
    }
}

/// The process-wide symbol map, keyed by FQN. Iteration order is insertion
/// order, which makes every downstream walk deterministic.
pub type SymbolTable = IndexMap<String, Symbol>;
