//! Low-level SSA intermediate representation for the cata compiler.
//!
//! This crate is the code-emission surface the semantic core targets:
//! - A type context (`Context`, `TyId`) with integer/float/pointer/struct/
//!   array/function types and layout queries
//! - A `Module` holding globals, functions, basic blocks, and values
//! - A `Builder` with an insertion cursor and the usual emission primitives
//!   (`alloca`, `load`, `store`, `gep`, casts, branches, `phi`, `call`, ...)
//! - A textual dump for debugging
//! - `eval`, an interpreter over emitted modules, used by the end-to-end
//!   tests and by `catac --run` in place of an external JIT backend
//! - `verify`, structural sanity checks run after emission

pub mod builder;
pub mod display;
pub mod eval;
pub mod module;
pub mod types;
pub mod verify;

pub use builder::{Builder, InsertPoint};
pub use module::{
    BlockId, Callee, CastOp, Constant, FuncId, Function, Global, GlobalId, ICmpPred, Inst, IntBinOp,
    Linkage, Module, ParamAttr, UnOp, ValueDef, ValueId, ValueKind,
};
pub use types::{Context, FloatKind, TyId, TyKind};
