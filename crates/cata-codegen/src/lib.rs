//! LLIR emission for the cata compiler.
//!
//! Runs after the resolution fixed point: walks the AST once more and emits
//! every declaration into the session's module: function bodies, global
//! initialisation, struct/class init routines, vtable metadata objects,
//! and this-adjusting thunks for multiple inheritance.

pub mod class;
pub mod decl;
pub mod expr;
pub mod session;
pub mod stmt;

pub use session::{compile, run_main, CompileSession};
