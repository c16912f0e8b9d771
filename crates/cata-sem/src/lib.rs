//! Semantic core of the cata compiler.
//!
//! This crate provides:
//! - The type universe (`TypeArena`, `TypeId`) with FQN encoding,
//!   assignability, and specialization scoring
//! - Members, member locators, and the inheritance machinery (virtual
//!   member enumeration, layout indices)
//! - The symbol table and scope stack
//! - The pass framework and the resolution passes (overload renaming,
//!   prototype fixed point, locals)
//! - Call-site overload resolution and expression result typing
//! - Lowering of semantic types to LLIR types

pub mod classifiers;
pub mod decl_type;
pub mod expr_type;
pub mod lower;
pub mod member;
pub mod object;
pub mod overload;
pub mod pass;
pub mod passes;
pub mod pipeline;
pub mod scope;
pub mod state;
pub mod symbol;
pub mod types;

pub use member::{canonical_name, Member, MemberKind, MemberLocator};
pub use pass::{block_scope_name, walk_decl, walk_unit, PassHooks};
pub use pipeline::resolve;
pub use scope::ScopeStack;
pub use state::SemState;
pub use symbol::{Symbol, SymbolTable, SymbolValue};
pub use types::{CustomKind, CustomType, FunctionType, Primitive, Type, TypeArena, TypeId};
