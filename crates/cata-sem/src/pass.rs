//! The pass framework: polymorphic hooks invoked over every declaration as
//! the walker descends, with scope entry/exit handled centrally. Hooks
//! return a count of changes; the walker returns the sum, which the
//! fixed-point driver uses to decide whether to run again.

use cata_ast::{Decl, FnBody, Statement, TranslationUnit};
use cata_common::Span;

use crate::state::SemState;

/// The synthetic scope name of a block statement, keyed by its identity
/// (its position in the source buffer).
pub fn block_scope_name(span: Span) -> String {
    format!("{:x}", span.start)
}

/// Per-declaration hooks. `process_*` runs before descending into the
/// declaration's scope, `process_after_*` after leaving it.
pub trait PassHooks {
    fn process_fn(&mut self, _state: &mut SemState, _decl: &cata_ast::FnDecl) -> usize {
        0
    }
    fn process_after_fn(&mut self, _state: &mut SemState, _decl: &cata_ast::FnDecl) -> usize {
        0
    }
    fn process_var(&mut self, _state: &mut SemState, _decl: &cata_ast::VarDecl) -> usize {
        0
    }
    fn process_struct(&mut self, _state: &mut SemState, _decl: &cata_ast::StructDecl) -> usize {
        0
    }
    fn process_after_struct(&mut self, _state: &mut SemState, _decl: &cata_ast::StructDecl) -> usize {
        0
    }
    fn process_class(&mut self, _state: &mut SemState, _decl: &cata_ast::ClassDecl) -> usize {
        0
    }
    fn process_after_class(&mut self, _state: &mut SemState, _decl: &cata_ast::ClassDecl) -> usize {
        0
    }
    fn process_iface(&mut self, _state: &mut SemState, _decl: &cata_ast::IfaceDecl) -> usize {
        0
    }
    fn process_after_iface(&mut self, _state: &mut SemState, _decl: &cata_ast::IfaceDecl) -> usize {
        0
    }
    fn process_ns(&mut self, _state: &mut SemState, _decl: &cata_ast::NsDecl) -> usize {
        0
    }
}

/// Walk the whole translation unit, maintaining the scope stack.
pub fn walk_unit(hooks: &mut dyn PassHooks, state: &mut SemState, tu: &TranslationUnit) -> usize {
    let mut changes = 0;
    for decl in &tu.declarations {
        changes += walk_decl(hooks, state, decl);
    }
    changes
}

pub fn walk_decl(hooks: &mut dyn PassHooks, state: &mut SemState, decl: &Decl) -> usize {
    match decl {
        Decl::Fn(d) => {
            let mut changes = hooks.process_fn(state, d);
            state.scopes.enter(&d.ident.name);
            if let Some(FnBody::Block(statements)) = &d.body {
                for stmt in statements {
                    changes += walk_stmt(hooks, state, stmt);
                }
            }
            state.scopes.leave();
            changes += hooks.process_after_fn(state, d);
            changes
        }
        Decl::Var(d) => hooks.process_var(state, d),
        Decl::Struct(d) => {
            let mut changes = hooks.process_struct(state, d);
            state.scopes.enter(&d.ident.name);
            for inner in &d.declarations {
                changes += walk_decl(hooks, state, inner);
            }
            state.scopes.leave();
            changes += hooks.process_after_struct(state, d);
            changes
        }
        Decl::Class(d) => {
            let mut changes = hooks.process_class(state, d);
            state.scopes.enter(&d.ident.name);
            for inner in &d.declarations {
                changes += walk_decl(hooks, state, inner);
            }
            state.scopes.leave();
            changes += hooks.process_after_class(state, d);
            changes
        }
        Decl::Iface(d) => {
            let mut changes = hooks.process_iface(state, d);
            state.scopes.enter(&d.ident.name);
            for inner in &d.declarations {
                changes += walk_decl(hooks, state, inner);
            }
            state.scopes.leave();
            changes += hooks.process_after_iface(state, d);
            changes
        }
        Decl::Ns(d) => {
            let mut changes = hooks.process_ns(state, d);
            state.scopes.enter(&d.ident.name);
            for inner in &d.declarations {
                changes += walk_decl(hooks, state, inner);
            }
            state.scopes.leave();
            changes
        }
    }
}

fn walk_stmt(hooks: &mut dyn PassHooks, state: &mut SemState, stmt: &Statement) -> usize {
    match stmt {
        Statement::Decl(decl) => walk_decl(hooks, state, decl),
        Statement::If { then, else_, .. } => {
            let mut changes = walk_stmt(hooks, state, then);
            if let Some(else_stmt) = else_ {
                changes += walk_stmt(hooks, state, else_stmt);
            }
            changes
        }
        Statement::Block { statements, span } => {
            let mut changes = 0;
            state.scopes.enter(block_scope_name(*span));
            for inner in statements {
                changes += walk_stmt(hooks, state, inner);
            }
            state.scopes.leave();
            changes
        }
        Statement::For { body, .. } => walk_stmt(hooks, state, body),
        Statement::Expr(_) | Statement::Return { .. } => 0,
    }
}
