//! The locals pass: runs inside the prototype pass, per function, until it
//! reports no further changes. Adds local variables to the symbol table and
//! infers their types; observes `return` statements to infer the enclosing
//! function's return type.
//!
//! Expression statements are not recursed into, so declarations introduced
//! by expressions are not picked up.

use cata_ast::{Decl, FnBody, FnDecl, Statement, VarDecl};
use cata_common::Span;

use crate::expr_type::expr_resulting_type;
use crate::pass::block_scope_name;
use crate::state::SemState;
use crate::symbol::Symbol;
use crate::types::Type;

/// One iteration over `decl`'s body. Returns the number of symbols added
/// or type-refined; `n` is the enclosing prototype-pass iteration.
pub fn locals_pass_fn(state: &mut SemState, n: usize, decl: &FnDecl) -> usize {
    let method_owner = state.enclosing_custom();
    state.scopes.enter(&decl.ident.name);

    let mut changes = 0;
    if n == 0 {
        // methods see their receiver as `this`
        if let Some(owner) = method_owner {
            let this_ty = state.types.object(owner);
            let key = state.scopes.fqn("this");
            state.symbols.insert(key, Symbol::new(Span::dummy(), this_ty));
            changes += 1;
        }
        for param in &decl.parameters {
            let Some(param_ty) = &param.ty else {
                state.error("Parameter has no type", param.span);
                state.scopes.leave();
                return 0;
            };
            let key = state.scopes.fqn(&param.ident.name);
            let ty = state.resolve_type_ref(param_ty);
            state
                .symbols
                .insert(key, Symbol::new(param.ident.span, ty));
            changes += 1;
        }
    }

    if let Some(FnBody::Block(statements)) = &decl.body {
        changes = walk_statements(state, n, statements);
    }

    state.scopes.leave();
    changes
}

fn walk_statements(state: &mut SemState, n: usize, statements: &[Statement]) -> usize {
    let mut changes = 0;
    for stmt in statements {
        changes += walk_statement(state, n, stmt);
    }
    changes
}

fn walk_statement(state: &mut SemState, n: usize, stmt: &Statement) -> usize {
    match stmt {
        Statement::Decl(decl) => walk_decl(state, n, decl),
        Statement::Return { expr, span } => walk_return(state, expr.as_ref(), *span),
        Statement::If { then, else_, .. } => {
            let mut changes = walk_statement(state, n, then);
            if let Some(else_stmt) = else_ {
                changes += walk_statement(state, n, else_stmt);
            }
            changes
        }
        Statement::Block { statements, span } => {
            state.scopes.enter(block_scope_name(*span));
            let changes = walk_statements(state, n, statements);
            state.scopes.leave();
            changes
        }
        Statement::Expr(_) => 0,
        Statement::For { span, .. } => {
            state.error("Choices exhausted", *span);
            0
        }
    }
}

fn walk_decl(state: &mut SemState, n: usize, decl: &Decl) -> usize {
    match decl {
        Decl::Var(d) => walk_var(state, n, d),
        Decl::Fn(d) => locals_pass_fn(state, n, d),
        Decl::Struct(d) => {
            state.error("Local structs not supported (yet)", d.span);
            0
        }
        _ => {
            state.error("Choices exhausted", decl.span());
            0
        }
    }
}

fn walk_var(state: &mut SemState, n: usize, decl: &VarDecl) -> usize {
    let key = state.scopes.fqn(&decl.ident.name);
    let mut changes = 0;

    let introduced = if state.symbols.contains_key(&key) {
        false
    } else {
        let undefined = state.types.undefined();
        state
            .symbols
            .insert(key.clone(), Symbol::new(decl.ident.span, undefined));
        true
    };

    if n == 0 && !introduced {
        state.error("Symbol redefined", decl.ident.span);
        return 0;
    }
    if introduced {
        changes = 1;
    }

    let new_ty = if let Some(ty) = &decl.ty {
        state.resolve_type_ref(ty)
    } else if let Some(init) = &decl.init {
        expr_resulting_type(state, init, None)
    } else {
        return changes;
    };

    let current = state.symbols[&key].ty;
    if !state.types.types_equal(current, new_ty) {
        state.symbols[&key].ty = new_ty;
        changes = 1;
    }
    changes
}

fn walk_return(state: &mut SemState, expr: Option<&cata_ast::Expr>, _span: Span) -> usize {
    state.current_function_has_return = true;

    let expr_ty = match expr {
        Some(e) => expr_resulting_type(state, e, None),
        None => state.types.void(),
    };

    let Some(fn_key) = state.current_function_fqn.clone() else {
        return 0;
    };
    let Some(fn_ty) = state.symbol_type(&fn_key) else {
        return 0;
    };
    let Some(f) = state.types.as_function(fn_ty).cloned() else {
        return 0;
    };

    if !state.types.is_valid(f.return_type) && state.types.is_valid(expr_ty) {
        let mut refined = f;
        refined.return_type = expr_ty;
        state.types.replace(fn_ty, Type::Function(refined));
        return 1;
    }
    0
}
