//! Statement emission.

use cata_ast::{Decl, Expr, Statement};
use cata_sem::block_scope_name;
use cata_sem::expr_type::expr_resulting_type;
use cata_sem::lower::llir_type_of;
use cata_sem::{SemState, SymbolValue, Type};

use crate::expr::{emit_coercion, emit_condition, emit_expr};

pub fn emit_stmt(state: &mut SemState, stmt: &Statement) {
    match stmt {
        Statement::Expr(expr) => {
            emit_expr(state, expr, None);
        }
        Statement::Decl(decl) => emit_local_decl(state, decl),
        Statement::Return { expr, span } => emit_return(state, expr.as_ref(), *span),
        Statement::If {
            cond, then, else_, ..
        } => emit_if(state, cond, then, else_.as_deref()),
        Statement::Block { statements, span } => {
            state.scopes.enter(block_scope_name(*span));
            for inner in statements {
                if current_block_terminated(state) {
                    break;
                }
                emit_stmt(state, inner);
            }
            state.scopes.leave();
        }
        Statement::For { span, .. } => {
            state.error("unsupported statement type", *span);
        }
    }
}

/// A local variable: stack storage plus the optional initialising store.
/// The locals pass already typed the symbol.
fn emit_local_decl(state: &mut SemState, decl: &Decl) {
    let Decl::Var(var) = decl else {
        // local functions were emitted as their own symbols
        if let Decl::Fn(f) = decl {
            crate::decl::emit_fn(state, f);
        }
        return;
    };
    let key = state.scopes.fqn(&var.ident.name);
    let Some(ty) = state.symbol_type(&key) else {
        return;
    };

    // objects live behind pointers; primitives inline
    let slot_ty = if state.types.object_custom(ty).is_some() {
        state.builder.module.types.ptr()
    } else {
        llir_type_of(state, ty)
    };
    let slot = state.builder.build_alloca(slot_ty, &var.ident.name);
    if let Some(sym) = state.symbols.get_mut(&key) {
        sym.value = Some(SymbolValue::Local(slot));
    }

    if let Some(init) = &var.init {
        let Some(value) = emit_expr(state, init, Some(ty)) else {
            return;
        };
        let init_ty = expr_resulting_type(state, init, Some(ty));
        if let Some(coerced) = emit_coercion(state, value, init_ty, ty, var.span) {
            state.builder.build_store(coerced, slot);
        }
    }
}

/// `return expr` stores the (possibly coerced) result in the return slot
/// and branches to the function's single return block.
fn emit_return(state: &mut SemState, expr: Option<&Expr>, span: cata_common::Span) {
    let Some(ret_block) = state.current_return_block else {
        state.error("`return` outside of a function", span);
        return;
    };
    if let Some(expr) = expr {
        let ret_ty = state
            .current_function_fqn
            .clone()
            .and_then(|fqn| state.symbol_type(&fqn))
            .and_then(|fn_ty| match state.types.get(fn_ty) {
                Type::Function(f) => Some(f.return_type),
                _ => None,
            });
        let Some(value) = emit_expr(state, expr, ret_ty) else {
            return;
        };
        // void functions still evaluate the expression for its effects
        if let Some(slot) = state.current_return_slot {
            if let Some(ret_ty) = ret_ty {
                let value_ty = expr_resulting_type(state, expr, Some(ret_ty));
                if let Some(coerced) = emit_coercion(state, value, value_ty, ret_ty, span) {
                    state.builder.build_store(coerced, slot);
                }
            } else {
                state.builder.build_store(value, slot);
            }
        }
    }
    state.builder.build_br(ret_block);
}

/// `if` lowers the condition to `i1` via not-equal-zero, branches through
/// then/else blocks, and falls through to a merge block.
fn emit_if(state: &mut SemState, cond: &Expr, then: &Statement, else_: Option<&Statement>) {
    let Some(func) = state.current_function else {
        return;
    };
    let Some(cond_val) = emit_condition(state, cond) else {
        return;
    };

    let then_bb = state.builder.module.append_block(func, "then");
    let else_bb = state.builder.module.append_block(func, "else");
    let merge_bb = state.builder.module.append_block(func, "ifcont");

    state.builder.build_cond_br(cond_val, then_bb, else_bb);

    state.builder.position_at_end(func, then_bb);
    emit_stmt(state, then);
    branch_unless_terminated(state, merge_bb);

    state.builder.position_at_end(func, else_bb);
    if let Some(else_stmt) = else_ {
        emit_stmt(state, else_stmt);
    }
    branch_unless_terminated(state, merge_bb);

    state.builder.position_at_end(func, merge_bb);
}

/// Append a branch to `dest` unless the current block already ends in a
/// terminator (an arm that returned stays returned).
pub fn branch_unless_terminated(state: &mut SemState, dest: cata_llir::BlockId) {
    if current_block_terminated(state) {
        return;
    }
    state.builder.build_br(dest);
}

pub fn current_block_terminated(state: &SemState) -> bool {
    let Some(at) = state.builder.insert_point() else {
        return true;
    };
    let block = state.builder.module.block(at.func, at.block);
    match block.insts.last() {
        Some(&last) => match &state.builder.module.value(last).kind {
            cata_llir::ValueKind::Inst(inst) => inst.is_terminator(),
            _ => false,
        },
        None => false,
    }
}
