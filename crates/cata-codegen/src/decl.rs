//! Declaration emission: function bodies, global initialisation, struct /
//! class / interface init routines and metadata, namespaces.

use cata_ast::{
    ClassDecl, Decl, FnBody, FnDecl, IfaceDecl, NsDecl, StructDecl, TranslationUnit, VarDecl,
};
use cata_llir::BlockId;
use cata_sem::classifiers::{
    check_class_classifiers, check_fn_classifiers, check_iface_classifiers, check_ns_classifiers,
    check_struct_classifiers, check_var_classifiers,
};
use cata_sem::expr_type::expr_resulting_type;
use cata_sem::lower::{default_value, llir_struct_of, llir_type_of};
use cata_sem::{MemberKind, SemState, SymbolValue, Type, TypeId};
use tracing::debug;

use crate::class::{emit_super_init_chain, metadata_object};
use crate::expr::{emit_coercion, emit_expr};
use crate::stmt::{branch_unless_terminated, current_block_terminated, emit_stmt};

/// Emit every declaration of the unit, then seal the module init function.
pub fn emit_unit(state: &mut SemState, tu: &TranslationUnit) {
    let init = state.init_function;
    if state.builder.module.function(init).blocks.is_empty() {
        state.builder.module.append_block(init, "entry");
    }

    for decl in &tu.declarations {
        emit_decl(state, decl);
    }

    state.builder.position_at_end(init, BlockId(0));
    state.builder.build_ret_void();
    state.builder.clear_position();
}

pub fn emit_decl(state: &mut SemState, decl: &Decl) {
    match decl {
        Decl::Fn(d) => emit_fn(state, d),
        Decl::Var(d) => emit_global_var(state, d),
        Decl::Struct(d) => emit_struct(state, d),
        Decl::Class(d) => emit_class(state, d),
        Decl::Iface(d) => emit_iface(state, d),
        Decl::Ns(d) => emit_ns(state, d),
    }
}

/// Emit a function body into the shell the prototype pass created: one
/// entry block, stack slots for parameters and the return value, the body,
/// and a single return block.
pub fn emit_fn(state: &mut SemState, decl: &FnDecl) {
    if !check_fn_classifiers(state, decl) {
        return;
    }
    let key = state.scopes.fqn(&decl.ident.name);
    let Some(sym) = state.symbols.get(&key) else {
        return;
    };
    let fn_sem_ty = sym.ty;
    let Some(SymbolValue::Function(func)) = sym.value else {
        return;
    };
    let Some(body) = &decl.body else {
        return;
    };
    let f = match state.types.get(fn_sem_ty) {
        Type::Function(f) => f.clone(),
        _ => return,
    };
    debug!(name = %key, "emitting function body");

    let saved_point = state.builder.insert_point();
    let saved_func = state.current_function;
    let saved_slot = state.current_return_slot;
    let saved_block = state.current_return_block;
    let saved_fqn = state.current_function_fqn.replace(key.clone());

    let entry = state.builder.module.append_block(func, "entry");
    let ret_block = state.builder.module.append_block(func, "ret");
    state.current_function = Some(func);
    state.current_return_block = Some(ret_block);
    state.builder.position_at_end(func, entry);

    // return slot
    let is_void = matches!(state.types.get(f.return_type), Type::Void);
    state.current_return_slot = if is_void {
        None
    } else {
        let lowered = return_slot_type(state, f.return_type);
        Some(state.builder.build_alloca(lowered, "retval"))
    };

    // parameter slots
    state.scopes.enter(&decl.ident.name);
    let params = state.builder.module.function(func).params.clone();
    let offset = usize::from(f.method_of.is_some());
    if let Some(&this_arg) = params.first() {
        if f.method_of.is_some() {
            let ptr = state.builder.module.types.ptr();
            let slot = state.builder.build_alloca(ptr, "this.addr");
            state.builder.build_store(this_arg, slot);
            let this_key = state.scopes.fqn("this");
            if let Some(sym) = state.symbols.get_mut(&this_key) {
                sym.value = Some(SymbolValue::Local(slot));
            }
        }
    }
    for (i, &param_ty) in f.parameters.iter().enumerate() {
        let arg = params[i + offset];
        let slot_ty = if state.types.object_custom(param_ty).is_some() {
            state.builder.module.types.ptr()
        } else {
            llir_type_of(state, param_ty)
        };
        let param_name = decl.parameters[i].ident.name.clone();
        let slot = state
            .builder
            .build_alloca(slot_ty, &format!("{param_name}.addr"));
        state.builder.build_store(arg, slot);
        let param_key = state.scopes.fqn(&param_name);
        if let Some(sym) = state.symbols.get_mut(&param_key) {
            sym.value = Some(SymbolValue::Local(slot));
        }
    }

    // body
    match body {
        FnBody::Block(statements) => {
            for stmt in statements {
                if current_block_terminated(state) {
                    break;
                }
                emit_stmt(state, stmt);
            }
        }
        FnBody::Expr(expr) => {
            let expecting = Some(f.return_type);
            if let Some(value) = emit_expr(state, expr, expecting) {
                if let Some(slot) = state.current_return_slot {
                    let value_ty = expr_resulting_type(state, expr, expecting);
                    if let Some(coerced) =
                        emit_coercion(state, value, value_ty, f.return_type, expr.span())
                    {
                        state.builder.build_store(coerced, slot);
                    }
                }
            }
        }
    }
    branch_unless_terminated(state, ret_block);

    // single return block
    state.builder.position_at_end(func, ret_block);
    match state.current_return_slot {
        Some(slot) => {
            let lowered = return_slot_type(state, f.return_type);
            let value = state.builder.build_load(lowered, slot, "retload");
            state.builder.build_ret(value);
        }
        None => {
            state.builder.build_ret_void();
        }
    }

    state.scopes.leave();
    state.current_function_fqn = saved_fqn;
    state.current_function = saved_func;
    state.current_return_slot = saved_slot;
    state.current_return_block = saved_block;
    state.builder.restore_point(saved_point);
}

fn return_slot_type(state: &mut SemState, ret_ty: TypeId) -> cata_llir::TyId {
    if state.types.object_custom(ret_ty).is_some() {
        state.builder.module.types.ptr()
    } else {
        llir_type_of(state, ret_ty)
    }
}

/// Emit a module-level variable's initialiser into the init function.
fn emit_global_var(state: &mut SemState, decl: &VarDecl) {
    if !check_var_classifiers(state, decl) {
        return;
    }
    let Some(init) = &decl.init else {
        return;
    };
    let key = state.scopes.fqn(&decl.ident.name);
    let Some(sym) = state.symbols.get(&key) else {
        return;
    };
    let ty = sym.ty;
    let Some(SymbolValue::Global(global)) = sym.value else {
        return;
    };

    let saved = state.builder.insert_point();
    let saved_func = state.current_function;
    let init_fn = state.init_function;
    state.builder.position_at_end(init_fn, BlockId(0));
    state.current_function = Some(init_fn);

    if let Some(value) = emit_expr(state, init, Some(ty)) {
        let value_ty = expr_resulting_type(state, init, Some(ty));
        if let Some(coerced) = emit_coercion(state, value, value_ty, ty, decl.span) {
            let addr = state.builder.module.global_value(global);
            state.builder.build_store(coerced, addr);
        }
    }

    state.current_function = saved_func;
    state.builder.restore_point(saved);
}

/// Emit a struct: its init function (field initialisers or zero values)
/// and its methods.
fn emit_struct(state: &mut SemState, decl: &StructDecl) {
    if !check_struct_classifiers(state, decl) {
        return;
    }
    let key = state.scopes.fqn(&decl.ident.name);
    let Some(custom) = state.symbol_type(&key).filter(|&t| state.types.is_custom(t)) else {
        return;
    };
    let Some(init) = state.types.custom(custom).and_then(|c| c.init_function) else {
        return;
    };

    let saved_func = state.current_function;
    let entry = state.builder.module.append_block(init, "init");
    let this_ptr = state.builder.module.function(init).params[0];
    state.current_function = Some(init);

    state.scopes.enter(&decl.ident.name);
    state.builder.position_at_end(init, entry);
    emit_field_initialisers(state, custom, this_ptr, &decl.declarations);
    state.builder.build_ret_void();

    // methods
    for inner in &decl.declarations {
        if let Decl::Fn(f) = inner {
            emit_fn(state, f);
        }
    }
    state.scopes.leave();
    state.current_function = saved_func;
    state.builder.clear_position();
}

/// Emit a class: init function (own vtable store, super init chain with
/// presenting-as metadata overwrites, field initialisers), methods, and
/// the metadata object.
fn emit_class(state: &mut SemState, decl: &ClassDecl) {
    if !check_class_classifiers(state, decl) {
        return;
    }
    let key = state.scopes.fqn(&decl.ident.name);
    let Some(custom) = state.symbol_type(&key).filter(|&t| state.types.is_custom(t)) else {
        return;
    };
    let Some(init) = state.types.custom(custom).and_then(|c| c.init_function) else {
        return;
    };

    let saved_func = state.current_function;
    let entry = state.builder.module.append_block(init, "init");
    let this_ptr = state.builder.module.function(init).params[0];
    state.current_function = Some(init);

    state.scopes.enter(&decl.ident.name);
    state.builder.position_at_end(init, entry);

    // own vtable pointer at offset 0
    if let Some(meta) = metadata_object(state, custom, custom) {
        let meta_val = state.builder.module.global_value(meta);
        state.builder.build_store(meta_val, this_ptr);
    }

    // supers: init each subobject, then present it as this class
    let _ = emit_super_init_chain(state, custom, custom, this_ptr);

    emit_field_initialisers(state, custom, this_ptr, &decl.declarations);
    state.builder.build_ret_void();

    for inner in &decl.declarations {
        if let Decl::Fn(f) = inner {
            emit_fn(state, f);
        }
    }
    state.scopes.leave();
    state.current_function = saved_func;
    state.builder.clear_position();
}

/// Emit an interface: method bodies where present, plus its own metadata
/// object.
fn emit_iface(state: &mut SemState, decl: &IfaceDecl) {
    if !check_iface_classifiers(state, decl) {
        return;
    }
    let key = state.scopes.fqn(&decl.ident.name);
    let Some(custom) = state.symbol_type(&key).filter(|&t| state.types.is_custom(t)) else {
        return;
    };

    state.scopes.enter(&decl.ident.name);
    for inner in &decl.declarations {
        match inner {
            Decl::Fn(f) if f.body.is_some() => emit_fn(state, f),
            Decl::Fn(_) => {}
            other => {
                state.error("Unsupported declaration type for interface", other.span());
            }
        }
    }
    state.scopes.leave();

    metadata_object(state, custom, custom);
}

fn emit_ns(state: &mut SemState, decl: &NsDecl) {
    if !check_ns_classifiers(state, decl) {
        return;
    }
    state.scopes.enter(&decl.ident.name);
    for inner in &decl.declarations {
        emit_decl(state, inner);
    }
    state.scopes.leave();
}

/// Store every non-method member's initialiser (or its type's zero value)
/// through the member's residence-relative address.
fn emit_field_initialisers(
    state: &mut SemState,
    custom: TypeId,
    this_ptr: cata_llir::ValueId,
    decls: &[Decl],
) {
    for inner in decls {
        let Decl::Var(var) = inner else { continue };
        let Some(locator) = state.types.get_member(custom, &var.ident.name) else {
            continue;
        };
        if state.types.locate(locator).kind == MemberKind::Method {
            continue;
        }
        let member_ty = state.types.locate(locator).ty;
        let Some(index) = state.types.member_field_index(locator) else {
            continue;
        };
        let shape = llir_struct_of(state, locator.residence);
        let addr = state
            .builder
            .build_struct_gep(shape, this_ptr, index, &var.ident.name);

        if let Some(init) = &var.init {
            if let Some(value) = emit_expr(state, init, Some(member_ty)) {
                let value_ty = expr_resulting_type(state, init, Some(member_ty));
                if let Some(coerced) = emit_coercion(state, value, value_ty, member_ty, var.span) {
                    state.builder.build_store(coerced, addr);
                }
            }
        } else if let Some(zero) = default_value(state, member_ty) {
            state.builder.build_store(zero, addr);
        }
    }
}
