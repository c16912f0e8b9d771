//! Expression emission.
//!
//! Every routine takes the compilation state explicitly and returns the
//! produced LLIR value, or `None` after reporting a diagnostic. Object
//! values (struct instances and class handles) are represented as pointers
//! throughout; primitives are loaded into SSA temporaries.

use cata_ast::{BinaryArithOp, Expr, UnaryArithOp};
use cata_llir::{CastOp, ICmpPred, IntBinOp, ValueId};
use cata_sem::expr_type::{expr_resulting_type, numeric_literal_type};
use cata_sem::lower::{llir_struct_of, llir_type_of};
use cata_sem::overload::find_function_overload;
use cata_sem::{CustomKind, MemberLocator, SemState, SymbolValue, Type, TypeId};

use crate::class::{emit_class_cast, subobject_ptr};

/// Emit an expression for its value.
pub fn emit_expr(state: &mut SemState, expr: &Expr, expecting: Option<TypeId>) -> Option<ValueId> {
    match expr {
        Expr::LiteralNumeric(lit) => {
            let ty = numeric_literal_type(state, lit, expecting);
            let lowered = llir_type_of(state, ty);
            let is_float = state.types.as_primitive(ty).map(|p| p.is_float).unwrap_or(false);
            Some(if is_float {
                let value = cata_common::numeric::fold_float(
                    lit.sign,
                    lit.integer,
                    lit.fraction,
                    lit.exponent,
                );
                state.builder.module.const_float(lowered, value)
            } else {
                let value = cata_common::numeric::fold_int(lit.sign, lit.integer, lit.exponent);
                state.builder.module.const_int(lowered, value as i128)
            })
        }
        Expr::LiteralBool { value, .. } => {
            let i1 = state.builder.module.types.bool();
            Some(state.builder.module.const_int(i1, *value as i128))
        }
        Expr::Ident(ident) => emit_ident(state, &ident.name, ident.span),
        Expr::MemberAccess { object, member, .. } => {
            let (addr, member_ty) = member_address(state, object, &member.name, member.span)?;
            // struct fields are inline: their value is their address
            if is_struct_valued(state, member_ty) {
                return Some(addr);
            }
            Some(load_scalar(state, addr, member_ty))
        }
        Expr::Call {
            callee,
            arguments,
            span,
        } => emit_call(state, callee, arguments, expecting, *span),
        Expr::BinaryArith { op, lhs, rhs, span } => {
            let lhs_val = emit_expr(state, lhs, None)?;
            let rhs_val = emit_expr(state, rhs, None)?;
            let lhs_ty = expr_resulting_type(state, lhs, None);
            let rhs_ty = expr_resulting_type(state, rhs, None);
            emit_arithmetic(state, *op, lhs_val, lhs_ty, rhs_val, rhs_ty, *span)
        }
        Expr::UnaryArith { op, operand, span } => {
            let value = emit_expr(state, operand, expecting)?;
            let ty = expr_resulting_type(state, operand, expecting);
            let is_float = state.types.as_primitive(ty).map(|p| p.is_float).unwrap_or(false);
            match op {
                UnaryArithOp::Negate => Some(if is_float {
                    state.builder.build_fneg(value, "negtmp")
                } else {
                    state.builder.build_neg(value, "negtmp")
                }),
                UnaryArithOp::Complement => {
                    if is_float {
                        state.error("Operator not implemented", *span);
                        return None;
                    }
                    Some(state.builder.build_not(value, "xortmp"))
                }
            }
        }
        Expr::BinaryLogical { span, .. } => {
            state.error("Operator not implemented", *span);
            None
        }
        Expr::Cast { expr: inner, target, span } => {
            let value = emit_expr(state, inner, None)?;
            let from = expr_resulting_type(state, inner, None);
            let to = state.resolve_type_ref(target);
            emit_coercion(state, value, from, to, *span)
        }
        Expr::Assignment { lhs, rhs, span } => {
            let Some((addr, lhs_ty)) = emit_lvalue(state, lhs) else {
                state.error("assignment must be towards an lvalue", *span);
                return None;
            };
            let rhs_val = emit_expr(state, rhs, Some(lhs_ty))?;
            let rhs_ty = expr_resulting_type(state, rhs, Some(lhs_ty));
            let coerced = emit_coercion(state, rhs_val, rhs_ty, lhs_ty, *span)?;
            state.builder.build_store(coerced, addr);
            Some(addr)
        }
    }
}

fn emit_ident(state: &mut SemState, name: &str, span: cata_common::Span) -> Option<ValueId> {
    let Some(key) = state.scopes.find_named(&state.symbols, name) else {
        state.error("Unknown identifier", span);
        return None;
    };
    let sym_ty = state.symbols[&key].ty;
    match state.symbols[&key].value {
        Some(SymbolValue::Function(func)) => Some(state.builder.module.function_value(func)),
        Some(SymbolValue::Global(global)) => {
            let addr = state.builder.module.global_value(global);
            // struct-typed globals store the aggregate inline
            if is_struct_valued(state, sym_ty) {
                return Some(addr);
            }
            Some(load_scalar(state, addr, sym_ty))
        }
        // local slots always hold a scalar: the value itself, or the
        // pointer an object travels as
        Some(SymbolValue::Local(slot)) => Some(load_scalar(state, slot, sym_ty)),
        None => {
            state.error("Unknown identifier", span);
            None
        }
    }
}

fn is_struct_valued(state: &SemState, ty: TypeId) -> bool {
    state
        .types
        .object_custom(ty)
        .and_then(|c| state.types.custom_kind(c))
        == Some(CustomKind::Struct)
}

/// Load the scalar stored at `addr`: objects and function values load as
/// pointers, primitives as themselves.
fn load_scalar(state: &mut SemState, addr: ValueId, ty: TypeId) -> ValueId {
    if state.types.object_custom(ty).is_some() || state.types.as_function(ty).is_some() {
        let ptr = state.builder.module.types.ptr();
        return state.builder.build_load(ptr, addr, "objtmp");
    }
    let lowered = llir_type_of(state, ty);
    state.builder.build_load(lowered, addr, "loadtmp")
}

/// The address an assignable expression denotes, with its semantic type.
pub fn emit_lvalue(state: &mut SemState, expr: &Expr) -> Option<(ValueId, TypeId)> {
    match expr {
        Expr::Ident(ident) => {
            let Some(key) = state.scopes.find_named(&state.symbols, &ident.name) else {
                state.error("Unknown identifier", ident.span);
                return None;
            };
            let sym_ty = state.symbols[&key].ty;
            match state.symbols[&key].value {
                Some(SymbolValue::Local(slot)) => Some((slot, sym_ty)),
                Some(SymbolValue::Global(global)) => {
                    let addr = state.builder.module.global_value(global);
                    Some((addr, sym_ty))
                }
                _ => None,
            }
        }
        Expr::MemberAccess { object, member, .. } => {
            member_address(state, object, &member.name, member.span)
        }
        _ => None,
    }
}

/// The address of `object.member`, walking up to the ancestor that
/// physically declares the member.
pub fn member_address(
    state: &mut SemState,
    object: &Expr,
    member_name: &str,
    span: cata_common::Span,
) -> Option<(ValueId, TypeId)> {
    let object_ty = expr_resulting_type(state, object, None);
    let Some(custom) = state.types.object_custom(object_ty) else {
        state.error("Member access on a non-object value", span);
        return None;
    };
    let Some(locator) = state.types.get_member(custom, member_name) else {
        state.error(
            format!("Unknown member `{member_name}`"),
            span,
        );
        return None;
    };
    let base = emit_expr(state, object, None)?;
    let sub = subobject_ptr(state, custom, locator.residence, base)?;
    let member_ty = state.types.locate(locator).ty;
    let Some(index) = state.types.member_field_index(locator) else {
        // a method: its "address" is not a field
        return Some((sub, member_ty));
    };
    let shape = llir_struct_of(state, locator.residence);
    let addr = state
        .builder
        .build_struct_gep(shape, sub, index, member_name);
    Some((addr, member_ty))
}

// ---- calls ----

fn emit_call(
    state: &mut SemState,
    callee: &Expr,
    arguments: &[Expr],
    expecting: Option<TypeId>,
    span: cata_common::Span,
) -> Option<ValueId> {
    match callee {
        Expr::Ident(ident) => {
            // instantiation of a custom type
            if let Some(key) = state.scopes.find_named(&state.symbols, &ident.name) {
                let ty = state.symbols[&key].ty;
                if state.types.is_custom(ty) {
                    return emit_instantiation(state, ty, span);
                }
            }
            let errors_before = state.num_errors();
            let Some(key) =
                find_function_overload(state, &ident.name, arguments, expecting, true, Some(span))
            else {
                if state.num_errors() == errors_before {
                    state.error("Unknown function referenced", ident.span);
                }
                return None;
            };
            let fn_ty = state.symbols[&key].ty;
            let Some(SymbolValue::Function(func)) = state.symbols[&key].value else {
                state.error("Unknown function referenced", ident.span);
                return None;
            };
            let args = lower_arguments(state, fn_ty, arguments, None, span)?;
            Some(state.builder.build_call(func, args, "calltmp"))
        }
        Expr::MemberAccess { object, member, .. } => {
            emit_method_call(state, object, &member.name, arguments, member.span)
        }
        other => {
            // calling through a function-typed value
            let fn_sem_ty = expr_resulting_type(state, other, None);
            if state.types.as_function(fn_sem_ty).is_none() {
                state.error("Called value is not a function", span);
                return None;
            }
            let target = emit_expr(state, other, None)?;
            let args = lower_arguments(state, fn_sem_ty, arguments, None, span)?;
            let lowered = cata_sem::lower::llir_fn_type(state, fn_sem_ty);
            Some(state.builder.build_indirect_call(lowered, target, args, "calltmp"))
        }
    }
}

/// Stack-allocate an instance and run its init function.
fn emit_instantiation(state: &mut SemState, custom: TypeId, span: cata_common::Span) -> Option<ValueId> {
    let shape = llir_struct_of(state, custom);
    let name = state
        .types
        .custom(custom)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    let obj = state.builder.build_alloca(shape, &name);
    let Some(init) = state.types.custom(custom).and_then(|c| c.init_function) else {
        state.error("Type cannot be instantiated", span);
        return None;
    };
    state.builder.build_call(init, vec![obj], "");
    Some(obj)
}

fn emit_method_call(
    state: &mut SemState,
    object: &Expr,
    method_name: &str,
    arguments: &[Expr],
    span: cata_common::Span,
) -> Option<ValueId> {
    let object_ty = expr_resulting_type(state, object, None);
    let Some(custom) = state.types.object_custom(object_ty) else {
        state.error("Method call on a non-object value", span);
        return None;
    };
    let Some(locator) = state.types.get_member_canonical(custom, method_name) else {
        state.error(format!("Unknown member `{method_name}`"), span);
        return None;
    };
    let member = state.types.locate(locator).clone();
    if !member.is_method() && state.types.as_function(member.ty).is_none() {
        state.error(format!("Member `{method_name}` is not callable"), span);
        return None;
    }

    let receiver = emit_expr(state, object, None)?;
    let this_ptr = subobject_ptr(state, custom, locator.residence, receiver)?;

    if member.is_virtual() {
        emit_virtual_dispatch(state, locator, this_ptr, arguments, span)
    } else {
        let fqn = state.types.member_fqn(locator);
        let Some(sym) = state.symbols.get(&fqn) else {
            state.error(format!("Unknown member `{method_name}`"), span);
            return None;
        };
        let fn_ty = sym.ty;
        let Some(SymbolValue::Function(func)) = sym.value else {
            state.error(format!("Unknown member `{method_name}`"), span);
            return None;
        };
        let args = lower_arguments(state, fn_ty, arguments, Some(this_ptr), span)?;
        Some(state.builder.build_call(func, args, "calltmp"))
    }
}

/// Virtual dispatch: load the vtable from the residence subobject's slot 0,
/// index it by the method's slot in the residence's virtual-member list,
/// and call through the loaded pointer. The vtable entry adjusts `this`
/// when the target lives elsewhere.
fn emit_virtual_dispatch(
    state: &mut SemState,
    locator: MemberLocator,
    this_ptr: ValueId,
    arguments: &[Expr],
    span: cata_common::Span,
) -> Option<ValueId> {
    let presenting = locator.residence;
    let Some(slot) = state.types.virtual_member_index(presenting, locator) else {
        state.error("internal: virtual member has no vtable slot", span);
        return None;
    };
    let fn_ty = state.types.locate(locator).ty;

    let ptr = state.builder.module.types.ptr();
    let vtable = state.builder.build_load(ptr, this_ptr, "vtable");
    let entry_addr = state
        .builder
        .build_const_gep(ptr, vtable, slot as i64, "vfn_slot");
    let target = state.builder.build_load(ptr, entry_addr, "vfn");

    let args = lower_arguments(state, fn_ty, arguments, Some(this_ptr), span)?;
    let lowered = cata_sem::lower::llir_fn_type(state, fn_ty);
    Some(state.builder.build_indirect_call(lowered, target, args, "virtcall"))
}

/// Lower call arguments against the callee's parameter types; `this` (when
/// given) goes first.
fn lower_arguments(
    state: &mut SemState,
    fn_ty: TypeId,
    arguments: &[Expr],
    this_ptr: Option<ValueId>,
    span: cata_common::Span,
) -> Option<Vec<ValueId>> {
    let params = match state.types.get(fn_ty) {
        Type::Function(f) => f.parameters.clone(),
        _ => Vec::new(),
    };
    if params.len() != arguments.len() {
        state.error(
            format!(
                "Incorrect number of arguments passed: expected {}, but got {}",
                params.len(),
                arguments.len()
            ),
            span,
        );
        return None;
    }
    let mut out = Vec::with_capacity(params.len() + 1);
    if let Some(this) = this_ptr {
        out.push(this);
    }
    for (&param_ty, arg) in params.iter().zip(arguments) {
        let value = emit_expr(state, arg, Some(param_ty))?;
        let arg_ty = expr_resulting_type(state, arg, Some(param_ty));
        let coerced = emit_coercion(state, value, arg_ty, param_ty, arg.span())?;
        out.push(coerced);
    }
    Some(out)
}

// ---- arithmetic & coercions ----

fn emit_arithmetic(
    state: &mut SemState,
    op: BinaryArithOp,
    lhs_val: ValueId,
    lhs_ty: TypeId,
    rhs_val: ValueId,
    rhs_ty: TypeId,
    span: cata_common::Span,
) -> Option<ValueId> {
    let result_ty = state.types.most_specialized(lhs_ty, rhs_ty);
    let Some(prim) = state.types.as_primitive(result_ty).copied() else {
        state.error("Operator not implemented", span);
        return None;
    };
    let lhs_c = emit_coercion(state, lhs_val, lhs_ty, result_ty, span)?;
    let rhs_c = emit_coercion(state, rhs_val, rhs_ty, result_ty, span)?;

    let llir_op = match (op, prim.is_float, prim.is_signed) {
        (BinaryArithOp::Plus, true, _) => IntBinOp::FAdd,
        (BinaryArithOp::Minus, true, _) => IntBinOp::FSub,
        (BinaryArithOp::Times, true, _) => IntBinOp::FMul,
        (BinaryArithOp::Div, true, _) => IntBinOp::FDiv,
        (BinaryArithOp::Plus, false, _) => IntBinOp::Add,
        (BinaryArithOp::Minus, false, _) => IntBinOp::Sub,
        (BinaryArithOp::Times, false, _) => IntBinOp::Mul,
        (BinaryArithOp::Div, false, true) => IntBinOp::SDiv,
        (BinaryArithOp::Div, false, false) => IntBinOp::UDiv,
        _ => {
            state.error("Operator not implemented", span);
            return None;
        }
    };
    let name = match op {
        BinaryArithOp::Plus => "addtmp",
        BinaryArithOp::Minus => "subtmp",
        BinaryArithOp::Times => "multmp",
        _ => "divtmp",
    };
    Some(state.builder.build_binop(llir_op, lhs_c, rhs_c, name))
}

/// Coerce `value` from one semantic type to another. Primitive pairs use
/// the numeric conversion matrix; object handles cast along the class
/// hierarchy; equal types pass through.
pub fn emit_coercion(
    state: &mut SemState,
    value: ValueId,
    from: TypeId,
    to: TypeId,
    span: cata_common::Span,
) -> Option<ValueId> {
    if state.types.types_equal(from, to) {
        return Some(value);
    }
    if let (Some(fp), Some(tp)) = (
        state.types.as_primitive(from).copied(),
        state.types.as_primitive(to).copied(),
    ) {
        let to_llir = llir_type_of(state, to);
        return Some(match (fp.is_float, tp.is_float) {
            (false, false) => {
                if fp.is_signed {
                    state.builder.build_sext_or_trunc(value, to_llir, "conv")
                } else {
                    state.builder.build_zext_or_trunc(value, to_llir, "conv")
                }
            }
            (false, true) => {
                let op = if fp.is_signed { CastOp::SIToFP } else { CastOp::UIToFP };
                state.builder.build_cast(op, value, to_llir, "conv")
            }
            (true, false) => {
                let op = if tp.is_signed { CastOp::FPToSI } else { CastOp::FPToUI };
                state.builder.build_cast(op, value, to_llir, "conv")
            }
            (true, true) => {
                let op = if tp.bits > fp.bits { CastOp::FPExt } else { CastOp::FPTrunc };
                state.builder.build_cast(op, value, to_llir, "conv")
            }
        });
    }
    if let (Some(from_custom), Some(to_custom)) = (
        state.types.object_custom(from),
        state.types.object_custom(to),
    ) {
        if state.types.is_virtual(from_custom) && state.types.is_virtual(to_custom) {
            return emit_class_cast(state, value, from_custom, to_custom, span);
        }
    }
    state.error("Type mismatch", span);
    None
}

/// Lower a condition to `i1` by comparing it not-equal to zero.
pub fn emit_condition(state: &mut SemState, cond: &Expr) -> Option<ValueId> {
    let value = emit_expr(state, cond, None)?;
    let ty = expr_resulting_type(state, cond, None);
    let lowered = llir_type_of(state, ty);
    let zero = state.builder.module.const_int(lowered, 0);
    Some(state.builder.build_icmp(ICmpPred::Ne, value, zero, "ifcond"))
}
