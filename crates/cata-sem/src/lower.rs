//! Lowering of semantic types to LLIR types.
//!
//! Struct shapes are memoised on the custom type the first time they are
//! requested; by then the fixed point has been reached, so member indices
//! stay stable for the rest of the compilation.

use cata_llir::TyId;

use crate::state::SemState;
use crate::types::{CustomKind, Type, TypeId};

/// The LLIR type a *value* of semantic type `ty` has. Class and interface
/// handles are pointers; struct values are the struct shape itself.
pub fn llir_type_of(state: &mut SemState, ty: TypeId) -> TyId {
    match state.types.get(ty) {
        Type::Undefined | Type::Void | Type::Namespace(_) => state.builder.module.types.void(),
        Type::Primitive(p) => {
            let p = *p;
            if p.is_float {
                let kind = match p.bits {
                    16 => cata_llir::FloatKind::F16,
                    32 => cata_llir::FloatKind::F32,
                    80 => cata_llir::FloatKind::F80,
                    128 => cata_llir::FloatKind::F128,
                    _ => cata_llir::FloatKind::F64,
                };
                state.builder.module.types.float(kind)
            } else {
                state.builder.module.types.int(p.bits)
            }
        }
        Type::Function(_) => {
            let id = ty;
            llir_fn_type(state, id)
        }
        Type::Struct(_) => llir_struct_of(state, ty),
        Type::Class(_) | Type::Iface(_) => state.builder.module.types.ptr(),
        Type::Object(custom) => {
            let custom = *custom;
            match state.types.custom_kind(custom) {
                Some(CustomKind::Struct) => llir_struct_of(state, custom),
                _ => state.builder.module.types.ptr(),
            }
        }
    }
}

/// The physical LLIR struct shape of a custom type:
/// - struct: own non-method fields, packed
/// - class: `[metadata ptr][supers...][own fields]`
/// - iface: `[supers...]` (or `[metadata ptr]` when it has none) + fields
pub fn llir_struct_of(state: &mut SemState, custom_id: TypeId) -> TyId {
    if let Some(cached) = state.types.custom(custom_id).and_then(|c| c.llir_struct) {
        return cached;
    }
    let Some(custom) = state.types.custom(custom_id) else {
        return state.builder.module.types.void();
    };
    let name = custom.name.clone();
    let supers: Vec<TypeId> = custom.supers.iter().copied().collect();
    let field_members: Vec<TypeId> = custom
        .members
        .iter()
        .filter(|m| !m.is_method())
        .map(|m| m.ty)
        .collect();
    let kind = state.types.custom_kind(custom_id);

    let ptr = state.builder.module.types.ptr();
    let mut fields: Vec<TyId> = Vec::new();
    match kind {
        Some(CustomKind::Class) => {
            fields.push(ptr);
            for s in &supers {
                fields.push(llir_struct_of(state, *s));
            }
        }
        Some(CustomKind::Iface) => {
            if supers.is_empty() {
                fields.push(ptr);
            } else {
                for s in &supers {
                    fields.push(llir_struct_of(state, *s));
                }
            }
        }
        _ => {}
    }
    for &member_ty in &field_members {
        if state.types.as_function(member_ty).is_some() {
            // a field holding a function pointer
            fields.push(ptr);
        } else {
            let lowered = llir_type_of(state, member_ty);
            fields.push(lowered);
        }
    }

    let packed = kind == Some(CustomKind::Struct);
    let shape = state
        .builder
        .module
        .types
        .struct_type(Some(&name), fields, packed);
    if let Some(c) = state.types.custom_mut(custom_id) {
        c.llir_struct = Some(shape);
    }
    shape
}

/// The LLIR function type of a semantic function type: methods receive a
/// leading `this` pointer; struct-typed parameters are passed as pointers
/// (with the byval attribute added by the caller of `add_function`).
pub fn llir_fn_type(state: &mut SemState, fn_ty: TypeId) -> TyId {
    let Some(f) = state.types.as_function(fn_ty).cloned() else {
        return state.builder.module.types.void();
    };
    let mut params: Vec<TyId> = Vec::new();
    if f.method_of.is_some() {
        params.push(state.builder.module.types.ptr());
    }
    for &p in &f.parameters {
        if state.types.object_custom(p).is_some() {
            // objects travel as pointers (structs byval, classes by handle)
            params.push(state.builder.module.types.ptr());
        } else {
            let lowered = llir_type_of(state, p);
            params.push(lowered);
        }
    }
    let ret = if state.types.object_custom(f.return_type).is_some() {
        state.builder.module.types.ptr()
    } else {
        llir_type_of(state, f.return_type)
    };
    state.builder.module.types.function(ret, params)
}

/// The zero value of a semantic type, used for default initialisation.
pub fn default_value(state: &mut SemState, ty: TypeId) -> Option<cata_llir::ValueId> {
    match state.types.get(ty) {
        Type::Primitive(p) => {
            let p = *p;
            let lowered = llir_type_of(state, ty);
            Some(if p.is_float {
                state.builder.module.const_float(lowered, 0.0)
            } else {
                state.builder.module.const_int(lowered, 0)
            })
        }
        Type::Object(custom) => {
            let custom = *custom;
            match state.types.custom_kind(custom) {
                Some(CustomKind::Struct) => {
                    let shape = llir_struct_of(state, custom);
                    Some(state.builder.module.const_zero(shape))
                }
                _ => Some(state.builder.module.const_null()),
            }
        }
        Type::Function(_) => Some(state.builder.module.const_null()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Member, MemberKind};
    use crate::types::CustomType;
    use smallvec::smallvec;

    #[test]
    fn class_shape_leads_with_metadata_pointer() {
        let mut state = SemState::new("t");
        let i64t = state.types.builtin("i64").unwrap();
        let members = vec![Member::new("a", i64t, MemberKind::Field, vec![])];
        let class = state
            .types
            .alloc(Type::Class(CustomType::new("A", members, smallvec![])));
        let shape = llir_struct_of(&mut state, class);
        // [ptr][i64]
        assert_eq!(
            state.builder.module.types.field_offset(shape, 1),
            8,
        );
        // memoised
        assert_eq!(llir_struct_of(&mut state, class), shape);
    }

    #[test]
    fn method_fn_type_gains_this_pointer() {
        let mut state = SemState::new("t");
        let i64t = state.types.builtin("i64").unwrap();
        let class = state
            .types
            .alloc(Type::Class(CustomType::new("A", vec![], smallvec![])));
        let fn_ty = state.types.function(i64t, vec![i64t]);
        match state.types.get_mut(fn_ty) {
            Type::Function(f) => f.method_of = Some(class),
            _ => unreachable!(),
        }
        let lowered = llir_fn_type(&mut state, fn_ty);
        match state.builder.module.types.kind(lowered) {
            cata_llir::TyKind::Function { params, .. } => assert_eq!(params.len(), 2),
            _ => panic!("not a function type"),
        }
    }
}
