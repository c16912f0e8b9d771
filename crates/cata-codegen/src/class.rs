//! Object-type emission: init routines, vtable metadata objects,
//! this-adjusting thunks, subobject addressing, and class casts.

use cata_llir::{ICmpPred, Linkage, TyId, ValueId};
use cata_sem::lower::llir_struct_of;
use cata_sem::{SemState, SymbolValue, TypeId};
use tracing::debug;

/// Advance `ptr` (pointing at a `from` object) to the subobject of
/// ancestor `residence`. Identity when they are the same type.
pub fn subobject_ptr(
    state: &mut SemState,
    from: TypeId,
    residence: TypeId,
    ptr: ValueId,
) -> Option<ValueId> {
    if state.types.types_equal(from, residence) {
        return Some(ptr);
    }
    let supers: Vec<TypeId> = state
        .types
        .custom(from)
        .map(|c| c.supers.to_vec())
        .unwrap_or_default();
    for super_id in supers {
        if !state.types.virtual_assignable(residence, super_id) {
            continue;
        }
        let index = state.types.super_field_index(from, super_id)?;
        let shape = llir_struct_of(state, from);
        let name = state
            .types
            .custom(super_id)
            .map(|c| format!("{}_ptr", c.name))
            .unwrap_or_default();
        let advanced = state.builder.build_struct_gep(shape, ptr, index, &name);
        return subobject_ptr(state, super_id, residence, advanced);
    }
    None
}

/// Cast a class handle between virtual types with a null guard: null stays
/// null, non-null pointers advance through super subobjects.
pub fn emit_class_cast(
    state: &mut SemState,
    value: ValueId,
    from: TypeId,
    to: TypeId,
    span: cata_common::Span,
) -> Option<ValueId> {
    if state.types.types_equal(from, to) {
        return Some(value);
    }
    if !state.types.virtual_assignable(to, from) {
        state.error("Type mismatch", span);
        return None;
    }

    let func = state.current_function?;
    let not_null_bb = state.builder.module.append_block(func, "is_not_null");
    let null_bb = state.builder.module.append_block(func, "is_null");
    let merge_bb = state.builder.module.append_block(func, "null_check_merge");

    let null = state.builder.module.const_null();
    let is_null = state.builder.build_icmp(ICmpPred::Eq, value, null, "null_check");
    state.builder.build_cond_br(is_null, null_bb, not_null_bb);

    state.builder.position_at_end(func, null_bb);
    state.builder.build_br(merge_bb);

    state.builder.position_at_end(func, not_null_bb);
    let casted = subobject_ptr(state, from, to, value)?;
    // the walk may have opened further blocks
    let not_null_end = state
        .builder
        .insert_point()
        .map(|p| p.block)
        .unwrap_or(not_null_bb);
    state.builder.build_br(merge_bb);

    state.builder.position_at_end(func, merge_bb);
    let ptr = state.builder.module.types.ptr();
    let phi = state.builder.build_phi(ptr, "casted");
    state.builder.add_incoming(phi, casted, not_null_end);
    state.builder.add_incoming(phi, null, null_bb);
    Some(phi)
}

/// The vtable struct shape of a virtual type: one fixed-length array of
/// function pointers.
pub fn metadata_struct_ty(state: &mut SemState, virtual_id: TypeId) -> TyId {
    if let Some(cached) = state.types.custom(virtual_id).and_then(|c| c.metadata_struct) {
        return cached;
    }
    let slot_count = state.types.virtual_members(virtual_id).len() as u64;
    let name = state
        .types
        .custom(virtual_id)
        .map(|c| format!(".meta({})", c.name))
        .unwrap_or_default();
    let ptr = state.builder.module.types.ptr();
    let array = state.builder.module.types.array(ptr, slot_count);
    let shape = state
        .builder
        .module
        .types
        .struct_type(Some(&name), vec![array], false);
    if let Some(custom) = state.types.custom_mut(virtual_id) {
        custom.metadata_struct = Some(shape);
    }
    shape
}

/// The vtable object of `concrete` presenting as ancestor `presenting`
/// (possibly itself). Memoised: exactly one global exists per pair.
pub fn metadata_object(
    state: &mut SemState,
    concrete: TypeId,
    presenting: TypeId,
) -> Option<cata_llir::GlobalId> {
    if let Some(&cached) = state
        .types
        .custom(concrete)
        .and_then(|c| c.metadata_objects.get(&presenting))
    {
        return Some(cached);
    }

    let slots = state.types.virtual_members(presenting);
    let mut entries: Vec<ValueId> = Vec::with_capacity(slots.len());
    for slot in slots {
        let member = state.types.locate(slot).clone();
        let resolved = if state.types.as_function(member.ty).is_some() {
            state
                .types
                .compatible_virtual_member(concrete, &member.name, member.ty)
        } else {
            state.types.get_member(concrete, &member.name)
        };
        let Some(my) = resolved else {
            let concrete_name = state.types.custom(concrete).map(|c| c.name.clone()).unwrap_or_default();
            let presenting_name = state.types.custom(presenting).map(|c| c.name.clone()).unwrap_or_default();
            state.error(
                format!(
                    "Could not find virtual member {presenting_name}.{} in {concrete_name}",
                    member.name
                ),
                member.span,
            );
            continue;
        };
        let fqn = state.types.member_fqn(my);
        let Some(SymbolValue::Function(target)) = state.symbols.get(&fqn).and_then(|s| s.value)
        else {
            state.error(format!("Could not find virtual member `{fqn}`"), member.span);
            continue;
        };
        let needs_thunk = !state.types.types_equal(my.residence, presenting)
            && !state.types.types_equal(concrete, presenting);
        let entry = if needs_thunk {
            thunk_function(state, target, presenting, my.residence)
        } else {
            state.builder.module.function_value(target)
        };
        entries.push(entry);
    }

    let ptr = state.builder.module.types.ptr();
    let array = state.builder.module.const_array(ptr, entries);
    let meta_ty = metadata_struct_ty(state, presenting);
    let initializer = state.builder.module.const_struct(meta_ty, vec![array]);

    let concrete_name = state.types.custom(concrete).map(|c| c.name.clone()).unwrap_or_default();
    let presenting_name = state.types.custom(presenting).map(|c| c.name.clone()).unwrap_or_default();
    let global_name = if state.types.types_equal(concrete, presenting) {
        format!(".meta({presenting_name})")
    } else {
        format!(".meta({presenting_name} in {concrete_name})")
    };
    let global = state.builder.module.add_global(&global_name, meta_ty, true);
    state.builder.module.set_global_initializer(global, initializer);
    debug!(name = %global_name, "emitted metadata object");

    if let Some(custom) = state.types.custom_mut(concrete) {
        custom.metadata_objects.insert(presenting, global);
    }
    Some(global)
}

/// A thunk adapting a vtable entry that presents as `presenting` to a
/// target method residing in `residence`: adjusts `this` backwards by the
/// residence subobject's offset and forwards the call. Memoised per
/// (target, presenting) pair.
pub fn thunk_function(
    state: &mut SemState,
    target: cata_llir::FuncId,
    presenting: TypeId,
    residence: TypeId,
) -> ValueId {
    let presenting_name = state
        .types
        .custom(presenting)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    let target_name = state.builder.module.function(target).name.clone();
    let thunk_name = format!("{target_name}#thunk:{presenting_name}");
    if let Some(existing) = state.builder.module.get_named_function(&thunk_name) {
        return state.builder.module.function_value(existing);
    }

    let fn_ty = state.builder.module.function(target).ty;
    let thunk = state
        .builder
        .module
        .add_function(&thunk_name, fn_ty, Linkage::External);
    let entry = state.builder.module.append_block(thunk, "entry");

    let saved = state.builder.insert_point();
    state.builder.position_at_end(thunk, entry);

    let params = state.builder.module.function(thunk).params.clone();
    state.builder.module.set_param_name(thunk, 0, "this");
    let mut this_ptr = params[0];

    // walk from the residence type down to the presenting ancestor,
    // subtracting each super's offset
    let mut intermediate = residence;
    loop {
        if state.types.types_equal(intermediate, presenting) {
            break;
        }
        let supers: Vec<TypeId> = state
            .types
            .custom(intermediate)
            .map(|c| c.supers.to_vec())
            .unwrap_or_default();
        if supers.is_empty() {
            break;
        }
        let mut advanced = false;
        for super_id in supers {
            if !state.types.virtual_assignable(presenting, super_id) {
                continue;
            }
            let Some(index) = state.types.super_field_index(intermediate, super_id) else {
                continue;
            };
            let shape = llir_struct_of(state, intermediate);
            let offset = state.builder.module.types.field_offset(shape, index);
            let i8t = state.builder.module.types.int(8);
            let i64t = state.builder.module.types.int(64);
            let neg = state.builder.module.const_int(i64t, -(offset as i128));
            this_ptr = state.builder.build_gep(i8t, this_ptr, neg, "offsetted_this");
            intermediate = super_id;
            advanced = true;
            break;
        }
        if !advanced {
            break;
        }
    }

    let mut args = params;
    args[0] = this_ptr;
    let result = state.builder.build_call(target, args, "thunked_call");
    let ret_ty = state.builder.module.type_of(result);
    if state.builder.module.types.is_void(ret_ty) {
        state.builder.build_ret_void();
    } else {
        state.builder.build_ret(result);
    }

    state.builder.restore_point(saved);
    state.builder.module.function_value(thunk)
}

/// Emit the init chain of a class: store its own vtable pointer, call each
/// super's init on the corresponding subobject, then overwrite that
/// subobject's metadata slot with the presenting-as vtable so dispatch
/// through a base handle reaches the derived override. Applied recursively
/// down the super chain.
pub fn emit_super_init_chain(
    state: &mut SemState,
    base: TypeId,
    current: TypeId,
    ptr: ValueId,
) -> Option<()> {
    let supers: Vec<TypeId> = state
        .types
        .custom(current)
        .map(|c| c.supers.to_vec())
        .unwrap_or_default();
    // class layout: slot 0 is the metadata pointer
    let mut super_index = 1u32;
    for super_id in supers {
        let init = state.types.custom(super_id).and_then(|c| c.init_function);
        if let Some(init) = init {
            let shape = llir_struct_of(state, current);
            let name = state
                .types
                .custom(super_id)
                .map(|c| format!("{}_offset", c.name))
                .unwrap_or_default();
            let offsetted = state.builder.build_struct_gep(shape, ptr, super_index, &name);
            state.builder.build_call(init, vec![offsetted], "");

            let meta = metadata_object(state, base, super_id)?;
            let meta_val = state.builder.module.global_value(meta);
            state.builder.build_store(meta_val, offsetted);

            emit_super_init_chain(state, base, super_id, offsetted)?;
        }
        super_index += 1;
    }
    Some(())
}
