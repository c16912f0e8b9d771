//! Resolving declarations to semantic types.

use cata_ast::{ClassDecl, Decl, FnDecl, IfaceDecl, StructDecl, TypeRef, VarDecl};
use smallvec::SmallVec;

use crate::expr_type::expr_resulting_type;
use crate::member::{Member, MemberKind};
use crate::state::SemState;
use crate::types::{CustomType, Type, TypeId};

/// The function type of a function declaration. Parameters without a type
/// annotation contribute an undefined type (the locals pass reports them).
pub fn decl_fn_type(state: &mut SemState, decl: &FnDecl) -> TypeId {
    let return_type = match &decl.return_type {
        Some(ty) => state.resolve_type_ref(ty),
        None => state.types.undefined(),
    };
    let mut params = Vec::with_capacity(decl.parameters.len());
    for param in &decl.parameters {
        match &param.ty {
            Some(ty) => params.push(state.resolve_type_ref(ty)),
            None => params.push(state.types.undefined()),
        }
    }
    state.types.function(return_type, params)
}

/// The type of a variable declaration: the annotation, else the
/// initialiser's type. `n` is the fixed-point iteration, used to report the
/// missing-type error only once.
pub fn decl_var_type(state: &mut SemState, n: usize, decl: &VarDecl) -> TypeId {
    if let Some(ty) = &decl.ty {
        return state.resolve_type_ref(ty);
    }
    if let Some(init) = &decl.init {
        return expr_resulting_type(state, init, None);
    }
    if n == 0 {
        state.error(
            "Global variable must have explicit type set or the type must be \
             inferrable from a direct assignment",
            decl.span,
        );
    }
    state.types.undefined()
}

fn member_of(state: &mut SemState, n: usize, decl: &Decl) -> Option<Member> {
    let (ty, kind) = match decl {
        Decl::Fn(d) => (decl_fn_type(state, d), MemberKind::Method),
        Decl::Var(d) => (decl_var_type(state, n, d), MemberKind::Field),
        _ => {
            state.error("Unsupported member declaration", decl.span());
            return None;
        }
    };
    Some(
        Member::new(
            decl.ident().name.clone(),
            ty,
            kind,
            decl.classifiers().to_vec(),
        )
        .with_span(decl.span()),
    )
}

/// The struct type of a struct declaration; member order follows
/// declaration order.
pub fn decl_struct_type(state: &mut SemState, n: usize, decl: &StructDecl) -> TypeId {
    let members = collect_members(state, n, &decl.declarations);
    let name = state.scopes.fqn(&decl.ident.name);
    state
        .types
        .alloc(Type::Struct(CustomType::new(name, members, SmallVec::new())))
}

/// The class type of a class declaration, supers resolved through the
/// symbol table. An unresolvable super contributes the undefined sentinel,
/// leaving the type invalid for another fixed-point round.
pub fn decl_class_type(state: &mut SemState, n: usize, decl: &ClassDecl) -> TypeId {
    let members = collect_members(state, n, &decl.declarations);
    let name = state.scopes.fqn(&decl.ident.name);
    let supers = resolve_supers(state, &decl.super_types, false);
    state
        .types
        .alloc(Type::Class(CustomType::new(name, members, supers)))
}

/// The interface type of an interface declaration. Supers must themselves
/// be interfaces.
pub fn decl_iface_type(state: &mut SemState, n: usize, decl: &IfaceDecl) -> TypeId {
    let members = collect_members(state, n, &decl.declarations);
    let name = state.scopes.fqn(&decl.ident.name);
    let supers = resolve_supers(state, &decl.super_types, true);
    state
        .types
        .alloc(Type::Iface(CustomType::new(name, members, supers)))
}

fn collect_members(state: &mut SemState, n: usize, decls: &[Decl]) -> Vec<Member> {
    let mut members = Vec::with_capacity(decls.len());
    for decl in decls {
        if let Some(member) = member_of(state, n, decl) {
            members.push(member);
        }
    }
    members
}

fn resolve_supers(
    state: &mut SemState,
    super_types: &[TypeRef],
    iface_only: bool,
) -> SmallVec<[TypeId; 2]> {
    let mut supers = SmallVec::new();
    for super_ref in super_types {
        let TypeRef::Name(qn) = super_ref else {
            supers.push(state.types.undefined());
            continue;
        };
        let Some(key) = state.scopes.find_named(&state.symbols, &qn.to_dotted()) else {
            supers.push(state.types.undefined());
            continue;
        };
        let super_ty = state.symbols[&key].ty;
        if iface_only {
            if !matches!(state.types.get(super_ty), Type::Iface(_)) {
                state.error("Unexpected base type", super_ref.span());
                state.help("An 'iface' can only inherit from other 'iface' types.");
                supers.push(state.types.undefined());
                continue;
            }
        } else if !state.types.is_virtual(super_ty) {
            state.error("Unexpected base type", super_ref.span());
            supers.push(state.types.undefined());
            continue;
        }
        supers.push(super_ty);
    }
    supers
}
