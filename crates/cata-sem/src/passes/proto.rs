//! The prototype pass: resolves declaration signatures, registers symbols,
//! runs the locals pass per function, and (re)creates LLIR function shells
//! and globals. Re-run by the driver until it reports zero changes.

use cata_ast::{ClassDecl, FnDecl, IfaceDecl, NsDecl, StructDecl, TranslationUnit, VarDecl};
use cata_llir::{Linkage, ParamAttr};
use tracing::debug;

use crate::decl_type::{decl_class_type, decl_fn_type, decl_iface_type, decl_struct_type, decl_var_type};
use crate::lower::{llir_fn_type, llir_type_of};
use crate::member::canonical_name;
use crate::pass::{walk_unit, PassHooks};
use crate::passes::locals::locals_pass_fn;
use crate::state::SemState;
use crate::symbol::{Symbol, SymbolValue};
use crate::types::{CustomKind, Type, TypeId};

pub struct ProtoPass {
    pub n: usize,
}

impl ProtoPass {
    pub fn new() -> Self {
        ProtoPass { n: 0 }
    }

    /// One iteration over the whole unit; returns the change count.
    pub fn run(&mut self, state: &mut SemState, tu: &TranslationUnit) -> usize {
        let changes = walk_unit(self, state, tu);
        debug!(iteration = self.n, changes, "prototype pass");
        self.n += 1;
        changes
    }
}

impl Default for ProtoPass {
    fn default() -> Self {
        Self::new()
    }
}

impl PassHooks for ProtoPass {
    fn process_fn(&mut self, state: &mut SemState, decl: &FnDecl) -> usize {
        let method_of = state.enclosing_custom();
        let key = state.scopes.fqn(&decl.ident.name);

        if self.n == 0 && state.symbols.contains_key(&key) {
            let prev = state.symbols[&key].span;
            state.error("Function name already exists", decl.ident.span);
            state.info("Previous declaration here", prev);
            return 0;
        }

        let mut changed = usize::from(self.n == 0);

        let fn_ty = decl_fn_type(state, decl);
        if let Some(owner) = method_of {
            if let Type::Function(f) = state.types.get_mut(fn_ty) {
                f.method_of = Some(owner);
            }
        }

        state.try_insert_symbol(&key, Symbol::new(decl.ident.span, fn_ty));
        let sym_ty = state.symbols[&key].ty;

        // refine the registered signature, keeping a previously inferred
        // return type when this resolution produced an invalid one
        if let (Some(current), Some(mut fresh)) = (
            state.types.as_function(sym_ty).cloned(),
            state.types.as_function(fn_ty).cloned(),
        ) {
            if !state.types.is_valid(fresh.return_type) {
                fresh.return_type = current.return_type;
            }
            let probe = state.types.alloc(Type::Function(fresh.clone()));
            if !state.types.types_equal(sym_ty, probe) {
                state.types.replace(sym_ty, Type::Function(fresh));
                changed = 1;
            }
        }

        // run the locals pass to a fixed point against this function
        let prev_fqn = state.current_function_fqn.replace(key.clone());
        let prev_has_return = state.current_function_has_return;
        state.current_function_has_return = false;

        let errors_before = state.num_errors();
        let mut updated = 1;
        while updated > 0 {
            updated = locals_pass_fn(state, self.n, decl);
            if state.num_errors() > errors_before {
                state.current_function_fqn = prev_fqn;
                state.current_function_has_return = prev_has_return;
                return 0;
            }
            changed += updated;
        }

        // no return seen: default to void, or complain (body-less
        // declarations keep their annotated signature)
        if !state.current_function_has_return && decl.body.is_some() {
            let annotated_void = match &decl.return_type {
                None => true,
                Some(cata_ast::TypeRef::Name(qn)) => qn.to_dotted() == "void",
                Some(_) => false,
            };
            if annotated_void {
                let ret = state
                    .types
                    .as_function(sym_ty)
                    .map(|f| f.return_type)
                    .unwrap_or_else(|| state.types.undefined());
                if !matches!(state.types.get(ret), Type::Void) {
                    if let Some(mut f) = state.types.as_function(sym_ty).cloned() {
                        f.return_type = state.types.void();
                        state.types.replace(sym_ty, Type::Function(f));
                        changed += 1;
                    }
                }
            } else {
                state.error("control reaches end of non-void function", decl.span);
            }
        }

        // `new` and `discard` must return void
        let canonical = canonical_name(&decl.ident.name);
        if canonical == "new" || canonical == "discard" {
            let ret = state
                .types
                .as_function(sym_ty)
                .map(|f| f.return_type)
                .unwrap_or_else(|| state.types.undefined());
            if !matches!(state.types.get(ret), Type::Void) {
                state.error(
                    format!("`{canonical}` function must return void"),
                    decl.span,
                );
                state.current_function_fqn = prev_fqn;
                state.current_function_has_return = prev_has_return;
                return 0;
            }
        }

        // (re)create the LLIR function shell when the signature moved
        if changed > 0 && state.types.is_valid(sym_ty) {
            self.emit_shell(state, &key, sym_ty, method_of, decl);
        }

        state.current_function_fqn = prev_fqn;
        state.current_function_has_return = prev_has_return;
        changed
    }

    fn process_var(&mut self, state: &mut SemState, decl: &VarDecl) -> usize {
        // locally scoped variables belong to the locals pass
        if !state.is_root_or_ns_scope() {
            return 0;
        }

        let key = state.scopes.fqn(&decl.ident.name);
        if self.n == 0 && state.symbols.contains_key(&key) {
            let prev = state.symbols[&key].span;
            state.error("Global variable name already exists", decl.ident.span);
            state.info("Previous declaration here", prev);
            return 0;
        }

        let ty = decl_var_type(state, self.n, decl);
        state.try_insert_symbol(&key, Symbol::new(decl.ident.span, ty));

        if state.types.is_valid(ty) && state.symbols[&key].value.is_none() {
            let lowered = llir_type_of(state, ty);
            let global = state.builder.module.add_global(&key, lowered, true);
            if let Some(zero) = crate::lower::default_value(state, ty) {
                state.builder.module.set_global_initializer(global, zero);
            }
            state.symbols[&key].value = Some(SymbolValue::Global(global));
        }

        if self.n == 0 {
            return 1;
        }
        let current = state.symbols[&key].ty;
        if !state.types.types_equal(current, ty) {
            state.symbols[&key].ty = ty;
            return 1;
        }
        0
    }

    fn process_ns(&mut self, state: &mut SemState, decl: &NsDecl) -> usize {
        let key = if decl.is_global {
            decl.ident.name.clone()
        } else {
            state.scopes.fqn(&decl.ident.name)
        };

        if self.n == 0 && state.symbols.contains_key(&key) {
            let prev = state.symbols[&key].span;
            state.error("Namespace name already exists", decl.ident.span);
            state.info("Previous declaration here", prev);
            return 0;
        }

        if decl.is_global {
            state.global_namespace = decl.ident.name.clone();
        }

        let ns_ty = state.types.alloc(Type::Namespace(decl.ident.name.clone()));
        let introduced = state.try_insert_symbol(&key, Symbol::new(decl.ident.span, ns_ty));
        usize::from(introduced)
    }

    fn process_struct(&mut self, state: &mut SemState, decl: &StructDecl) -> usize {
        self.register_custom(state, &decl.ident, "Struct", |state, n| {
            decl_struct_type(state, n, decl)
        })
    }

    fn process_after_struct(&mut self, state: &mut SemState, decl: &StructDecl) -> usize {
        self.refine_custom(state, &decl.ident, CustomKind::Struct, |state, n| {
            decl_struct_type(state, n, decl)
        })
    }

    fn process_class(&mut self, state: &mut SemState, decl: &ClassDecl) -> usize {
        self.register_custom(state, &decl.ident, "Class", |state, n| {
            decl_class_type(state, n, decl)
        })
    }

    fn process_after_class(&mut self, state: &mut SemState, decl: &ClassDecl) -> usize {
        self.refine_custom(state, &decl.ident, CustomKind::Class, |state, n| {
            decl_class_type(state, n, decl)
        })
    }

    fn process_iface(&mut self, state: &mut SemState, decl: &IfaceDecl) -> usize {
        self.register_custom(state, &decl.ident, "Interface", |state, n| {
            decl_iface_type(state, n, decl)
        })
    }

    fn process_after_iface(&mut self, state: &mut SemState, decl: &IfaceDecl) -> usize {
        self.refine_custom(state, &decl.ident, CustomKind::Iface, |state, n| {
            decl_iface_type(state, n, decl)
        })
    }
}

impl ProtoPass {
    fn emit_shell(
        &mut self,
        state: &mut SemState,
        key: &str,
        sym_ty: TypeId,
        method_of: Option<TypeId>,
        decl: &FnDecl,
    ) {
        let lowered = llir_fn_type(state, sym_ty);
        let func = match state.symbols[key].value {
            Some(SymbolValue::Function(existing)) => {
                state.builder.module.redefine_function(existing, lowered);
                existing
            }
            _ => state.builder.module.add_function(key, lowered, Linkage::External),
        };
        state.symbols.get_mut(key).expect("symbol just touched").value =
            Some(SymbolValue::Function(func));

        let params = state
            .types
            .as_function(sym_ty)
            .map(|f| f.parameters.clone())
            .unwrap_or_default();
        let offset = usize::from(method_of.is_some());
        if let Some(owner) = method_of {
            state.builder.module.set_param_name(func, 0, "this");
            match state.types.custom_kind(owner) {
                Some(CustomKind::Struct) => {
                    let shape = crate::lower::llir_struct_of(state, owner);
                    state.builder.module.add_param_attr(func, 0, ParamAttr::NoUndef);
                    state
                        .builder
                        .module
                        .add_param_attr(func, 0, ParamAttr::ByVal(shape));
                }
                Some(_) => {
                    state.builder.module.add_param_attr(func, 0, ParamAttr::NoUndef);
                }
                None => {}
            }
        }
        for (i, &param_ty) in params.iter().enumerate() {
            let index = i + offset;
            state
                .builder
                .module
                .set_param_name(func, index, &decl.parameters[i].ident.name);
            if let Some(custom) = state.types.object_custom(param_ty) {
                match state.types.custom_kind(custom) {
                    Some(CustomKind::Struct) => {
                        let shape = crate::lower::llir_struct_of(state, custom);
                        state.builder.module.add_param_attr(func, index, ParamAttr::NoUndef);
                        state
                            .builder
                            .module
                            .add_param_attr(func, index, ParamAttr::ByVal(shape));
                    }
                    Some(_) => {
                        state.builder.module.add_param_attr(func, index, ParamAttr::NoUndef);
                    }
                    None => {}
                }
            }
        }
    }

    fn register_custom(
        &mut self,
        state: &mut SemState,
        ident: &cata_ast::Ident,
        what: &str,
        resolve: impl FnOnce(&mut SemState, usize) -> TypeId,
    ) -> usize {
        let key = state.scopes.fqn(&ident.name);
        if self.n == 0 && state.symbols.contains_key(&key) {
            let prev = state.symbols[&key].span;
            state.error(format!("{what} name already exists"), ident.span);
            state.info("Previous declaration here", prev);
            return 0;
        }
        let ty = resolve(state, self.n);
        state.try_insert_symbol(&key, Symbol::new(ident.span, ty));
        usize::from(self.n == 0)
    }

    /// Re-resolve the custom type now that its scope's methods have been
    /// prototyped, update function-typed members from the symbol table, and
    /// copy the refined data into the existing instance.
    fn refine_custom(
        &mut self,
        state: &mut SemState,
        ident: &cata_ast::Ident,
        kind: CustomKind,
        resolve: impl FnOnce(&mut SemState, usize) -> TypeId,
    ) -> usize {
        let key = state.scopes.fqn(&ident.name);
        let Some(sym_ty) = state.symbol_type(&key) else {
            return 0;
        };
        let mut changes = 0;

        let fresh = resolve(state, self.n);

        // late-bound method types live in the symbol table under the
        // type's scope
        state.scopes.enter(&ident.name);
        let member_names: Vec<String> = state
            .types
            .custom(fresh)
            .map(|c| c.members.iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default();
        for (i, name) in member_names.iter().enumerate() {
            let member_ty = state.types.custom(fresh).map(|c| c.members[i].ty);
            let Some(member_ty) = member_ty else { continue };
            if state.types.as_function(member_ty).is_none() {
                continue;
            }
            let member_key = state.scopes.fqn(name);
            if let Some(resolved) = state.symbol_type(&member_key) {
                if let Some(custom) = state.types.custom_mut(fresh) {
                    custom.members[i].ty = resolved;
                }
            }
        }
        state.scopes.leave();

        if !state.types.types_equal(sym_ty, fresh) {
            let contents = state.types.custom(fresh).cloned();
            if let Some(contents) = contents {
                let refined = match kind {
                    CustomKind::Struct => Type::Struct(contents),
                    CustomKind::Class => Type::Class(contents),
                    CustomKind::Iface => Type::Iface(contents),
                };
                state.types.replace(sym_ty, refined);
                changes += 1;
            }
        }

        // interfaces carry no init function
        if kind != CustomKind::Iface {
            let missing = state
                .types
                .custom(sym_ty)
                .map(|c| c.init_function.is_none())
                .unwrap_or(false);
            if missing {
                let void = state.builder.module.types.void();
                let ptr = state.builder.module.types.ptr();
                let init_ty = state.builder.module.types.function(void, vec![ptr]);
                let init_name = format!("{key}..__CATA_INIT");
                let func = state
                    .builder
                    .module
                    .add_function(&init_name, init_ty, Linkage::External);
                state.builder.module.function_mut(func).dso_local = true;
                state.builder.module.set_param_name(func, 0, "this");
                if let Some(custom) = state.types.custom_mut(sym_ty) {
                    custom.init_function = Some(func);
                }
                changes += 1;
            }
        }

        changes
    }
}
