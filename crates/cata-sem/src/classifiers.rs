//! Classifier validation.
//!
//! `virtual` and `override` are only meaningful on methods of virtual
//! types, and shadowing an ancestor virtual without `override` is an
//! error. Everything else is currently rejected where it appears.

use cata_ast::{Classifier, ClassDecl, FnDecl, IfaceDecl, NsDecl, StructDecl, VarDecl};

use crate::member::canonical_name;
use crate::state::SemState;
use crate::types::Type;

/// Validate a function declaration's classifiers in its current scope.
/// Returns false when any error was reported.
pub fn check_fn_classifiers(state: &mut SemState, decl: &FnDecl) -> bool {
    let mut ok = true;
    let name = canonical_name(&decl.ident.name).to_string();

    if decl.classifiers.contains(&Classifier::Virtual)
        && decl.classifiers.contains(&Classifier::Override)
    {
        state.error(
            "Function cannot be classified both `virtual` and `override`",
            decl.span,
        );
        ok = false;
    }

    let enclosing = state.enclosing_custom();
    for &classifier in &decl.classifiers {
        match classifier {
            Classifier::Virtual => {
                let Some(owner) = enclosing.filter(|&o| state.types.is_virtual(o)) else {
                    state.error("`virtual` keyword on non-class function", decl.span);
                    ok = false;
                    continue;
                };
                let supers: Vec<_> = state
                    .types
                    .custom(owner)
                    .map(|c| c.supers.to_vec())
                    .unwrap_or_default();
                for super_id in supers {
                    let shadowed = state
                        .types
                        .virtual_members(super_id)
                        .iter()
                        .any(|slot| canonical_name(&state.types.locate(*slot).name) == name);
                    if shadowed {
                        state.error(
                            "`virtual` declaration shadows virtual declaration in parent class",
                            decl.span,
                        );
                        state.help("use the 'override' keyword to override this virtual declaration");
                        ok = false;
                    }
                }
            }
            Classifier::Override => {
                let Some(owner) =
                    enclosing.filter(|&o| matches!(state.types.get(o), Type::Class(_)))
                else {
                    state.error("`override` keyword on non-class function", decl.span);
                    ok = false;
                    continue;
                };
                let supers: Vec<_> = state
                    .types
                    .custom(owner)
                    .map(|c| c.supers.to_vec())
                    .unwrap_or_default();
                if supers.is_empty() {
                    state.error("Cannot `override` function in class without parent", decl.span);
                    ok = false;
                    continue;
                }
                let found = supers.iter().any(|&super_id| {
                    state
                        .types
                        .virtual_members(super_id)
                        .iter()
                        .any(|slot| canonical_name(&state.types.locate(*slot).name) == name)
                });
                if !found {
                    state.error(
                        "declaration does not override a virtual function in any parent class",
                        decl.span,
                    );
                    ok = false;
                }
            }
            other => {
                state.error(
                    format!("unsupported classifier `{}` on function", other.as_str()),
                    decl.span,
                );
                ok = false;
            }
        }
    }

    // shadowing an ancestor virtual without `override`
    if !decl.classifiers.contains(&Classifier::Override) {
        if let Some(owner) = enclosing.filter(|&o| matches!(state.types.get(o), Type::Class(_))) {
            let supers: Vec<_> = state
                .types
                .custom(owner)
                .map(|c| c.supers.to_vec())
                .unwrap_or_default();
            for super_id in supers {
                let shadowed = state
                    .types
                    .virtual_members(super_id)
                    .iter()
                    .any(|slot| canonical_name(&state.types.locate(*slot).name) == name);
                if shadowed && !decl.classifiers.contains(&Classifier::Virtual) {
                    state.error("declaration shadows a virtual function", decl.span);
                    ok = false;
                }
            }
        }
    }

    ok
}

pub fn check_var_classifiers(state: &mut SemState, decl: &VarDecl) -> bool {
    report_all_unsupported(state, &decl.classifiers, decl.span, "variable")
}

pub fn check_struct_classifiers(state: &mut SemState, decl: &StructDecl) -> bool {
    report_all_unsupported(state, &decl.classifiers, decl.span, "struct")
}

pub fn check_class_classifiers(state: &mut SemState, decl: &ClassDecl) -> bool {
    report_all_unsupported(state, &decl.classifiers, decl.span, "class")
}

pub fn check_iface_classifiers(state: &mut SemState, decl: &IfaceDecl) -> bool {
    report_all_unsupported(state, &decl.classifiers, decl.span, "interface")
}

pub fn check_ns_classifiers(state: &mut SemState, decl: &NsDecl) -> bool {
    report_all_unsupported(state, &decl.classifiers, decl.span, "namespace")
}

fn report_all_unsupported(
    state: &mut SemState,
    classifiers: &[Classifier],
    span: cata_common::Span,
    what: &str,
) -> bool {
    for c in classifiers {
        state.error(
            format!("unsupported classifier `{}` on {what}", c.as_str()),
            span,
        );
    }
    classifiers.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Member, MemberKind};
    use crate::symbol::Symbol;
    use crate::types::CustomType;
    use cata_common::Span;
    use smallvec::smallvec;

    fn class_with_virtual_test(state: &mut SemState) -> crate::types::TypeId {
        let i64t = state.types.builtin("i64").unwrap();
        let fn_ty = state.types.function(i64t, vec![]);
        let member = Member::new("test", fn_ty, MemberKind::Method, vec![Classifier::Virtual]);
        state
            .types
            .alloc(Type::Class(CustomType::new("A", vec![member], smallvec![])))
    }

    fn fn_decl(name: &str, classifiers: Vec<Classifier>) -> FnDecl {
        FnDecl::new(name, vec![], vec![]).with_classifiers(classifiers)
    }

    #[test]
    fn virtual_and_override_conflict() {
        let mut state = SemState::new("t");
        let decl = fn_decl("f", vec![Classifier::Virtual, Classifier::Override]);
        assert!(!check_fn_classifiers(&mut state, &decl));
    }

    #[test]
    fn virtual_outside_class_is_rejected() {
        let mut state = SemState::new("t");
        let decl = fn_decl("f", vec![Classifier::Virtual]);
        assert!(!check_fn_classifiers(&mut state, &decl));
        assert_eq!(state.num_errors(), 1);
    }

    #[test]
    fn override_without_matching_super_member() {
        let mut state = SemState::new("t");
        let a = class_with_virtual_test(&mut state);
        let b = state
            .types
            .alloc(Type::Class(CustomType::new("B", vec![], smallvec![a])));
        state.try_insert_symbol("B", Symbol::new(Span::dummy(), b));
        state.scopes.enter("B");

        let good = fn_decl("test", vec![Classifier::Override]);
        assert!(check_fn_classifiers(&mut state, &good));

        let bad = fn_decl("other", vec![Classifier::Override]);
        assert!(!check_fn_classifiers(&mut state, &bad));
    }

    #[test]
    fn shadowing_without_override_is_an_error() {
        let mut state = SemState::new("t");
        let a = class_with_virtual_test(&mut state);
        let b = state
            .types
            .alloc(Type::Class(CustomType::new("B", vec![], smallvec![a])));
        state.try_insert_symbol("B", Symbol::new(Span::dummy(), b));
        state.scopes.enter("B");

        let shadow = fn_decl("test", vec![]);
        assert!(!check_fn_classifiers(&mut state, &shadow));
    }

    #[test]
    fn unsupported_classifier_on_namespace() {
        let mut state = SemState::new("t");
        let decl = NsDecl {
            ident: cata_ast::Ident::synthetic("n"),
            declarations: vec![],
            is_global: false,
            classifiers: vec![Classifier::Static],
            span: Span::dummy(),
        };
        assert!(!check_ns_classifiers(&mut state, &decl));
    }
}
