//! Inheritance machinery at the module level: metadata objects, thunks,
//! layout, structs, interfaces, and diagnostic paths.

use cata_ast::{
    ClassDecl, Classifier, Decl, Expr, FnDecl, Ident, IfaceDecl, NumericLiteral, Statement,
    StructDecl, TranslationUnit, TypeRef, VarDecl,
};
use cata_codegen::{compile, run_main};
use cata_common::Span;

fn int(v: i64) -> Expr {
    Expr::LiteralNumeric(NumericLiteral::int(v))
}

fn class(name: &str, supers: Vec<&str>, decls: Vec<Decl>) -> Decl {
    Decl::Class(ClassDecl {
        ident: Ident::synthetic(name),
        super_types: supers.into_iter().map(TypeRef::named).collect(),
        declarations: decls,
        classifiers: vec![],
        span: Span::dummy(),
    })
}

fn method(name: &str, classifiers: Vec<Classifier>, body: Vec<Statement>) -> Decl {
    Decl::Fn(FnDecl::new(name, vec![], body).with_classifiers(classifiers))
}

fn field(name: &str, init: Expr) -> Decl {
    Decl::Var(VarDecl::new(name, None, Some(init)))
}

fn method_call(object: &str, name: &str) -> Expr {
    Expr::Call {
        callee: Box::new(Expr::member(object, name)),
        arguments: vec![],
        span: Span::dummy(),
    }
}

fn virtual_pair() -> Vec<Decl> {
    vec![
        class(
            "A",
            vec![],
            vec![method("test", vec![Classifier::Virtual], vec![Statement::ret(int(54))])],
        ),
        class(
            "B",
            vec!["A"],
            vec![method("test", vec![Classifier::Override], vec![Statement::ret(int(54398))])],
        ),
    ]
}

#[test]
fn one_metadata_object_per_presentation() {
    let mut decls = virtual_pair();
    decls.push(Decl::Fn(FnDecl::new(
        "main",
        vec![],
        vec![
            Statement::Decl(Decl::Var(VarDecl::new("b", None, Some(Expr::call("B", vec![]))))),
            Statement::ret(method_call("b", "test")),
        ],
    )));
    let mut tu = TranslationUnit::new(decls, "");
    let session = compile(&mut tu, "meta");
    assert_eq!(session.state.num_errors(), 0, "{:?}", session.state.sink.diagnostics());

    let module = &session.state.builder.module;
    assert!(module.get_named_global(".meta(A)").is_some());
    assert!(module.get_named_global(".meta(B)").is_some());
    assert!(module.get_named_global(".meta(A in B)").is_some());
    // dispatch through the derived handle still reaches the override
    assert_eq!(run_main(&session).unwrap().as_signed(64), 54398);
}

#[test]
fn vtable_lengths_agree_across_presentations() {
    let mut decls = virtual_pair();
    decls.push(Decl::Fn(FnDecl::new(
        "main",
        vec![],
        vec![Statement::ret(int(0))],
    )));
    let mut tu = TranslationUnit::new(decls, "");
    let session = compile(&mut tu, "meta_len");
    assert!(session.is_successful);

    let state = &session.state;
    let a = state.symbol_type("A").unwrap();
    let b = state.symbol_type("B").unwrap();
    assert_eq!(
        state.types.virtual_members(a).len(),
        state.types.virtual_members(b).len()
    );
}

#[test]
fn thunk_is_memoised_per_target_and_presentation() {
    let mut decls = virtual_pair();
    // two dispatch sites through the base handle
    decls.push(Decl::Fn(FnDecl::new(
        "main",
        vec![],
        vec![
            Statement::Decl(Decl::Var(VarDecl::new(
                "v",
                Some(TypeRef::named("A")),
                Some(Expr::call("B", vec![])),
            ))),
            Statement::Expr(method_call("v", "test")),
            Statement::ret(method_call("v", "test")),
        ],
    )));
    let mut tu = TranslationUnit::new(decls, "");
    let session = compile(&mut tu, "thunks");
    assert!(session.is_successful, "{:?}", session.state.sink.diagnostics());

    let module = &session.state.builder.module;
    let thunks: Vec<_> = module
        .functions()
        .filter(|(_, f)| f.name.contains("#thunk:"))
        .collect();
    assert_eq!(thunks.len(), 1, "one thunk per (target, presenting) pair");
    assert_eq!(run_main(&session).unwrap().as_signed(64), 54398);
}

#[test]
fn struct_fields_initialise_and_read_back() {
    // struct S { var x = 3  var y = 9 }  fn main() { var s = S(); return s.y }
    let mut tu = TranslationUnit::new(
        vec![
            Decl::Struct(StructDecl {
                ident: Ident::synthetic("S"),
                declarations: vec![field("x", int(3)), field("y", int(9))],
                classifiers: vec![],
                span: Span::dummy(),
            }),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![
                    Statement::Decl(Decl::Var(VarDecl::new("s", None, Some(Expr::call("S", vec![]))))),
                    Statement::ret(Expr::member("s", "y")),
                ],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "structs");
    assert!(session.is_successful, "{:?}", session.state.sink.diagnostics());
    // structs carry no metadata pointer
    assert!(session.state.builder.module.get_named_global(".meta(S)").is_none());
    assert_eq!(run_main(&session).unwrap().as_signed(64), 9);
}

#[test]
fn interface_methods_with_bodies_are_emitted() {
    // iface Shape { virtual fn kind() { return 1 } }
    // class Circle : Shape { override fn kind() { return 2 } }
    // fn main() { var c = Circle(); return c.kind() }
    let mut tu = TranslationUnit::new(
        vec![
            Decl::Iface(IfaceDecl {
                ident: Ident::synthetic("Shape"),
                super_types: vec![],
                declarations: vec![method(
                    "kind",
                    vec![Classifier::Virtual],
                    vec![Statement::ret(int(1))],
                )],
                classifiers: vec![],
                span: Span::dummy(),
            }),
            class(
                "Circle",
                vec!["Shape"],
                vec![method("kind", vec![Classifier::Override], vec![Statement::ret(int(2))])],
            ),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![
                    Statement::Decl(Decl::Var(VarDecl::new(
                        "c",
                        None,
                        Some(Expr::call("Circle", vec![])),
                    ))),
                    Statement::ret(method_call("c", "kind")),
                ],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "ifaces");
    assert!(session.is_successful, "{:?}", session.state.sink.diagnostics());
    assert!(session
        .state
        .builder
        .module
        .get_named_function("Shape.kind")
        .is_some());
    assert_eq!(run_main(&session).unwrap().as_signed(64), 2);
}

#[test]
fn shadowing_virtual_without_override_reports() {
    let mut tu = TranslationUnit::new(
        vec![
            class(
                "A",
                vec![],
                vec![method("test", vec![Classifier::Virtual], vec![Statement::ret(int(1))])],
            ),
            class(
                "B",
                vec!["A"],
                vec![method("test", vec![], vec![Statement::ret(int(2))])],
            ),
            Decl::Fn(FnDecl::new("main", vec![], vec![Statement::ret(int(0))])),
        ],
        "",
    );
    let session = compile(&mut tu, "shadow");
    assert!(!session.is_successful);
    let rendered = session.render_diagnostics("", cata_common::RenderFormat::Ascii);
    assert!(rendered.contains("shadows a virtual function"), "{rendered}");
}

#[test]
fn base_must_be_a_virtual_type() {
    // struct S {}  class C : S {}
    let mut tu = TranslationUnit::new(
        vec![
            Decl::Struct(StructDecl {
                ident: Ident::synthetic("S"),
                declarations: vec![],
                classifiers: vec![],
                span: Span::dummy(),
            }),
            class("C", vec!["S"], vec![]),
            Decl::Fn(FnDecl::new("main", vec![], vec![Statement::ret(int(0))])),
        ],
        "",
    );
    let session = compile(&mut tu, "bad_base");
    assert!(!session.is_successful);
    let rendered = session.render_diagnostics("", cata_common::RenderFormat::Ascii);
    assert!(rendered.contains("Unexpected base type"), "{rendered}");
}

#[test]
fn upcast_to_grandparent_walks_the_chain() {
    // class A { var a = 1 }  class B : A { }  class C : B { }
    // fn main() { var v: A = C(); return v.a }
    let mut tu = TranslationUnit::new(
        vec![
            class("A", vec![], vec![field("a", int(1))]),
            class("B", vec!["A"], vec![]),
            class("C", vec!["B"], vec![]),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![
                    Statement::Decl(Decl::Var(VarDecl::new(
                        "v",
                        Some(TypeRef::named("A")),
                        Some(Expr::call("C", vec![])),
                    ))),
                    Statement::ret(Expr::member("v", "a")),
                ],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "grandparent");
    assert!(session.is_successful, "{:?}", session.state.sink.diagnostics());
    assert_eq!(run_main(&session).unwrap().as_signed(64), 1);
}
