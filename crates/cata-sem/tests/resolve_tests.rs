//! End-to-end resolution tests: the overloading + prototype fixed point
//! over constructed translation units.

use cata_ast::{
    ClassDecl, Decl, Expr, FnDecl, FnParameter, Ident, NumericLiteral, Statement, TranslationUnit,
    TypeRef, VarDecl,
};
use cata_common::Span;
use cata_sem::{resolve, SemState, Type};

fn unit(decls: Vec<Decl>) -> TranslationUnit {
    TranslationUnit::new(decls, "")
}

fn simple_main(body: Vec<Statement>) -> Decl {
    Decl::Fn(FnDecl::new("main", vec![], body))
}

#[test]
fn infers_i64_return_from_arithmetic() {
    let mut tu = unit(vec![simple_main(vec![Statement::ret(Expr::binary(
        Expr::LiteralNumeric(NumericLiteral::int(3)),
        cata_ast::BinaryArithOp::Plus,
        Expr::LiteralNumeric(NumericLiteral::int(5)),
    ))])]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);

    assert_eq!(state.num_errors(), 0, "{:?}", state.sink.diagnostics());
    let main_ty = state.symbol_type("main").unwrap();
    assert_eq!(state.types.fqn(main_ty), "fn()->i64");
    // the LLIR shell exists
    assert!(state.builder.module.get_named_function("main").is_some());
}

#[test]
fn float_operand_widens_the_chain() {
    let mut tu = unit(vec![simple_main(vec![Statement::ret(Expr::binary(
        Expr::binary(
            Expr::LiteralNumeric(NumericLiteral::int(89)),
            cata_ast::BinaryArithOp::Div,
            Expr::LiteralNumeric(NumericLiteral::int(3)),
        ),
        cata_ast::BinaryArithOp::Div,
        Expr::LiteralNumeric(NumericLiteral::float(4, 0, 1)),
    ))])]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    assert_eq!(state.num_errors(), 0);
    let main_ty = state.symbol_type("main").unwrap();
    assert_eq!(state.types.fqn(main_ty), "fn()->f64");
}

#[test]
fn overload_siblings_gain_suffixes() {
    let mut tu = unit(vec![
        Decl::Fn(
            FnDecl::new("test", vec![], vec![Statement::ret(Expr::LiteralNumeric(NumericLiteral::int(4)))])
                .with_return_type(TypeRef::named("i32")),
        ),
        Decl::Fn(
            FnDecl::new("test", vec![], vec![Statement::ret(Expr::LiteralNumeric(NumericLiteral::int(5)))])
                .with_return_type(TypeRef::named("i64")),
        ),
    ]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    assert_eq!(state.num_errors(), 0);
    assert!(state.symbols.contains_key("test"));
    assert!(state.symbols.contains_key("test`1"));
}

#[test]
fn methods_get_owner_backreference_and_this() {
    let class = ClassDecl {
        ident: Ident::synthetic("A"),
        super_types: vec![],
        declarations: vec![
            Decl::Fn(FnDecl::new(
                "get",
                vec![],
                vec![Statement::ret(Expr::member("this", "a"))],
            )),
            Decl::Var(VarDecl::new(
                "a",
                None,
                Some(Expr::LiteralNumeric(NumericLiteral::int(4))),
            )),
        ],
        classifiers: vec![],
        span: Span::dummy(),
    };
    let mut tu = unit(vec![Decl::Class(class)]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);

    assert_eq!(state.num_errors(), 0, "{:?}", state.sink.diagnostics());
    let method_ty = state.symbol_type("A.get").unwrap();
    let f = state.types.as_function(method_ty).unwrap().clone();
    assert_eq!(state.types.fqn(f.return_type), "i64");
    let owner = f.method_of.expect("method_of set");
    assert_eq!(state.types.custom(owner).unwrap().name, "A");

    // the class symbol's member list carries the refined method type
    let class_ty = state.symbol_type("A").unwrap();
    let fqn = state.types.fqn(class_ty);
    assert!(fqn.contains("get:fn()->i64"), "{fqn}");
    // init function shell exists
    assert!(state
        .builder
        .module
        .get_named_function("A..__CATA_INIT")
        .is_some());
}

#[test]
fn forward_references_resolve_via_fixed_point() {
    // var before the class it instantiates
    let mut tu = unit(vec![
        Decl::Fn(FnDecl::new(
            "make",
            vec![],
            vec![Statement::ret(Expr::call("A", vec![]))],
        )),
        Decl::Class(ClassDecl {
            ident: Ident::synthetic("A"),
            super_types: vec![],
            declarations: vec![],
            classifiers: vec![],
            span: Span::dummy(),
        }),
    ]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    assert_eq!(state.num_errors(), 0, "{:?}", state.sink.diagnostics());
    let make_ty = state.symbol_type("make").unwrap();
    let ret = state.types.as_function(make_ty).unwrap().return_type;
    assert_eq!(state.types.fqn(ret), "A");
}

#[test]
fn unresolvable_type_reports_incomplete() {
    let mut tu = unit(vec![Decl::Fn(FnDecl::new(
        "f",
        vec![FnParameter::new("p", TypeRef::named("Missing"))],
        vec![],
    ))]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    assert!(state.num_errors() > 0);
}

#[test]
fn duplicate_global_variable_reports() {
    let mut tu = unit(vec![
        Decl::Var(VarDecl::new(
            "x",
            Some(TypeRef::named("i64")),
            None,
        )),
        Decl::Var(VarDecl::new(
            "x",
            Some(TypeRef::named("i64")),
            None,
        )),
    ]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    assert!(state.num_errors() > 0);
}

#[test]
fn global_namespace_prefixes_main() {
    let mut tu = unit(vec![Decl::Ns(cata_ast::NsDecl {
        ident: Ident::synthetic("app"),
        declarations: vec![simple_main(vec![Statement::ret(Expr::LiteralNumeric(
            NumericLiteral::int(1),
        ))])],
        is_global: true,
        classifiers: vec![],
        span: Span::dummy(),
    })]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    assert_eq!(state.num_errors(), 0);
    assert_eq!(state.global_namespace, "app");
    assert!(state.symbols.contains_key("app.main"));
    assert_eq!(state.main_fqn(), "app.main");
    let ns_ty = state.symbol_type("app").unwrap();
    assert!(matches!(state.types.get(ns_ty), Type::Namespace(_)));
}

#[test]
fn resolution_is_quiescent_on_rerun() {
    let mut tu = unit(vec![simple_main(vec![Statement::ret(
        Expr::LiteralNumeric(NumericLiteral::int(1)),
    )])]);
    let mut state = SemState::new("t");
    resolve(&mut state, &mut tu);
    let mut proto = cata_sem::passes::ProtoPass::new();
    proto.n = 1; // not the first iteration: no duplicate-name reporting
    let changes = proto.run(&mut state, &tu);
    assert_eq!(changes, 0);
    assert_eq!(state.num_errors(), 0);
}
