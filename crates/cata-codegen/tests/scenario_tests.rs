//! End-to-end scenarios: compile a constructed translation unit, execute
//! `main` through the module evaluator, and check the result value and
//! type. Each scenario also checks that no diagnostics were produced and
//! that `main` landed at the expected FQN.

use cata_ast::{
    BinaryArithOp, ClassDecl, Classifier, Decl, Expr, FnDecl, FnParameter, Ident, NumericLiteral,
    Statement, TranslationUnit, TypeRef, VarDecl,
};
use cata_codegen::{compile, run_main, CompileSession};
use cata_common::Span;

fn int(v: i64) -> Expr {
    Expr::LiteralNumeric(NumericLiteral::int(v))
}

fn float(i: u64, frac: u64, width: u8) -> Expr {
    Expr::LiteralNumeric(NumericLiteral::float(i, frac, width))
}

fn var_stmt(name: &str, ty: Option<TypeRef>, init: Expr) -> Statement {
    Statement::Decl(Decl::Var(VarDecl::new(name, ty, Some(init))))
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

fn check(session: &CompileSession) {
    assert_eq!(
        session.state.num_errors(),
        0,
        "diagnostics: {:?}",
        session.state.sink.diagnostics()
    );
    assert!(session.is_successful);
    assert!(session.is_runnable, "main not found or not a function");
    assert!(session
        .state
        .symbols
        .contains_key(&session.state.main_fqn()));
}

#[test]
fn addition_of_literals() {
    // fn main() { return 3 + 5 }
    let mut tu = TranslationUnit::new(
        vec![Decl::Fn(FnDecl::new(
            "main",
            vec![],
            vec![Statement::ret(Expr::binary(int(3), BinaryArithOp::Plus, int(5)))],
        ))],
        "",
    );
    let session = compile(&mut tu, "scenario1");
    check(&session);
    assert_eq!(session.result_type_name, "i64");
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 8);
}

#[test]
fn division_chain_widens_to_float() {
    // fn main() { return 89 / 3 / 4.0 }
    let mut tu = TranslationUnit::new(
        vec![Decl::Fn(FnDecl::new(
            "main",
            vec![],
            vec![Statement::ret(Expr::binary(
                Expr::binary(int(89), BinaryArithOp::Div, int(3)),
                BinaryArithOp::Div,
                float(4, 0, 1),
            ))],
        ))],
        "",
    );
    let session = compile(&mut tu, "scenario2");
    check(&session);
    assert_eq!(session.result_type_name, "f64");
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_float(), 7.25);
}

#[test]
fn inherited_field_through_base_handle() {
    // class A { var a = 4 }  class B : A { var b = 5 }
    // fn main() { var v: A = B(); return v.a }
    let mut tu = TranslationUnit::new(
        vec![
            class("A", vec![], vec![field("a", int(4))]),
            class("B", vec!["A"], vec![field("b", int(5))]),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![
                    var_stmt("v", Some(TypeRef::named("A")), Expr::call("B", vec![])),
                    Statement::ret(Expr::member("v", "a")),
                ],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "scenario3");
    check(&session);
    assert_eq!(session.result_type_name, "i64");
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 4);
}

#[test]
fn virtual_dispatch_through_base_parameter() {
    // class A { virtual fn test() { return 54 } }
    // class B : A { override fn test() { return 54398 } }
    // fn get(a: A) { return a.test() }
    // fn main() { return get(B()) }
    let mut tu = TranslationUnit::new(
        vec![
            class(
                "A",
                vec![],
                vec![method(
                    "test",
                    vec![Classifier::Virtual],
                    vec![Statement::ret(int(54))],
                )],
            ),
            class(
                "B",
                vec!["A"],
                vec![method(
                    "test",
                    vec![Classifier::Override],
                    vec![Statement::ret(int(54398))],
                )],
            ),
            Decl::Fn(FnDecl::new(
                "get",
                vec![FnParameter::new("a", TypeRef::named("A"))],
                vec![Statement::ret(Expr::Call {
                    callee: Box::new(Expr::member("a", "test")),
                    arguments: vec![],
                    span: Span::dummy(),
                })],
            )),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![Statement::ret(Expr::call("get", vec![Expr::call("B", vec![])]))],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "scenario4");
    check(&session);
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 54398);
}

#[test]
fn multiple_inheritance_leftmost_base_wins() {
    // class A { fn test() { return 4 } }
    // class D { fn test() { return this.i }  var i = 44 }
    // class MI : D, A { }
    // fn main() { var v = MI(); return v.test() }
    let mut tu = TranslationUnit::new(
        vec![
            class("A", vec![], vec![method("test", vec![], vec![Statement::ret(int(4))])]),
            class(
                "D",
                vec![],
                vec![
                    method("test", vec![], vec![Statement::ret(Expr::member("this", "i"))]),
                    field("i", int(44)),
                ],
            ),
            class("MI", vec!["D", "A"], vec![]),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![
                    var_stmt("v", None, Expr::call("MI", vec![])),
                    Statement::ret(Expr::Call {
                        callee: Box::new(Expr::member("v", "test")),
                        arguments: vec![],
                        span: Span::dummy(),
                    }),
                ],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "scenario5");
    check(&session);
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 44);
}

#[test]
fn return_type_overload_disambiguation() {
    // fn test() -> i32 { return 4 }  fn test() -> i64 { return 5 }
    // fn main() { var a: i64 = test(); return a }
    let mut tu = TranslationUnit::new(
        vec![
            Decl::Fn(
                FnDecl::new("test", vec![], vec![Statement::ret(int(4))])
                    .with_return_type(TypeRef::named("i32")),
            ),
            Decl::Fn(
                FnDecl::new("test", vec![], vec![Statement::ret(int(5))])
                    .with_return_type(TypeRef::named("i64")),
            ),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![
                    var_stmt("a", Some(TypeRef::named("i64")), Expr::call("test", vec![])),
                    Statement::ret(Expr::ident("a")),
                ],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "scenario6");
    check(&session);
    assert_eq!(session.result_type_name, "i64");
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 5);
}

#[test]
fn branching_on_a_condition() {
    // fn main() { var x = 10; if x { return 1 } else { return 2 } }
    let if_stmt = Statement::If {
        cond: Expr::ident("x"),
        then: Box::new(Statement::Block {
            statements: vec![Statement::ret(int(1))],
            span: Span::new(100, 110),
        }),
        else_: Some(Box::new(Statement::Block {
            statements: vec![Statement::ret(int(2))],
            span: Span::new(120, 130),
        })),
        span: Span::dummy(),
    };
    let mut tu = TranslationUnit::new(
        vec![Decl::Fn(FnDecl::new(
            "main",
            vec![],
            vec![var_stmt("x", None, int(10)), if_stmt],
        ))],
        "",
    );
    let session = compile(&mut tu, "branching");
    check(&session);
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 1);
}

#[test]
fn global_variables_initialise_before_main() {
    // var g = 12  fn main() { return g + 1 }
    let mut tu = TranslationUnit::new(
        vec![
            Decl::Var(VarDecl::new("g", None, Some(int(12)))),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![Statement::ret(Expr::binary(
                    Expr::ident("g"),
                    BinaryArithOp::Plus,
                    int(1),
                ))],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "globals");
    check(&session);
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_signed(64), 13);
}

#[test]
fn function_arguments_coerce_to_parameter_types() {
    // fn half(x: f64) -> f64 { return x / 2 }  fn main() { return half(7) }
    let mut tu = TranslationUnit::new(
        vec![
            Decl::Fn(
                FnDecl::new(
                    "half",
                    vec![FnParameter::new("x", TypeRef::named("f64"))],
                    vec![Statement::ret(Expr::binary(
                        Expr::ident("x"),
                        BinaryArithOp::Div,
                        int(2),
                    ))],
                )
                .with_return_type(TypeRef::named("f64")),
            ),
            Decl::Fn(FnDecl::new(
                "main",
                vec![],
                vec![Statement::ret(Expr::call("half", vec![int(7)]))],
            )),
        ],
        "",
    );
    let session = compile(&mut tu, "coerce");
    check(&session);
    assert_eq!(session.result_type_name, "f64");
    let result = run_main(&session).unwrap();
    assert_eq!(result.as_float(), 3.5);
}

#[test]
fn assignment_through_a_local() {
    // fn main() { var x = 1; x = x + 41; return x }
    let mut tu = TranslationUnit::new(
        vec![Decl::Fn(FnDecl::new(
            "main",
            vec![],
            vec![
                var_stmt("x", None, int(1)),
                Statement::Expr(Expr::Assignment {
                    lhs: Box::new(Expr::ident("x")),
                    rhs: Box::new(Expr::binary(Expr::ident("x"), BinaryArithOp::Plus, int(41))),
                    span: Span::dummy(),
                }),
                Statement::ret(Expr::ident("x")),
            ],
        ))],
        "",
    );
    let session = compile(&mut tu, "assign");
    check(&session);
    assert_eq!(run_main(&session).unwrap().as_signed(64), 42);
}

#[test]
fn unary_negation() {
    // fn main() { return -(5) }
    let mut tu = TranslationUnit::new(
        vec![Decl::Fn(FnDecl::new(
            "main",
            vec![],
            vec![Statement::ret(Expr::UnaryArith {
                op: cata_ast::UnaryArithOp::Negate,
                operand: Box::new(int(5)),
                span: Span::dummy(),
            })],
        ))],
        "",
    );
    let session = compile(&mut tu, "negate");
    check(&session);
    assert_eq!(run_main(&session).unwrap().as_signed(64), -5);
}

#[test]
fn cast_expression_converts_primitives() {
    // fn main() { return 89 as f32 }
    let mut tu = TranslationUnit::new(
        vec![Decl::Fn(FnDecl::new(
            "main",
            vec![],
            vec![Statement::ret(Expr::Cast {
                expr: Box::new(int(89)),
                target: TypeRef::named("f32"),
                span: Span::dummy(),
            })],
        ))],
        "",
    );
    let session = compile(&mut tu, "casts");
    check(&session);
    assert_eq!(session.result_type_name, "f32");
    assert_eq!(run_main(&session).unwrap().as_float(), 89.0);
}

#[test]
fn global_namespace_program_runs_through_prefixed_main() {
    // ns app (global) { fn helper() { return 6 }  fn main() { return helper() * 7 } }
    let mut tu = TranslationUnit::new(
        vec![Decl::Ns(cata_ast::NsDecl {
            ident: Ident::synthetic("app"),
            declarations: vec![
                Decl::Fn(FnDecl::new("helper", vec![], vec![Statement::ret(int(6))])),
                Decl::Fn(FnDecl::new(
                    "main",
                    vec![],
                    vec![Statement::ret(Expr::binary(
                        Expr::call("helper", vec![]),
                        BinaryArithOp::Times,
                        int(7),
                    ))],
                )),
            ],
            is_global: true,
            classifiers: vec![],
            span: Span::dummy(),
        })],
        "",
    );
    let session = compile(&mut tu, "namespaced");
    check(&session);
    assert_eq!(session.state.main_fqn(), "app.main");
    assert_eq!(run_main(&session).unwrap().as_signed(64), 42);
}
