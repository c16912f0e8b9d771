//! Result typing of expressions, used by the locals pass (inference) and by
//! the emitter (operand and coercion decisions). Must never report
//! diagnostics: the fixed-point driver calls it while types are still in
//! flux, so an unresolvable expression simply types as undefined.

use cata_ast::{BinaryArithOp, Expr, NumericClassifier, NumericLiteral};

use crate::overload::find_function_overload;
use crate::state::SemState;
use crate::types::{Type, TypeId};

/// The type an expression produces, or undefined when it cannot be deduced
/// yet. `expecting` is the type the surrounding context wants, used for
/// numeric-literal inference and return-type overload disambiguation.
pub fn expr_resulting_type(state: &mut SemState, expr: &Expr, expecting: Option<TypeId>) -> TypeId {
    match expr {
        Expr::Ident(ident) => match state.scopes.find_named(&state.symbols, &ident.name) {
            Some(key) => state.symbols[&key].ty,
            None => state.types.undefined(),
        },
        Expr::LiteralBool { .. } => state
            .types
            .builtin("bool")
            .unwrap_or_else(|| state.types.undefined()),
        Expr::LiteralNumeric(lit) => numeric_literal_type(state, lit, expecting),
        Expr::BinaryArith { op, lhs, rhs, .. } => {
            let lhs_ty = expr_resulting_type(state, lhs, None);
            let rhs_ty = expr_resulting_type(state, rhs, None);
            if !state.types.is_valid(lhs_ty) || !state.types.is_valid(rhs_ty) {
                return state.types.undefined();
            }
            match op {
                BinaryArithOp::Plus
                | BinaryArithOp::Minus
                | BinaryArithOp::Times
                | BinaryArithOp::Div => state.types.most_specialized(lhs_ty, rhs_ty),
                _ => state.types.undefined(),
            }
        }
        Expr::UnaryArith { operand, .. } => {
            let ty = expr_resulting_type(state, operand, expecting);
            if state.types.is_valid(ty) {
                ty
            } else {
                state.types.undefined()
            }
        }
        Expr::BinaryLogical { .. } => state
            .types
            .builtin("bool")
            .unwrap_or_else(|| state.types.undefined()),
        Expr::Assignment { lhs, .. } => expr_resulting_type(state, lhs, None),
        Expr::Call {
            callee, arguments, ..
        } => call_resulting_type(state, callee, arguments, expecting),
        Expr::MemberAccess { object, member, .. } => {
            let object_ty = expr_resulting_type(state, object, None);
            let Some(custom) = state.types.object_custom(object_ty) else {
                return state.types.undefined();
            };
            match state.types.get_member(custom, &member.name) {
                Some(locator) => state.types.locate(locator).ty,
                None => state.types.undefined(),
            }
        }
        Expr::Cast { target, .. } => state.resolve_type_ref(target),
    }
}

fn call_resulting_type(
    state: &mut SemState,
    callee: &Expr,
    arguments: &[Expr],
    expecting: Option<TypeId>,
) -> TypeId {
    match callee {
        Expr::Ident(ident) => {
            // instantiation: calling a custom type yields an object handle
            if let Some(key) = state.scopes.find_named(&state.symbols, &ident.name) {
                let ty = state.symbols[&key].ty;
                if state.types.is_custom(ty) {
                    return state.types.object(ty);
                }
            }
            let resolved =
                find_function_overload(state, &ident.name, arguments, expecting, false, None);
            let Some(key) = resolved else {
                return state.types.undefined();
            };
            let ty = state.symbols[&key].ty;
            match state.types.get(ty) {
                Type::Function(f) => f.return_type,
                _ => state.types.undefined(),
            }
        }
        Expr::MemberAccess { object, member, .. } => {
            let object_ty = expr_resulting_type(state, object, None);
            let Some(custom) = state.types.object_custom(object_ty) else {
                return state.types.undefined();
            };
            match state.types.get_member_canonical(custom, &member.name) {
                Some(locator) => {
                    let member_ty = state.types.locate(locator).ty;
                    match state.types.get(member_ty) {
                        Type::Function(f) => f.return_type,
                        _ => state.types.undefined(),
                    }
                }
                None => state.types.undefined(),
            }
        }
        _ => state.types.undefined(),
    }
}

/// A numeric literal's type: the suffix classifier wins; otherwise form
/// decides (fraction or negative exponent means float) with the expected
/// type adopted when its family matches.
pub fn numeric_literal_type(
    state: &mut SemState,
    lit: &NumericLiteral,
    expecting: Option<TypeId>,
) -> TypeId {
    let builtin = |state: &SemState, token: &str| {
        state
            .types
            .builtin(token)
            .unwrap_or_else(|| state.types.undefined())
    };
    match lit.classifier {
        NumericClassifier::Unsigned => return builtin(state, "u64"),
        NumericClassifier::Signed => return builtin(state, "i64"),
        NumericClassifier::Size => return builtin(state, "usize"),
        NumericClassifier::Signed8 => return builtin(state, "i8"),
        NumericClassifier::Unsigned8 => return builtin(state, "u8"),
        NumericClassifier::Signed16 => return builtin(state, "i16"),
        NumericClassifier::Unsigned16 => return builtin(state, "u16"),
        NumericClassifier::Signed32 => return builtin(state, "i32"),
        NumericClassifier::Unsigned32 => return builtin(state, "u32"),
        NumericClassifier::Signed64 => return builtin(state, "i64"),
        NumericClassifier::Unsigned64 => return builtin(state, "u64"),
        NumericClassifier::Signed128 => return builtin(state, "i128"),
        NumericClassifier::Unsigned128 => return builtin(state, "u128"),
        NumericClassifier::Float => return builtin(state, "f64"),
        NumericClassifier::Float16 => return builtin(state, "f16"),
        NumericClassifier::Float32 => return builtin(state, "f32"),
        NumericClassifier::Float64 => return builtin(state, "f64"),
        NumericClassifier::Float80 => return builtin(state, "f80"),
        NumericClassifier::Float128 => return builtin(state, "f128"),
        NumericClassifier::None => {}
    }

    let expected_token = expecting.and_then(|e| state.types.as_primitive(e).map(|p| p.token));
    if lit.is_float_form() {
        if let Some(token) = expected_token {
            if matches!(token, "f16" | "f32" | "f64" | "f80" | "f128") {
                return builtin(state, token);
            }
        }
        builtin(state, "f64")
    } else {
        if let Some(token) = expected_token {
            if matches!(
                token,
                "i8" | "i16" | "i32" | "i64" | "i128" | "u8" | "u16" | "u32" | "u64" | "u128"
            ) {
                return builtin(state, token);
            }
        }
        builtin(state, "i64")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cata_ast::Expr;

    #[test]
    fn bare_integer_defaults_to_i64() {
        let mut state = SemState::new("t");
        let ty = expr_resulting_type(&mut state, &Expr::LiteralNumeric(NumericLiteral::int(3)), None);
        assert_eq!(state.types.fqn(ty), "i64");
    }

    #[test]
    fn float_form_defaults_to_f64() {
        let mut state = SemState::new("t");
        let lit = NumericLiteral::float(4, 0, 1);
        let ty = expr_resulting_type(&mut state, &Expr::LiteralNumeric(lit), None);
        assert_eq!(state.types.fqn(ty), "f64");
    }

    #[test]
    fn literal_adopts_expected_type_of_matching_family() {
        let mut state = SemState::new("t");
        let i32t = state.types.builtin("i32").unwrap();
        let f32t = state.types.builtin("f32").unwrap();
        let int_lit = Expr::LiteralNumeric(NumericLiteral::int(5));
        assert_eq!(expr_resulting_type(&mut state, &int_lit, Some(i32t)), i32t);
        // an integer literal does not adopt a float expectation
        let adopted = expr_resulting_type(&mut state, &int_lit, Some(f32t));
        assert_eq!(state.types.fqn(adopted), "i64");
    }

    #[test]
    fn suffix_classifier_overrides_expectation() {
        let mut state = SemState::new("t");
        let i32t = state.types.builtin("i32").unwrap();
        let mut lit = NumericLiteral::int(5);
        lit.classifier = NumericClassifier::Unsigned;
        let ty = expr_resulting_type(&mut state, &Expr::LiteralNumeric(lit), Some(i32t));
        assert_eq!(state.types.fqn(ty), "u64");
    }

    #[test]
    fn arithmetic_picks_most_specialized() {
        let mut state = SemState::new("t");
        let expr = Expr::binary(
            Expr::LiteralNumeric(NumericLiteral::int(89)),
            BinaryArithOp::Div,
            Expr::LiteralNumeric(NumericLiteral::float(4, 0, 1)),
        );
        let ty = expr_resulting_type(&mut state, &expr, None);
        assert_eq!(state.types.fqn(ty), "f64");
    }

    #[test]
    fn unknown_ident_is_undefined() {
        let mut state = SemState::new("t");
        let ty = expr_resulting_type(&mut state, &Expr::ident("missing"), None);
        assert!(!state.types.is_valid(ty));
    }
}
