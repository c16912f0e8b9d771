//! Call-site overload resolution.
//!
//! Candidates are gathered by suffix walking (`f`, `` f`1 ``, ...), then
//! narrowed: arity and parameter assignability first, exact parameter
//! matches next, and the expected result type last. Exactly one survivor
//! binds; zero or several is a diagnostic (when `report` is set; the
//! typing passes resolve quietly).

use cata_ast::Expr;
use cata_common::Span;

use crate::expr_type::expr_resulting_type;
use crate::state::SemState;
use crate::types::{Type, TypeId};

pub fn find_function_overload(
    state: &mut SemState,
    name: &str,
    arguments: &[Expr],
    expecting: Option<TypeId>,
    report: bool,
    call_span: Option<Span>,
) -> Option<String> {
    let mut candidates: Vec<String> = state
        .scopes
        .find_overloaded(&state.symbols, &state.types, name, false)
        .into_iter()
        .filter(|key| {
            matches!(
                state.types.get(state.symbols[key].ty),
                Type::Function(_)
            )
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return candidates.pop();
    }

    // arity and parameter assignability
    let mut viable: Vec<String> = Vec::new();
    for key in &candidates {
        if params_accept(state, key, arguments, false) {
            viable.push(key.clone());
        }
    }
    candidates = viable;

    if candidates.len() > 1 {
        // prefer a unique exact parameter-type match
        let exact: Vec<String> = candidates
            .iter()
            .filter(|key| params_accept(state, key, arguments, true))
            .cloned()
            .collect();
        if exact.len() == 1 {
            return exact.into_iter().next();
        }

        // fall back to the expected result type
        match expecting.filter(|&e| state.types.is_valid(e)) {
            None => {
                if report {
                    state.sink.error(
                        "function call couldn't be matched by return type",
                        call_span,
                    );
                    state.sink.info(
                        "Expected type is not deducible from context.",
                        None,
                    );
                    state.help("Consider making types explicit.");
                }
            }
            Some(expected) => {
                candidates.retain(|key| {
                    let ret = match state.types.get(state.symbols[key].ty) {
                        Type::Function(f) => f.return_type,
                        _ => return false,
                    };
                    state.types.is_assignable_from(expected, ret)
                });
                if candidates.len() > 1 {
                    // primitives coerce freely, so assignability rarely
                    // narrows; an exact return-type match breaks the tie
                    let exact_ret: Vec<String> = candidates
                        .iter()
                        .filter(|key| {
                            let ret = match state.types.get(state.symbols[*key].ty) {
                                Type::Function(f) => f.return_type,
                                _ => return false,
                            };
                            state.types.types_equal(expected, ret)
                        })
                        .cloned()
                        .collect();
                    if exact_ret.len() == 1 {
                        return exact_ret.into_iter().next();
                    }
                }
            }
        }
    }

    if candidates.is_empty() {
        if report {
            state
                .sink
                .error("No overload matches call signature", call_span);
        }
        return None;
    }
    if candidates.len() > 1 {
        if report {
            state.sink.error("Ambiguous function call", call_span);
            for key in &candidates {
                let span = state.symbols[key].span;
                state.info("Possible candidate", span);
            }
            state.help("Consider making types explicit.");
        }
        return None;
    }
    candidates.pop()
}

/// Whether `key`'s parameters accept the arguments: assignable when
/// `exact` is false, canonically equal when true.
fn params_accept(state: &mut SemState, key: &str, arguments: &[Expr], exact: bool) -> bool {
    let params: Vec<TypeId> = match state.types.get(state.symbols[key].ty) {
        Type::Function(f) => f.parameters.clone(),
        _ => return false,
    };
    if params.len() != arguments.len() {
        return false;
    }
    for (param, arg) in params.iter().zip(arguments) {
        let arg_ty = expr_resulting_type(state, arg, Some(*param));
        let ok = if exact {
            state.types.types_equal(*param, arg_ty)
        } else {
            state.types.is_assignable_from(*param, arg_ty)
        };
        if !ok {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use cata_ast::NumericLiteral;
    use cata_common::Span;

    fn add_fn(state: &mut SemState, key: &str, params: &[&str], ret: &str) {
        let param_ids: Vec<TypeId> = params
            .iter()
            .map(|p| state.types.builtin(p).unwrap())
            .collect();
        let ret_id = state.types.builtin(ret).unwrap();
        let fn_ty = state.types.function(ret_id, param_ids);
        state.try_insert_symbol(key, Symbol::new(Span::dummy(), fn_ty));
    }

    #[test]
    fn single_candidate_wins_unconditionally() {
        let mut state = SemState::new("t");
        add_fn(&mut state, "f", &["i64"], "i64");
        let args = vec![Expr::LiteralNumeric(NumericLiteral::int(1))];
        let found = find_function_overload(&mut state, "f", &args, None, true, None);
        assert_eq!(found.as_deref(), Some("f"));
    }

    #[test]
    fn arity_eliminates_candidates() {
        let mut state = SemState::new("t");
        add_fn(&mut state, "f", &["i64", "i64"], "i64");
        add_fn(&mut state, "f`1", &["i64"], "i64");
        let args = vec![Expr::LiteralNumeric(NumericLiteral::int(1))];
        let found = find_function_overload(&mut state, "f", &args, None, true, None);
        assert_eq!(found.as_deref(), Some("f`1"));
        assert_eq!(state.num_errors(), 0);
    }

    #[test]
    fn exact_parameter_match_beats_coercible() {
        let mut state = SemState::new("t");
        add_fn(&mut state, "f", &["i32"], "i64");
        add_fn(&mut state, "f`1", &["i64"], "i64");
        // a bare integer literal adopts each candidate's parameter type in
        // turn, so both match exactly and no unique winner exists
        let args = vec![Expr::LiteralNumeric(NumericLiteral::int(1))];
        let found = find_function_overload(&mut state, "f", &args, None, true, None);
        // both adopt the expected type so both match exactly: ambiguous
        // without an expecting type
        assert!(found.is_none());
        assert!(state.num_errors() > 0);
    }

    #[test]
    fn expecting_type_disambiguates_by_return() {
        let mut state = SemState::new("t");
        add_fn(&mut state, "test", &[], "i32");
        add_fn(&mut state, "test`1", &[], "i64");
        let i64t = state.types.builtin("i64").unwrap();
        let found = find_function_overload(&mut state, "test", &[], Some(i64t), true, None);
        assert_eq!(found.as_deref(), Some("test`1"));
        assert_eq!(state.num_errors(), 0);
    }

    #[test]
    fn missing_expecting_type_reports() {
        let mut state = SemState::new("t");
        add_fn(&mut state, "test", &[], "i32");
        add_fn(&mut state, "test`1", &[], "i64");
        let found = find_function_overload(&mut state, "test", &[], None, true, None);
        assert!(found.is_none());
        assert!(state.num_errors() > 0);
    }
}
