//! The fixed-point resolution driver: overload renaming once, then the
//! prototype pass until quiescent, then a completeness sweep over the
//! symbol table.

use cata_ast::TranslationUnit;
use tracing::info;

use crate::passes::{OverloadingPass, ProtoPass};
use crate::state::SemState;

/// Iteration backstop. Convergence is usually reached within a handful of
/// rounds; a pass that still reports changes here is cycling.
const MAX_ITERATIONS: usize = 64;

/// Run name resolution and typing to a fixed point. Diagnostics land in
/// `state.sink`; the caller decides whether emission may proceed.
pub fn resolve(state: &mut SemState, tu: &mut TranslationUnit) {
    OverloadingPass::new().run(state, tu);

    let mut proto = ProtoPass::new();
    loop {
        let changes = proto.run(state, tu);
        if changes == 0 {
            break;
        }
        if proto.n >= MAX_ITERATIONS {
            state.error_unanchored("internal: type resolution did not converge");
            break;
        }
    }
    info!(iterations = proto.n, symbols = state.symbols.len(), "resolution finished");

    // anything still invalid after the fixed point is an incomplete type
    let incomplete: Vec<(String, cata_common::Span)> = state
        .symbols
        .iter()
        .filter(|(_, sym)| !sym.imported && !state.types.is_valid(sym.ty))
        .map(|(key, sym)| (key.clone(), sym.span))
        .collect();
    for (key, span) in incomplete {
        state.error(
            format!("No type has been defined for `{key}` and it can't be inferred"),
            span,
        );
    }
}
