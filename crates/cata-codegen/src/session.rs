//! The compile session: resolution, emission, verification, and the
//! runnability probe.

use cata_ast::TranslationUnit;
use cata_llir::eval::{self, EvalError, RtVal};
use cata_sem::{SemState, Type};
use tracing::info;

/// The outcome of compiling one translation unit.
pub struct CompileSession {
    pub state: SemState,
    /// No error diagnostics were produced.
    pub is_successful: bool,
    /// `main` exists (under the global namespace when set) and is a
    /// function.
    pub is_runnable: bool,
    /// FQN of `main`'s result type, when runnable.
    pub result_type_name: String,
}

impl CompileSession {
    /// Render collected diagnostics against the unit's source buffer.
    pub fn render_diagnostics(&self, source: &str, format: cata_common::RenderFormat) -> String {
        self.state.sink.render_all(source, format)
    }
}

/// Compile a translation unit: overload renaming and the prototype fixed
/// point, then declaration emission, then structural verification.
/// Diagnostics never abort the pipeline; emission is skipped only when
/// resolution already failed.
pub fn compile(tu: &mut TranslationUnit, module_name: &str) -> CompileSession {
    let mut state = SemState::new(module_name);

    cata_sem::resolve(&mut state, tu);

    if state.num_errors() == 0 {
        crate::decl::emit_unit(&mut state, tu);

        // emission diagnostics make the module shape unreliable; only a
        // clean emission gets the structural check
        if state.num_errors() == 0 {
            for problem in cata_llir::verify::verify_module(&state.builder.module) {
                state.error_unanchored(format!("internal: {problem}"));
            }
        }
    }

    let is_successful = state.num_errors() == 0;

    let main_fqn = state.main_fqn();
    let mut is_runnable = false;
    let mut result_type_name = String::new();
    if is_successful {
        if let Some(main_ty) = state.symbol_type(&main_fqn) {
            if let Type::Function(f) = state.types.get(main_ty) {
                result_type_name = state.types.fqn(f.return_type);
                is_runnable = true;
            }
        }
    }
    info!(successful = is_successful, runnable = is_runnable, "compilation finished");

    CompileSession {
        state,
        is_successful,
        is_runnable,
        result_type_name,
    }
}

/// Execute the compiled module: global initialisation first, then `main`.
pub fn run_main(session: &CompileSession) -> Result<RtVal, EvalError> {
    let module = &session.state.builder.module;
    let mut machine = eval::Machine::new(module);
    if module
        .get_named_function("__CATA_GLOBAL_INIT")
        .map(|f| !module.function(f).is_declaration())
        .unwrap_or(false)
    {
        machine.run("__CATA_GLOBAL_INIT")?;
    }
    machine.run(&session.state.main_fqn())
}
