//! Structural verification of emitted functions.
//!
//! Catches emitter bugs early: unterminated blocks, instructions after a
//! terminator, and return values whose type disagrees with the function
//! signature.

use crate::module::{Inst, Module, ValueKind};
use crate::types::TyKind;

/// Verify every defined function in the module. Returns human-readable
/// problem descriptions; empty means the module passed.
pub fn verify_module(module: &Module) -> Vec<String> {
    let mut problems = Vec::new();
    for (_, func) in module.functions() {
        if func.is_declaration() {
            continue;
        }
        let ret_ty = module.types.return_type(func.ty);
        for (bi, block) in func.blocks.iter().enumerate() {
            let Some((&last, body)) = block.insts.split_last() else {
                problems.push(format!(
                    "function '{}' block {} ('{}') is empty",
                    func.name, bi, block.label
                ));
                continue;
            };
            for &v in body {
                if let ValueKind::Inst(inst) = &module.value(v).kind {
                    if inst.is_terminator() {
                        problems.push(format!(
                            "function '{}' block '{}' has a terminator before its end",
                            func.name, block.label
                        ));
                    }
                }
            }
            match &module.value(last).kind {
                ValueKind::Inst(inst) if inst.is_terminator() => {
                    if let Inst::Ret { value } = inst {
                        check_ret(module, &func.name, ret_ty, *value, &mut problems);
                    }
                }
                _ => problems.push(format!(
                    "function '{}' block '{}' does not end in a terminator",
                    func.name, block.label
                )),
            }
        }
    }
    problems
}

fn check_ret(
    module: &Module,
    func_name: &str,
    ret_ty: Option<crate::types::TyId>,
    value: Option<crate::module::ValueId>,
    problems: &mut Vec<String>,
) {
    let Some(ret_ty) = ret_ty else { return };
    match value {
        None => {
            if !matches!(module.types.kind(ret_ty), TyKind::Void) {
                problems.push(format!(
                    "function '{func_name}' returns void but its type does not"
                ));
            }
        }
        Some(v) => {
            let vty = module.type_of(v);
            if vty != ret_ty {
                problems.push(format!(
                    "function '{func_name}' returns a value of the wrong type"
                ));
            }
        }
    }
}
