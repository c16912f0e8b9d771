//! The instruction builder.
//!
//! `Builder` owns the module and an insertion cursor. Every `build_*`
//! method appends an instruction at the cursor and returns the resulting
//! value id. Positioning mirrors the usual IR-builder surface:
//! `position_at_end`, `insert_block`, etc.

use tracing::trace;

use crate::module::{
    BlockId, Callee, CastOp, FuncId, ICmpPred, Inst, IntBinOp, Module, UnOp, ValueDef, ValueId,
    ValueKind,
};
use crate::types::{TyId, TyKind};

/// Where the next instruction goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertPoint {
    pub func: FuncId,
    pub block: BlockId,
}

/// Builds instructions into a module at a movable cursor.
#[derive(Debug, Default)]
pub struct Builder {
    pub module: Module,
    cursor: Option<InsertPoint>,
}

impl Builder {
    pub fn new(module: Module) -> Self {
        Builder {
            module,
            cursor: None,
        }
    }

    // ---- cursor ----

    pub fn position_at_end(&mut self, func: FuncId, block: BlockId) {
        self.cursor = Some(InsertPoint { func, block });
    }

    pub fn clear_position(&mut self) {
        self.cursor = None;
    }

    pub fn insert_point(&self) -> Option<InsertPoint> {
        self.cursor
    }

    /// Restore a previously saved cursor (possibly none).
    pub fn restore_point(&mut self, point: Option<InsertPoint>) {
        self.cursor = point;
    }

    fn append(&mut self, ty: TyId, inst: Inst, name: &str) -> ValueId {
        let id = self.module.push_value(ValueDef {
            ty,
            kind: ValueKind::Inst(inst),
            name: name.to_string(),
        });
        let at = self
            .cursor
            .expect("builder has no insertion point");
        self.module.functions[at.func.0 as usize].blocks[at.block.0 as usize]
            .insts
            .push(id);
        trace!(value = id.0, "append instruction");
        id
    }

    // ---- memory ----

    pub fn build_alloca(&mut self, alloc_ty: TyId, name: &str) -> ValueId {
        let ptr = self.module.types.ptr();
        self.append(ptr, Inst::Alloca { alloc_ty }, name)
    }

    pub fn build_load(&mut self, ty: TyId, ptr: ValueId, name: &str) -> ValueId {
        self.append(ty, Inst::Load { ptr }, name)
    }

    pub fn build_store(&mut self, value: ValueId, ptr: ValueId) -> ValueId {
        let void = self.module.types.void();
        self.append(void, Inst::Store { value, ptr }, "")
    }

    pub fn build_gep(&mut self, elem_ty: TyId, ptr: ValueId, index: ValueId, name: &str) -> ValueId {
        let p = self.module.types.ptr();
        self.append(
            p,
            Inst::Gep {
                elem_ty,
                ptr,
                index,
            },
            name,
        )
    }

    /// `gep` with a constant index, mirroring `CreateConstGEP1_64`.
    pub fn build_const_gep(&mut self, elem_ty: TyId, ptr: ValueId, index: i64, name: &str) -> ValueId {
        let i64t = self.module.types.int(64);
        let idx = self.module.const_int(i64t, index as i128);
        self.build_gep(elem_ty, ptr, idx, name)
    }

    pub fn build_struct_gep(
        &mut self,
        struct_ty: TyId,
        ptr: ValueId,
        index: u32,
        name: &str,
    ) -> ValueId {
        let p = self.module.types.ptr();
        self.append(
            p,
            Inst::StructGep {
                struct_ty,
                ptr,
                index,
            },
            name,
        )
    }

    // ---- arithmetic ----

    pub fn build_binop(&mut self, op: IntBinOp, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
        let ty = self.module.type_of(lhs);
        self.append(ty, Inst::BinOp { op, lhs, rhs }, name)
    }

    pub fn build_neg(&mut self, operand: ValueId, name: &str) -> ValueId {
        let ty = self.module.type_of(operand);
        self.append(ty, Inst::UnOp { op: UnOp::Neg, operand }, name)
    }

    pub fn build_fneg(&mut self, operand: ValueId, name: &str) -> ValueId {
        let ty = self.module.type_of(operand);
        self.append(ty, Inst::UnOp { op: UnOp::FNeg, operand }, name)
    }

    /// Bitwise complement via `xor x, -1`.
    pub fn build_not(&mut self, operand: ValueId, name: &str) -> ValueId {
        let ty = self.module.type_of(operand);
        let all_ones = self.module.const_int(ty, -1);
        self.build_binop(IntBinOp::Xor, operand, all_ones, name)
    }

    pub fn build_icmp(&mut self, pred: ICmpPred, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
        let b = self.module.types.bool();
        self.append(b, Inst::ICmp { pred, lhs, rhs }, name)
    }

    // ---- casts ----

    pub fn build_cast(&mut self, op: CastOp, value: ValueId, to_ty: TyId, name: &str) -> ValueId {
        self.append(to_ty, Inst::Cast { op, value }, name)
    }

    /// Sign-extend or truncate to `to_ty`; identity when widths match.
    pub fn build_sext_or_trunc(&mut self, value: ValueId, to_ty: TyId, name: &str) -> ValueId {
        self.resize_int(value, to_ty, CastOp::SExt, name)
    }

    /// Zero-extend or truncate to `to_ty`; identity when widths match.
    pub fn build_zext_or_trunc(&mut self, value: ValueId, to_ty: TyId, name: &str) -> ValueId {
        self.resize_int(value, to_ty, CastOp::ZExt, name)
    }

    fn resize_int(&mut self, value: ValueId, to_ty: TyId, widen: CastOp, name: &str) -> ValueId {
        let from_ty = self.module.type_of(value);
        let (from_bits, to_bits) = match (
            self.module.types.kind(from_ty),
            self.module.types.kind(to_ty),
        ) {
            (TyKind::Int { bits: f }, TyKind::Int { bits: t }) => (*f, *t),
            _ => return value,
        };
        if from_bits == to_bits {
            value
        } else if from_bits < to_bits {
            self.build_cast(widen, value, to_ty, name)
        } else {
            self.build_cast(CastOp::Trunc, value, to_ty, name)
        }
    }

    // ---- control flow ----

    pub fn build_br(&mut self, dest: BlockId) -> ValueId {
        let void = self.module.types.void();
        self.append(void, Inst::Br { dest }, "")
    }

    pub fn build_cond_br(&mut self, cond: ValueId, then_dest: BlockId, else_dest: BlockId) -> ValueId {
        let void = self.module.types.void();
        self.append(
            void,
            Inst::CondBr {
                cond,
                then_dest,
                else_dest,
            },
            "",
        )
    }

    pub fn build_phi(&mut self, ty: TyId, name: &str) -> ValueId {
        self.append(ty, Inst::Phi { incoming: Vec::new() }, name)
    }

    pub fn add_incoming(&mut self, phi: ValueId, value: ValueId, block: BlockId) {
        if let ValueKind::Inst(Inst::Phi { incoming }) = &mut self.module.value_mut(phi).kind {
            incoming.push((value, block));
        }
    }

    pub fn build_ret(&mut self, value: ValueId) -> ValueId {
        let void = self.module.types.void();
        self.append(void, Inst::Ret { value: Some(value) }, "")
    }

    pub fn build_ret_void(&mut self) -> ValueId {
        let void = self.module.types.void();
        self.append(void, Inst::Ret { value: None }, "")
    }

    // ---- calls ----

    pub fn build_call(&mut self, func: FuncId, args: Vec<ValueId>, name: &str) -> ValueId {
        let fn_ty = self.module.function(func).ty;
        let ret = self.module.types.return_type(fn_ty).unwrap_or_else(|| {
            self.module.types.void()
        });
        self.append(
            ret,
            Inst::Call {
                callee: Callee::Function(func),
                fn_ty,
                args,
            },
            name,
        )
    }

    /// Call through a function pointer with an explicit function type.
    pub fn build_indirect_call(
        &mut self,
        fn_ty: TyId,
        callee: ValueId,
        args: Vec<ValueId>,
        name: &str,
    ) -> ValueId {
        let ret = self.module.types.return_type(fn_ty).unwrap_or_else(|| {
            self.module.types.void()
        });
        self.append(
            ret,
            Inst::Call {
                callee: Callee::Pointer(callee),
                fn_ty,
                args,
            },
            name,
        )
    }

    /// The size of `ty` as an `i64` constant, straight from the layout
    /// (no null-gep trick needed).
    pub fn size_of(&mut self, ty: TyId) -> ValueId {
        let size = self.module.types.size_of(ty);
        let i64t = self.module.types.int(64);
        self.module.const_int(i64t, size as i128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Linkage;

    #[test]
    fn cursor_moves_between_blocks() {
        let mut b = Builder::new(Module::new("m"));
        let i64t = b.module.types.int(64);
        let fn_ty = b.module.types.function(i64t, vec![]);
        let f = b.module.add_function("f", fn_ty, Linkage::External);
        let entry = b.module.append_block(f, "entry");
        let other = b.module.append_block(f, "other");

        b.position_at_end(f, entry);
        let c = b.module.const_int(i64t, 1);
        b.build_ret(c);

        b.position_at_end(f, other);
        b.build_ret_void();

        assert_eq!(b.module.block(f, entry).insts.len(), 1);
        assert_eq!(b.module.block(f, other).insts.len(), 1);
    }

    #[test]
    fn sext_or_trunc_is_identity_on_same_width() {
        let mut b = Builder::new(Module::new("m"));
        let i64t = b.module.types.int(64);
        let i32t = b.module.types.int(32);
        let fn_ty = b.module.types.function(i64t, vec![]);
        let f = b.module.add_function("f", fn_ty, Linkage::External);
        let entry = b.module.append_block(f, "entry");
        b.position_at_end(f, entry);

        let v = b.module.const_int(i64t, 7);
        assert_eq!(b.build_sext_or_trunc(v, i64t, "same"), v);
        let narrowed = b.build_sext_or_trunc(v, i32t, "narrow");
        assert_ne!(narrowed, v);
        assert_eq!(b.module.type_of(narrowed), i32t);
    }
}
