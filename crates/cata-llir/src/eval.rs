//! An interpreter over emitted modules.
//!
//! Stands in for the external JIT/code-generation backend: the end-to-end
//! tests and `catac --run` execute `main` here and observe the result.
//!
//! The machine is byte-addressed. Allocas and globals live in one flat
//! memory; pointers are plain offsets into it. Function "addresses" are
//! tagged offsets above `FN_BASE` so function pointers stored in vtables
//! round-trip through memory.

use rustc_hash::FxHashMap;

use crate::module::{
    Callee, CastOp, Constant, FuncId, ICmpPred, Inst, IntBinOp, Module, UnOp, ValueId, ValueKind,
};
use crate::types::{FloatKind, TyId, TyKind};

/// Address space reserved for function pointers.
const FN_BASE: u64 = 0xF000_0000;
/// Execution fuel: aborts runaway programs.
const MAX_STEPS: u64 = 50_000_000;

/// A runtime value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RtVal {
    /// Raw bits, masked to the width of the producing type.
    Int(u128),
    Float(f64),
    Ptr(u64),
    Unit,
}

impl RtVal {
    pub fn as_int(&self) -> u128 {
        match self {
            RtVal::Int(v) => *v,
            RtVal::Ptr(p) => *p as u128,
            RtVal::Float(f) => *f as u128,
            RtVal::Unit => 0,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            RtVal::Float(f) => *f,
            RtVal::Int(v) => *v as f64,
            RtVal::Ptr(p) => *p as f64,
            RtVal::Unit => 0.0,
        }
    }

    pub fn as_ptr(&self) -> u64 {
        match self {
            RtVal::Ptr(p) => *p,
            RtVal::Int(v) => *v as u64,
            _ => 0,
        }
    }

    /// Interpret the raw bits as a signed integer of `bits` width.
    pub fn as_signed(&self, bits: u32) -> i128 {
        sign_extend(self.as_int(), bits)
    }
}

#[derive(Debug)]
pub enum EvalError {
    MissingFunction(String),
    NoBody(String),
    NullDeref,
    OutOfFuel,
    BadCallee,
    Unsupported(&'static str),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::MissingFunction(name) => write!(f, "no function named '{name}'"),
            EvalError::NoBody(name) => write!(f, "function '{name}' has no body"),
            EvalError::NullDeref => write!(f, "null pointer dereference"),
            EvalError::OutOfFuel => write!(f, "execution step limit exceeded"),
            EvalError::BadCallee => write!(f, "call through a non-function pointer"),
            EvalError::Unsupported(what) => write!(f, "unsupported operation: {what}"),
        }
    }
}

impl std::error::Error for EvalError {}

fn sign_extend(bits_value: u128, bits: u32) -> i128 {
    if bits == 0 || bits >= 128 {
        return bits_value as i128;
    }
    let shift = 128 - bits;
    ((bits_value << shift) as i128) >> shift
}

fn mask(value: u128, bits: u32) -> u128 {
    if bits >= 128 {
        value
    } else {
        value & ((1u128 << bits) - 1)
    }
}

/// The abstract machine.
pub struct Machine<'m> {
    module: &'m Module,
    memory: Vec<u8>,
    globals: FxHashMap<u32, u64>,
    steps: u64,
}

impl<'m> Machine<'m> {
    pub fn new(module: &'m Module) -> Self {
        let mut machine = Machine {
            module,
            // address 0 stays unmapped so null is distinguishable
            memory: vec![0u8; 64],
            globals: FxHashMap::default(),
            steps: 0,
        };
        machine.place_globals();
        machine
    }

    /// Run a function by name with no arguments.
    pub fn run(&mut self, name: &str) -> Result<RtVal, EvalError> {
        let func = self
            .module
            .get_named_function(name)
            .ok_or_else(|| EvalError::MissingFunction(name.to_string()))?;
        self.call(func, &[])
    }

    fn alloc(&mut self, size: u64, align: u64) -> u64 {
        let align = align.max(1);
        let addr = (self.memory.len() as u64).next_multiple_of(align);
        self.memory.resize((addr + size.max(1)) as usize, 0);
        addr
    }

    fn place_globals(&mut self) {
        // two passes so initializers may reference later globals
        let ids: Vec<_> = self.module.globals().map(|(id, _)| id).collect();
        for id in &ids {
            let g = self.module.global(*id);
            let size = self.module.types.size_of(g.value_ty);
            let align = self.module.types.align_of(g.value_ty);
            let addr = self.alloc(size, align);
            self.globals.insert(id.0, addr);
        }
        for id in &ids {
            let g = self.module.global(*id);
            if let Some(init) = g.init {
                let addr = self.globals[&id.0];
                self.write_constant(addr, g.value_ty, init);
            }
        }
    }

    fn write_constant(&mut self, addr: u64, ty: TyId, value: ValueId) {
        let def = self.module.value(value);
        match &def.kind {
            ValueKind::Constant(c) => match c {
                Constant::Int { value } => {
                    self.write_scalar(addr, ty, RtVal::Int(*value as u128));
                }
                Constant::Float { value } => {
                    self.write_scalar(addr, ty, RtVal::Float(*value));
                }
                Constant::Null => self.write_scalar(addr, ty, RtVal::Ptr(0)),
                Constant::Zero => {
                    let size = self.module.types.size_of(ty) as usize;
                    for i in 0..size {
                        self.memory[addr as usize + i] = 0;
                    }
                }
                Constant::Array { elems } => {
                    if let TyKind::Array { elem, .. } = self.module.types.kind(ty) {
                        let elem = *elem;
                        let elem_size = self.module.types.size_of(elem);
                        for (i, &e) in elems.iter().enumerate() {
                            self.write_constant(addr + i as u64 * elem_size, elem, e);
                        }
                    }
                }
                Constant::Struct { fields } => {
                    for (i, &f) in fields.iter().enumerate() {
                        let offset = self.module.types.field_offset(ty, i as u32);
                        if let Some(fty) = self.module.types.field_type(ty, i as u32) {
                            self.write_constant(addr + offset, fty, f);
                        }
                    }
                }
            },
            ValueKind::Function(f) => {
                self.write_scalar(addr, ty, RtVal::Ptr(FN_BASE + f.0 as u64));
            }
            ValueKind::Global(g) => {
                let target = self.globals[&g.0];
                self.write_scalar(addr, ty, RtVal::Ptr(target));
            }
            _ => {}
        }
    }

    fn write_scalar(&mut self, addr: u64, ty: TyId, value: RtVal) {
        let addr = addr as usize;
        match self.module.types.kind(ty) {
            TyKind::Int { bits } => {
                let size = (*bits as usize).div_ceil(8);
                let raw = mask(value.as_int(), *bits).to_le_bytes();
                self.memory[addr..addr + size].copy_from_slice(&raw[..size]);
            }
            TyKind::Float(kind) => match kind {
                FloatKind::F32 => {
                    let raw = (value.as_float() as f32).to_le_bytes();
                    self.memory[addr..addr + 4].copy_from_slice(&raw);
                }
                FloatKind::F16 => {
                    // stored as truncated f32 bits; precision loss is fine here
                    let raw = (value.as_float() as f32).to_le_bytes();
                    self.memory[addr..addr + 2].copy_from_slice(&raw[2..4]);
                }
                _ => {
                    let raw = value.as_float().to_le_bytes();
                    self.memory[addr..addr + 8].copy_from_slice(&raw);
                }
            },
            TyKind::Ptr | TyKind::Function { .. } => {
                let raw = value.as_ptr().to_le_bytes();
                self.memory[addr..addr + 8].copy_from_slice(&raw);
            }
            TyKind::Void | TyKind::Struct { .. } | TyKind::Array { .. } => {}
        }
    }

    fn read_scalar(&self, addr: u64, ty: TyId) -> RtVal {
        let addr = addr as usize;
        match self.module.types.kind(ty) {
            TyKind::Int { bits } => {
                let size = (*bits as usize).div_ceil(8);
                let mut raw = [0u8; 16];
                raw[..size].copy_from_slice(&self.memory[addr..addr + size]);
                RtVal::Int(mask(u128::from_le_bytes(raw), *bits))
            }
            TyKind::Float(kind) => match kind {
                FloatKind::F32 => {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(&self.memory[addr..addr + 4]);
                    RtVal::Float(f32::from_le_bytes(raw) as f64)
                }
                FloatKind::F16 => {
                    let mut raw = [0u8; 4];
                    raw[2..4].copy_from_slice(&self.memory[addr..addr + 2]);
                    RtVal::Float(f32::from_le_bytes(raw) as f64)
                }
                _ => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(&self.memory[addr..addr + 8]);
                    RtVal::Float(f64::from_le_bytes(raw))
                }
            },
            TyKind::Ptr | TyKind::Function { .. } => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&self.memory[addr..addr + 8]);
                RtVal::Ptr(u64::from_le_bytes(raw))
            }
            TyKind::Void | TyKind::Struct { .. } | TyKind::Array { .. } => RtVal::Unit,
        }
    }

    /// Copy `size` bytes between memory locations (used for by-value
    /// aggregate moves).
    fn memcpy(&mut self, dst: u64, src: u64, size: u64) {
        for i in 0..size {
            self.memory[(dst + i) as usize] = self.memory[(src + i) as usize];
        }
    }

    fn call(&mut self, func: FuncId, args: &[RtVal]) -> Result<RtVal, EvalError> {
        let f = self.module.function(func);
        if f.is_declaration() {
            return Err(EvalError::NoBody(f.name.clone()));
        }

        let mut frame: FxHashMap<u32, RtVal> = FxHashMap::default();
        for (i, &param) in f.params.iter().enumerate() {
            let incoming = args.get(i).copied().unwrap_or(RtVal::Unit);
            // byval parameters get a private copy of the aggregate
            let byval_ty = f.param_attrs[i].iter().find_map(|a| match a {
                crate::module::ParamAttr::ByVal(ty) => Some(*ty),
                _ => None,
            });
            let value = if let Some(ty) = byval_ty {
                let size = self.module.types.size_of(ty);
                let align = self.module.types.align_of(ty);
                let copy = self.alloc(size, align);
                self.memcpy(copy, incoming.as_ptr(), size);
                RtVal::Ptr(copy)
            } else {
                incoming
            };
            frame.insert(param.0, value);
        }

        let mut block = 0u32;
        let mut prev_block: Option<u32> = None;
        loop {
            let insts = self.module.function(func).blocks[block as usize].insts.clone();
            let mut next_block = None;
            for inst_id in insts {
                self.steps += 1;
                if self.steps > MAX_STEPS {
                    return Err(EvalError::OutOfFuel);
                }
                let def = self.module.value(inst_id);
                let ValueKind::Inst(inst) = &def.kind else {
                    continue;
                };
                match inst {
                    Inst::Ret { value } => {
                        return Ok(match value {
                            Some(v) => self.operand(&frame, *v),
                            None => RtVal::Unit,
                        });
                    }
                    Inst::Br { dest } => {
                        next_block = Some(dest.0);
                        break;
                    }
                    Inst::CondBr {
                        cond,
                        then_dest,
                        else_dest,
                    } => {
                        let c = self.operand(&frame, *cond).as_int();
                        next_block = Some(if c != 0 { then_dest.0 } else { else_dest.0 });
                        break;
                    }
                    _ => {
                        let result = self.exec(&frame, prev_block, def.ty, inst)?;
                        frame.insert(inst_id.0, result);
                    }
                }
            }
            match next_block {
                Some(nb) => {
                    prev_block = Some(block);
                    block = nb;
                }
                None => return Ok(RtVal::Unit),
            }
        }
    }

    fn operand(&self, frame: &FxHashMap<u32, RtVal>, id: ValueId) -> RtVal {
        if let Some(v) = frame.get(&id.0) {
            return *v;
        }
        let def = self.module.value(id);
        match &def.kind {
            ValueKind::Constant(c) => match c {
                Constant::Int { value } => {
                    let bits = match self.module.types.kind(def.ty) {
                        TyKind::Int { bits } => *bits,
                        _ => 128,
                    };
                    RtVal::Int(mask(*value as u128, bits))
                }
                Constant::Float { value } => RtVal::Float(*value),
                Constant::Null | Constant::Zero => match self.module.types.kind(def.ty) {
                    TyKind::Float(_) => RtVal::Float(0.0),
                    TyKind::Ptr => RtVal::Ptr(0),
                    _ => RtVal::Int(0),
                },
                Constant::Array { .. } | Constant::Struct { .. } => RtVal::Unit,
            },
            ValueKind::Global(g) => RtVal::Ptr(self.globals[&g.0]),
            ValueKind::Function(f) => RtVal::Ptr(FN_BASE + f.0 as u64),
            _ => RtVal::Unit,
        }
    }

    fn exec(
        &mut self,
        frame: &FxHashMap<u32, RtVal>,
        prev_block: Option<u32>,
        result_ty: TyId,
        inst: &Inst,
    ) -> Result<RtVal, EvalError> {
        match inst {
            Inst::Alloca { alloc_ty } => {
                let size = self.module.types.size_of(*alloc_ty);
                let align = self.module.types.align_of(*alloc_ty);
                Ok(RtVal::Ptr(self.alloc(size, align)))
            }
            Inst::Load { ptr } => {
                let addr = self.operand(frame, *ptr).as_ptr();
                if addr == 0 {
                    return Err(EvalError::NullDeref);
                }
                Ok(self.read_scalar(addr, result_ty))
            }
            Inst::Store { value, ptr } => {
                let addr = self.operand(frame, *ptr).as_ptr();
                if addr == 0 {
                    return Err(EvalError::NullDeref);
                }
                let v = self.operand(frame, *value);
                let vty = self.module.type_of(*value);
                match self.module.types.kind(vty) {
                    TyKind::Struct { .. } | TyKind::Array { .. } => {
                        // aggregate store: copy from the source pointer
                        let size = self.module.types.size_of(vty);
                        self.memcpy(addr, v.as_ptr(), size);
                    }
                    _ => self.write_scalar(addr, vty, v),
                }
                Ok(RtVal::Unit)
            }
            Inst::Gep { elem_ty, ptr, index } => {
                let base = self.operand(frame, *ptr).as_ptr();
                let idx_bits = match self.module.types.kind(self.module.type_of(*index)) {
                    TyKind::Int { bits } => *bits,
                    _ => 64,
                };
                let idx = self.operand(frame, *index).as_signed(idx_bits);
                let size = self.module.types.size_of(*elem_ty) as i128;
                Ok(RtVal::Ptr((base as i128 + idx * size) as u64))
            }
            Inst::StructGep {
                struct_ty,
                ptr,
                index,
            } => {
                let base = self.operand(frame, *ptr).as_ptr();
                let offset = self.module.types.field_offset(*struct_ty, *index);
                Ok(RtVal::Ptr(base + offset))
            }
            Inst::BinOp { op, lhs, rhs } => {
                let l = self.operand(frame, *lhs);
                let r = self.operand(frame, *rhs);
                let bits = match self.module.types.kind(self.module.type_of(*lhs)) {
                    TyKind::Int { bits } => *bits,
                    _ => 64,
                };
                Ok(self.binop(*op, l, r, bits))
            }
            Inst::UnOp { op, operand } => {
                let v = self.operand(frame, *operand);
                let bits = match self.module.types.kind(self.module.type_of(*operand)) {
                    TyKind::Int { bits } => *bits,
                    _ => 64,
                };
                Ok(match op {
                    UnOp::Neg => RtVal::Int(mask((!v.as_int()).wrapping_add(1), bits)),
                    UnOp::FNeg => RtVal::Float(-v.as_float()),
                })
            }
            Inst::ICmp { pred, lhs, rhs } => {
                let l = self.operand(frame, *lhs).as_int();
                let r = self.operand(frame, *rhs).as_int();
                let result = match pred {
                    ICmpPred::Eq => l == r,
                    ICmpPred::Ne => l != r,
                };
                Ok(RtVal::Int(result as u128))
            }
            Inst::Cast { op, value } => {
                let v = self.operand(frame, *value);
                let from_ty = self.module.type_of(*value);
                Ok(self.cast(*op, v, from_ty, result_ty))
            }
            Inst::Phi { incoming } => {
                let prev = prev_block.ok_or(EvalError::Unsupported("phi in entry block"))?;
                for (value, block) in incoming {
                    if block.0 == prev {
                        return Ok(self.operand(frame, *value));
                    }
                }
                Err(EvalError::Unsupported("phi without matching predecessor"))
            }
            Inst::Call { callee, args, .. } => {
                let target = match callee {
                    Callee::Function(f) => *f,
                    Callee::Pointer(p) => {
                        let addr = self.operand(frame, *p).as_ptr();
                        if addr < FN_BASE {
                            return Err(EvalError::BadCallee);
                        }
                        FuncId((addr - FN_BASE) as u32)
                    }
                };
                let arg_vals: Vec<RtVal> = args.iter().map(|&a| self.operand(frame, a)).collect();
                self.call(target, &arg_vals)
            }
            Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. } => {
                Err(EvalError::Unsupported("terminator in exec"))
            }
        }
    }

    fn binop(&self, op: IntBinOp, l: RtVal, r: RtVal, bits: u32) -> RtVal {
        use IntBinOp::*;
        match op {
            FAdd => return RtVal::Float(l.as_float() + r.as_float()),
            FSub => return RtVal::Float(l.as_float() - r.as_float()),
            FMul => return RtVal::Float(l.as_float() * r.as_float()),
            FDiv => return RtVal::Float(l.as_float() / r.as_float()),
            _ => {}
        }
        let (lu, ru) = (l.as_int(), r.as_int());
        let (ls, rs) = (sign_extend(lu, bits), sign_extend(ru, bits));
        let raw = match op {
            Add => lu.wrapping_add(ru),
            Sub => lu.wrapping_sub(ru),
            Mul => lu.wrapping_mul(ru),
            SDiv => {
                if rs == 0 {
                    0
                } else {
                    (ls.wrapping_div(rs)) as u128
                }
            }
            UDiv => {
                if ru == 0 {
                    0
                } else {
                    lu / ru
                }
            }
            SRem => {
                if rs == 0 {
                    0
                } else {
                    (ls.wrapping_rem(rs)) as u128
                }
            }
            URem => {
                if ru == 0 {
                    0
                } else {
                    lu % ru
                }
            }
            And => lu & ru,
            Or => lu | ru,
            Xor => lu ^ ru,
            Shl => lu.wrapping_shl(ru as u32),
            LShr => lu.wrapping_shr(ru as u32),
            AShr => (ls.wrapping_shr(ru as u32)) as u128,
            FAdd | FSub | FMul | FDiv => unreachable!(),
        };
        RtVal::Int(mask(raw, bits))
    }

    fn cast(&self, op: CastOp, v: RtVal, from_ty: TyId, to_ty: TyId) -> RtVal {
        let from_bits = match self.module.types.kind(from_ty) {
            TyKind::Int { bits } => *bits,
            _ => 64,
        };
        let to_bits = match self.module.types.kind(to_ty) {
            TyKind::Int { bits } => *bits,
            _ => 64,
        };
        match op {
            CastOp::SExt => RtVal::Int(mask(sign_extend(v.as_int(), from_bits) as u128, to_bits)),
            CastOp::ZExt => RtVal::Int(mask(v.as_int(), to_bits)),
            CastOp::Trunc => RtVal::Int(mask(v.as_int(), to_bits)),
            CastOp::SIToFP => RtVal::Float(sign_extend(v.as_int(), from_bits) as f64),
            CastOp::UIToFP => RtVal::Float(v.as_int() as f64),
            CastOp::FPToSI => RtVal::Int(mask((v.as_float() as i128) as u128, to_bits)),
            CastOp::FPToUI => RtVal::Int(mask(v.as_float() as u128, to_bits)),
            CastOp::FPExt | CastOp::FPTrunc => {
                // precision narrows on the next store; values stay f64 here
                match self.module.types.kind(to_ty) {
                    TyKind::Float(FloatKind::F32) => RtVal::Float(v.as_float() as f32 as f64),
                    _ => RtVal::Float(v.as_float()),
                }
            }
            CastOp::BitCast => v,
            CastOp::PtrToInt => RtVal::Int(mask(v.as_ptr() as u128, to_bits)),
            CastOp::IntToPtr => RtVal::Ptr(v.as_int() as u64),
        }
    }
}

/// Run `name` in `module` and return its result.
pub fn run(module: &Module, name: &str) -> Result<RtVal, EvalError> {
    Machine::new(module).run(name)
}
