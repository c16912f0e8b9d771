//! Textual dump of a module, for debugging and driver output.
//!
//! The syntax is IR-flavored but not meant to be reparsed.

use std::fmt::Write as _;

use crate::module::{Callee, Constant, FuncId, Inst, Module, ValueId, ValueKind};
use crate::types::{TyId, TyKind};

impl Module {
    pub fn print_to_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "; module = {}", self.name);
        for (_, g) in self.globals() {
            let init = match g.init {
                Some(v) => format!(" {}", self.value_repr(v)),
                None => String::new(),
            };
            let _ = writeln!(
                out,
                "@{} ={} global {}{}",
                g.name,
                if g.dso_local { " dso_local" } else { "" },
                self.ty_repr(g.value_ty),
                init
            );
        }
        let func_ids: Vec<FuncId> = self.functions().map(|(id, _)| id).collect();
        for id in func_ids {
            out.push('\n');
            self.print_function(&mut out, id);
        }
        out
    }

    fn print_function(&self, out: &mut String, id: FuncId) {
        let f = self.function(id);
        let (ret, params) = match self.types.kind(f.ty) {
            TyKind::Function { ret, params } => (*ret, params.clone()),
            _ => return,
        };
        let keyword = if f.is_declaration() { "declare" } else { "define" };
        let mut sig = String::new();
        for (i, &p) in params.iter().enumerate() {
            if i > 0 {
                sig.push_str(", ");
            }
            let _ = write!(sig, "{}", self.ty_repr(p));
            for attr in &f.param_attrs[i] {
                let _ = write!(sig, " {attr:?}");
            }
            let _ = write!(sig, " %{}", self.value(f.params[i]).name);
        }
        let _ = writeln!(out, "{keyword} {} @{}({sig}) {{", self.ty_repr(ret), f.name);
        for block in &f.blocks {
            let _ = writeln!(out, "{}:", block.label);
            for &inst in &block.insts {
                let _ = writeln!(out, "  {}", self.inst_repr(inst, id));
            }
        }
        out.push_str("}\n");
    }

    fn ty_repr(&self, ty: TyId) -> String {
        match self.types.kind(ty) {
            TyKind::Void => "void".to_string(),
            TyKind::Int { bits } => format!("i{bits}"),
            TyKind::Float(kind) => format!("f{}", kind.bits()),
            TyKind::Ptr => "ptr".to_string(),
            TyKind::Struct { name, fields, .. } => match name {
                Some(n) => format!("%{n}"),
                None => {
                    let inner: Vec<_> = fields.iter().map(|&f| self.ty_repr(f)).collect();
                    format!("{{ {} }}", inner.join(", "))
                }
            },
            TyKind::Array { elem, len } => format!("[{} x {}]", len, self.ty_repr(*elem)),
            TyKind::Function { ret, params } => {
                let inner: Vec<_> = params.iter().map(|&p| self.ty_repr(p)).collect();
                format!("{} ({})", self.ty_repr(*ret), inner.join(", "))
            }
        }
    }

    fn value_repr(&self, id: ValueId) -> String {
        let def = self.value(id);
        match &def.kind {
            ValueKind::Constant(c) => match c {
                Constant::Int { value } => format!("{value}"),
                Constant::Float { value } => format!("{value:e}"),
                Constant::Null => "null".to_string(),
                Constant::Zero => "zeroinitializer".to_string(),
                Constant::Array { elems } => {
                    let inner: Vec<_> = elems.iter().map(|&e| self.value_repr(e)).collect();
                    format!("[{}]", inner.join(", "))
                }
                Constant::Struct { fields } => {
                    let inner: Vec<_> = fields.iter().map(|&f| self.value_repr(f)).collect();
                    format!("{{ {} }}", inner.join(", "))
                }
            },
            ValueKind::Global(g) => format!("@{}", self.global(*g).name),
            ValueKind::Function(f) => format!("@{}", self.function(*f).name),
            ValueKind::Argument { .. } | ValueKind::Inst(_) => {
                if def.name.is_empty() {
                    format!("%v{}", id.0)
                } else {
                    format!("%{}", def.name)
                }
            }
        }
    }

    fn block_label(&self, func: FuncId, block: crate::module::BlockId) -> String {
        format!("%{}", self.function(func).blocks[block.0 as usize].label)
    }

    fn inst_repr(&self, id: ValueId, func: FuncId) -> String {
        let def = self.value(id);
        let lhs = if self.types.is_void(def.ty) {
            String::new()
        } else {
            format!("{} = ", self.value_repr(id))
        };
        let ValueKind::Inst(inst) = &def.kind else {
            return String::new();
        };
        let body = match inst {
            Inst::Alloca { alloc_ty } => format!("alloca {}", self.ty_repr(*alloc_ty)),
            Inst::Load { ptr } => {
                format!("load {}, ptr {}", self.ty_repr(def.ty), self.value_repr(*ptr))
            }
            Inst::Store { value, ptr } => format!(
                "store {} {}, ptr {}",
                self.ty_repr(self.type_of(*value)),
                self.value_repr(*value),
                self.value_repr(*ptr)
            ),
            Inst::Gep { elem_ty, ptr, index } => format!(
                "getelementptr {}, ptr {}, {}",
                self.ty_repr(*elem_ty),
                self.value_repr(*ptr),
                self.value_repr(*index)
            ),
            Inst::StructGep {
                struct_ty,
                ptr,
                index,
            } => format!(
                "getelementptr inbounds {}, ptr {}, i32 0, i32 {}",
                self.ty_repr(*struct_ty),
                self.value_repr(*ptr),
                index
            ),
            Inst::BinOp { op, lhs: l, rhs } => format!(
                "{:?} {} {}, {}",
                op,
                self.ty_repr(self.type_of(*l)),
                self.value_repr(*l),
                self.value_repr(*rhs)
            )
            .to_lowercase(),
            Inst::UnOp { op, operand } => format!(
                "{:?} {} {}",
                op,
                self.ty_repr(self.type_of(*operand)),
                self.value_repr(*operand)
            )
            .to_lowercase(),
            Inst::ICmp { pred, lhs: l, rhs } => format!(
                "icmp {:?} {} {}, {}",
                pred,
                self.ty_repr(self.type_of(*l)),
                self.value_repr(*l),
                self.value_repr(*rhs)
            )
            .to_lowercase(),
            Inst::Cast { op, value } => format!(
                "{:?} {} {} to {}",
                op,
                self.ty_repr(self.type_of(*value)),
                self.value_repr(*value),
                self.ty_repr(def.ty)
            )
            .to_lowercase(),
            Inst::Phi { incoming } => {
                let inner: Vec<_> = incoming
                    .iter()
                    .map(|(v, b)| format!("[ {}, {} ]", self.value_repr(*v), self.block_label(func, *b)))
                    .collect();
                format!("phi {} {}", self.ty_repr(def.ty), inner.join(", "))
            }
            Inst::Br { dest } => format!("br label {}", self.block_label(func, *dest)),
            Inst::CondBr {
                cond,
                then_dest,
                else_dest,
            } => format!(
                "br i1 {}, label {}, label {}",
                self.value_repr(*cond),
                self.block_label(func, *then_dest),
                self.block_label(func, *else_dest)
            ),
            Inst::Ret { value } => match value {
                Some(v) => format!(
                    "ret {} {}",
                    self.ty_repr(self.type_of(*v)),
                    self.value_repr(*v)
                ),
                None => "ret void".to_string(),
            },
            Inst::Call { callee, args, .. } => {
                let callee_repr = match callee {
                    Callee::Function(f) => format!("@{}", self.function(*f).name),
                    Callee::Pointer(p) => self.value_repr(*p),
                };
                let inner: Vec<_> = args
                    .iter()
                    .map(|&a| format!("{} {}", self.ty_repr(self.type_of(a)), self.value_repr(a)))
                    .collect();
                format!(
                    "call {} {}({})",
                    self.ty_repr(def.ty),
                    callee_repr,
                    inner.join(", ")
                )
            }
        };
        format!("{lhs}{body}")
    }
}
