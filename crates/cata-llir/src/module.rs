//! The LLIR module: values, globals, functions, and basic blocks.
//!
//! Every value (constant, global reference, function reference, argument,
//! instruction result) lives in one module-wide arena and is addressed by
//! `ValueId`. Instructions additionally appear, in program order, in the
//! instruction list of their basic block.

use rustc_hash::FxHashMap;

use crate::types::{Context, TyId, TyKind};

/// Index of a value in the module's value arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

/// Index of a function in the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Index of a global variable in the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

/// Index of a basic block within its function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
}

/// Attributes attached to function parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamAttr {
    NoUndef,
    ByVal(TyId),
}

/// A constant value.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int { value: i128 },
    Float { value: f64 },
    Null,
    /// Aggregate of other (constant) values.
    Array { elems: Vec<ValueId> },
    Struct { fields: Vec<ValueId> },
    /// All-zero value of the value's type.
    Zero,
}

/// Integer/float binary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntBinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

/// Unary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    /// Integer negation (`0 - x`).
    Neg,
    /// Floating negation.
    FNeg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ICmpPred {
    Eq,
    Ne,
}

/// Conversion operations. The destination type is the instruction value's
/// type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOp {
    SExt,
    ZExt,
    Trunc,
    SIToFP,
    UIToFP,
    FPToSI,
    FPToUI,
    FPExt,
    FPTrunc,
    BitCast,
    PtrToInt,
    IntToPtr,
}

/// A call target: a known function or an arbitrary pointer value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callee {
    Function(FuncId),
    Pointer(ValueId),
}

/// An instruction. The result type is carried by the owning `ValueDef`.
#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    Alloca {
        alloc_ty: TyId,
    },
    Load {
        ptr: ValueId,
    },
    Store {
        value: ValueId,
        ptr: ValueId,
    },
    /// `ptr + index * size_of(elem_ty)`; `index` is a signed integer value.
    Gep {
        elem_ty: TyId,
        ptr: ValueId,
        index: ValueId,
    },
    /// Address of field `index` of a `struct_ty` at `ptr`.
    StructGep {
        struct_ty: TyId,
        ptr: ValueId,
        index: u32,
    },
    BinOp {
        op: IntBinOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    UnOp {
        op: UnOp,
        operand: ValueId,
    },
    ICmp {
        pred: ICmpPred,
        lhs: ValueId,
        rhs: ValueId,
    },
    Cast {
        op: CastOp,
        value: ValueId,
    },
    Phi {
        incoming: Vec<(ValueId, BlockId)>,
    },
    Br {
        dest: BlockId,
    },
    CondBr {
        cond: ValueId,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret {
        value: Option<ValueId>,
    },
    Call {
        callee: Callee,
        fn_ty: TyId,
        args: Vec<ValueId>,
    },
}

impl Inst {
    /// Whether this instruction ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. })
    }
}

/// What a value is.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Constant(Constant),
    Global(GlobalId),
    Function(FuncId),
    Argument { func: FuncId, index: u32 },
    Inst(Inst),
}

/// One value in the module arena: its type, its kind, and an optional name
/// used by the textual dump.
#[derive(Clone, Debug)]
pub struct ValueDef {
    pub ty: TyId,
    pub kind: ValueKind,
    pub name: String,
}

/// A basic block: a label and an ordered instruction list.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub label: String,
    pub insts: Vec<ValueId>,
}

/// A function: signature, argument values, parameter attributes, blocks.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub ty: TyId,
    pub linkage: Linkage,
    pub dso_local: bool,
    pub params: Vec<ValueId>,
    pub param_attrs: Vec<Vec<ParamAttr>>,
    pub blocks: Vec<Block>,
}

impl Function {
    /// A function with no body (an import or a not-yet-emitted shell).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A module global variable.
#[derive(Clone, Debug)]
pub struct Global {
    pub name: String,
    /// Type of the stored value (the global itself is a pointer).
    pub value_ty: TyId,
    pub init: Option<ValueId>,
    pub dso_local: bool,
}

/// A compilation module: the type context plus all values, globals, and
/// functions emitted for one session.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub types: Context,
    pub(crate) values: Vec<ValueDef>,
    pub(crate) functions: Vec<Function>,
    pub(crate) globals: Vec<Global>,
    func_names: FxHashMap<String, FuncId>,
    global_names: FxHashMap<String, GlobalId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Default::default()
        }
    }

    // ---- values ----

    pub fn push_value(&mut self, def: ValueDef) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(def);
        id
    }

    pub fn value(&self, id: ValueId) -> &ValueDef {
        &self.values[id.0 as usize]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut ValueDef {
        &mut self.values[id.0 as usize]
    }

    pub fn type_of(&self, id: ValueId) -> TyId {
        self.value(id).ty
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    // ---- constants ----

    pub fn const_int(&mut self, ty: TyId, value: i128) -> ValueId {
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Constant(Constant::Int { value }),
            name: String::new(),
        })
    }

    pub fn const_float(&mut self, ty: TyId, value: f64) -> ValueId {
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Constant(Constant::Float { value }),
            name: String::new(),
        })
    }

    pub fn const_null(&mut self) -> ValueId {
        let ty = self.types.ptr();
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Constant(Constant::Null),
            name: String::new(),
        })
    }

    pub fn const_zero(&mut self, ty: TyId) -> ValueId {
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Constant(Constant::Zero),
            name: String::new(),
        })
    }

    pub fn const_array(&mut self, elem_ty: TyId, elems: Vec<ValueId>) -> ValueId {
        let ty = self.types.array(elem_ty, elems.len() as u64);
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Constant(Constant::Array { elems }),
            name: String::new(),
        })
    }

    pub fn const_struct(&mut self, struct_ty: TyId, fields: Vec<ValueId>) -> ValueId {
        self.push_value(ValueDef {
            ty: struct_ty,
            kind: ValueKind::Constant(Constant::Struct { fields }),
            name: String::new(),
        })
    }

    // ---- functions ----

    /// Create a function shell with argument values named after `arg_names`
    /// (missing names get positional defaults).
    pub fn add_function(&mut self, name: impl Into<String>, fn_ty: TyId, linkage: Linkage) -> FuncId {
        let name = name.into();
        let id = FuncId(self.functions.len() as u32);
        let param_tys = match self.types.kind(fn_ty) {
            TyKind::Function { params, .. } => params.clone(),
            _ => Vec::new(),
        };
        let mut params = Vec::with_capacity(param_tys.len());
        for (i, &pty) in param_tys.iter().enumerate() {
            params.push(self.push_value(ValueDef {
                ty: pty,
                kind: ValueKind::Argument {
                    func: id,
                    index: i as u32,
                },
                name: format!("arg{i}"),
            }));
        }
        let param_attrs = vec![Vec::new(); params.len()];
        self.functions.push(Function {
            name: name.clone(),
            ty: fn_ty,
            linkage,
            dso_local: false,
            params,
            param_attrs,
            blocks: Vec::new(),
        });
        self.func_names.insert(name, id);
        id
    }

    /// Replace a function's signature, dropping its body and arguments.
    /// Used when fixed-point refinement changes a prototype.
    pub fn redefine_function(&mut self, id: FuncId, fn_ty: TyId) {
        let param_tys = match self.types.kind(fn_ty) {
            TyKind::Function { params, .. } => params.clone(),
            _ => Vec::new(),
        };
        let mut params = Vec::with_capacity(param_tys.len());
        for (i, &pty) in param_tys.iter().enumerate() {
            params.push(self.push_value(ValueDef {
                ty: pty,
                kind: ValueKind::Argument {
                    func: id,
                    index: i as u32,
                },
                name: format!("arg{i}"),
            }));
        }
        let func = &mut self.functions[id.0 as usize];
        func.ty = fn_ty;
        func.param_attrs = vec![Vec::new(); params.len()];
        func.params = params;
        func.blocks.clear();
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn get_named_function(&self, name: &str) -> Option<FuncId> {
        self.func_names.get(name).copied()
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId(i as u32), f))
    }

    /// A value referring to a function (usable as a callee or vtable entry).
    pub fn function_value(&mut self, id: FuncId) -> ValueId {
        let ty = self.types.ptr();
        let name = self.functions[id.0 as usize].name.clone();
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Function(id),
            name,
        })
    }

    pub fn set_param_name(&mut self, func: FuncId, index: usize, name: impl Into<String>) {
        let param = self.functions[func.0 as usize].params[index];
        self.value_mut(param).name = name.into();
    }

    pub fn add_param_attr(&mut self, func: FuncId, index: usize, attr: ParamAttr) {
        self.functions[func.0 as usize].param_attrs[index].push(attr);
    }

    // ---- globals ----

    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        value_ty: TyId,
        dso_local: bool,
    ) -> GlobalId {
        let name = name.into();
        if let Some(&existing) = self.global_names.get(&name) {
            return existing;
        }
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(Global {
            name: name.clone(),
            value_ty,
            init: None,
            dso_local,
        });
        self.global_names.insert(name, id);
        id
    }

    pub fn set_global_initializer(&mut self, id: GlobalId, init: ValueId) {
        self.globals[id.0 as usize].init = Some(init);
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0 as usize]
    }

    pub fn get_named_global(&self, name: &str) -> Option<GlobalId> {
        self.global_names.get(name).copied()
    }

    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &Global)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, g)| (GlobalId(i as u32), g))
    }

    /// A value referring to a global's address.
    pub fn global_value(&mut self, id: GlobalId) -> ValueId {
        let ty = self.types.ptr();
        let name = self.globals[id.0 as usize].name.clone();
        self.push_value(ValueDef {
            ty,
            kind: ValueKind::Global(id),
            name,
        })
    }

    // ---- blocks ----

    pub fn append_block(&mut self, func: FuncId, label: impl Into<String>) -> BlockId {
        let f = &mut self.functions[func.0 as usize];
        let id = BlockId(f.blocks.len() as u32);
        f.blocks.push(Block {
            label: label.into(),
            insts: Vec::new(),
        });
        id
    }

    pub fn block(&self, func: FuncId, block: BlockId) -> &Block {
        &self.functions[func.0 as usize].blocks[block.0 as usize]
    }
}
