//! Interpreter tests: arithmetic, memory, control flow, indirect calls
//! through memory (the shape vtable dispatch takes).

use cata_llir::eval::{self, RtVal};
use cata_llir::{Builder, CastOp, ICmpPred, IntBinOp, Linkage, Module};

fn new_builder() -> Builder {
    Builder::new(Module::new("test"))
}

#[test]
fn returns_constant_sum() {
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let fn_ty = b.module.types.function(i64t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    b.position_at_end(f, entry);
    let three = b.module.const_int(i64t, 3);
    let five = b.module.const_int(i64t, 5);
    let sum = b.build_binop(IntBinOp::Add, three, five, "sum");
    b.build_ret(sum);

    assert_eq!(eval::run(&b.module, "main").unwrap(), RtVal::Int(8));
}

#[test]
fn alloca_store_load_roundtrip() {
    let mut b = new_builder();
    let i32t = b.module.types.int(32);
    let fn_ty = b.module.types.function(i32t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    b.position_at_end(f, entry);
    let slot = b.build_alloca(i32t, "slot");
    let v = b.module.const_int(i32t, 1234);
    b.build_store(v, slot);
    let loaded = b.build_load(i32t, slot, "loaded");
    b.build_ret(loaded);

    assert_eq!(eval::run(&b.module, "main").unwrap(), RtVal::Int(1234));
}

#[test]
fn sdiv_on_negative_operands() {
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let fn_ty = b.module.types.function(i64t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    b.position_at_end(f, entry);
    let lhs = b.module.const_int(i64t, -12);
    let rhs = b.module.const_int(i64t, 4);
    let q = b.build_binop(IntBinOp::SDiv, lhs, rhs, "q");
    b.build_ret(q);

    let result = eval::run(&b.module, "main").unwrap();
    assert_eq!(result.as_signed(64), -3);
}

#[test]
fn cond_br_and_phi() {
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let fn_ty = b.module.types.function(i64t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    let then_bb = b.module.append_block(f, "then");
    let else_bb = b.module.append_block(f, "else");
    let merge_bb = b.module.append_block(f, "merge");

    b.position_at_end(f, entry);
    let one = b.module.const_int(i64t, 1);
    let zero = b.module.const_int(i64t, 0);
    let cond = b.build_icmp(ICmpPred::Ne, one, zero, "cond");
    b.build_cond_br(cond, then_bb, else_bb);

    b.position_at_end(f, then_bb);
    let a = b.module.const_int(i64t, 10);
    b.build_br(merge_bb);
    b.position_at_end(f, else_bb);
    let c = b.module.const_int(i64t, 20);
    b.build_br(merge_bb);

    b.position_at_end(f, merge_bb);
    let phi = b.build_phi(i64t, "result");
    b.add_incoming(phi, a, then_bb);
    b.add_incoming(phi, c, else_bb);
    b.build_ret(phi);

    assert_eq!(eval::run(&b.module, "main").unwrap(), RtVal::Int(10));
}

#[test]
fn sitofp_and_fdiv() {
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let f64t = b.module.types.float(cata_llir::FloatKind::F64);
    let fn_ty = b.module.types.function(f64t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    b.position_at_end(f, entry);
    let int_val = b.module.const_int(i64t, 29);
    let as_float = b.build_cast(CastOp::SIToFP, int_val, f64t, "as_float");
    let four = b.module.const_float(f64t, 4.0);
    let q = b.build_binop(IntBinOp::FDiv, as_float, four, "q");
    b.build_ret(q);

    assert_eq!(eval::run(&b.module, "main").unwrap(), RtVal::Float(7.25));
}

#[test]
fn call_through_function_pointer_in_global() {
    // models vtable dispatch: a global holds a function pointer array;
    // main loads slot 1 and calls through it.
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let ptr = b.module.types.ptr();

    let callee_ty = b.module.types.function(i64t, vec![]);
    let f1 = b.module.add_function("one", callee_ty, Linkage::External);
    let e1 = b.module.append_block(f1, "entry");
    b.position_at_end(f1, e1);
    let c1 = b.module.const_int(i64t, 111);
    b.build_ret(c1);

    let f2 = b.module.add_function("two", callee_ty, Linkage::External);
    let e2 = b.module.append_block(f2, "entry");
    b.position_at_end(f2, e2);
    let c2 = b.module.const_int(i64t, 222);
    b.build_ret(c2);

    let f1v = b.module.function_value(f1);
    let f2v = b.module.function_value(f2);
    let table = b.module.const_array(ptr, vec![f1v, f2v]);
    let table_ty = b.module.type_of(table);
    let g = b.module.add_global("vtable", table_ty, true);
    b.module.set_global_initializer(g, table);

    let fn_ty = b.module.types.function(i64t, vec![]);
    let main = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(main, "entry");
    b.position_at_end(main, entry);
    let gv = b.module.global_value(g);
    let slot = b.build_const_gep(ptr, gv, 1, "slot");
    let target = b.build_load(ptr, slot, "target");
    let result = b.build_indirect_call(callee_ty, target, vec![], "result");
    b.build_ret(result);

    assert_eq!(eval::run(&b.module, "main").unwrap(), RtVal::Int(222));
}

#[test]
fn struct_gep_addresses_fields() {
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let i8t = b.module.types.int(8);
    let s = b.module.types.struct_type(Some("pair"), vec![i8t, i64t], false);
    let fn_ty = b.module.types.function(i64t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    b.position_at_end(f, entry);
    let obj = b.build_alloca(s, "obj");
    let field1 = b.build_struct_gep(s, obj, 1, "field1");
    let v = b.module.const_int(i64t, 77);
    b.build_store(v, field1);
    let loaded = b.build_load(i64t, field1, "loaded");
    b.build_ret(loaded);

    assert_eq!(eval::run(&b.module, "main").unwrap(), RtVal::Int(77));
}

#[test]
fn null_load_is_an_error() {
    let mut b = new_builder();
    let i64t = b.module.types.int(64);
    let fn_ty = b.module.types.function(i64t, vec![]);
    let f = b.module.add_function("main", fn_ty, Linkage::External);
    let entry = b.module.append_block(f, "entry");
    b.position_at_end(f, entry);
    let null = b.module.const_null();
    let loaded = b.build_load(i64t, null, "loaded");
    b.build_ret(loaded);

    assert!(eval::run(&b.module, "main").is_err());
}
