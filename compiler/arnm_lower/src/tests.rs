use crate::{lower, pattern_tag};
use arnm_ir::SharedInterner;
use arnm_ssa::{Function, IrValue, Module, Opcode};

fn lower_source(source: &str) -> (Module, SharedInterner) {
    let interner = SharedInterner::new();
    let parsed = arnm_parse::parse(source, interner.clone());
    assert!(
        !parsed.had_error(),
        "parse failed: {:?}",
        parsed.diagnostics.iter().collect::<Vec<_>>()
    );
    let analysis = arnm_sema::analyze(&parsed.program, &parsed.arena, interner.clone());
    assert!(
        !analysis.had_error(),
        "sema failed: {:?}",
        analysis.diagnostics.iter().collect::<Vec<_>>()
    );
    let module = lower(&parsed.program, &parsed.arena, &analysis, interner.clone());
    (module, interner)
}

fn find_func<'m>(module: &'m Module, interner: &SharedInterner, name: &str) -> &'m Function {
    let name = interner.intern(name);
    module
        .find(name)
        .unwrap_or_else(|| panic!("function not found in module"))
}

fn count_ops(func: &Function, op: Opcode) -> usize {
    func.blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .filter(|i| i.op == op)
        .count()
}

/// Every block ends in exactly one terminator, and contains no interior
/// terminator.
fn assert_block_invariant(module: &Module) {
    for func in &module.funcs {
        for (i, block) in func.blocks.iter().enumerate() {
            assert!(
                block.is_terminated(),
                "block {i} of function lacks a terminator"
            );
            let terminators = block
                .instrs
                .iter()
                .filter(|instr| instr.op.is_terminator())
                .count();
            assert_eq!(terminators, 1, "block {i} has {terminators} terminators");
        }
    }
}

#[test]
fn add_function_shape() {
    let (module, interner) = lower_source("fn add(a: i32, b: i32) -> i32 { return a + b; }");
    let func = find_func(&module, &interner, "add");

    assert_eq!(count_ops(func, Opcode::Alloca), 2);
    assert_eq!(count_ops(func, Opcode::Store), 2);
    assert_eq!(count_ops(func, Opcode::Load), 2);
    assert_eq!(count_ops(func, Opcode::Add), 1);
    assert_eq!(count_ops(func, Opcode::Ret), 1);
    assert_block_invariant(&module);
}

#[test]
fn while_loop_shape() {
    let (module, interner) =
        lower_source("fn f() { let mut i = 0; while i < 10 { i = i + 1; } }");
    let func = find_func(&module, &interner, "f");

    // One jump into the cond block, one branch out of it, one jump from
    // the body back to cond.
    assert_eq!(count_ops(func, Opcode::Jmp), 2);
    assert_eq!(count_ops(func, Opcode::Br), 1);
    assert_block_invariant(&module);
}

#[test]
fn if_else_shape() {
    let (module, _) = lower_source(
        "fn f(x: bool) -> i32 { if x { return 1; } else { return 2; } return 0; }",
    );
    assert_block_invariant(&module);
}

#[test]
fn void_function_gets_synthesized_return() {
    let (module, interner) = lower_source("fn f() { print(1); }");
    let func = find_func(&module, &interner, "f");
    assert_eq!(count_ops(func, Opcode::Ret), 1);
    assert_block_invariant(&module);
}

#[test]
fn break_and_continue_target_loop_blocks() {
    let (module, interner) = lower_source(
        "fn f() { loop { if true { break; } else { continue; } } }",
    );
    let func = find_func(&module, &interner, "f");
    // break -> loop.end, continue -> loop.body, plus entry jump and the
    // back-jump is dropped when the body terminates itself.
    assert!(count_ops(func, Opcode::Jmp) >= 3);
    assert_block_invariant(&module);
}

#[test]
fn spawn_lowered_to_runtime_call() {
    let (module, interner) =
        lower_source("fn worker() { } fn main() { spawn worker(); }");
    let func = find_func(&module, &interner, "main");

    let spawn_name = interner.intern("arnm_spawn");
    let spawn_call = func
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .find(|i| {
            i.op == Opcode::Call
                && matches!(i.op1, IrValue::Global { name, .. } if name == spawn_name)
        })
        .unwrap_or_else(|| panic!("no arnm_spawn call emitted"));

    assert_eq!(spawn_call.args.len(), 3);
    // Entry function address, null start argument, zero state size.
    let worker = interner.intern("worker");
    assert!(matches!(spawn_call.args[0], IrValue::Global { name, .. } if name == worker));
    assert!(matches!(spawn_call.args[2], IrValue::Const { bits: 0, .. }));
    assert_block_invariant(&module);
}

#[test]
fn spawn_actor_passes_state_size() {
    let (module, interner) = lower_source(
        "actor Counter {
            let count: i32 = 0;
            let limit: i32 = 10;
            fn init(v: i32) { self.count = v; }
        }
        fn main() { spawn Counter(5); }",
    );
    let func = find_func(&module, &interner, "main");

    let spawn_name = interner.intern("arnm_spawn");
    let spawn_call = func
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .find(|i| {
            i.op == Opcode::Call
                && matches!(i.op1, IrValue::Global { name, .. } if name == spawn_name)
        })
        .unwrap_or_else(|| panic!("no arnm_spawn call emitted"));

    // Entry is the mangled constructor; state is 2 fields * 8 bytes.
    let init = interner.intern("Counter_init");
    assert!(matches!(spawn_call.args[0], IrValue::Global { name, .. } if name == init));
    assert!(matches!(spawn_call.args[2], IrValue::Const { bits: 16, .. }));
    assert_block_invariant(&module);
}

#[test]
fn self_field_access_loads_state_pointer() {
    let (module, interner) = lower_source(
        "actor A {
            let n: i32 = 0;
            fn get() -> i32 { return self.n; }
        }",
    );
    let func = find_func(&module, &interner, "A_get");

    // arnm_self call, state-pointer load, field_ptr, field load.
    assert_eq!(count_ops(func, Opcode::FieldPtr), 1);
    assert!(count_ops(func, Opcode::Load) >= 2);
    assert_block_invariant(&module);
}

#[test]
fn receive_lowered_with_tag_chain() {
    let (module, interner) = lower_source(
        "fn f() {
            receive {
                42 => { print(1); }
                incr => { print(2); }
            }
        }",
    );
    let func = find_func(&module, &interner, "f");

    // One comparison per arm, one branch per comparison plus the arm
    // bodies' jumps to the merge block.
    assert_eq!(count_ops(func, Opcode::Eq), 2);
    assert!(count_ops(func, Opcode::Br) >= 2);

    // The literal arm compares against 42; the bind arm against DJB2.
    let tags: Vec<u64> = func
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .filter(|i| i.op == Opcode::Eq)
        .filter_map(|i| match i.op2 {
            IrValue::Const { bits, .. } => Some(bits),
            _ => None,
        })
        .collect();
    assert!(tags.contains(&42));
    assert!(tags.contains(&u64::from(pattern_tag("incr"))));

    // Unmatched tags reach the panic call.
    let panic_name = interner.intern("arnm_panic_nomatch");
    assert!(func
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .any(|i| matches!(i.op1, IrValue::Global { name, .. } if name == panic_name)));
    assert_block_invariant(&module);
}

#[test]
fn actor_receive_synthesizes_behavior_loop() {
    let (module, interner) = lower_source(
        "actor Echo {
            fn init() { }
            receive {
                msg => { print(0); }
            }
        }",
    );

    // Behavior function exists and loops forever.
    let behavior = find_func(&module, &interner, "Echo_behavior");
    assert!(count_ops(behavior, Opcode::Ret) == 0);
    assert!(count_ops(behavior, Opcode::Jmp) >= 2);

    // Init chains into the behavior before returning.
    let init = find_func(&module, &interner, "Echo_init");
    let behavior_name = interner.intern("Echo_behavior");
    assert!(init
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .any(|i| {
            i.op == Opcode::Call
                && matches!(i.op1, IrValue::Global { name, .. } if name == behavior_name)
        }));
    assert_block_invariant(&module);
}

#[test]
fn send_lowered_to_runtime_call() {
    let (module, interner) = lower_source(
        "fn worker() { } fn f() { let p = spawn worker(); p ! 99; }",
    );
    let func = find_func(&module, &interner, "f");
    let send_name = interner.intern("arnm_send");
    let send = func
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .find(|i| matches!(i.op1, IrValue::Global { name, .. } if name == send_name))
        .unwrap_or_else(|| panic!("no arnm_send call emitted"));
    assert_eq!(send.args.len(), 4);
    assert_block_invariant(&module);
}

#[test]
fn unreachable_statements_after_return_are_dropped() {
    let (module, interner) = lower_source("fn f() -> i32 { return 1; return 2; }");
    let func = find_func(&module, &interner, "f");
    assert_eq!(count_ops(func, Opcode::Ret), 1);
    assert_block_invariant(&module);
}

#[test]
fn i64_values_stay_wide() {
    let (module, interner) =
        lower_source("fn g() -> i64 { return h(); } fn h() -> i64 { return g(); }");
    let func = find_func(&module, &interner, "g");
    assert_eq!(func.ret, arnm_ssa::IrType::I64);
    assert_block_invariant(&module);
}
