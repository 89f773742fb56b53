use crate::{emit_llvm, emit_x86_64};
use arnm_ir::SharedInterner;
use arnm_ssa::Module;

fn compile(source: &str) -> (Module, SharedInterner) {
    let interner = SharedInterner::new();
    let parsed = arnm_parse::parse(source, interner.clone());
    assert!(!parsed.had_error());
    let analysis = arnm_sema::analyze(&parsed.program, &parsed.arena, interner.clone());
    assert!(!analysis.had_error());
    let module = arnm_lower::lower(&parsed.program, &parsed.arena, &analysis, interner.clone());
    (module, interner)
}

#[test]
fn llvm_add_function() {
    let (module, interner) = compile("fn add(a: i32, b: i32) -> i32 { return a + b; }");
    let text = emit_llvm(&module, &interner);

    assert!(text.contains("define i32 @add(i32 %v0, i32 %v1)"));
    assert!(text.contains("alloca i32"));
    assert!(text.contains("store i32 %v0"));
    assert!(text.contains(" = add i32 "));
    assert!(text.contains("ret i32"));
}

#[test]
fn llvm_declares_runtime_abi() {
    let (module, interner) = compile("fn main() { }");
    let text = emit_llvm(&module, &interner);

    assert!(text.contains("declare ptr @arnm_spawn(ptr, ptr, i64)"));
    assert!(text.contains("declare i32 @arnm_send(ptr, i64, ptr, i64)"));
    assert!(text.contains("declare ptr @arnm_receive(ptr)"));
    assert!(text.contains("declare ptr @arnm_self()"));
    assert!(text.contains("declare void @arnm_panic_nomatch()"));
}

#[test]
fn llvm_renames_main() {
    let (module, interner) = compile("fn main() { }");
    let text = emit_llvm(&module, &interner);
    assert!(text.contains("define void @_arnm_main()"));
    assert!(!text.contains("define void @main()"));
}

#[test]
fn llvm_branches_use_unique_labels() {
    let (module, interner) = compile(
        "fn f(x: bool) { if x { print(1); } if x { print(2); } }",
    );
    let text = emit_llvm(&module, &interner);
    // Two `then` blocks must not share a label.
    let then_labels: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("then") && l.ends_with(':'))
        .collect();
    assert_eq!(then_labels.len(), 2);
    assert_ne!(then_labels[0], then_labels[1]);
}

#[test]
fn llvm_conditional_branch_shape() {
    let (module, interner) = compile("fn f() { let mut i = 0; while i < 3 { i = i + 1; } }");
    let text = emit_llvm(&module, &interner);
    assert!(text.contains("icmp slt i32"));
    assert!(text.contains("br i1"));
    assert!(text.contains("br label %while.cond"));
}

#[test]
fn x86_add_function() {
    let (module, interner) = compile("fn add(a: i32, b: i32) -> i32 { return a + b; }");
    let text = emit_x86_64(&module, &interner);

    assert!(text.contains("\t.globl add"));
    assert!(text.contains("add:"));
    assert!(text.contains("\tpushq %rbp"));
    // Incoming args spill to the first two slots.
    assert!(text.contains("\tmovq %rdi, -8(%rbp)"));
    assert!(text.contains("\tmovq %rsi, -16(%rbp)"));
    assert!(text.contains("\taddq"));
    assert!(text.contains("\tret\n"));
}

#[test]
fn x86_renames_main_and_closes_stack_note() {
    let (module, interner) = compile("fn main() { print(7); }");
    let text = emit_x86_64(&module, &interner);
    assert!(text.contains("_arnm_main:"));
    assert!(text.contains("\tcall arnm_print_int"));
    assert!(text.contains(".note.GNU-stack"));
}

#[test]
fn x86_labels_are_function_local() {
    let (module, interner) = compile("fn f() { loop { break; } } fn g() { loop { break; } }");
    let text = emit_x86_64(&module, &interner);
    assert!(text.contains(".Lf_BB_1:"));
    assert!(text.contains(".Lg_BB_1:"));
}

#[test]
fn x86_spawn_passes_sysv_args() {
    let (module, interner) = compile("fn worker() { } fn main() { spawn worker(); }");
    let text = emit_x86_64(&module, &interner);
    // Entry pointer, start arg, state size in the first three arg registers.
    assert!(text.contains("\tmovq $worker, %rdi"));
    assert!(text.contains("\tcall arnm_spawn"));
}

#[test]
fn x86_division_uses_cqo_idiv() {
    let (module, interner) = compile("fn f(a: i32, b: i32) -> i32 { return a / b; }");
    let text = emit_x86_64(&module, &interner);
    assert!(text.contains("\tcqo\n"));
    assert!(text.contains("\tidivq %rbx"));
}
