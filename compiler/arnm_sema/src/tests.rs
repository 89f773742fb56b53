use crate::{analyze, Analysis};
use arnm_diagnostic::ErrorCode;
use arnm_ir::ast::{DeclKind, ExprKind};
use arnm_ir::{AstArena, ExprId, SharedInterner};
use arnm_types::TypeId;

struct Checked {
    analysis: Analysis,
    arena: AstArena,
    program: arnm_ir::Program,
    interner: SharedInterner,
}

fn check(source: &str) -> Checked {
    let interner = SharedInterner::new();
    let parsed = arnm_parse::parse(source, interner.clone());
    assert!(
        !parsed.had_error(),
        "parse failed: {:?}",
        parsed.diagnostics.iter().collect::<Vec<_>>()
    );
    let analysis = analyze(&parsed.program, &parsed.arena, interner.clone());
    Checked {
        analysis,
        arena: parsed.arena,
        program: parsed.program,
        interner,
    }
}

fn check_ok(source: &str) -> Checked {
    let checked = check(source);
    assert!(
        !checked.analysis.had_error(),
        "unexpected sema errors: {:?}",
        checked.analysis.diagnostics.iter().collect::<Vec<_>>()
    );
    checked
}

fn check_err(source: &str, code: ErrorCode) -> Checked {
    let checked = check(source);
    assert!(
        checked
            .analysis
            .diagnostics
            .iter()
            .any(|d| d.code == code),
        "expected {code:?}, got {:?}",
        checked.analysis.diagnostics.iter().collect::<Vec<_>>()
    );
    checked
}

/// Find the first expression of a given shape in the arena.
fn find_expr(checked: &Checked, pred: impl Fn(&ExprKind) -> bool) -> ExprId {
    for i in 0..checked.arena.expr_count() {
        let id = ExprId::new(i as u32);
        if pred(&checked.arena.expr(id).kind) {
            return id;
        }
    }
    panic!("expression not found");
}

#[test]
fn comparison_has_type_bool() {
    let checked = check_ok("fn f() -> bool { return 1 < 2; }");
    let cmp = find_expr(&checked, |k| {
        matches!(
            k,
            ExprKind::Binary {
                op: arnm_ir::ast::BinaryOp::Lt,
                ..
            }
        )
    });
    let ty = checked.analysis.expr_type(cmp);
    assert_eq!(checked.analysis.pool.resolve(ty), TypeId::BOOL);
}

#[test]
fn int_plus_string_is_an_error() {
    check_err(
        "fn f() { let x = 1; x + \"s\"; }",
        ErrorCode::TypeMismatch,
    );
}

#[test]
fn break_outside_loop_is_an_error() {
    check_err("fn f() { break; }", ErrorCode::BreakOutsideLoop);
}

#[test]
fn break_inside_loops_is_fine() {
    check_ok("fn f() { while true { break; } loop { continue; } }");
}

#[test]
fn bare_actor_field_requires_self() {
    let checked = check(
        "actor A {
            let n: i32 = 0;
            fn get() -> i32 { return n; }
        }",
    );
    assert!(checked
        .analysis
        .diagnostics
        .iter()
        .any(|d| d.code == ErrorCode::BareActorField));
}

#[test]
fn self_field_access_is_accepted() {
    check_ok(
        "actor A {
            let n: i32 = 0;
            fn get() -> i32 { return self.n; }
        }",
    );
}

#[test]
fn self_outside_actor_is_an_error() {
    check_err("fn f() { self; }", ErrorCode::SelfOutsideActor);
}

#[test]
fn undefined_identifier() {
    check_err("fn f() { missing; }", ErrorCode::UndefinedIdent);
}

#[test]
fn duplicate_let_in_same_scope() {
    check_err(
        "fn f() { let x = 1; let x = 2; }",
        ErrorCode::DuplicateDefinition,
    );
}

#[test]
fn shadowing_in_nested_block_is_fine() {
    check_ok("fn f() { let x = 1; if true { let x = 2; x; } x; }");
}

#[test]
fn assignment_requires_mut() {
    check_err("fn f() { let x = 1; x = 2; }", ErrorCode::ImmutableAssign);
    check_ok("fn f() { let mut x = 1; x = 2; }");
}

#[test]
fn invalid_assignment_target() {
    check_err("fn f() { 1 = 2; }", ErrorCode::InvalidAssignTarget);
}

#[test]
fn if_condition_must_be_bool() {
    check_err("fn f() { if 1 { return; } }", ErrorCode::TypeMismatch);
}

#[test]
fn logical_operators_require_bool() {
    check_err("fn f() { 1 && true; }", ErrorCode::TypeMismatch);
}

#[test]
fn return_type_mismatch() {
    check_err(
        "fn f() -> i32 { return true; }",
        ErrorCode::TypeMismatch,
    );
}

#[test]
fn call_arity_checked() {
    check_err(
        "fn g(a: i32) { } fn f() { g(1, 2); }",
        ErrorCode::ArityMismatch,
    );
}

#[test]
fn call_argument_types_checked() {
    check_err(
        "fn g(a: i32) { } fn f() { g(true); }",
        ErrorCode::TypeMismatch,
    );
}

#[test]
fn calling_non_function() {
    check_err("fn f() { let x = 1; x(); }", ErrorCode::NonCallable);
}

#[test]
fn intrinsic_print_is_available() {
    check_ok("fn f() { print(42); }");
}

#[test]
fn user_print_collides_with_intrinsic() {
    check_err("fn print(x: i32) { }", ErrorCode::DuplicateDefinition);
}

#[test]
fn send_requires_process_target() {
    check_ok("fn f() { let p = spawn worker(); p ! 42; } fn worker() { }");
    check_err("fn f() { let x = 1; x ! 42; }", ErrorCode::SendToNonProcess);
}

#[test]
fn spawn_yields_process_handle() {
    let checked = check_ok("fn worker() { } fn f() { let p = spawn worker(); }");
    let spawn = find_expr(&checked, |k| matches!(k, ExprKind::Spawn(_)));
    assert_eq!(
        checked.analysis.pool.resolve(checked.analysis.expr_type(spawn)),
        TypeId::PROCESS
    );
}

#[test]
fn spawn_requires_callable() {
    check_err("fn f() { spawn 42; }", ErrorCode::NonCallable);
}

#[test]
fn actor_constructor_arity() {
    check_ok(
        "actor A { let n: i32 = 0; fn init(v: i32) { self.n = v; } }
         fn f() { spawn A(7); }",
    );
    check_err(
        "actor A { let n: i32 = 0; fn init(v: i32) { self.n = v; } }
         fn f() { spawn A(); }",
        ErrorCode::ArityMismatch,
    );
    check_err(
        "actor B { } fn f() { spawn B(3); }",
        ErrorCode::ArityMismatch,
    );
}

#[test]
fn receive_arm_binds_pattern() {
    check_ok(
        "actor A {
            receive {
                msg => { print(0); msg; }
                42 => { print(1); }
            }
        }",
    );
}

#[test]
fn for_loop_binds_element_type() {
    let checked = check_ok("fn f(xs: i32[]) { for x in xs { x + 1; } }");
    // The loop variable unified with the array element type.
    let add = find_expr(&checked, |k| {
        matches!(
            k,
            ExprKind::Binary {
                op: arnm_ir::ast::BinaryOp::Add,
                ..
            }
        )
    });
    assert_eq!(
        checked.analysis.pool.resolve(checked.analysis.expr_type(add)),
        TypeId::I32
    );
}

#[test]
fn annotated_let_is_enforced() {
    check_err("fn f() { let x: bool = 1; }", ErrorCode::TypeMismatch);
    check_ok("fn f() { let x: i32 = 1; let y: bool = true; }");
}

#[test]
fn unknown_type_annotation() {
    check_err("fn f() { let x: Banana = 1; }", ErrorCode::UnknownType);
}

#[test]
fn struct_field_access() {
    check_ok("struct Point { x: i32, y: i32 } fn f(p: Point) -> i32 { return p.x; }");
    check_err(
        "struct Point { x: i32 } fn f(p: Point) { p.z; }",
        ErrorCode::UnknownField,
    );
}

#[test]
fn actor_method_hoisted_under_mangled_name() {
    let checked = check_ok(
        "actor Counter {
            let count: i32 = 0;
            fn get() -> i32 { return self.count; }
        }",
    );
    let mangled = checked
        .analysis
        .symbols
        .lookup(checked.interner.intern("Counter_get"));
    assert!(mangled.is_some());

    let decls = checked.arena.decl_list(checked.program.decls);
    assert_eq!(decls.len(), 1);
    assert!(matches!(
        checked.arena.decl(decls[0]).kind,
        DeclKind::Actor(_)
    ));
}

#[test]
fn errors_do_not_cascade() {
    // One bad identifier produces one diagnostic, not a chain.
    let checked = check("fn f() { let x = missing; x + 1; }");
    assert_eq!(checked.analysis.diagnostics.len(), 1);
}

#[test]
fn analysis_continues_after_errors() {
    let checked = check("fn f() { missing; } fn g() { also_missing; }");
    assert_eq!(checked.analysis.diagnostics.len(), 2);
}
