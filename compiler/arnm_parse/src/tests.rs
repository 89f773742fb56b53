#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use crate::parse;
use arnm_ir::ast::{BinaryOp, DeclKind, ExprKind, Pattern, StmtKind};
use arnm_ir::{ExprId, SharedInterner, StmtId};

fn parse_ok(source: &str) -> crate::ParseOutput {
    let out = parse(source, SharedInterner::new());
    assert!(
        !out.had_error(),
        "unexpected diagnostics: {:?}",
        out.diagnostics.iter().collect::<Vec<_>>()
    );
    out
}

fn parse_err(source: &str) -> crate::ParseOutput {
    let out = parse(source, SharedInterner::new());
    assert!(out.had_error(), "expected diagnostics for: {source}");
    out
}

fn first_fn_stmts(out: &crate::ParseOutput) -> Vec<StmtId> {
    let decls = out.arena.decl_list(out.program.decls);
    let DeclKind::Fn(fn_id) = out.arena.decl(decls[0]).kind else {
        panic!("expected fn declaration");
    };
    let body = out.arena.fn_decl(fn_id).body;
    out.arena.stmt_list(out.arena.block(body).stmts).to_vec()
}

fn stmt_expr(out: &crate::ParseOutput, id: StmtId) -> ExprId {
    match out.arena.stmt(id).kind {
        StmtKind::Expr(e) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn empty_program() {
    let out = parse_ok("");
    assert_eq!(out.program.decls.len(), 0);
}

#[test]
fn simple_function() {
    let out = parse_ok("fn add(a: i32, b: i32) -> i32 { return a + b; }");
    let decls = out.arena.decl_list(out.program.decls);
    assert_eq!(decls.len(), 1);
    let DeclKind::Fn(fn_id) = out.arena.decl(decls[0]).kind else {
        panic!("expected fn");
    };
    let decl = out.arena.fn_decl(fn_id);
    assert_eq!(out.arena.params(decl.params).len(), 2);
    assert!(decl.return_type.is_some());
}

#[test]
fn precedence_mul_binds_tighter_than_add() {
    let out = parse_ok("fn f() { 1 + 2 * 3; }");
    let stmts = first_fn_stmts(&out);
    let root = stmt_expr(&out, stmts[0]);
    let ExprKind::Binary { op, rhs, .. } = out.arena.expr(root).kind else {
        panic!("expected binary root");
    };
    assert_eq!(op, BinaryOp::Add);
    let ExprKind::Binary { op: inner, .. } = out.arena.expr(rhs).kind else {
        panic!("expected nested binary");
    };
    assert_eq!(inner, BinaryOp::Mul);
}

#[test]
fn send_binds_between_comparison_and_term() {
    // `p ! 1 + 2` parses the term on the right of the send.
    let out = parse_ok("fn f(p: Process) { p ! 1 + 2; }");
    let stmts = first_fn_stmts(&out);
    let root = stmt_expr(&out, stmts[0]);
    let ExprKind::Send { message, .. } = out.arena.expr(root).kind else {
        panic!("expected send root, got {:?}", out.arena.expr(root).kind);
    };
    assert!(matches!(
        out.arena.expr(message).kind,
        ExprKind::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));

    // `!` binds tighter than `==`: `a ! b == c` sends first, then
    // compares the unit result.
    let out = parse_ok("fn f(a: Process, b: i32, c: i32) { a ! b == c; }");
    let stmts = first_fn_stmts(&out);
    let root = stmt_expr(&out, stmts[0]);
    let ExprKind::Binary {
        op: BinaryOp::Eq,
        lhs,
        ..
    } = out.arena.expr(root).kind
    else {
        panic!("expected comparison root, got {:?}", out.arena.expr(root).kind);
    };
    assert!(matches!(out.arena.expr(lhs).kind, ExprKind::Send { .. }));
}

#[test]
fn compound_assignment_desugars() {
    let out = parse_ok("fn f() { let mut x = 1; x += 2; }");
    let stmts = first_fn_stmts(&out);
    let root = stmt_expr(&out, stmts[1]);
    let ExprKind::Binary { op, lhs, rhs } = out.arena.expr(root).kind else {
        panic!("expected assignment");
    };
    assert_eq!(op, BinaryOp::Assign);
    let ExprKind::Binary {
        op: BinaryOp::Add,
        lhs: shared,
        ..
    } = out.arena.expr(rhs).kind
    else {
        panic!("expected desugared add");
    };
    // The target node is shared between both sides.
    assert_eq!(lhs, shared);
}

#[test]
fn call_field_index_chain() {
    let out = parse_ok("fn f(xs: i32[]) { xs[0]; g(1, 2); self.count; }");
    let stmts = first_fn_stmts(&out);
    assert!(matches!(
        out.arena.expr(stmt_expr(&out, stmts[0])).kind,
        ExprKind::Index { .. }
    ));
    let ExprKind::Call { args, .. } = out.arena.expr(stmt_expr(&out, stmts[1])).kind else {
        panic!("expected call");
    };
    assert_eq!(out.arena.expr_list(args).len(), 2);
    assert!(matches!(
        out.arena.expr(stmt_expr(&out, stmts[2])).kind,
        ExprKind::Field { .. }
    ));
}

#[test]
fn control_flow_statements() {
    let out = parse_ok(
        "fn f() {
            if a { return; } else if b { return; } else { return; }
            while c { break; }
            loop { continue; }
            for x in xs { x; }
        }",
    );
    let stmts = first_fn_stmts(&out);
    assert!(matches!(out.arena.stmt(stmts[0]).kind, StmtKind::If { .. }));
    assert!(matches!(
        out.arena.stmt(stmts[1]).kind,
        StmtKind::While { .. }
    ));
    assert!(matches!(
        out.arena.stmt(stmts[2]).kind,
        StmtKind::Loop { .. }
    ));
    assert!(matches!(out.arena.stmt(stmts[3]).kind, StmtKind::For { .. }));
}

#[test]
fn spawn_statement_and_expression() {
    let out = parse_ok("fn f() { spawn worker(1); let p = spawn worker(2); }");
    let stmts = first_fn_stmts(&out);
    assert!(matches!(
        out.arena.stmt(stmts[0]).kind,
        StmtKind::Spawn(_)
    ));
    let StmtKind::Let {
        init: Some(init), ..
    } = out.arena.stmt(stmts[1]).kind
    else {
        panic!("expected let with initializer");
    };
    assert!(matches!(out.arena.expr(init).kind, ExprKind::Spawn(_)));
}

#[test]
fn receive_with_bind_and_tag_arms() {
    let out = parse_ok("fn f() { receive { msg => { msg; } 42 => { return; } } }");
    let stmts = first_fn_stmts(&out);
    let StmtKind::Receive { arms } = out.arena.stmt(stmts[0]).kind else {
        panic!("expected receive");
    };
    let arms = out.arena.arms(arms);
    assert_eq!(arms.len(), 2);
    assert!(matches!(arms[0].pattern, Pattern::Bind(_)));
    assert!(matches!(arms[1].pattern, Pattern::Tag(42)));
}

#[test]
fn actor_declaration() {
    let out = parse_ok(
        "actor Counter {
            let count: i32 = 0;
            fn init() { }
            fn get() -> i32 { return self.count; }
            receive {
                incr => { self.count = self.count + 1; }
            }
        }",
    );
    let decls = out.arena.decl_list(out.program.decls);
    let DeclKind::Actor(actor) = out.arena.decl(decls[0]).kind else {
        panic!("expected actor");
    };
    assert_eq!(out.arena.actor_fields(actor.fields).len(), 1);
    assert_eq!(actor.methods.len(), 2);
    assert!(actor.receive_arms.is_some());
}

#[test]
fn struct_declaration() {
    let out = parse_ok("struct Point { x: i32, y: i32 }");
    let decls = out.arena.decl_list(out.program.decls);
    let DeclKind::Struct(decl) = out.arena.decl(decls[0]).kind else {
        panic!("expected struct");
    };
    assert_eq!(out.arena.params(decl.fields).len(), 2);
}

#[test]
fn optional_and_array_types() {
    parse_ok("fn f(a: i32?, b: i32[]) { }");
}

#[test]
fn invalid_program_produces_diagnostic_with_span() {
    let source = "fn f() { let = 1; }";
    let out = parse_err(source);
    let diag = out.diagnostics.iter().next().unwrap();
    // The diagnostic span intersects the offending `=` token.
    let eq_pos = source.find("= 1").unwrap() as u32;
    assert!(
        diag.span.contains(eq_pos),
        "span {:?} does not cover offset {eq_pos}",
        diag.span
    );
}

#[test]
fn error_recovery_continues_parsing() {
    // The bad statement is skipped; both surrounding declarations survive.
    let out = parse_err("fn f() { let 1; return; } fn g() { return; }");
    assert_eq!(out.arena.decl_list(out.program.decls).len(), 2);
}

#[test]
fn top_level_garbage_recovers() {
    let out = parse_err("let x = 1; fn f() { }");
    assert_eq!(out.arena.decl_list(out.program.decls).len(), 1);
}

#[test]
fn too_many_arguments_is_diagnosed_not_fatal() {
    let args = (0..70).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let source = format!("fn f() {{ g({args}); }}");
    let out = parse_err(&source);
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.message.contains("too many arguments")));
}

#[test]
fn unclosed_brace_is_diagnosed() {
    parse_err("fn f() { return;");
}

#[test]
fn deeply_nested_expressions_do_not_overflow() {
    let depth = 2000;
    let source = format!(
        "fn f() {{ {}1{}; }}",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let out = parse(&source, SharedInterner::new());
    assert!(!out.had_error());
}
