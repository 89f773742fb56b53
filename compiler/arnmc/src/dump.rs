//! Debugging dumps: token stream and AST structure.

use arnm_ir::ast::{DeclKind, ExprKind, Pattern, StmtKind};
use arnm_ir::{
    AstArena, BlockId, ExprId, FnId, Program, SharedInterner, StmtId, TokenKind,
};

/// Print the token stream as `line:col KIND 'lexeme'`.
pub fn print_tokens(source: &str, interner: SharedInterner) {
    println!("=== Tokens ===");
    for token in arnm_lexer::tokenize(source, interner) {
        println!(
            "{:>4}:{:<3} {:<16} '{}'",
            token.span.line,
            token.span.column,
            token.kind.display_name(),
            token.span.slice(source)
        );
        if token.kind == TokenKind::Eof {
            break;
        }
    }
}

/// Print the declaration tree with two-space indentation.
pub fn print_ast(program: &Program, arena: &AstArena, interner: &SharedInterner) {
    println!("=== AST ===");
    let decls = arena.decl_list(program.decls);
    println!("Program: {} declarations", decls.len());

    let printer = AstPrinter { arena, interner };
    for &decl_id in decls {
        match arena.decl(decl_id).kind {
            DeclKind::Fn(fn_id) => printer.print_fn(fn_id, 1),
            DeclKind::Actor(actor) => {
                printer.indent(1);
                println!(
                    "Actor: {} (fields: {}, methods: {})",
                    interner.lookup(actor.name),
                    actor.fields.len(),
                    actor.methods.len()
                );
                for method in arena.fn_ids(actor.methods) {
                    printer.print_fn(method, 2);
                }
                if let Some(arms) = actor.receive_arms {
                    printer.indent(2);
                    println!("Receive: {} arms", arms.len());
                }
            }
            DeclKind::Struct(decl) => {
                printer.indent(1);
                println!(
                    "Struct: {} ({} fields)",
                    interner.lookup(decl.name),
                    decl.fields.len()
                );
            }
        }
    }
}

struct AstPrinter<'a> {
    arena: &'a AstArena,
    interner: &'a SharedInterner,
}

impl AstPrinter<'_> {
    fn indent(&self, depth: usize) {
        print!("{}", "  ".repeat(depth));
    }

    fn print_fn(&self, fn_id: FnId, depth: usize) {
        let decl = self.arena.fn_decl(fn_id);
        self.indent(depth);
        println!(
            "Function: {} (params: {})",
            self.interner.lookup(decl.name),
            decl.params.len()
        );
        self.print_block(decl.body, depth + 1);
    }

    fn print_block(&self, block: BlockId, depth: usize) {
        for &stmt in self.arena.stmt_list(self.arena.block(block).stmts) {
            self.print_stmt(stmt, depth);
        }
    }

    fn print_stmt(&self, stmt_id: StmtId, depth: usize) {
        let stmt = self.arena.stmt(stmt_id);
        self.indent(depth);
        match stmt.kind {
            StmtKind::Let { name, is_mut, init, .. } => {
                println!(
                    "Let: {}{}",
                    self.interner.lookup(name),
                    if is_mut { " (mut)" } else { "" }
                );
                if let Some(init) = init {
                    self.print_expr(init, depth + 1);
                }
            }
            StmtKind::Expr(expr) => {
                println!("ExprStmt:");
                self.print_expr(expr, depth + 1);
            }
            StmtKind::Return(value) => {
                println!("Return:");
                if let Some(value) = value {
                    self.print_expr(value, depth + 1);
                }
            }
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                println!("If:");
                self.print_expr(cond, depth + 1);
                self.print_block(then_block, depth + 1);
                if let Some(else_branch) = else_branch {
                    self.indent(depth);
                    println!("Else:");
                    self.print_stmt(else_branch, depth + 1);
                }
            }
            StmtKind::While { cond, body } => {
                println!("While:");
                self.print_expr(cond, depth + 1);
                self.print_block(body, depth + 1);
            }
            StmtKind::For { var, iterable, body } => {
                println!("For: {}", self.interner.lookup(var));
                self.print_expr(iterable, depth + 1);
                self.print_block(body, depth + 1);
            }
            StmtKind::Loop { body } => {
                println!("Loop:");
                self.print_block(body, depth + 1);
            }
            StmtKind::Break => println!("Break"),
            StmtKind::Continue => println!("Continue"),
            StmtKind::Spawn(expr) => {
                println!("Spawn:");
                self.print_expr(expr, depth + 1);
            }
            StmtKind::Receive { arms } => {
                println!("Receive: {} arms", arms.len());
                for arm in self.arena.arms(arms) {
                    self.indent(depth + 1);
                    match arm.pattern {
                        Pattern::Bind(name) => {
                            println!("Arm: {}", self.interner.lookup(name));
                        }
                        Pattern::Tag(value) => println!("Arm: {value}"),
                    }
                    self.print_block(arm.body, depth + 2);
                }
            }
            StmtKind::Block(block) => {
                println!("Block:");
                self.print_block(block, depth + 1);
            }
            StmtKind::Error => println!("(error)"),
        }
    }

    fn print_expr(&self, expr_id: ExprId, depth: usize) {
        let expr = self.arena.expr(expr_id);
        self.indent(depth);
        match expr.kind {
            ExprKind::Ident(name) => println!("Ident: {}", self.interner.lookup(name)),
            ExprKind::Int(value) => println!("Int: {value}"),
            ExprKind::Float(bits) => println!("Float: {}", f64::from_bits(bits)),
            ExprKind::Str(name) => println!("String: {}", self.interner.lookup(name)),
            ExprKind::Char(name) => println!("Char: {}", self.interner.lookup(name)),
            ExprKind::Bool(value) => println!("Bool: {value}"),
            ExprKind::Nil => println!("Nil"),
            ExprKind::SelfRef => println!("Self"),
            ExprKind::Unary { op, operand } => {
                println!("Unary: {op:?}");
                self.print_expr(operand, depth + 1);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                println!("Binary: {op:?}");
                self.print_expr(lhs, depth + 1);
                self.print_expr(rhs, depth + 1);
            }
            ExprKind::Call { callee, args } => {
                println!("Call:");
                self.print_expr(callee, depth + 1);
                for &arg in self.arena.expr_list(args) {
                    self.print_expr(arg, depth + 1);
                }
            }
            ExprKind::Index { object, index } => {
                println!("Index:");
                self.print_expr(object, depth + 1);
                self.print_expr(index, depth + 1);
            }
            ExprKind::Field { object, field } => {
                println!("Field: {}", self.interner.lookup(field));
                self.print_expr(object, depth + 1);
            }
            ExprKind::Send { target, message } => {
                println!("Send:");
                self.print_expr(target, depth + 1);
                self.print_expr(message, depth + 1);
            }
            ExprKind::Spawn(inner) => {
                println!("SpawnExpr:");
                self.print_expr(inner, depth + 1);
            }
            ExprKind::Group(inner) => {
                println!("Group:");
                self.print_expr(inner, depth + 1);
            }
            ExprKind::Error => println!("(error)"),
        }
    }
}
