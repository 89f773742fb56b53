//! Declaration and statement checking.

use crate::Analyzer;
use arnm_diagnostic::ErrorCode;
use arnm_ir::ast::{ActorDecl, StructDecl, TypeAnnKind};
use arnm_ir::{ArmRange, BlockId, FnId, Pattern, StmtId, StmtKind, TypeAnnId};
use arnm_types::{Field, SymbolKind, TypeId, TypeKind};

impl Analyzer<'_> {
    // ── Type annotations ─────────────────────────────────────────────────

    /// Lower a written type annotation to a pool type.
    pub(crate) fn resolve_type_ann(&mut self, ann_id: TypeAnnId) -> TypeId {
        let ann = *self.arena.type_ann(ann_id);
        match ann.kind {
            TypeAnnKind::Named(name) => {
                let ty = match self.interner.lookup(name) {
                    "i32" => Some(TypeId::I32),
                    "i64" => Some(TypeId::I64),
                    "f32" => Some(TypeId::F32),
                    "f64" => Some(TypeId::F64),
                    "bool" => Some(TypeId::BOOL),
                    "string" => Some(TypeId::STRING),
                    "char" => Some(TypeId::CHAR),
                    "unit" => Some(TypeId::UNIT),
                    "Process" => Some(TypeId::PROCESS),
                    _ => None,
                };
                if let Some(ty) = ty {
                    return ty;
                }
                // User-declared actor or struct.
                if let Some(sym_id) = self.symbols.lookup(name) {
                    let sym = self.symbols.symbol(sym_id);
                    if matches!(sym.kind, SymbolKind::Actor | SymbolKind::Type) {
                        return sym.ty;
                    }
                }
                let text = self.interner.lookup(name);
                self.error(
                    ErrorCode::UnknownType,
                    format!("unknown type '{text}'"),
                    ann.span,
                );
                TypeId::ERROR
            }
            TypeAnnKind::Optional(inner) => {
                let inner = self.resolve_type_ann(inner);
                self.pool.optional(inner)
            }
            TypeAnnKind::Array(elem) => {
                let elem = self.resolve_type_ann(elem);
                self.pool.array(elem)
            }
        }
    }

    // ── Declarations ─────────────────────────────────────────────────────

    /// Check one function and publish its signature.
    ///
    /// `override_name` replaces the symbol name for hoisted actor methods.
    pub(crate) fn check_function(&mut self, fn_id: FnId, override_name: Option<arnm_ir::Name>) {
        let decl = *self.arena.fn_decl(fn_id);

        self.symbols.push_scope();

        // Parameters bind to fresh variables; annotations constrain them.
        let mut param_types = Vec::with_capacity(self.arena.params(decl.params).len());
        let params: Vec<_> = self.arena.params(decl.params).to_vec();
        for param in &params {
            let var = self.pool.fresh_var();
            if let Some(ann) = param.ty {
                let annotated = self.resolve_type_ann(ann);
                self.pool.unify(var, annotated);
            }
            param_types.push(var);
            match self
                .symbols
                .define(param.name, SymbolKind::Param, var, param.span)
            {
                Some(id) => self.symbols.symbol_mut(id).is_mutable = param.is_mut,
                None => {
                    let text = self.interner.lookup(param.name);
                    self.error(
                        ErrorCode::DuplicateDefinition,
                        format!("duplicate parameter '{text}'"),
                        param.span,
                    );
                }
            }
        }

        // Expected return type: fresh variable, constrained by the
        // annotation and unified against every `return`.
        let ret = self.pool.fresh_var();
        if let Some(ann) = decl.return_type {
            let annotated = self.resolve_type_ann(ann);
            self.pool.unify(ret, annotated);
        }
        let saved_return = self.current_return.replace(ret);

        let body = *self.arena.block(decl.body);
        for &stmt in self.arena.stmt_list(body.stmts) {
            self.check_stmt(stmt);
        }

        self.current_return = saved_return;
        self.symbols.pop_scope();

        // Publish the signature.
        let fn_type = self.pool.fn_type(param_types, ret);
        let name = override_name.unwrap_or(decl.name);
        if let Some(sym_id) = self.symbols.lookup_current(name) {
            // Forward-declared in pass 1: flow the signature into the
            // placeholder so earlier call-site constraints merge.
            let placeholder = self.symbols.symbol(sym_id).ty;
            if !self.pool.unify(placeholder, fn_type) {
                let text = self.interner.lookup(name);
                self.error(
                    ErrorCode::TypeMismatch,
                    format!("conflicting uses of function '{text}'"),
                    decl.span,
                );
            }
            self.symbols.symbol_mut(sym_id).is_defined = true;
        } else {
            self.symbols
                .define(name, SymbolKind::Fn, fn_type, decl.span);
        }
    }

    pub(crate) fn check_actor(&mut self, actor: &ActorDecl) {
        // The nominal type was created in pass 1.
        let actor_type = match self.symbols.lookup(actor.name) {
            Some(id) => self.symbols.symbol(id).ty,
            None => self.pool.actor(actor.name),
        };

        // Populate the field table: annotation first, initializer second,
        // open variable otherwise.
        let fields: Vec<_> = self.arena.actor_fields(actor.fields).to_vec();
        let mut field_infos = Vec::with_capacity(fields.len());
        for field in &fields {
            let ty = match (field.ty, field.init) {
                (Some(ann), init) => {
                    let annotated = self.resolve_type_ann(ann);
                    if let Some(init) = init {
                        let init_ty = self.infer_expr(init);
                        if !self.pool.unify(init_ty, annotated) {
                            self.type_mismatch("field initializer", field.span);
                        }
                    }
                    annotated
                }
                (None, Some(init)) => self.infer_expr(init),
                (None, None) => self.pool.fresh_var(),
            };
            field_infos.push(Field {
                name: field.name,
                ty,
            });
        }
        self.pool.set_actor_fields(actor_type, field_infos);

        // Methods are hoisted to the global scope under mangled names; no
        // actor scope is pushed.
        let was_in_actor = self.in_actor;
        let was_cur_actor = self.cur_actor;
        self.in_actor = true;
        self.cur_actor = Some(actor_type);

        let method_ids: Vec<FnId> = self.arena.fn_ids(actor.methods).collect();
        for method_id in method_ids {
            let method_name = self.arena.fn_decl(method_id).name;
            let mangled = self.mangle_method(actor.name, method_name);
            self.check_function(method_id, Some(mangled));
        }

        if let Some(arms) = actor.receive_arms {
            self.check_receive_arms(arms);
        }

        self.in_actor = was_in_actor;
        self.cur_actor = was_cur_actor;
    }

    pub(crate) fn check_struct(&mut self, decl: &StructDecl) {
        let struct_type = match self.symbols.lookup(decl.name) {
            Some(id) => self.symbols.symbol(id).ty,
            None => self.pool.struct_type(decl.name),
        };

        let params: Vec<_> = self.arena.params(decl.fields).to_vec();
        let mut field_infos = Vec::with_capacity(params.len());
        for field in &params {
            let ty = match field.ty {
                Some(ann) => self.resolve_type_ann(ann),
                None => self.pool.fresh_var(),
            };
            field_infos.push(Field {
                name: field.name,
                ty,
            });
        }
        self.pool.set_struct_fields(struct_type, field_infos);
    }

    // ── Statements ───────────────────────────────────────────────────────

    pub(crate) fn check_block(&mut self, block: BlockId) {
        self.symbols.push_scope();
        let stmts = self.arena.block(block).stmts;
        for &stmt in self.arena.stmt_list(stmts) {
            self.check_stmt(stmt);
        }
        self.symbols.pop_scope();
    }

    pub(crate) fn check_stmt(&mut self, stmt_id: StmtId) {
        let stmt = *self.arena.stmt(stmt_id);
        match stmt.kind {
            StmtKind::Let {
                name,
                is_mut,
                ty,
                init,
            } => {
                let init_ty = match init {
                    Some(init) => self.infer_expr(init),
                    None => self.pool.fresh_var(),
                };
                let var_ty = match ty {
                    Some(ann) => {
                        let annotated = self.resolve_type_ann(ann);
                        if !self.pool.unify(init_ty, annotated) {
                            self.type_mismatch("variable initializer", stmt.span);
                        }
                        annotated
                    }
                    None => init_ty,
                };
                match self.symbols.define(name, SymbolKind::Var, var_ty, stmt.span) {
                    Some(id) => self.symbols.symbol_mut(id).is_mutable = is_mut,
                    None => {
                        let text = self.interner.lookup(name);
                        self.error(
                            ErrorCode::DuplicateDefinition,
                            format!("duplicate variable definition '{text}'"),
                            stmt.span,
                        );
                    }
                }
            }

            StmtKind::Expr(expr) => {
                self.infer_expr(expr);
            }

            StmtKind::Return(value) => {
                let ret_ty = match value {
                    Some(expr) => self.infer_expr(expr),
                    None => TypeId::UNIT,
                };
                if let Some(expected) = self.current_return {
                    if !self.pool.unify(ret_ty, expected) {
                        self.error(
                            ErrorCode::TypeMismatch,
                            "return type mismatch",
                            stmt.span,
                        );
                    }
                }
            }

            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                let cond_ty = self.infer_expr(cond);
                if !self.pool.unify(cond_ty, TypeId::BOOL) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        "if condition must be bool",
                        stmt.span,
                    );
                }
                self.check_block(then_block);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }

            StmtKind::While { cond, body } => {
                let cond_ty = self.infer_expr(cond);
                if !self.pool.unify(cond_ty, TypeId::BOOL) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        "while condition must be bool",
                        stmt.span,
                    );
                }
                let was_in_loop = self.in_loop;
                self.in_loop = true;
                self.check_block(body);
                self.in_loop = was_in_loop;
            }

            StmtKind::For {
                var,
                iterable,
                body,
            } => {
                let iter_ty = self.infer_expr(iterable);
                // The iterable must be an array of the loop element type.
                let elem = self.pool.fresh_var();
                let array = self.pool.array(elem);
                if !self.pool.unify(iter_ty, array) {
                    self.error(
                        ErrorCode::TypeMismatch,
                        "for loop requires an array iterable",
                        stmt.span,
                    );
                }

                self.symbols.push_scope();
                self.symbols.define(var, SymbolKind::Var, elem, stmt.span);
                let was_in_loop = self.in_loop;
                self.in_loop = true;
                self.check_block(body);
                self.in_loop = was_in_loop;
                self.symbols.pop_scope();
            }

            StmtKind::Loop { body } => {
                let was_in_loop = self.in_loop;
                self.in_loop = true;
                self.check_block(body);
                self.in_loop = was_in_loop;
            }

            StmtKind::Spawn(expr) => {
                self.infer_expr(expr);
            }

            StmtKind::Receive { arms } => {
                self.check_receive_arms(arms);
            }

            StmtKind::Break | StmtKind::Continue => {
                if !self.in_loop {
                    self.error(
                        ErrorCode::BreakOutsideLoop,
                        "break/continue outside loop",
                        stmt.span,
                    );
                }
            }

            StmtKind::Block(block) => self.check_block(block),

            StmtKind::Error => {}
        }
    }

    /// Each arm opens a scope binding its pattern name (if any) to the
    /// message tag, then checks the body statements in that scope.
    pub(crate) fn check_receive_arms(&mut self, arms: ArmRange) {
        let arms: Vec<_> = self.arena.arms(arms).to_vec();
        for arm in arms {
            self.symbols.push_scope();
            if let Pattern::Bind(name) = arm.pattern {
                let ty = self.pool.fresh_var();
                self.symbols.define(name, SymbolKind::Var, ty, arm.span);
            }
            let stmts = self.arena.block(arm.body).stmts;
            for &stmt in self.arena.stmt_list(stmts) {
                self.check_stmt(stmt);
            }
            self.symbols.pop_scope();
        }
    }

    pub(crate) fn type_mismatch(&mut self, what: &str, span: arnm_ir::Span) {
        self.error(
            ErrorCode::TypeMismatch,
            format!("type mismatch in {what}"),
            span,
        );
    }

    /// Is the resolved type an actor?
    pub(crate) fn is_actor(&self, ty: TypeId) -> bool {
        matches!(
            self.pool.kind(self.pool.resolve(ty)),
            TypeKind::Actor { .. }
        )
    }
}
