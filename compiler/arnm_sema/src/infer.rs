//! Expression type inference.

use crate::Analyzer;
use arnm_diagnostic::ErrorCode;
use arnm_ir::ast::{BinaryOp, ExprKind, UnaryOp};
use arnm_ir::{ExprId, ExprRange, Name, Span};
use arnm_types::{SymbolKind, TypeId, TypeKind};

impl Analyzer<'_> {
    /// Infer (and record) the type of an expression.
    pub(crate) fn infer_expr(&mut self, expr_id: ExprId) -> TypeId {
        if let Some(cached) = self.cached(expr_id) {
            return cached;
        }

        let expr = *self.arena.expr(expr_id);
        let ty = match expr.kind {
            ExprKind::Int(_) => TypeId::I32,
            ExprKind::Float(_) => TypeId::F64,
            ExprKind::Str(_) => TypeId::STRING,
            ExprKind::Char(_) => TypeId::CHAR,
            ExprKind::Bool(_) => TypeId::BOOL,
            ExprKind::Nil => TypeId::UNIT,

            ExprKind::SelfRef => match self.cur_actor {
                Some(actor) => actor,
                None => {
                    self.error(
                        ErrorCode::SelfOutsideActor,
                        "'self' used outside of actor",
                        expr.span,
                    );
                    TypeId::ERROR
                }
            },

            ExprKind::Ident(name) => self.infer_ident(name, expr.span),
            ExprKind::Unary { op, operand } => self.infer_unary(op, operand, expr.span),
            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(op, lhs, rhs, expr.span),
            ExprKind::Call { callee, args } => self.infer_call(callee, args, expr.span),
            ExprKind::Index { object, index } => {
                let obj_ty = self.infer_expr(object);
                self.infer_expr(index);
                let resolved = self.pool.resolve(obj_ty);
                match self.pool.kind(resolved) {
                    TypeKind::Array(elem) => *elem,
                    _ => self.pool.fresh_var(),
                }
            }
            ExprKind::Field { object, field } => self.infer_field(object, field, expr.span),
            ExprKind::Send { target, message } => self.infer_send(target, message, expr.span),
            ExprKind::Spawn(inner) => self.infer_spawn(inner, expr.span),
            ExprKind::Group(inner) => self.infer_expr(inner),
            ExprKind::Error => TypeId::ERROR,
        };

        self.record(expr_id, ty)
    }

    fn infer_ident(&mut self, name: Name, span: Span) -> TypeId {
        // Actor fields are reachable only through `self.`; a bare name that
        // matches one is an error even though the field table would resolve
        // it.
        if self.in_actor {
            if let Some(actor) = self.cur_actor {
                let actor = self.pool.resolve(actor);
                if self.pool.field_index(actor, name).is_some() {
                    self.error(
                        ErrorCode::BareActorField,
                        "actor field access requires 'self.' prefix",
                        span,
                    );
                    return TypeId::ERROR;
                }
            }
        }

        match self.symbols.lookup(name) {
            Some(sym_id) => self.symbols.symbol(sym_id).ty,
            None => {
                let text = self.interner.lookup(name);
                self.error(
                    ErrorCode::UndefinedIdent,
                    format!("undefined identifier '{text}'"),
                    span,
                );
                TypeId::ERROR
            }
        }
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: ExprId, span: Span) -> TypeId {
        let operand_ty = self.infer_expr(operand);
        match op {
            // Same numeric type flows through.
            UnaryOp::Neg | UnaryOp::BitNot => operand_ty,
            UnaryOp::Not => {
                if !self.pool.unify(operand_ty, TypeId::BOOL) {
                    self.error(ErrorCode::TypeMismatch, "'!' requires a bool operand", span);
                }
                TypeId::BOOL
            }
        }
    }

    fn infer_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, span: Span) -> TypeId {
        if op == BinaryOp::Assign {
            return self.infer_assignment(lhs, rhs, span);
        }

        let lhs_ty = self.infer_expr(lhs);
        let rhs_ty = self.infer_expr(rhs);

        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                if !self.pool.unify(lhs_ty, rhs_ty) {
                    self.type_mismatch("binary operation", span);
                }
                lhs_ty
            }

            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => {
                if !self.pool.unify(lhs_ty, rhs_ty) {
                    self.type_mismatch("comparison", span);
                }
                TypeId::BOOL
            }

            BinaryOp::And | BinaryOp::Or => {
                let lhs_ok = self.pool.unify(lhs_ty, TypeId::BOOL);
                let rhs_ok = self.pool.unify(rhs_ty, TypeId::BOOL);
                if !lhs_ok || !rhs_ok {
                    self.error(
                        ErrorCode::TypeMismatch,
                        "logical operators require bool",
                        span,
                    );
                }
                TypeId::BOOL
            }

            BinaryOp::Assign => unreachable!("handled above"),
        }
    }

    fn infer_assignment(&mut self, lhs: ExprId, rhs: ExprId, span: Span) -> TypeId {
        let lhs_ty = self.infer_expr(lhs);
        let rhs_ty = self.infer_expr(rhs);

        self.check_assignment_target(lhs);

        if !self.pool.unify(lhs_ty, rhs_ty) {
            self.type_mismatch("assignment", span);
        }
        TypeId::UNIT
    }

    /// Validate that `target` may appear on the left of `=` and is mutable.
    fn check_assignment_target(&mut self, target: ExprId) -> bool {
        let expr = *self.arena.expr(target);
        match expr.kind {
            ExprKind::Ident(name) => {
                let Some(sym_id) = self.symbols.lookup(name) else {
                    // Undefined: already reported by inference.
                    return false;
                };
                if !self.symbols.symbol(sym_id).is_mutable {
                    let text = self.interner.lookup(name);
                    self.error(
                        ErrorCode::ImmutableAssign,
                        format!("cannot assign to immutable variable '{text}'"),
                        expr.span,
                    );
                    return false;
                }
                true
            }

            ExprKind::Field { object, .. } => {
                // `self.field` is assignable inside an actor; actor state
                // is mutable through `self`.
                if matches!(self.arena.expr(object).kind, ExprKind::SelfRef) {
                    if !self.in_actor {
                        self.error(
                            ErrorCode::SelfOutsideActor,
                            "'self.field' assignment outside actor",
                            expr.span,
                        );
                        return false;
                    }
                    return true;
                }
                self.check_assignment_target(object)
            }

            ExprKind::Index { object, .. } => self.check_assignment_target(object),

            ExprKind::Error => false,

            _ => {
                self.error(
                    ErrorCode::InvalidAssignTarget,
                    "invalid assignment target",
                    expr.span,
                );
                false
            }
        }
    }

    fn infer_call(&mut self, callee: ExprId, args: ExprRange, span: Span) -> TypeId {
        let callee_ty = self.infer_expr(callee);
        let callee_ty = self.pool.resolve(callee_ty);
        let arg_ids: Vec<ExprId> = self.arena.expr_list(args).to_vec();

        // Actor constructor call: `Counter(args)` validates against the
        // actor's `init` method (or zero arguments) and yields the actor.
        if self.is_actor(callee_ty) {
            return self.infer_actor_construction(callee_ty, &arg_ids, span);
        }

        match self.pool.kind(callee_ty).clone() {
            TypeKind::Fn { params, ret } => {
                if arg_ids.len() != params.len() {
                    self.error(
                        ErrorCode::ArityMismatch,
                        format!(
                            "wrong number of arguments: expected {}, found {}",
                            params.len(),
                            arg_ids.len()
                        ),
                        span,
                    );
                    return ret;
                }
                for (&arg, &param) in arg_ids.iter().zip(params.iter()) {
                    let arg_ty = self.infer_expr(arg);
                    if !self.pool.unify(arg_ty, param) {
                        self.type_mismatch("argument", self.arena.expr(arg).span);
                    }
                }
                ret
            }

            TypeKind::Var { .. } => {
                // Unknown callee: constrain it to a call-shaped function
                // type.
                let mut params = Vec::with_capacity(arg_ids.len());
                for &arg in &arg_ids {
                    params.push(self.infer_expr(arg));
                }
                let ret = self.pool.fresh_var();
                let fn_ty = self.pool.fn_type(params, ret);
                self.pool.unify(callee_ty, fn_ty);
                ret
            }

            TypeKind::Error => TypeId::ERROR,

            _ => {
                self.error(ErrorCode::NonCallable, "calling non-function", span);
                TypeId::ERROR
            }
        }
    }

    fn infer_actor_construction(
        &mut self,
        actor_ty: TypeId,
        args: &[ExprId],
        span: Span,
    ) -> TypeId {
        let TypeKind::Actor { name, .. } = self.pool.kind(self.pool.resolve(actor_ty)) else {
            return TypeId::ERROR;
        };
        let init_name = self.mangle_method(*name, self.interner.intern("init"));

        let init_ty = self
            .symbols
            .lookup(init_name)
            .filter(|&id| self.symbols.symbol(id).kind == SymbolKind::Fn)
            .map(|id| self.symbols.symbol(id).ty)
            .map(|ty| self.pool.resolve(ty));

        match init_ty.map(|ty| self.pool.kind(ty).clone()) {
            Some(TypeKind::Fn { params, .. }) => {
                if args.len() != params.len() {
                    self.error(
                        ErrorCode::ArityMismatch,
                        "wrong number of arguments for actor init",
                        span,
                    );
                    return TypeId::ERROR;
                }
                for (&arg, &param) in args.iter().zip(params.iter()) {
                    let arg_ty = self.infer_expr(arg);
                    if !self.pool.unify(arg_ty, param) {
                        self.error(
                            ErrorCode::TypeMismatch,
                            "argument type mismatch in actor init",
                            self.arena.expr(arg).span,
                        );
                        return TypeId::ERROR;
                    }
                }
            }
            _ => {
                if !args.is_empty() {
                    self.error(
                        ErrorCode::ArityMismatch,
                        "actor has no init method, expected 0 arguments",
                        span,
                    );
                    return TypeId::ERROR;
                }
            }
        }

        actor_ty
    }

    fn infer_field(&mut self, object: ExprId, field: Name, span: Span) -> TypeId {
        let obj_ty = self.infer_expr(object);
        let obj_ty = self.pool.resolve(obj_ty);

        match self.pool.kind(obj_ty).clone() {
            TypeKind::Actor { name, fields } => {
                if let Some(f) = fields.iter().find(|f| f.name == field) {
                    return f.ty;
                }
                // Not a field: try a method under its mangled name.
                let mangled = self.mangle_method(name, field);
                if let Some(sym_id) = self.symbols.lookup(mangled) {
                    let sym = self.symbols.symbol(sym_id);
                    if sym.kind == SymbolKind::Fn {
                        return sym.ty;
                    }
                }
                let text = self.interner.lookup(field);
                self.error(
                    ErrorCode::UnknownField,
                    format!("field or method '{text}' not found in actor"),
                    span,
                );
                TypeId::ERROR
            }

            TypeKind::Struct { fields, .. } => {
                if let Some(f) = fields.iter().find(|f| f.name == field) {
                    return f.ty;
                }
                let text = self.interner.lookup(field);
                self.error(
                    ErrorCode::UnknownField,
                    format!("field '{text}' not found in struct"),
                    span,
                );
                TypeId::ERROR
            }

            TypeKind::Error => TypeId::ERROR,

            _ => {
                self.error(
                    ErrorCode::UnknownField,
                    "field access on non-actor/struct value",
                    span,
                );
                TypeId::ERROR
            }
        }
    }

    /// `target ! message`: the target must be a process handle (or still
    /// unresolved); sends evaluate to unit.
    fn infer_send(&mut self, target: ExprId, message: ExprId, span: Span) -> TypeId {
        let target_ty = self.infer_expr(target);
        self.infer_expr(message);

        let resolved = self.pool.resolve(target_ty);
        match self.pool.kind(resolved) {
            TypeKind::Process | TypeKind::Var { .. } | TypeKind::Error => {}
            _ => {
                self.error(
                    ErrorCode::SendToNonProcess,
                    "send target must be a process",
                    span,
                );
            }
        }
        TypeId::UNIT
    }

    /// `spawn e`: `e` must be callable (function or actor constructor);
    /// the result is a process handle.
    fn infer_spawn(&mut self, inner: ExprId, span: Span) -> TypeId {
        let inner_ty = self.infer_expr(inner);
        let resolved = self.pool.resolve(inner_ty);
        match self.pool.kind(resolved) {
            TypeKind::Fn { .. }
            | TypeKind::Var { .. }
            | TypeKind::Actor { .. }
            | TypeKind::Error => {}
            _ => {
                self.error(
                    ErrorCode::NonCallable,
                    "spawn requires a function or actor method",
                    span,
                );
            }
        }
        TypeId::PROCESS
    }
}
