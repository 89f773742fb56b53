//! Expression lowering.

use crate::{Lowerer, FIELD_SIZE};
use arnm_ir::ast::{BinaryOp, ExprKind, UnaryOp};
use arnm_ir::{ExprId, Name};
use arnm_ssa::{IrType, IrValue, Opcode};
use arnm_types::{SymbolKind, TypeId, TypeKind};

impl Lowerer<'_> {
    /// Lower one expression to a value.
    pub(crate) fn lower_expr(&mut self, expr_id: ExprId) -> IrValue {
        let expr = *self.arena.expr(expr_id);
        match expr.kind {
            ExprKind::Int(value) => {
                // Literal width follows the inferred type.
                match self.ir_type_of(self.analysis.expr_type(expr_id)) {
                    IrType::I64 => IrValue::const_i64(value),
                    _ => IrValue::const_i32(value as i32),
                }
            }
            ExprKind::Float(bits) => IrValue::Const {
                bits,
                ty: IrType::F64,
            },
            ExprKind::Bool(value) => IrValue::const_bool(value),
            ExprKind::Char(name) => IrValue::Const {
                bits: u64::from(char_lexeme_byte(self.interner.lookup(name))),
                ty: IrType::I8,
            },
            // Strings have no native object layout yet; they lower to a
            // null pointer placeholder.
            ExprKind::Str(_) => IrValue::null_ptr(),
            ExprKind::Nil => IrValue::Undef,

            ExprKind::Ident(name) => self.lower_ident(name),

            ExprKind::Unary { op, operand } => self.lower_unary(op, operand),

            ExprKind::Binary { op, lhs, rhs } => {
                if op == BinaryOp::Assign {
                    self.lower_assignment(lhs, rhs)
                } else {
                    self.lower_binary(op, lhs, rhs)
                }
            }

            ExprKind::Call { .. } => self.lower_call(expr_id),

            ExprKind::Field { object, field } => self.lower_field_read(object, field),

            ExprKind::Index { .. } => IrValue::Undef,

            ExprKind::Send { target, message } => self.lower_send(target, message),

            ExprKind::Spawn(_) => self.lower_spawn(expr_id),

            ExprKind::SelfRef => {
                let block = self.cur_block;
                let callee = self.runtime("arnm_self");
                self.fb().call(block, callee, Vec::new(), IrType::Process)
            }

            ExprKind::Group(inner) => self.lower_expr(inner),

            ExprKind::Error => IrValue::Undef,
        }
    }

    fn lower_ident(&mut self, name: Name) -> IrValue {
        match self.lookup_local(name) {
            Some((slot, ty)) => {
                let block = self.cur_block;
                self.fb().load(block, ty, slot)
            }
            None => IrValue::Undef,
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: ExprId) -> IrValue {
        let val = self.lower_expr(operand);
        let block = self.cur_block;
        match op {
            // 0 - x
            UnaryOp::Neg => {
                let zero = match val.ty() {
                    IrType::I64 => IrValue::const_i64(0),
                    _ => IrValue::const_i32(0),
                };
                self.fb().binary(block, Opcode::Sub, zero, val)
            }
            // x == false
            UnaryOp::Not => self
                .fb()
                .compare(block, Opcode::Eq, val, IrValue::const_bool(false)),
            // -1 - x
            UnaryOp::BitNot => {
                let all_ones = match val.ty() {
                    IrType::I64 => IrValue::const_i64(-1),
                    _ => IrValue::const_i32(-1),
                };
                self.fb().binary(block, Opcode::Sub, all_ones, val)
            }
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> IrValue {
        let lhs_val = self.lower_expr(lhs);
        let rhs_val = self.lower_expr(rhs);
        let block = self.cur_block;

        let opcode = match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::Eq => Opcode::Eq,
            BinaryOp::Ne => Opcode::Ne,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Le => Opcode::Le,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Ge => Opcode::Ge,
            BinaryOp::And => Opcode::And,
            BinaryOp::Or => Opcode::Or,
            // Bitwise operators have no IR opcode yet.
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => return IrValue::Undef,
            BinaryOp::Assign => unreachable!("assignments handled by lower_assignment"),
        };

        if opcode.is_comparison() {
            self.fb().compare(block, opcode, lhs_val, rhs_val)
        } else {
            self.fb().binary(block, opcode, lhs_val, rhs_val)
        }
    }

    /// Store through a named slot or an actor/struct field pointer.
    fn lower_assignment(&mut self, lhs: ExprId, rhs: ExprId) -> IrValue {
        let rhs_val = self.lower_expr(rhs);

        let target = *self.arena.expr(lhs);
        match target.kind {
            ExprKind::Ident(name) => {
                if let Some((slot, _)) = self.lookup_local(name) {
                    let block = self.cur_block;
                    self.fb().store(block, rhs_val, slot);
                }
            }
            ExprKind::Field { object, field } => {
                if let Some(ptr) = self.lower_field_ptr(object, field) {
                    let block = self.cur_block;
                    self.fb().store(block, rhs_val, ptr);
                }
            }
            _ => {}
        }
        rhs_val
    }

    /// The semantic type of a field-access object, `self` included.
    fn object_type(&self, object: ExprId) -> Option<TypeId> {
        match self.arena.expr(object).kind {
            ExprKind::SelfRef => self.cur_actor,
            _ => Some(self.analysis.expr_type(object)),
        }
    }

    /// Address of `object.field`. For actors the state pointer sits behind
    /// the process handle at offset 0, so one extra load precedes the
    /// field offset.
    fn lower_field_ptr(&mut self, object: ExprId, field: Name) -> Option<IrValue> {
        let obj_val = self.lower_expr(object);
        let obj_ty = self.object_type(object)?;
        let pool = &self.analysis.pool;
        let resolved = pool.resolve(obj_ty);
        let index = pool.field_index(resolved, field)?;
        let is_actor = matches!(pool.kind(resolved), TypeKind::Actor { .. });

        let block = self.cur_block;
        let base = if is_actor {
            self.fb().load(block, IrType::Ptr, obj_val)
        } else {
            obj_val
        };
        Some(self.fb().field_ptr(block, base, index as i32))
    }

    fn lower_field_read(&mut self, object: ExprId, field: Name) -> IrValue {
        // Field content type, for the final load.
        let load_ty = self
            .object_type(object)
            .map(|obj_ty| {
                let pool = &self.analysis.pool;
                let resolved = pool.resolve(obj_ty);
                pool.field_index(resolved, field)
                    .map(|i| self.ir_type_of(pool.fields(resolved)[i].ty))
                    .unwrap_or(IrType::I32)
            })
            .unwrap_or(IrType::I32);

        match self.lower_field_ptr(object, field) {
            Some(ptr) => {
                let block = self.cur_block;
                self.fb().load(block, load_ty, ptr)
            }
            None => IrValue::Undef,
        }
    }

    /// `target ! msg` lowers to `arnm_send(target, tag, null, 0)`: the
    /// message value is the tag, no payload travels.
    fn lower_send(&mut self, target: ExprId, message: ExprId) -> IrValue {
        let target_val = self.lower_expr(target);
        let msg_val = self.lower_expr(message);
        let block = self.cur_block;
        let callee = self.runtime("arnm_send");
        self.fb().call(
            block,
            callee,
            vec![target_val, msg_val, IrValue::null_ptr(), IrValue::const_i64(0)],
            IrType::I32,
        );
        IrValue::Undef
    }

    fn lower_call(&mut self, expr_id: ExprId) -> IrValue {
        let ExprKind::Call { callee, args } = self.arena.expr(expr_id).kind else {
            unreachable!("lower_call on non-call");
        };

        let ExprKind::Ident(name) = self.arena.expr(callee).kind else {
            // Indirect calls (function values) are not lowered yet.
            return IrValue::Undef;
        };

        let arg_ids: Vec<ExprId> = self.arena.expr_list(args).to_vec();
        let mut arg_vals = Vec::with_capacity(arg_ids.len());
        for arg in arg_ids {
            arg_vals.push(self.lower_expr(arg));
        }

        // The print intrinsic maps straight onto the runtime ABI.
        let callee_name = if self.interner.lookup(name) == "print" {
            self.runtime("arnm_print_int")
        } else {
            name
        };

        let ret = self.ir_type_of(self.analysis.expr_type(expr_id));
        let block = self.cur_block;
        self.fb().call(block, callee_name, arg_vals, ret)
    }

    /// Lower `spawn f(args)` / `spawn Actor(args)` / `spawn Actor.m(args)`
    /// to `arnm_spawn(@entry, first_arg, state_size)`.
    pub(crate) fn lower_spawn(&mut self, expr_id: ExprId) -> IrValue {
        // Accept both the spawn expression itself and its inner call.
        let mut target = expr_id;
        loop {
            match self.arena.expr(target).kind {
                ExprKind::Spawn(inner) | ExprKind::Group(inner) => target = inner,
                _ => break,
            }
        }

        let ExprKind::Call { callee, args } = self.arena.expr(target).kind else {
            return IrValue::Undef;
        };

        let (entry, state_size) = match self.arena.expr(callee).kind {
            ExprKind::Ident(name) => match self.actor_of(name) {
                // `spawn Actor(...)` enters the constructor.
                Some(actor_ty) => (
                    self.mangled_init(name),
                    self.state_size_of(actor_ty),
                ),
                None => (name, 0),
            },
            // `spawn Actor.method(...)`.
            ExprKind::Field { object, field } => {
                let ExprKind::Ident(actor_name) = self.arena.expr(object).kind else {
                    return IrValue::Undef;
                };
                let entry = self.mangle_method(actor_name, field);
                let size = self
                    .actor_of(actor_name)
                    .map_or(0, |ty| self.state_size_of(ty));
                (entry, size)
            }
            _ => return IrValue::Undef,
        };

        let arg_ids = self.arena.expr_list(args).to_vec();
        let start_arg = match arg_ids.first() {
            Some(&first) => self.lower_expr(first),
            None => IrValue::null_ptr(),
        };

        let block = self.cur_block;
        let callee_name = self.runtime("arnm_spawn");
        self.fb().call(
            block,
            callee_name,
            vec![
                IrValue::global(entry, IrType::Ptr),
                start_arg,
                IrValue::const_i64(state_size as i64),
            ],
            IrType::Process,
        )
    }

    /// The actor type behind a global name, if it names an actor.
    fn actor_of(&self, name: Name) -> Option<TypeId> {
        let sym_id = self.analysis.symbols.lookup(name)?;
        let sym = self.analysis.symbols.symbol(sym_id);
        (sym.kind == SymbolKind::Actor).then_some(sym.ty)
    }

    fn state_size_of(&self, actor_ty: TypeId) -> u64 {
        let pool = &self.analysis.pool;
        pool.fields(pool.resolve(actor_ty)).len() as u64 * FIELD_SIZE
    }

    fn mangled_init(&self, actor: Name) -> Name {
        self.mangled(actor, "init")
    }
}

/// First content byte of a char literal lexeme (`'a'`, `'\n'`). Escapes
/// pass through uninterpreted, matching the lexer's contract.
fn char_lexeme_byte(lexeme: &str) -> u8 {
    let bytes = lexeme.as_bytes();
    match bytes {
        [b'\'', b'\\', escaped, ..] => *escaped,
        [b'\'', content, ..] => *content,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::char_lexeme_byte;

    #[test]
    fn char_bytes() {
        assert_eq!(char_lexeme_byte("'a'"), b'a');
        assert_eq!(char_lexeme_byte("'\\n'"), b'n');
        assert_eq!(char_lexeme_byte("''"), b'\'');
    }
}
