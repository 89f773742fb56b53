//! Statement lowering.

use crate::Lowerer;
use arnm_ir::ast::StmtKind;
use arnm_ir::StmtId;
use arnm_ssa::{IrType, IrValue};

impl Lowerer<'_> {
    pub(crate) fn lower_stmt(&mut self, stmt_id: StmtId) {
        let stmt = *self.arena.stmt(stmt_id);
        match stmt.kind {
            StmtKind::Let { name, init, .. } => {
                let (init_val, ty) = match init {
                    Some(init) => {
                        let val = self.lower_expr(init);
                        let ty = self.slot_type_of(self.analysis.expr_type(init));
                        (val, ty)
                    }
                    None => (IrValue::const_i32(0), IrType::I32),
                };
                let block = self.cur_block;
                let slot = {
                    let mut b = self.fb();
                    let slot = b.alloca(block, ty);
                    b.store(block, init_val, slot);
                    slot
                };
                self.add_local(name, slot, ty);
            }

            StmtKind::Expr(expr) => {
                self.lower_expr(expr);
            }

            StmtKind::Return(value) => match value {
                Some(expr) => {
                    let val = self.lower_expr(expr);
                    let block = self.cur_block;
                    self.fb().ret(block, val);
                }
                None => {
                    let block = self.cur_block;
                    self.fb().ret_void(block);
                }
            },

            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                let cond_val = self.lower_expr(cond);
                let entry = self.cur_block;

                let then_bb = self.fb().add_block(Some("then"));
                let merge_bb = self.fb().add_block(Some("merge"));
                let else_bb = else_branch.map(|_| self.fb().add_block(Some("else")));

                // False path goes to the else block when present, straight
                // to the merge otherwise.
                self.fb()
                    .br(entry, cond_val, then_bb, else_bb.unwrap_or(merge_bb));

                self.cur_block = then_bb;
                self.lower_block(then_block);
                if !self.is_terminated() {
                    let block = self.cur_block;
                    self.fb().jmp(block, merge_bb);
                }

                if let (Some(else_bb), Some(else_stmt)) = (else_bb, else_branch) {
                    self.cur_block = else_bb;
                    self.lower_stmt(else_stmt);
                    if !self.is_terminated() {
                        let block = self.cur_block;
                        self.fb().jmp(block, merge_bb);
                    }
                }

                self.cur_block = merge_bb;
            }

            StmtKind::While { cond, body } => {
                let entry = self.cur_block;
                let cond_bb = self.fb().add_block(Some("while.cond"));
                let body_bb = self.fb().add_block(Some("while.body"));
                let exit_bb = self.fb().add_block(Some("while.exit"));

                let saved_break = self.break_target.replace(exit_bb);
                let saved_continue = self.continue_target.replace(cond_bb);

                self.fb().jmp(entry, cond_bb);

                self.cur_block = cond_bb;
                let cond_val = self.lower_expr(cond);
                let cond_end = self.cur_block;
                self.fb().br(cond_end, cond_val, body_bb, exit_bb);

                self.cur_block = body_bb;
                self.lower_block(body);
                if !self.is_terminated() {
                    let block = self.cur_block;
                    self.fb().jmp(block, cond_bb);
                }

                self.break_target = saved_break;
                self.continue_target = saved_continue;
                self.cur_block = exit_bb;
            }

            StmtKind::Loop { body } => {
                let entry = self.cur_block;
                let body_bb = self.fb().add_block(Some("loop.body"));
                let end_bb = self.fb().add_block(Some("loop.end"));

                let saved_break = self.break_target.replace(end_bb);
                let saved_continue = self.continue_target.replace(body_bb);

                self.fb().jmp(entry, body_bb);

                self.cur_block = body_bb;
                self.lower_block(body);
                if !self.is_terminated() {
                    let block = self.cur_block;
                    self.fb().jmp(block, body_bb);
                }

                self.break_target = saved_break;
                self.continue_target = saved_continue;
                self.cur_block = end_bb;
            }

            StmtKind::For { .. } => {
                // Array iteration needs a runtime array representation;
                // analysis accepts it, lowering does not yet.
                tracing::warn!("for loops are not lowered yet");
            }

            StmtKind::Break => {
                if let Some(target) = self.break_target {
                    let block = self.cur_block;
                    self.fb().jmp(block, target);
                }
            }

            StmtKind::Continue => {
                if let Some(target) = self.continue_target {
                    let block = self.cur_block;
                    self.fb().jmp(block, target);
                }
            }

            StmtKind::Spawn(expr) => {
                self.lower_spawn(expr);
            }

            StmtKind::Receive { arms } => {
                self.lower_receive(arms);
            }

            StmtKind::Block(block) => self.lower_block(block),

            StmtKind::Error => {}
        }
    }
}
