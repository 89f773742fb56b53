//! Arena storage for the flat AST.
//!
//! All nodes of a compilation unit live in one `AstArena`; dropping the
//! arena frees the whole tree. Child links are typed indices, list-valued
//! fields are ranges into side vectors.

use crate::ast::{
    ActorField, Block, Decl, Expr, FnDecl, Param, ReceiveArm, Stmt, TypeAnn,
};
use crate::{
    ArmId, ArmRange, BlockId, DeclId, DeclRange, ExprId, ExprRange, FieldId, FieldRange, FnId,
    FnRange, ParamId, ParamRange, StmtId, StmtRange, TypeAnnId,
};
use std::fmt;

/// Contiguous storage for every AST node of a compilation unit.
#[derive(Default)]
pub struct AstArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    blocks: Vec<Block>,
    decls: Vec<Decl>,
    fns: Vec<FnDecl>,
    params: Vec<Param>,
    actor_fields: Vec<ActorField>,
    arms: Vec<ReceiveArm>,
    type_anns: Vec<TypeAnn>,

    /// Flattened expression lists (call arguments).
    expr_lists: Vec<ExprId>,
    /// Flattened statement lists (block bodies).
    stmt_lists: Vec<StmtId>,
    /// Flattened declaration lists (program roots).
    decl_lists: Vec<DeclId>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with capacity estimated from source size.
    /// Heuristic: roughly one expression per 20 bytes of source.
    pub fn with_capacity(source_len: usize) -> Self {
        let estimated = source_len / 20;
        AstArena {
            exprs: Vec::with_capacity(estimated),
            stmts: Vec::with_capacity(estimated / 4),
            blocks: Vec::with_capacity(estimated / 8),
            expr_lists: Vec::with_capacity(estimated / 2),
            stmt_lists: Vec::with_capacity(estimated / 4),
            ..Self::default()
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    #[inline]
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn alloc_expr_list(&mut self, exprs: impl IntoIterator<Item = ExprId>) -> ExprRange {
        let start = self.expr_lists.len() as u32;
        self.expr_lists.extend(exprs);
        let len = (self.expr_lists.len() as u32 - start) as u16;
        ExprRange::new(start, len)
    }

    #[inline]
    pub fn expr_list(&self, range: ExprRange) -> &[ExprId] {
        &self.expr_lists[range.start as usize..range.start as usize + range.len()]
    }

    // ── Statements ───────────────────────────────────────────────────────

    #[inline]
    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn alloc_stmt_list(&mut self, stmts: impl IntoIterator<Item = StmtId>) -> StmtRange {
        let start = self.stmt_lists.len() as u32;
        self.stmt_lists.extend(stmts);
        let len = (self.stmt_lists.len() as u32 - start) as u16;
        StmtRange::new(start, len)
    }

    #[inline]
    pub fn stmt_list(&self, range: StmtRange) -> &[StmtId] {
        &self.stmt_lists[range.start as usize..range.start as usize + range.len()]
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    #[inline]
    pub fn alloc_block(&mut self, block: Block) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    // ── Declarations ─────────────────────────────────────────────────────

    #[inline]
    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::new(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn alloc_decl_list(&mut self, decls: impl IntoIterator<Item = DeclId>) -> DeclRange {
        let start = self.decl_lists.len() as u32;
        self.decl_lists.extend(decls);
        let len = (self.decl_lists.len() as u32 - start) as u16;
        DeclRange::new(start, len)
    }

    #[inline]
    pub fn decl_list(&self, range: DeclRange) -> &[DeclId] {
        &self.decl_lists[range.start as usize..range.start as usize + range.len()]
    }

    // ── Functions ────────────────────────────────────────────────────────

    #[inline]
    pub fn alloc_fn(&mut self, decl: FnDecl) -> FnId {
        let id = FnId::new(self.fns.len() as u32);
        self.fns.push(decl);
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn fn_decl(&self, id: FnId) -> &FnDecl {
        &self.fns[id.index()]
    }

    /// Range covering `count` functions ending at the current high mark.
    /// Methods of one actor are allocated contiguously, so the range is
    /// recovered from the final store length.
    pub fn fn_range_from(&self, first: FnId) -> FnRange {
        let len = (self.fns.len() - first.index()) as u16;
        FnRange::new(first.raw(), len)
    }

    pub fn fn_ids(&self, range: FnRange) -> impl Iterator<Item = FnId> + '_ {
        (range.start..range.start + u32::from(range.len)).map(FnId::new)
    }

    #[inline]
    pub fn next_fn_id(&self) -> FnId {
        FnId::new(self.fns.len() as u32)
    }

    // ── Parameters ───────────────────────────────────────────────────────

    pub fn alloc_params(&mut self, params: impl IntoIterator<Item = Param>) -> ParamRange {
        let start = self.params.len() as u32;
        self.params.extend(params);
        let len = (self.params.len() as u32 - start) as u16;
        ParamRange::new(start, len)
    }

    #[inline]
    pub fn params(&self, range: ParamRange) -> &[Param] {
        &self.params[range.start as usize..range.start as usize + range.len()]
    }

    #[inline]
    pub fn param(&self, id: ParamId) -> &Param {
        &self.params[id.index()]
    }

    // ── Actor fields ─────────────────────────────────────────────────────

    pub fn alloc_actor_fields(
        &mut self,
        fields: impl IntoIterator<Item = ActorField>,
    ) -> FieldRange {
        let start = self.actor_fields.len() as u32;
        self.actor_fields.extend(fields);
        let len = (self.actor_fields.len() as u32 - start) as u16;
        FieldRange::new(start, len)
    }

    #[inline]
    pub fn actor_fields(&self, range: FieldRange) -> &[ActorField] {
        &self.actor_fields[range.start as usize..range.start as usize + range.len()]
    }

    #[inline]
    pub fn actor_field(&self, id: FieldId) -> &ActorField {
        &self.actor_fields[id.index()]
    }

    // ── Receive arms ─────────────────────────────────────────────────────

    pub fn alloc_arms(&mut self, arms: impl IntoIterator<Item = ReceiveArm>) -> ArmRange {
        let start = self.arms.len() as u32;
        self.arms.extend(arms);
        let len = (self.arms.len() as u32 - start) as u16;
        ArmRange::new(start, len)
    }

    #[inline]
    pub fn arms(&self, range: ArmRange) -> &[ReceiveArm] {
        &self.arms[range.start as usize..range.start as usize + range.len()]
    }

    #[inline]
    pub fn arm(&self, id: ArmId) -> &ReceiveArm {
        &self.arms[id.index()]
    }

    // ── Type annotations ─────────────────────────────────────────────────

    #[inline]
    pub fn alloc_type_ann(&mut self, ann: TypeAnn) -> TypeAnnId {
        let id = TypeAnnId::new(self.type_anns.len() as u32);
        self.type_anns.push(ann);
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn type_ann(&self, id: TypeAnnId) -> &TypeAnn {
        &self.type_anns[id.index()]
    }
}

impl fmt::Debug for AstArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AstArena {{ {} exprs, {} stmts, {} blocks, {} decls }}",
            self.exprs.len(),
            self.stmts.len(),
            self.blocks.len(),
            self.decls.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, StmtKind};
    use crate::Span;

    #[test]
    fn alloc_and_get_expr() {
        let mut arena = AstArena::new();
        let one = arena.alloc_expr(Expr::new(ExprKind::Int(1), Span::DUMMY));
        let two = arena.alloc_expr(Expr::new(ExprKind::Int(2), Span::DUMMY));

        assert_eq!(one.index(), 0);
        assert_eq!(two.index(), 1);
        assert!(matches!(arena.expr(one).kind, ExprKind::Int(1)));
        assert!(matches!(arena.expr(two).kind, ExprKind::Int(2)));
    }

    #[test]
    fn expr_lists_round_trip() {
        let mut arena = AstArena::new();
        let ids: Vec<ExprId> = (0..3)
            .map(|i| arena.alloc_expr(Expr::new(ExprKind::Int(i), Span::DUMMY)))
            .collect();
        let range = arena.alloc_expr_list(ids.clone());
        assert_eq!(arena.expr_list(range), ids.as_slice());
    }

    #[test]
    fn stmt_lists_tolerate_interleaved_allocation() {
        let mut arena = AstArena::new();
        // Nested blocks allocate statements out of order; only the list
        // store must stay contiguous.
        let inner = arena.alloc_stmt(Stmt::new(StmtKind::Break, Span::DUMMY));
        let outer = arena.alloc_stmt(Stmt::new(StmtKind::Continue, Span::DUMMY));
        let range = arena.alloc_stmt_list([outer, inner]);
        assert_eq!(arena.stmt_list(range), &[outer, inner]);
    }

    #[test]
    fn fn_range_recovers_methods() {
        let mut arena = AstArena::new();
        let first = arena.next_fn_id();
        let body = arena.alloc_block(Block {
            stmts: StmtRange::EMPTY,
            span: Span::DUMMY,
        });
        for _ in 0..2 {
            arena.alloc_fn(FnDecl {
                name: crate::Name::EMPTY,
                params: ParamRange::EMPTY,
                return_type: None,
                body,
                span: Span::DUMMY,
            });
        }
        let range = arena.fn_range_from(first);
        assert_eq!(range.len(), 2);
        let ids: Vec<FnId> = arena.fn_ids(range).collect();
        assert_eq!(ids, vec![FnId::new(0), FnId::new(1)]);
    }
}
