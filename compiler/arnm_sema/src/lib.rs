//! Semantic analysis: two passes over the parsed program.
//!
//! Pass 1 forward-declares every top-level name in the global scope with a
//! placeholder type and injects the intrinsics. Pass 2 checks declarations:
//! Hindley-Milner inference over expressions, rule enforcement for
//! statements, and actor method hoisting under mangled `Actor_method`
//! names.
//!
//! Failures are reported and analysis continues; the `Error` type absorbs
//! follow-on unifications so one mistake produces one diagnostic.

mod check;
mod infer;

use arnm_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use arnm_ir::ast::{DeclKind, Program};
use arnm_ir::{AstArena, ExprId, Name, SharedInterner, Span};
use arnm_types::{SymbolKind, SymbolTable, TypeId, TypePool};
use tracing::debug_span;

/// Result of analyzing one program.
pub struct Analysis {
    pub pool: TypePool,
    pub symbols: SymbolTable,
    /// Resolved type per expression, indexed by `ExprId`.
    expr_types: Vec<TypeId>,
    pub diagnostics: DiagnosticQueue,
}

impl Analysis {
    pub fn had_error(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Type of an expression after analysis.
    pub fn expr_type(&self, id: ExprId) -> TypeId {
        self.expr_types
            .get(id.index())
            .copied()
            .unwrap_or(TypeId::UNKNOWN)
    }
}

/// Analyze a parsed program.
pub fn analyze(program: &Program, arena: &AstArena, interner: SharedInterner) -> Analysis {
    let mut analyzer = Analyzer::new(arena, interner);
    analyzer.run(program);
    Analysis {
        pool: analyzer.pool,
        symbols: analyzer.symbols,
        expr_types: analyzer.expr_types,
        diagnostics: analyzer.diagnostics,
    }
}

pub(crate) struct Analyzer<'a> {
    pub(crate) arena: &'a AstArena,
    pub(crate) interner: SharedInterner,
    pub(crate) pool: TypePool,
    pub(crate) symbols: SymbolTable,
    pub(crate) diagnostics: DiagnosticQueue,
    pub(crate) expr_types: Vec<TypeId>,

    /// Expected return type of the function being checked.
    pub(crate) current_return: Option<TypeId>,
    pub(crate) in_loop: bool,
    pub(crate) in_actor: bool,
    pub(crate) cur_actor: Option<TypeId>,
}

impl<'a> Analyzer<'a> {
    fn new(arena: &'a AstArena, interner: SharedInterner) -> Self {
        let symbols = SymbolTable::new(interner.clone());
        Analyzer {
            arena,
            interner,
            pool: TypePool::new(),
            symbols,
            diagnostics: DiagnosticQueue::new(),
            expr_types: vec![TypeId::UNKNOWN; arena.expr_count()],
            current_return: None,
            in_loop: false,
            in_actor: false,
            cur_actor: None,
        }
    }

    pub(crate) fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::new(code, message, span));
    }

    fn run(&mut self, program: &Program) {
        self.inject_intrinsics();

        {
            let _span = debug_span!("sema_forward_declare").entered();
            self.forward_declare(program);
        }

        let _span = debug_span!("sema_check").entered();
        for &decl_id in self.arena.decl_list(program.decls) {
            let decl = self.arena.decl(decl_id);
            match decl.kind {
                DeclKind::Fn(fn_id) => self.check_function(fn_id, None),
                DeclKind::Actor(actor) => self.check_actor(&actor),
                DeclKind::Struct(decl) => self.check_struct(&decl),
            }
        }
    }

    /// Runtime-provided names, defined before any user declaration. A user
    /// declaration of the same name collides and is reported, keeping call
    /// lowering unambiguous.
    fn inject_intrinsics(&mut self) {
        let print = self.interner.intern("print");
        let print_ty = self.pool.fn_type(vec![TypeId::I32], TypeId::UNIT);
        self.symbols
            .define(print, SymbolKind::Fn, print_ty, Span::DUMMY);
    }

    /// Pass 1: register every top-level name. Actors and structs get their
    /// nominal type immediately (fields arrive in pass 2) so references
    /// ahead of the declaration resolve; functions get a placeholder
    /// variable that pass 2 publishes the real signature through.
    fn forward_declare(&mut self, program: &Program) {
        for &decl_id in self.arena.decl_list(program.decls) {
            let decl = self.arena.decl(decl_id);
            let (name, kind, ty) = match decl.kind {
                DeclKind::Fn(fn_id) => {
                    let f = self.arena.fn_decl(fn_id);
                    let placeholder = self.pool.fresh_var();
                    (f.name, SymbolKind::Fn, placeholder)
                }
                DeclKind::Actor(actor) => {
                    let ty = self.pool.actor(actor.name);
                    (actor.name, SymbolKind::Actor, ty)
                }
                DeclKind::Struct(s) => {
                    let ty = self.pool.struct_type(s.name);
                    (s.name, SymbolKind::Type, ty)
                }
            };

            match self.symbols.define(name, kind, ty, decl.span) {
                Some(id) => self.symbols.symbol_mut(id).is_defined = false,
                None => {
                    let text = self.interner.lookup(name);
                    self.error(
                        ErrorCode::DuplicateDefinition,
                        format!("duplicate definition of '{text}'"),
                        decl.span,
                    );
                }
            }
        }
    }

    /// Mangled global name for an actor method: `Actor_method`.
    pub(crate) fn mangle_method(&self, actor: Name, method: Name) -> Name {
        let actor = self.interner.lookup(actor);
        let method = self.interner.lookup(method);
        self.interner.intern(&format!("{actor}_{method}"))
    }

    /// Record a resolved expression type.
    pub(crate) fn record(&mut self, id: ExprId, ty: TypeId) -> TypeId {
        if let Some(slot) = self.expr_types.get_mut(id.index()) {
            *slot = ty;
        }
        ty
    }

    /// Cached type for an already-inferred expression.
    pub(crate) fn cached(&self, id: ExprId) -> Option<TypeId> {
        match self.expr_types.get(id.index()) {
            Some(&ty) if ty != TypeId::UNKNOWN => Some(ty),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
