//! Lowering: typed AST → SSA IR.
//!
//! A structural walk of the analyzed program. Every `let` and parameter
//! gets a stack slot (`Alloca` + `Store`); reads `Load` and writes `Store`
//! through the slot. Control flow lowers to the standard block shapes;
//! actor constructs lower to calls into the runtime ABI (`arnm_spawn`,
//! `arnm_send`, `arnm_receive`, `arnm_self`, `arnm_panic_nomatch`).
//!
//! Contract: the program has been analyzed. Lowering panics on contract
//! violations (no current function/block); those are compiler bugs, not
//! user errors.

mod expr;
mod receive;
mod stmt;

pub use receive::pattern_tag;

use arnm_ir::ast::{DeclKind, Program};
use arnm_ir::{AstArena, BlockId as AstBlockId, FnId, Name, SharedInterner};
use arnm_sema::Analysis;
use arnm_ssa::{BlockId, Function, FunctionBuilder, IrType, IrValue, Module};
use arnm_types::{TypeId, TypeKind};
use tracing::debug_span;

/// Field slots are 8 bytes wide; actor state is `8 * field_count` bytes.
pub const FIELD_SIZE: u64 = 8;

/// Lower an analyzed program to an IR module.
pub fn lower(
    program: &Program,
    arena: &AstArena,
    analysis: &Analysis,
    interner: SharedInterner,
) -> Module {
    let _span = debug_span!("lower").entered();
    let mut lowerer = Lowerer {
        arena,
        analysis,
        interner,
        module: Module::new(),
        func: None,
        cur_block: BlockId::new(0),
        cur_actor: None,
        break_target: None,
        continue_target: None,
        locals: Vec::new(),
    };

    for &decl_id in arena.decl_list(program.decls) {
        match arena.decl(decl_id).kind {
            DeclKind::Fn(fn_id) => lowerer.lower_function(fn_id, None, None),
            DeclKind::Actor(actor) => lowerer.lower_actor(&actor),
            // Structs carry no code.
            DeclKind::Struct(_) => {}
        }
    }

    lowerer.module
}

/// A named stack slot in the current function.
pub(crate) struct Local {
    pub(crate) name: Name,
    /// Address of the slot (an `Alloca` result).
    pub(crate) slot: IrValue,
    /// Type of the slot's contents.
    pub(crate) ty: IrType,
}

pub(crate) struct Lowerer<'a> {
    pub(crate) arena: &'a AstArena,
    pub(crate) analysis: &'a Analysis,
    pub(crate) interner: SharedInterner,
    pub(crate) module: Module,

    /// Function under construction.
    func: Option<Function>,
    pub(crate) cur_block: BlockId,
    pub(crate) cur_actor: Option<TypeId>,
    pub(crate) break_target: Option<BlockId>,
    pub(crate) continue_target: Option<BlockId>,
    /// Flat locals environment; block scoping via high-water marks.
    pub(crate) locals: Vec<Local>,
}

impl Lowerer<'_> {
    // ── Contract accessors ───────────────────────────────────────────────

    pub(crate) fn func_mut(&mut self) -> &mut Function {
        match self.func.as_mut() {
            Some(func) => func,
            None => panic!("lowering outside a function"),
        }
    }

    pub(crate) fn fb(&mut self) -> FunctionBuilder<'_> {
        FunctionBuilder::new(match self.func.as_mut() {
            Some(func) => func,
            None => panic!("lowering outside a function"),
        })
    }

    pub(crate) fn is_terminated(&self) -> bool {
        match self.func.as_ref() {
            Some(func) => func.block(self.cur_block).is_terminated(),
            None => panic!("lowering outside a function"),
        }
    }

    // ── Locals ───────────────────────────────────────────────────────────

    pub(crate) fn add_local(&mut self, name: Name, slot: IrValue, ty: IrType) {
        self.locals.push(Local { name, slot, ty });
    }

    /// Newest binding wins: shadowed names resolve to the innermost slot.
    pub(crate) fn lookup_local(&self, name: Name) -> Option<(IrValue, IrType)> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| (local.slot, local.ty))
    }

    // ── Type mapping ─────────────────────────────────────────────────────

    /// Map a semantic type to its IR representation.
    pub(crate) fn ir_type_of(&self, ty: TypeId) -> IrType {
        let pool = &self.analysis.pool;
        match pool.kind(pool.resolve(ty)) {
            TypeKind::Unit => IrType::Void,
            TypeKind::Bool => IrType::Bool,
            TypeKind::I32 => IrType::I32,
            TypeKind::I64 => IrType::I64,
            TypeKind::F32 | TypeKind::F64 => IrType::F64,
            TypeKind::Char => IrType::I8,
            TypeKind::Process => IrType::Process,
            TypeKind::String
            | TypeKind::Actor { .. }
            | TypeKind::Struct { .. }
            | TypeKind::Array(_)
            | TypeKind::Optional(_)
            | TypeKind::Fn { .. } => IrType::Ptr,
            // Unconstrained or errored values fall back to i32.
            TypeKind::Var { .. } | TypeKind::Unknown | TypeKind::Error => IrType::I32,
        }
    }

    /// IR type for a value slot: void-typed values occupy an i32 slot so a
    /// unit-returning call can still be stored and discarded.
    pub(crate) fn slot_type_of(&self, ty: TypeId) -> IrType {
        match self.ir_type_of(ty) {
            IrType::Void => IrType::I32,
            other => other,
        }
    }

    // ── Functions ────────────────────────────────────────────────────────

    /// Signature of a published function symbol, as IR types.
    fn signature_of(&self, name: Name) -> (Vec<IrType>, IrType) {
        let pool = &self.analysis.pool;
        if let Some(sym_id) = self.analysis.symbols.lookup(name) {
            let ty = pool.resolve(self.analysis.symbols.symbol(sym_id).ty);
            if let TypeKind::Fn { params, ret } = pool.kind(ty) {
                let params = params.iter().map(|&p| self.ir_type_of(p)).collect();
                let ret = self.ir_type_of(*ret);
                return (params, ret);
            }
        }
        (Vec::new(), IrType::Void)
    }

    /// Lower one function. `override_name` renames hoisted actor methods;
    /// `chain_call` appends a call before the synthesized return (used to
    /// enter an actor's behavior loop from its `init`).
    pub(crate) fn lower_function(
        &mut self,
        fn_id: FnId,
        override_name: Option<Name>,
        chain_call: Option<Name>,
    ) {
        let decl = *self.arena.fn_decl(fn_id);
        let name = override_name.unwrap_or(decl.name);
        let _span = debug_span!("lower_function", name = self.interner.lookup(name)).entered();

        let (mut param_types, ret) = self.signature_of(name);
        let param_count = self.arena.params(decl.params).len();
        // Unpublished signatures (analysis errors) still lower with i32
        // parameters so the walk can proceed.
        if param_types.len() != param_count {
            param_types = vec![IrType::I32; param_count];
        }

        let mut func = Function::new(name, ret, param_types.clone());
        let entry = func.add_block(Some("entry"));
        self.func = Some(func);
        self.cur_block = entry;
        self.locals.clear();

        // Spill parameters into addressable slots.
        let params: Vec<_> = self.arena.params(decl.params).to_vec();
        for (i, param) in params.iter().enumerate() {
            let ty = param_types[i];
            let arg = self.func_mut().param_value(i);
            let slot = {
                let mut b = self.fb();
                let slot = b.alloca(entry, ty);
                b.store(entry, arg, slot);
                slot
            };
            self.add_local(param.name, slot, ty);
        }

        self.lower_block(decl.body);

        // Synthesize the epilogue on fall-through paths.
        if !self.is_terminated() {
            let block = self.cur_block;
            if let Some(chain) = chain_call {
                let mut b = self.fb();
                b.call(block, chain, Vec::new(), IrType::Void);
            }
            self.fb().ret_void(block);
        }

        self.locals.clear();
        let func = match self.func.take() {
            Some(func) => func,
            None => unreachable!("function vanished during lowering"),
        };
        self.module.push(func);
    }

    /// Lower an actor: a synthesized behavior loop for its receive block,
    /// then each method hoisted under `Actor_method`.
    fn lower_actor(&mut self, actor: &arnm_ir::ActorDecl) {
        let actor_type = self
            .analysis
            .symbols
            .lookup(actor.name)
            .map(|id| self.analysis.symbols.symbol(id).ty);
        self.cur_actor = actor_type;

        // The behavior function runs the receive block forever. Generated
        // first so `init` can chain into it.
        let behavior_name = if let Some(arms) = actor.receive_arms {
            let name = self.mangled(actor.name, "behavior");
            let mut func = Function::new(name, IrType::Void, Vec::new());
            let entry = func.add_block(Some("entry"));
            let body = func.add_block(Some("loop"));
            self.func = Some(func);
            self.cur_block = entry;
            self.locals.clear();

            self.fb().jmp(entry, body);
            self.cur_block = body;
            self.lower_receive(arms);
            // Back to the top; the loop never returns.
            let tail = self.cur_block;
            self.fb().jmp(tail, body);

            self.locals.clear();
            if let Some(func) = self.func.take() {
                self.module.push(func);
            }
            Some(name)
        } else {
            None
        };

        let init_name = self.interner.intern("init");
        let method_ids: Vec<FnId> = self.arena.fn_ids(actor.methods).collect();
        for method_id in method_ids {
            let method = self.arena.fn_decl(method_id);
            let mangled = self.mangle_method(actor.name, method.name);
            let chain = if method.name == init_name {
                behavior_name
            } else {
                None
            };
            self.lower_function(method_id, Some(mangled), chain);
        }

        self.cur_actor = None;
    }

    pub(crate) fn mangle_method(&self, actor: Name, method: Name) -> Name {
        let actor = self.interner.lookup(actor);
        let method = self.interner.lookup(method);
        self.interner.intern(&format!("{actor}_{method}"))
    }

    pub(crate) fn mangled(&self, actor: Name, suffix: &str) -> Name {
        let actor = self.interner.lookup(actor);
        self.interner.intern(&format!("{actor}_{suffix}"))
    }

    /// Lower a block's statements with local-scope high-water marking.
    /// Statements after a terminator are unreachable and dropped.
    pub(crate) fn lower_block(&mut self, block: AstBlockId) {
        let mark = self.locals.len();
        let stmts = self.arena.block(block).stmts;
        for &stmt in self.arena.stmt_list(stmts) {
            if self.is_terminated() {
                break;
            }
            self.lower_stmt(stmt);
        }
        self.locals.truncate(mark);
    }

    /// Intern a runtime ABI symbol.
    pub(crate) fn runtime(&self, symbol: &str) -> Name {
        self.interner.intern(symbol)
    }
}

#[cfg(test)]
mod tests;
