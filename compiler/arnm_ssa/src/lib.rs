//! SSA intermediate representation.
//!
//! A module holds functions; a function holds basic blocks addressed by
//! [`BlockId`]; a block holds a straight-line instruction vector ending in
//! one terminator. Values are single-assignment virtual registers with
//! dense per-function ids, the first `params.len()` of which are the
//! function parameters.
//!
//! Dropping a [`Module`] frees every function, block, instruction, and
//! call-argument vector transitively.

mod builder;
mod dump;
mod instr;
mod value;

pub use builder::FunctionBuilder;
pub use instr::{Instr, Opcode};
pub use value::{IrType, IrValue};

use arnm_ir::Name;

/// Handle to a basic block within its function.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        BlockId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A basic block: optional debug label plus its instructions.
#[derive(Debug, Default)]
pub struct Block {
    pub label: Option<String>,
    pub instrs: Vec<Instr>,
}

impl Block {
    /// A block is terminated once its last instruction is `Ret`, `Br`,
    /// or `Jmp`.
    pub fn is_terminated(&self) -> bool {
        self.instrs
            .last()
            .is_some_and(|instr| instr.op.is_terminator())
    }
}

/// One IR function.
#[derive(Debug)]
pub struct Function {
    pub name: Name,
    pub ret: IrType,
    pub params: Vec<IrType>,
    pub blocks: Vec<Block>,
    /// Next virtual register id; ids `0..params.len()` are the parameters.
    next_vreg: u32,
}

impl Function {
    pub fn new(name: Name, ret: IrType, params: Vec<IrType>) -> Self {
        let next_vreg = params.len() as u32;
        Function {
            name,
            ret,
            params,
            blocks: Vec::new(),
            next_vreg,
        }
    }

    /// The value of parameter `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn param_value(&self, i: usize) -> IrValue {
        IrValue::Var {
            id: i as u32,
            ty: self.params[i],
        }
    }

    /// Allocate a fresh virtual register.
    pub fn fresh_value(&mut self, ty: IrType) -> IrValue {
        let id = self.next_vreg;
        self.next_vreg += 1;
        IrValue::Var { id, ty }
    }

    /// Number of virtual registers allocated so far.
    pub fn vreg_count(&self) -> u32 {
        self.next_vreg
    }

    pub fn add_block(&mut self, label: Option<&str>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            label: label.map(String::from),
            instrs: Vec::new(),
        });
        id
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Printable block name: `label.N` when labeled, `bN` otherwise. The id
    /// suffix keeps repeated labels (`then`, `merge`, ...) unique within
    /// the function.
    pub fn block_name(&self, id: BlockId) -> String {
        match &self.block(id).label {
            Some(label) => format!("{label}{}", id.raw()),
            None => format!("b{}", id.raw()),
        }
    }
}

/// A compiled module: the function list.
#[derive(Debug, Default)]
pub struct Module {
    pub funcs: Vec<Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, func: Function) {
        self.funcs.push(func);
    }

    pub fn find(&self, name: Name) -> Option<&Function> {
        self.funcs.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arnm_ir::SharedInterner;

    #[test]
    fn params_take_first_vreg_ids() {
        let interner = SharedInterner::new();
        let mut func = Function::new(
            interner.intern("add"),
            IrType::I32,
            vec![IrType::I32, IrType::I32],
        );
        assert_eq!(func.param_value(0), IrValue::Var { id: 0, ty: IrType::I32 });
        assert_eq!(func.param_value(1), IrValue::Var { id: 1, ty: IrType::I32 });
        let v = func.fresh_value(IrType::Bool);
        assert_eq!(v, IrValue::Var { id: 2, ty: IrType::Bool });
    }

    #[test]
    fn block_termination() {
        let interner = SharedInterner::new();
        let mut func = Function::new(interner.intern("f"), IrType::Void, vec![]);
        let entry = func.add_block(Some("entry"));
        assert!(!func.block(entry).is_terminated());

        let mut builder = FunctionBuilder::new(&mut func);
        builder.ret_void(entry);
        assert!(func.block(entry).is_terminated());
    }
}
