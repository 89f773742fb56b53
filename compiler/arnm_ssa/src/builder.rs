//! Instruction builders.
//!
//! Thin helpers that allocate the result register, fill in the operand
//! record, and append to a block.

use crate::{BlockId, Function, Instr, IrType, IrValue, Opcode};
use arnm_ir::Name;

/// Builds instructions into one function.
pub struct FunctionBuilder<'f> {
    func: &'f mut Function,
}

impl<'f> FunctionBuilder<'f> {
    pub fn new(func: &'f mut Function) -> Self {
        FunctionBuilder { func }
    }

    pub fn func(&self) -> &Function {
        self.func
    }

    pub fn add_block(&mut self, label: Option<&str>) -> BlockId {
        self.func.add_block(label)
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.func.block(block).is_terminated()
    }

    fn push(&mut self, block: BlockId, instr: Instr) {
        self.func.block_mut(block).instrs.push(instr);
    }

    /// Reserve a stack slot of `ty`; the result is its address.
    pub fn alloca(&mut self, block: BlockId, ty: IrType) -> IrValue {
        let result = self.func.fresh_value(IrType::Ptr);
        let mut instr = Instr::new(Opcode::Alloca);
        instr.ty = IrType::Ptr;
        instr.result = Some(result);
        // The allocated type travels in op1's type slot.
        instr.op1 = IrValue::Const { bits: 0, ty };
        self.push(block, instr);
        result
    }

    pub fn load(&mut self, block: BlockId, ty: IrType, ptr: IrValue) -> IrValue {
        let result = self.func.fresh_value(ty);
        let mut instr = Instr::new(Opcode::Load);
        instr.ty = ty;
        instr.result = Some(result);
        instr.op1 = ptr;
        self.push(block, instr);
        result
    }

    pub fn store(&mut self, block: BlockId, value: IrValue, ptr: IrValue) {
        let mut instr = Instr::new(Opcode::Store);
        instr.op1 = value;
        instr.op2 = ptr;
        self.push(block, instr);
    }

    /// `base + index * 8`; every field slot is 8 bytes wide.
    pub fn field_ptr(&mut self, block: BlockId, base: IrValue, index: i32) -> IrValue {
        let result = self.func.fresh_value(IrType::Ptr);
        let mut instr = Instr::new(Opcode::FieldPtr);
        instr.ty = IrType::Ptr;
        instr.result = Some(result);
        instr.op1 = base;
        instr.op2 = IrValue::const_i32(index);
        self.push(block, instr);
        result
    }

    /// Arithmetic and logical binaries; the result takes the lhs type.
    pub fn binary(
        &mut self,
        block: BlockId,
        op: Opcode,
        lhs: IrValue,
        rhs: IrValue,
    ) -> IrValue {
        debug_assert!(op.is_arithmetic() || matches!(op, Opcode::And | Opcode::Or));
        let ty = lhs.ty();
        let result = self.func.fresh_value(ty);
        let mut instr = Instr::new(op);
        instr.ty = ty;
        instr.result = Some(result);
        instr.op1 = lhs;
        instr.op2 = rhs;
        self.push(block, instr);
        result
    }

    /// Signed comparison; the result is a bool.
    pub fn compare(
        &mut self,
        block: BlockId,
        op: Opcode,
        lhs: IrValue,
        rhs: IrValue,
    ) -> IrValue {
        debug_assert!(op.is_comparison());
        let result = self.func.fresh_value(IrType::Bool);
        let mut instr = Instr::new(op);
        instr.ty = IrType::Bool;
        instr.result = Some(result);
        instr.op1 = lhs;
        instr.op2 = rhs;
        self.push(block, instr);
        result
    }

    pub fn ret(&mut self, block: BlockId, value: IrValue) {
        let mut instr = Instr::new(Opcode::Ret);
        instr.op1 = value;
        self.push(block, instr);
    }

    pub fn ret_void(&mut self, block: BlockId) {
        self.push(block, Instr::new(Opcode::Ret));
    }

    pub fn br(&mut self, block: BlockId, cond: IrValue, then_bb: BlockId, else_bb: BlockId) {
        let mut instr = Instr::new(Opcode::Br);
        instr.op1 = cond;
        instr.target1 = Some(then_bb);
        instr.target2 = Some(else_bb);
        self.push(block, instr);
    }

    pub fn jmp(&mut self, block: BlockId, dest: BlockId) {
        let mut instr = Instr::new(Opcode::Jmp);
        instr.target1 = Some(dest);
        self.push(block, instr);
    }

    /// Call a global symbol. Produces a result register unless the return
    /// type is void.
    pub fn call(
        &mut self,
        block: BlockId,
        callee: Name,
        args: Vec<IrValue>,
        ret: IrType,
    ) -> IrValue {
        let result = if ret == IrType::Void {
            None
        } else {
            Some(self.func.fresh_value(ret))
        };
        let mut instr = Instr::new(Opcode::Call);
        instr.ty = ret;
        instr.result = result;
        instr.op1 = IrValue::global(callee, IrType::Ptr);
        instr.args = args;
        self.push(block, instr);
        result.unwrap_or(IrValue::Undef)
    }

    pub fn mov(&mut self, block: BlockId, value: IrValue) -> IrValue {
        let ty = value.ty();
        let result = self.func.fresh_value(ty);
        let mut instr = Instr::new(Opcode::Mov);
        instr.ty = ty;
        instr.result = Some(result);
        instr.op1 = value;
        self.push(block, instr);
        result
    }
}
