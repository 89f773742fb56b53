//! Text rendering of the IR, for `--emit-ir` and tests.

use crate::{BlockId, Function, Instr, IrValue, Module, Opcode};
use arnm_ir::StringInterner;
use std::fmt::Write as _;

impl Module {
    /// Render the module in the reference notation.
    pub fn dump(&self, interner: &StringInterner) -> String {
        let mut out = String::new();
        for func in &self.funcs {
            func.dump_into(&mut out, interner);
            out.push('\n');
        }
        out
    }
}

impl Function {
    fn dump_into(&self, out: &mut String, interner: &StringInterner) {
        let _ = write!(out, "func @{}(", interner.lookup(self.name));
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "%{i}: {param}");
        }
        let _ = writeln!(out, ") -> {} {{", self.ret);

        for (i, block) in self.blocks.iter().enumerate() {
            let _ = writeln!(out, "{}:", self.block_name(BlockId::new(i as u32)));
            for instr in &block.instrs {
                out.push_str("  ");
                dump_instr(out, instr, self, interner);
                out.push('\n');
            }
        }

        out.push_str("}\n");
    }
}

fn value(out: &mut String, val: IrValue, interner: &StringInterner) {
    match val {
        IrValue::Var { id, .. } => {
            let _ = write!(out, "%{id}");
        }
        IrValue::Const { bits, ty } => {
            let _ = write!(out, "{} {}", ty, bits as i64);
        }
        IrValue::Global { name, .. } => {
            let _ = write!(out, "@{}", interner.lookup(name));
        }
        IrValue::Undef => out.push_str("undef"),
    }
}

fn target(out: &mut String, func: &Function, id: Option<BlockId>) {
    match id {
        Some(id) => {
            let _ = write!(out, "%{}", func.block_name(id));
        }
        None => out.push_str("%?"),
    }
}

fn dump_instr(out: &mut String, instr: &Instr, func: &Function, interner: &StringInterner) {
    if let Some(result) = instr.result {
        value(out, result, interner);
        out.push_str(" = ");
    }
    let _ = write!(out, "{}", instr.op.mnemonic());

    match instr.op {
        Opcode::Alloca => {
            let _ = write!(out, " {}", instr.op1.ty());
        }
        Opcode::Ret => {
            if !instr.op1.is_undef() {
                out.push(' ');
                value(out, instr.op1, interner);
            }
        }
        Opcode::Br => {
            out.push(' ');
            value(out, instr.op1, interner);
            out.push_str(", ");
            target(out, func, instr.target1);
            out.push_str(", ");
            target(out, func, instr.target2);
        }
        Opcode::Jmp => {
            out.push(' ');
            target(out, func, instr.target1);
        }
        Opcode::Call => {
            out.push(' ');
            value(out, instr.op1, interner);
            out.push('(');
            for (i, &arg) in instr.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                value(out, arg, interner);
            }
            out.push(')');
        }
        _ => {
            if !instr.op1.is_undef() {
                out.push(' ');
                value(out, instr.op1, interner);
            }
            if !instr.op2.is_undef() {
                out.push_str(", ");
                value(out, instr.op2, interner);
            }
        }
    }
}
