//! LLVM text emitter (the reference backend).

use crate::extern_name;
use arnm_ir::StringInterner;
use arnm_ssa::{Function, Instr, IrType, IrValue, Module, Opcode};
use std::fmt::Write as _;

fn llvm_type(ty: IrType) -> &'static str {
    match ty {
        IrType::Void => "void",
        IrType::Bool => "i1",
        IrType::I8 => "i8",
        IrType::I32 => "i32",
        IrType::I64 => "i64",
        IrType::F64 => "double",
        IrType::Ptr | IrType::Process => "ptr",
        IrType::Bad => "void",
    }
}

fn value(out: &mut String, val: IrValue, interner: &StringInterner) {
    match val {
        IrValue::Var { id, .. } => {
            let _ = write!(out, "%v{id}");
        }
        IrValue::Const { bits, ty } => match ty {
            IrType::F64 => {
                let _ = write!(out, "{:e}", f64::from_bits(bits));
            }
            IrType::Ptr | IrType::Process if bits == 0 => out.push_str("null"),
            _ => {
                let _ = write!(out, "{}", bits as i64);
            }
        },
        IrValue::Global { name, .. } => {
            let _ = write!(out, "@{}", interner.lookup(name));
        }
        IrValue::Undef => out.push_str("undef"),
    }
}

fn typed_value(out: &mut String, val: IrValue, interner: &StringInterner) {
    let _ = write!(out, "{} ", llvm_type(val.ty()));
    value(out, val, interner);
}

fn label(out: &mut String, func: &Function, target: Option<arnm_ssa::BlockId>) {
    match target {
        Some(id) => {
            let _ = write!(out, "label %{}", func.block_name(id));
        }
        None => out.push_str("label %bad"),
    }
}

fn emit_instr(out: &mut String, instr: &Instr, func: &Function, interner: &StringInterner) {
    out.push_str("  ");
    match instr.op {
        Opcode::Alloca => {
            if let Some(result) = instr.result {
                value(out, result, interner);
                let _ = write!(out, " = alloca {}", llvm_type(instr.op1.ty()));
            }
        }

        Opcode::Load => {
            if let Some(result) = instr.result {
                value(out, result, interner);
                let _ = write!(out, " = load {}, ptr ", llvm_type(instr.ty));
                value(out, instr.op1, interner);
            }
        }

        Opcode::Store => {
            out.push_str("store ");
            typed_value(out, instr.op1, interner);
            out.push_str(", ptr ");
            value(out, instr.op2, interner);
        }

        Opcode::FieldPtr => {
            // Field slots are 8 bytes: index as an i64 element offset.
            if let Some(result) = instr.result {
                value(out, result, interner);
                out.push_str(" = getelementptr i64, ptr ");
                value(out, instr.op1, interner);
                out.push_str(", i64 ");
                value(out, instr.op2, interner);
            }
        }

        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
            if let Some(result) = instr.result {
                let mnemonic = match instr.op {
                    Opcode::Add => "add",
                    Opcode::Sub => "sub",
                    Opcode::Mul => "mul",
                    Opcode::Div => "sdiv",
                    Opcode::Mod => "srem",
                    _ => unreachable!(),
                };
                value(out, result, interner);
                let _ = write!(out, " = {mnemonic} {} ", llvm_type(instr.ty));
                value(out, instr.op1, interner);
                out.push_str(", ");
                value(out, instr.op2, interner);
            }
        }

        Opcode::And | Opcode::Or => {
            if let Some(result) = instr.result {
                let mnemonic = if instr.op == Opcode::And { "and" } else { "or" };
                value(out, result, interner);
                let _ = write!(out, " = {mnemonic} {} ", llvm_type(instr.ty));
                value(out, instr.op1, interner);
                out.push_str(", ");
                value(out, instr.op2, interner);
            }
        }

        Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
            if let Some(result) = instr.result {
                let cond = match instr.op {
                    Opcode::Eq => "eq",
                    Opcode::Ne => "ne",
                    Opcode::Lt => "slt",
                    Opcode::Le => "sle",
                    Opcode::Gt => "sgt",
                    Opcode::Ge => "sge",
                    _ => unreachable!(),
                };
                value(out, result, interner);
                let _ = write!(out, " = icmp {cond} {} ", llvm_type(instr.op1.ty()));
                value(out, instr.op1, interner);
                out.push_str(", ");
                value(out, instr.op2, interner);
            }
        }

        Opcode::Ret => {
            if instr.op1.is_undef() {
                out.push_str("ret void");
            } else {
                out.push_str("ret ");
                typed_value(out, instr.op1, interner);
            }
        }

        Opcode::Br => {
            out.push_str("br ");
            typed_value(out, instr.op1, interner);
            out.push_str(", ");
            label(out, func, instr.target1);
            out.push_str(", ");
            label(out, func, instr.target2);
        }

        Opcode::Jmp => {
            out.push_str("br ");
            label(out, func, instr.target1);
        }

        Opcode::Call => {
            if let Some(result) = instr.result {
                value(out, result, interner);
                out.push_str(" = ");
            }
            let _ = write!(out, "call {} ", llvm_type(instr.ty));
            value(out, instr.op1, interner);
            out.push('(');
            for (i, &arg) in instr.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                typed_value(out, arg, interner);
            }
            out.push(')');
        }

        Opcode::Mov => {
            // LLVM has no register move; copy through an add of zero.
            if let Some(result) = instr.result {
                value(out, result, interner);
                let _ = write!(out, " = add {} 0, ", llvm_type(instr.ty));
                value(out, instr.op1, interner);
            }
        }

        // Actor ops reach the emitter only as calls.
        Opcode::Spawn | Opcode::Send | Opcode::Receive | Opcode::SelfRef => {
            out.push_str("; unlowered actor op");
        }
    }
    out.push('\n');
}

fn emit_function(out: &mut String, func: &Function, interner: &StringInterner) {
    let _ = write!(
        out,
        "define {} @{}(",
        llvm_type(func.ret),
        extern_name(func, interner)
    );
    for (i, &param) in func.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} %v{i}", llvm_type(param));
    }
    out.push_str(") {\n");

    for (i, block) in func.blocks.iter().enumerate() {
        let id = arnm_ssa::BlockId::new(i as u32);
        let _ = writeln!(out, "{}:", func.block_name(id));
        for instr in &block.instrs {
            emit_instr(out, instr, func, interner);
        }
    }

    out.push_str("}\n\n");
}

/// Render the module as LLVM textual IR.
pub fn emit_llvm(module: &Module, interner: &StringInterner) -> String {
    let mut out = String::new();
    out.push_str("; Generated by the ARNm compiler\n");
    out.push_str("target datalayout = \"e-m:e-i64:64-f80:128-n8:16:32:64-S128\"\n");
    out.push_str("target triple = \"x86_64-pc-linux-gnu\"\n\n");

    // Runtime ABI consumed by generated code.
    out.push_str("declare ptr @arnm_spawn(ptr, ptr, i64)\n");
    out.push_str("declare ptr @arnm_self()\n");
    out.push_str("declare void @arnm_yield()\n");
    out.push_str("declare void @arnm_exit()\n");
    out.push_str("declare i32 @arnm_send(ptr, i64, ptr, i64)\n");
    out.push_str("declare ptr @arnm_receive(ptr)\n");
    out.push_str("declare ptr @arnm_try_receive()\n");
    out.push_str("declare void @arnm_message_free(ptr)\n");
    out.push_str("declare void @arnm_print_int(i32)\n");
    out.push_str("declare void @arnm_panic_nomatch()\n\n");

    for func in &module.funcs {
        emit_function(&mut out, func, interner);
    }
    out
}
