//! x86-64 assembly emitter (spill-everywhere).
//!
//! Every virtual register `N` maps to the stack slot `-(N+1)*8(%rbp)`.
//! Operands are loaded into `%rax`/`%rbx`, operated on, and stored back.
//! Calls follow the System V AMD64 ABI for the first six integer
//! arguments; results return in `%rax`.

use crate::extern_name;
use arnm_ir::StringInterner;
use arnm_ssa::{BlockId, Function, Instr, IrValue, Module, Opcode};
use std::fmt::Write as _;

const ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

fn operand(val: IrValue, interner: &StringInterner) -> String {
    match val {
        IrValue::Var { id, .. } => format!("-{}(%rbp)", (id + 1) * 8),
        IrValue::Const { bits, .. } => format!("${}", bits as i64),
        IrValue::Global { name, .. } => format!("${}", interner.lookup(name)),
        IrValue::Undef => "$0".to_owned(),
    }
}

/// Local label, mangled with the function name for uniqueness.
fn block_label(fn_name: &str, id: BlockId) -> String {
    format!(".L{}_BB_{}", fn_name, id.raw())
}

fn emit_prologue(out: &mut String, func: &Function, name: &str) {
    let _ = writeln!(out, "\t.globl {name}");
    let _ = writeln!(out, "\t.type {name}, @function");
    let _ = writeln!(out, "{name}:");
    out.push_str("\tpushq %rbp\n");
    out.push_str("\tmovq %rsp, %rbp\n");

    // One slot per virtual register plus headroom; keep 16-byte alignment.
    let mut stack_size = (func.vreg_count() as usize + 32) * 8;
    if stack_size % 16 != 0 {
        stack_size += 8;
    }
    let _ = writeln!(out, "\tsubq ${stack_size}, %rsp");

    // Spill incoming arguments into their value slots.
    for (i, reg) in ARG_REGS.iter().enumerate().take(func.params.len()) {
        let _ = writeln!(out, "\tmovq {reg}, -{}(%rbp)", (i + 1) * 8);
    }
}

fn emit_epilogue(out: &mut String) {
    out.push_str("\tmovq %rbp, %rsp\n");
    out.push_str("\tpopq %rbp\n");
    out.push_str("\tret\n");
}

fn emit_instr(out: &mut String, instr: &Instr, fn_name: &str, interner: &StringInterner) {
    let op1 = operand(instr.op1, interner);
    let op2 = operand(instr.op2, interner);
    let dest = instr
        .result
        .map(|r| operand(r, interner))
        .unwrap_or_default();

    match instr.op {
        Opcode::Mov => {
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            let _ = writeln!(out, "\tmovq %rax, {dest}");
        }

        Opcode::Alloca => {
            // Carve 16 bytes below the frame; the slot address is the value.
            out.push_str("\tsubq $16, %rsp\n");
            out.push_str("\tmovq %rsp, %rax\n");
            let _ = writeln!(out, "\tmovq %rax, {dest}");
        }

        Opcode::Load => {
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            out.push_str("\tmovq (%rax), %rbx\n");
            let _ = writeln!(out, "\tmovq %rbx, {dest}");
        }

        Opcode::Store => {
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            let _ = writeln!(out, "\tmovq {op2}, %rbx");
            out.push_str("\tmovq %rax, (%rbx)\n");
        }

        Opcode::FieldPtr => {
            let offset = match instr.op2 {
                IrValue::Const { bits, .. } => (bits as i64) * 8,
                _ => 0,
            };
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            if offset > 0 {
                let _ = writeln!(out, "\taddq ${offset}, %rax");
            }
            let _ = writeln!(out, "\tmovq %rax, {dest}");
        }

        Opcode::Add => emit_binary(out, "addq", &op1, &op2, &dest),
        Opcode::Sub => emit_binary(out, "subq", &op1, &op2, &dest),
        Opcode::Mul => emit_binary(out, "imulq", &op1, &op2, &dest),
        Opcode::And => emit_binary(out, "andq", &op1, &op2, &dest),
        Opcode::Or => emit_binary(out, "orq", &op1, &op2, &dest),

        Opcode::Div => {
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            out.push_str("\tcqo\n");
            let _ = writeln!(out, "\tmovq {op2}, %rbx");
            out.push_str("\tidivq %rbx\n");
            let _ = writeln!(out, "\tmovq %rax, {dest}");
        }

        Opcode::Mod => {
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            out.push_str("\tcqo\n");
            let _ = writeln!(out, "\tmovq {op2}, %rbx");
            out.push_str("\tidivq %rbx\n");
            // Remainder lands in %rdx.
            let _ = writeln!(out, "\tmovq %rdx, {dest}");
        }

        Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
            let set = match instr.op {
                Opcode::Eq => "sete",
                Opcode::Ne => "setne",
                Opcode::Lt => "setl",
                Opcode::Le => "setle",
                Opcode::Gt => "setg",
                Opcode::Ge => "setge",
                _ => unreachable!(),
            };
            let _ = writeln!(out, "\tmovq {op1}, %rax");
            let _ = writeln!(out, "\tcmpq {op2}, %rax");
            let _ = writeln!(out, "\t{set} %al");
            out.push_str("\tmovzbl %al, %eax\n");
            let _ = writeln!(out, "\tmovq %rax, {dest}");
        }

        Opcode::Jmp => {
            if let Some(target) = instr.target1 {
                let _ = writeln!(out, "\tjmp {}", block_label(fn_name, target));
            }
        }

        Opcode::Br => {
            if let (Some(then_bb), Some(else_bb)) = (instr.target1, instr.target2) {
                let _ = writeln!(out, "\tmovq {op1}, %rax");
                out.push_str("\tcmpq $0, %rax\n");
                let _ = writeln!(out, "\tje {}", block_label(fn_name, else_bb));
                let _ = writeln!(out, "\tjmp {}", block_label(fn_name, then_bb));
            }
        }

        Opcode::Ret => {
            if !instr.op1.is_undef() {
                let _ = writeln!(out, "\tmovq {op1}, %rax");
            }
            emit_epilogue(out);
        }

        Opcode::Call => {
            for (arg, reg) in instr.args.iter().zip(ARG_REGS.iter()) {
                let _ = writeln!(out, "\tmovq {}, {reg}", operand(*arg, interner));
            }
            match instr.op1 {
                IrValue::Global { name, .. } => {
                    let _ = writeln!(out, "\tcall {}", interner.lookup(name));
                }
                _ => {
                    // Indirect call through a value slot.
                    let _ = writeln!(out, "\tcall *{op1}");
                }
            }
            if !dest.is_empty() {
                let _ = writeln!(out, "\tmovq %rax, {dest}");
            }
        }

        // Actor ops reach the emitter only as calls.
        Opcode::Spawn | Opcode::Send | Opcode::Receive | Opcode::SelfRef => {
            out.push_str("\t# unlowered actor op\n");
        }
    }
}

fn emit_binary(out: &mut String, mnemonic: &str, op1: &str, op2: &str, dest: &str) {
    let _ = writeln!(out, "\tmovq {op1}, %rax");
    let _ = writeln!(out, "\t{mnemonic} {op2}, %rax");
    let _ = writeln!(out, "\tmovq %rax, {dest}");
}

fn emit_function(out: &mut String, func: &Function, interner: &StringInterner) {
    let name = extern_name(func, interner);
    emit_prologue(out, func, name);

    for (i, block) in func.blocks.iter().enumerate() {
        let id = BlockId::new(i as u32);
        let _ = writeln!(out, "{}:", block_label(name, id));
        for instr in &block.instrs {
            emit_instr(out, instr, name, interner);
        }
    }
    out.push('\n');
}

/// Render the module as GNU-syntax x86-64 assembly.
pub fn emit_x86_64(module: &Module, interner: &StringInterner) -> String {
    let mut out = String::new();
    out.push_str("\t.text\n");
    for func in &module.funcs {
        emit_function(&mut out, func, interner);
    }
    out.push_str("\t.section .note.GNU-stack,\"\",@progbits\n");
    out
}
