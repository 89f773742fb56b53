//! Cooperative context switching.
//!
//! The switch primitive saves the callee-saved registers and stack pointer
//! of the current execution into `from`, restores them from `to`, and
//! resumes at `to`'s saved instruction address. Caller-saved registers are
//! the caller's problem, exactly as with any C call.
//!
//! [`context_init`] lays down a synthetic first activation: the initial
//! switch into the context lands in an assembly shim that calls
//! `entry(arg)` and, should the entry ever return, falls into the process
//! exit trampoline, which marks the process dead and yields to the
//! scheduler for good.

use core::arch::global_asm;
use std::ffi::c_void;

/// Entry point signature for a spawned process.
pub type ProcessEntry = unsafe extern "C" fn(*mut c_void);

/// Saved CPU state: callee-saved registers plus stack pointer and resume
/// address, per the platform ABI.
#[cfg(target_arch = "x86_64")]
#[repr(C)]
#[derive(Default)]
pub struct Context {
    rsp: u64,
    rbp: u64,
    rbx: u64,
    r12: u64,
    r13: u64,
    r14: u64,
    r15: u64,
    rip: u64,
}

#[cfg(target_arch = "aarch64")]
#[repr(C)]
#[derive(Default)]
pub struct Context {
    sp: u64,
    x19: u64,
    x20: u64,
    x21: u64,
    x22: u64,
    x23: u64,
    x24: u64,
    x25: u64,
    x26: u64,
    x27: u64,
    x28: u64,
    x29: u64,
    /// Link register: resume address.
    x30: u64,
}

extern "C" {
    /// Save the current execution into `from`, resume `to`.
    ///
    /// Returns (into the *from* context) only when something later
    /// switches back to it.
    pub fn arnm_context_switch(from: *mut Context, to: *const Context);
}

// x86-64, System V: callee-saves are rbx, rbp, r12-r15. The return address
// sits at (%rsp); popping it into the saved rip makes the eventual resume
// an indirect jump equivalent to `ret`.
#[cfg(target_arch = "x86_64")]
global_asm!(
    r#"
    .text
    .globl arnm_context_switch
    .type arnm_context_switch, @function
arnm_context_switch:
    movq (%rsp), %rax
    movq %rax, 56(%rdi)
    leaq 8(%rsp), %rax
    movq %rax, 0(%rdi)
    movq %rbp, 8(%rdi)
    movq %rbx, 16(%rdi)
    movq %r12, 24(%rdi)
    movq %r13, 32(%rdi)
    movq %r14, 40(%rdi)
    movq %r15, 48(%rdi)

    movq 8(%rsi), %rbp
    movq 16(%rsi), %rbx
    movq 24(%rsi), %r12
    movq 32(%rsi), %r13
    movq 40(%rsi), %r14
    movq 48(%rsi), %r15
    movq 0(%rsi), %rsp
    jmpq *56(%rsi)

    .globl arnm_context_entry
    .type arnm_context_entry, @function
arnm_context_entry:
    movq %r13, %rdi
    callq *%r12
    callq arnm_process_exit_trampoline
"#,
    options(att_syntax)
);

// AArch64, AAPCS64: callee-saves are x19-x28, frame pointer x29, link
// register x30. The switch returns through the restored x30.
#[cfg(target_arch = "aarch64")]
global_asm!(
    r#"
    .text
    .globl arnm_context_switch
    .type arnm_context_switch, @function
arnm_context_switch:
    mov x9, sp
    str x9, [x0]
    stp x19, x20, [x0, #8]
    stp x21, x22, [x0, #24]
    stp x23, x24, [x0, #40]
    stp x25, x26, [x0, #56]
    stp x27, x28, [x0, #72]
    stp x29, x30, [x0, #88]

    ldr x9, [x1]
    mov sp, x9
    ldp x19, x20, [x1, #8]
    ldp x21, x22, [x1, #24]
    ldp x23, x24, [x1, #40]
    ldp x25, x26, [x1, #56]
    ldp x27, x28, [x1, #72]
    ldp x29, x30, [x1, #88]
    ret

    .globl arnm_context_entry
    .type arnm_context_entry, @function
arnm_context_entry:
    mov x0, x20
    blr x19
    bl arnm_process_exit_trampoline
"#
);

extern "C" {
    fn arnm_context_entry();
}

/// Prepare `ctx` so the first switch into it executes `entry(arg)` on the
/// given stack, with the exit trampoline underneath.
pub fn context_init(ctx: &mut Context, stack_top: *mut u8, entry: ProcessEntry, arg: *mut c_void) {
    // The entry shim is jumped to (not called), so the stack pointer must
    // be 16-byte aligned on arrival.
    let top = (stack_top as usize) & !0xF;

    #[cfg(target_arch = "x86_64")]
    {
        *ctx = Context {
            rsp: top as u64,
            rip: arnm_context_entry as usize as u64,
            r12: entry as usize as u64,
            r13: arg as usize as u64,
            ..Context::default()
        };
    }

    #[cfg(target_arch = "aarch64")]
    {
        *ctx = Context {
            sp: top as u64,
            x30: arnm_context_entry as usize as u64,
            x19: entry as usize as u64,
            x20: arg as usize as u64,
            ..Context::default()
        };
    }
}
