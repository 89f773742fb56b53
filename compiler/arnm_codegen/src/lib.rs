//! Code emitters: render IR to LLVM text or x86-64 assembly.
//!
//! Both emitters consume the IR without mutating it. The LLVM emitter is
//! the reference; the x86-64 emitter takes the spill-everywhere approach
//! (every virtual register gets a stack slot, `%rax`/`%rbx` do the work).
//!
//! Either way, the IR function named `main` is emitted as `_arnm_main`;
//! the runtime owns the program entry point and calls `_arnm_main` through
//! its spawn shim.

mod llvm;
mod x86_64;

pub use llvm::emit_llvm;
pub use x86_64::emit_x86_64;

use arnm_ir::StringInterner;
use arnm_ssa::Function;

/// External symbol name for a function: `main` becomes `_arnm_main`.
pub(crate) fn extern_name(func: &Function, interner: &StringInterner) -> &'static str {
    let name = interner.lookup(func.name);
    if name == "main" {
        "_arnm_main"
    } else {
        name
    }
}

#[cfg(test)]
mod tests;
