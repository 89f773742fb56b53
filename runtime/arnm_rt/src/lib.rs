//! ARNm runtime library (`libarnm_rt`).
//!
//! Userspace actor runtime for compiled ARNm programs: lightweight
//! processes with their own guard-paged stacks, an M:N work-stealing
//! scheduler, lock-free MPSC mailboxes, and atomically reference-counted
//! heap objects.
//!
//! # Build modes
//!
//! - **rlib**: Rust consumers (tests, the compiler's own tooling)
//! - **staticlib**: linked against generated code (`libarnm_rt.a`)
//!
//! # C ABI
//!
//! Generated code calls the `arnm_*` entry points declared at the bottom
//! of this file; they use `#[no_mangle] extern "C"` and raw pointers.
//! Pointers handed in by generated code are trusted, as with any runtime
//! ABI.
//!
//! # Safety
//!
//! This is the one crate in the workspace that allows `unsafe`: the
//! context switch, process stacks, and the C ABI cannot be expressed
//! without it. Safe Rust wrappers sit immediately above each unsafe core.

pub mod context;
pub mod mailbox;
pub mod memory;
pub mod process;
pub mod scheduler;
pub mod sync;

use crate::context::ProcessEntry;
use crate::mailbox::{Message, OverflowPolicy};
use crate::process::{Process, ProcessState, DEFAULT_STACK_SIZE};
use std::ffi::c_void;
use std::ptr;

// ── Runtime lifecycle ───────────────────────────────────────────────────

/// Initialize the runtime with `num_workers` OS threads (0 = one per
/// online CPU). Returns 0 on success, -1 if already initialized.
#[no_mangle]
pub extern "C" fn arnm_init(num_workers: i32) -> i32 {
    let requested = if num_workers > 0 { num_workers as u32 } else { 0 };
    match scheduler::init(requested) {
        Ok(()) => 0,
        Err(()) => -1,
    }
}

/// Drive the scheduler until every process has exited. Blocks.
#[no_mangle]
pub extern "C" fn arnm_run() {
    if let Some(sched) = scheduler::get() {
        sched.run();
    }
}

/// Tear the runtime down, destroying any processes still queued.
#[no_mangle]
pub extern "C" fn arnm_shutdown() {
    scheduler::shutdown();
}

// ── Process API ─────────────────────────────────────────────────────────

/// Create a process with the given entry, a default 64 KiB stack, and an
/// optional zeroed actor state block of `state_size` bytes. Returns the
/// process handle, or null on failure.
#[no_mangle]
pub extern "C" fn arnm_spawn(
    entry: ProcessEntry,
    arg: *mut c_void,
    state_size: usize,
) -> *mut Process {
    let Some(sched) = scheduler::get() else {
        return ptr::null_mut();
    };
    let proc = Process::create(entry, arg, DEFAULT_STACK_SIZE, state_size);
    if !proc.is_null() {
        sched.enqueue(proc);
    }
    proc
}

/// Handle of the currently running process, or null outside one.
#[no_mangle]
pub extern "C" fn arnm_self() -> *mut Process {
    process::current()
}

/// PID of a process handle (0 for null).
#[no_mangle]
pub extern "C" fn arnm_pid(proc: *mut Process) -> u64 {
    if proc.is_null() {
        return 0;
    }
    // Safety: live handle from arnm_spawn.
    unsafe { (*proc).pid }
}

/// Cooperative yield.
#[no_mangle]
pub extern "C" fn arnm_yield() {
    scheduler::yield_current();
}

/// Terminate the current process. Does not return when called from a
/// process context.
#[no_mangle]
pub extern "C" fn arnm_exit() {
    let proc = process::current();
    if !proc.is_null() {
        // Safety: this thread is the process.
        unsafe {
            (*proc).set_state(ProcessState::Dead);
        }
        scheduler::yield_current();
    }
}

// ── Message passing ─────────────────────────────────────────────────────

/// Send a message to `target`. `size > 0` copies the payload; `size == 0`
/// sends `data` as an opaque value. Returns 0 on success.
#[no_mangle]
pub extern "C" fn arnm_send(
    target: *mut Process,
    tag: u64,
    data: *mut c_void,
    size: usize,
) -> i32 {
    if target.is_null() {
        return -1;
    }
    // Safety: a sender holds a live process handle; the mailbox outlives
    // every sender by the runtime's ownership rules.
    let mbox = unsafe { (*target).mailbox() };

    // Bounded mailboxes apply their overflow policy; unbounded never block.
    while mbox.is_full() {
        match mbox.policy() {
            OverflowPolicy::Drop => return 0,
            OverflowPolicy::Panic => {
                eprintln!("[arnm] panic: mailbox overflow");
                std::process::abort();
            }
            OverflowPolicy::Block => {
                if process::current().is_null() {
                    std::thread::yield_now();
                } else {
                    scheduler::yield_current();
                }
            }
        }
    }

    if mbox.send(tag, data.cast(), size).is_err() {
        return -1;
    }

    // Wake the owner if it is parked on the empty mailbox.
    if let Some(sched) = scheduler::get() {
        let owner = mbox.owner();
        if !owner.is_null() {
            // Safety: owner handle stays valid while its mailbox exists.
            if unsafe { (*owner).state() } == ProcessState::Waiting {
                sched.wake(owner);
            }
        }
    }
    0
}

/// Block until a message arrives. The returned message is consumer-owned
/// and must be released with [`arnm_message_free`]. Returns null when
/// called outside a process.
#[no_mangle]
pub extern "C" fn arnm_receive(_reserved: *mut c_void) -> *mut Message {
    let proc = process::current();
    if proc.is_null() {
        return ptr::null_mut();
    }

    loop {
        // Safety: the current process is the single consumer.
        if let Some(msg) = unsafe { (*proc).mailbox().try_recv() } {
            return msg.into_raw();
        }
        // Mark waiting and let the worker park us once the context is
        // saved; a send (or the park-time mailbox recheck) wakes us.
        // Safety: this thread is the process.
        unsafe {
            (*proc).set_state(ProcessState::Waiting);
        }
        scheduler::yield_current();
    }
}

/// Non-blocking receive. Null when the mailbox is empty or there is no
/// current process.
#[no_mangle]
pub extern "C" fn arnm_try_receive() -> *mut Message {
    let proc = process::current();
    if proc.is_null() {
        return ptr::null_mut();
    }
    // Safety: the current process is the single consumer.
    match unsafe { (*proc).mailbox().try_recv() } {
        Some(msg) => msg.into_raw(),
        None => ptr::null_mut(),
    }
}

/// Release a received message and its payload.
#[no_mangle]
pub extern "C" fn arnm_message_free(msg: *mut Message) {
    // Safety: consumer-owned message from arnm_receive/arnm_try_receive.
    unsafe {
        Message::free(msg);
    }
}

#[no_mangle]
pub extern "C" fn arnm_message_tag(msg: *mut Message) -> u64 {
    if msg.is_null() {
        return 0;
    }
    // Safety: live message.
    unsafe { (*msg).tag }
}

#[no_mangle]
pub extern "C" fn arnm_message_data(msg: *mut Message) -> *mut c_void {
    if msg.is_null() {
        return ptr::null_mut();
    }
    // Safety: live message.
    unsafe { (*msg).data.cast() }
}

#[no_mangle]
pub extern "C" fn arnm_message_size(msg: *mut Message) -> usize {
    if msg.is_null() {
        return 0;
    }
    // Safety: live message.
    unsafe { (*msg).size }
}

/// Runtime abort for a receive block whose arms matched nothing.
#[no_mangle]
pub extern "C" fn arnm_panic_nomatch() -> ! {
    eprintln!("[arnm] panic: unmatched message in receive block");
    std::process::abort();
}

/// Debug print for the `print` intrinsic.
#[no_mangle]
pub extern "C" fn arnm_print_int(value: i32) {
    println!("{value}");
}

// ── ARC memory API ──────────────────────────────────────────────────────

#[no_mangle]
pub extern "C" fn arnm_alloc(size: usize, dtor: Option<memory::Destructor>) -> *mut c_void {
    memory::arc_alloc(size, dtor)
}

#[no_mangle]
pub extern "C" fn arnm_retain(obj: *mut c_void) {
    memory::arc_retain(obj);
}

#[no_mangle]
pub extern "C" fn arnm_release(obj: *mut c_void) {
    memory::arc_release(obj);
}

#[no_mangle]
pub extern "C" fn arnm_refcount(obj: *mut c_void) -> u32 {
    memory::arc_refcount(obj)
}

// ── Entry shim (crt0) ───────────────────────────────────────────────────

/// C `main` for fully linked ARNm programs: initialize the runtime, spawn
/// the generated `_arnm_main` as the first process, run the scheduler to
/// completion, shut down.
#[cfg(feature = "crt0")]
mod crt0 {
    use super::*;
    use std::ffi::{c_char, c_int};

    extern "C" {
        fn _arnm_main();
    }

    unsafe extern "C" fn main_wrapper(_arg: *mut c_void) {
        _arnm_main();
    }

    #[no_mangle]
    pub extern "C" fn main(_argc: c_int, _argv: *mut *mut c_char) -> c_int {
        if arnm_init(0) != 0 {
            eprintln!("[arnm] failed to initialize runtime");
            return 1;
        }
        if arnm_spawn(main_wrapper, ptr::null_mut(), 0).is_null() {
            eprintln!("[arnm] failed to spawn main process");
            return 1;
        }
        arnm_run();
        arnm_shutdown();
        0
    }
}
