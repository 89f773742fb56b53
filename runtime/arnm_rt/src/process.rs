//! Process control blocks.

use crate::context::{context_init, Context, ProcessEntry};
use crate::mailbox::Mailbox;
use crate::memory::{stack_alloc, stack_free};
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicU8, Ordering};

/// Default per-process stack: 64 KiB.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Scheduling state of a process.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum ProcessState {
    Ready = 0,
    Running = 1,
    Waiting = 2,
    Dead = 3,
}

impl ProcessState {
    fn from_u8(raw: u8) -> ProcessState {
        match raw {
            0 => ProcessState::Ready,
            1 => ProcessState::Running,
            2 => ProcessState::Waiting,
            _ => ProcessState::Dead,
        }
    }
}

/// A lightweight process.
///
/// Layout contract with generated code: `actor_state` is the FIRST field;
/// `self.field` compiles to a load through the handle at offset 0.
///
/// Ownership: a process belongs to exactly one place at a time (a run
/// queue, the wait queue, a worker's current slot, or destruction). The
/// single `next` link is reused across queues because membership is
/// exclusive.
#[repr(C)]
pub struct Process {
    /// Actor state block, or null for plain functions. Must stay first.
    pub actor_state: *mut u8,
    /// Size of the actor state block in bytes.
    state_size: usize,
    pub pid: u64,
    state: AtomicU8,
    pub context: Context,
    stack_base: *mut u8,
    stack_size: usize,
    mailbox: *mut Mailbox,
    /// Intrusive queue link; owned by whichever queue holds the process.
    pub(crate) next: AtomicPtr<Process>,
    pub worker_id: u32,
    pub spawn_time: u64,
    pub run_count: u64,
}

static NEXT_PID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_PROCESS: Cell<*mut Process> = const { Cell::new(ptr::null_mut()) };
}

/// The process currently running on this worker thread, if any.
pub fn current() -> *mut Process {
    CURRENT_PROCESS.with(Cell::get)
}

pub(crate) fn set_current(proc: *mut Process) {
    CURRENT_PROCESS.with(|cell| cell.set(proc));
}

impl Process {
    /// Create a process with its own guard-paged stack, mailbox, and
    /// initialized context. Returns null on allocation failure.
    pub fn create(
        entry: ProcessEntry,
        arg: *mut c_void,
        stack_size: usize,
        state_size: usize,
    ) -> *mut Process {
        // Actor state block, zeroed, field slots of 8 bytes each.
        let actor_state = if state_size > 0 {
            let layout = match Layout::from_size_align(state_size, 8) {
                Ok(layout) => layout,
                Err(_) => return ptr::null_mut(),
            };
            // Safety: non-zero size.
            let block = unsafe { alloc_zeroed(layout) };
            if block.is_null() {
                handle_alloc_error(layout);
            }
            block
        } else {
            ptr::null_mut()
        };

        let stack_base = stack_alloc(stack_size);
        if stack_base.is_null() {
            free_state(actor_state, state_size);
            return ptr::null_mut();
        }

        let mailbox = Box::into_raw(Box::new(Mailbox::new()));

        let mut proc = Box::new(Process {
            actor_state,
            state_size,
            pid: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(ProcessState::Ready as u8),
            context: Context::default(),
            stack_base,
            stack_size,
            mailbox,
            next: AtomicPtr::new(ptr::null_mut()),
            worker_id: 0,
            spawn_time: 0,
            run_count: 0,
        });

        // Stack grows down from the top of the writable region.
        // Safety: base + size stays within the mapping.
        let stack_top = unsafe { stack_base.add(stack_size) };
        context_init(&mut proc.context, stack_top, entry, arg);

        let raw = Box::into_raw(proc);
        // Safety: raw was just created; the mailbox lives until destroy.
        unsafe {
            (*mailbox).set_owner(raw);
        }
        tracing::debug!(pid = unsafe { (*raw).pid }, "process created");
        raw
    }

    /// Tear down a dead process: mailbox, actor state, stack, and the
    /// control block itself.
    ///
    /// # Safety
    /// `proc` must have come from [`Process::create`], be owned by the
    /// caller, and never be used again.
    pub unsafe fn destroy(proc: *mut Process) {
        if proc.is_null() {
            return;
        }
        let boxed = Box::from_raw(proc);
        tracing::debug!(pid = boxed.pid, "process destroyed");
        if !boxed.mailbox.is_null() {
            drop(Box::from_raw(boxed.mailbox));
        }
        free_state(boxed.actor_state, boxed.state_size);
        if !boxed.stack_base.is_null() {
            stack_free(boxed.stack_base, boxed.stack_size);
        }
    }

    pub fn state(&self) -> ProcessState {
        ProcessState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ProcessState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn mailbox(&self) -> &Mailbox {
        // Safety: the mailbox outlives the process; senders reach it only
        // through a live process handle.
        unsafe { &*self.mailbox }
    }
}

fn free_state(state: *mut u8, size: usize) {
    if state.is_null() || size == 0 {
        return;
    }
    if let Ok(layout) = Layout::from_size_align(size, 8) {
        // Safety: matches the allocation in Process::create.
        unsafe {
            dealloc(state, layout);
        }
    }
}
