//! M:N scheduler: OS worker threads multiplexing lightweight processes.
//!
//! Each worker owns a spinlocked local run queue; a global run queue feeds
//! processes spawned off-worker; a global wait queue holds processes
//! parked on an empty mailbox. Idle workers steal from their neighbours.
//!
//! There is no preemption: a process runs until it yields (explicitly, in
//! `receive`, or by exiting). Queue locks are short-duration and never
//! held across a context switch.

use crate::context::{arnm_context_switch, Context};
use crate::process::{self, Process, ProcessState};
use parking_lot::Mutex;
use std::cell::Cell;
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on worker threads.
pub const MAX_WORKERS: u32 = 64;

/// Nap length when a worker finds no runnable process.
const IDLE_NAP: Duration = Duration::from_micros(100);

/// Idle naps between advisory deadlock checks.
const DEADLOCK_CHECK_INTERVAL: u32 = 1000;

// ── Intrusive process queues ────────────────────────────────────────────

struct QueueLinks {
    head: *mut Process,
    tail: *mut Process,
}

// The raw pointers are guarded by the queue's lock.
unsafe impl Send for QueueLinks {}

/// FIFO of processes, guarded by a short-duration spinlock.
pub struct ProcessQueue {
    links: Mutex<QueueLinks>,
    count: AtomicUsize,
}

impl ProcessQueue {
    fn new() -> Self {
        ProcessQueue {
            links: Mutex::new(QueueLinks {
                head: ptr::null_mut(),
                tail: ptr::null_mut(),
            }),
            count: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, proc: *mut Process) {
        let mut links = self.links.lock();
        // Safety: the queue exclusively owns enqueued processes.
        unsafe {
            (*proc).next.store(ptr::null_mut(), Ordering::Relaxed);
            if links.tail.is_null() {
                links.head = proc;
            } else {
                (*links.tail).next.store(proc, Ordering::Relaxed);
            }
        }
        links.tail = proc;
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn pop(&self) -> *mut Process {
        let mut links = self.links.lock();
        let proc = links.head;
        if proc.is_null() {
            return ptr::null_mut();
        }
        // Safety: head is owned by the queue while linked.
        unsafe {
            links.head = (*proc).next.load(Ordering::Relaxed);
            if links.head.is_null() {
                links.tail = ptr::null_mut();
            }
            (*proc).next.store(ptr::null_mut(), Ordering::Relaxed);
        }
        self.count.fetch_sub(1, Ordering::SeqCst);
        proc
    }

    /// Unlink a specific process (wait-queue wakeups). Linear scan.
    fn remove(&self, target: *mut Process) -> bool {
        let mut links = self.links.lock();
        let mut prev: *mut Process = ptr::null_mut();
        let mut cursor = links.head;
        // Safety: every linked node is queue-owned.
        unsafe {
            while !cursor.is_null() {
                if cursor == target {
                    let next = (*cursor).next.load(Ordering::Relaxed);
                    if prev.is_null() {
                        links.head = next;
                    } else {
                        (*prev).next.store(next, Ordering::Relaxed);
                    }
                    if links.tail == cursor {
                        links.tail = prev;
                    }
                    (*cursor).next.store(ptr::null_mut(), Ordering::Relaxed);
                    self.count.fetch_sub(1, Ordering::SeqCst);
                    return true;
                }
                prev = cursor;
                cursor = (*cursor).next.load(Ordering::Relaxed);
            }
        }
        false
    }

    /// Drain and destroy whatever is still queued (shutdown path).
    fn drain_destroy(&self) {
        loop {
            let proc = self.pop();
            if proc.is_null() {
                break;
            }
            // Safety: popped processes are exclusively ours.
            unsafe {
                Process::destroy(proc);
            }
        }
    }
}

// ── Workers ─────────────────────────────────────────────────────────────

pub struct Worker {
    pub id: u32,
    current: AtomicPtr<Process>,
    local_queue: ProcessQueue,
    /// The worker's own saved context, switched to when a process yields.
    scheduler_ctx: UnsafeCell<Context>,
    running: AtomicBool,
    steal_count: AtomicU64,
    run_count: AtomicU64,
}

// scheduler_ctx is only touched by the worker's own thread (and by the
// context switch while that thread is suspended in a process).
unsafe impl Sync for Worker {}

impl Worker {
    fn new(id: u32) -> Self {
        Worker {
            id,
            current: AtomicPtr::new(ptr::null_mut()),
            local_queue: ProcessQueue::new(),
            scheduler_ctx: UnsafeCell::new(Context::default()),
            running: AtomicBool::new(false),
            steal_count: AtomicU64::new(0),
            run_count: AtomicU64::new(0),
        }
    }

    pub fn steal_count(&self) -> u64 {
        self.steal_count.load(Ordering::Relaxed)
    }

    pub fn run_count(&self) -> u64 {
        self.run_count.load(Ordering::Relaxed)
    }
}

thread_local! {
    static TLS_WORKER: Cell<*const Worker> = const { Cell::new(ptr::null()) };
}

fn current_worker() -> *const Worker {
    TLS_WORKER.with(Cell::get)
}

// ── Scheduler ───────────────────────────────────────────────────────────

pub struct Scheduler {
    workers: Vec<Worker>,
    global_queue: ProcessQueue,
    wait_queue: ProcessQueue,
    shutdown: AtomicBool,
    active_procs: AtomicUsize,
    waiting_procs: AtomicUsize,
}

static SCHEDULER: Mutex<Option<Arc<Scheduler>>> = Mutex::new(None);

/// The installed scheduler, if initialized.
pub fn get() -> Option<Arc<Scheduler>> {
    SCHEDULER.lock().clone()
}

/// Initialize the global scheduler with `num_workers` OS threads
/// (0 = one per online CPU, capped at [`MAX_WORKERS`]).
pub fn init(num_workers: u32) -> Result<(), ()> {
    let mut guard = SCHEDULER.lock();
    if guard.is_some() {
        return Err(());
    }

    let num_workers = if num_workers == 0 {
        online_cpus()
    } else {
        num_workers
    }
    .clamp(1, MAX_WORKERS);

    let workers = (0..num_workers).map(Worker::new).collect();
    *guard = Some(Arc::new(Scheduler {
        workers,
        global_queue: ProcessQueue::new(),
        wait_queue: ProcessQueue::new(),
        shutdown: AtomicBool::new(false),
        active_procs: AtomicUsize::new(0),
        waiting_procs: AtomicUsize::new(0),
    }));
    tracing::debug!(num_workers, "scheduler initialized");
    Ok(())
}

/// Tear down the global scheduler, destroying any leftover processes.
pub fn shutdown() {
    let sched = SCHEDULER.lock().take();
    if let Some(sched) = sched {
        sched.shutdown.store(true, Ordering::SeqCst);
        sched.global_queue.drain_destroy();
        sched.wait_queue.drain_destroy();
        for worker in &sched.workers {
            worker.local_queue.drain_destroy();
        }
        tracing::debug!("scheduler shut down");
    }
}

fn online_cpus() -> u32 {
    // Safety: plain sysconf query.
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n < 1 {
        1
    } else {
        n as u32
    }
}

impl Scheduler {
    pub fn num_workers(&self) -> u32 {
        self.workers.len() as u32
    }

    pub fn active_procs(&self) -> usize {
        self.active_procs.load(Ordering::SeqCst)
    }

    pub fn waiting_procs(&self) -> usize {
        self.waiting_procs.load(Ordering::SeqCst)
    }

    /// Enqueue a newly runnable process: the current worker's local queue
    /// when called from a worker, the global queue otherwise.
    pub fn enqueue(&self, proc: *mut Process) {
        if proc.is_null() {
            return;
        }
        // Safety: caller hands over ownership.
        unsafe {
            (*proc).set_state(ProcessState::Ready);
        }
        self.active_procs.fetch_add(1, Ordering::SeqCst);

        let worker = current_worker();
        if worker.is_null() {
            self.global_queue.push(proc);
        } else {
            // Safety: worker pointers live as long as the scheduler.
            unsafe {
                (*worker).local_queue.push(proc);
            }
        }
    }

    /// Next runnable process for `worker`: local, then global, then steal.
    fn next_for(&self, worker: &Worker) -> *mut Process {
        let proc = worker.local_queue.pop();
        if !proc.is_null() {
            return proc;
        }
        let proc = self.global_queue.pop();
        if !proc.is_null() {
            return proc;
        }
        self.try_steal(worker)
    }

    /// Scan the other workers circularly, starting past our own id, and
    /// take from the first victim with more than one queued process.
    fn try_steal(&self, thief: &Worker) -> *mut Process {
        let n = self.workers.len() as u32;
        for i in 1..n {
            let victim = &self.workers[((thief.id + i) % n) as usize];
            if victim.local_queue.len() > 1 {
                let proc = victim.local_queue.pop();
                if !proc.is_null() {
                    thief.steal_count.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(thief = thief.id, victim = victim.id, "stole process");
                    return proc;
                }
            }
        }
        ptr::null_mut()
    }

    /// Park a process on the wait queue. Called on the scheduler side,
    /// after the process context is fully saved; the mailbox recheck
    /// closes the race with a send that happened between the process
    /// observing an empty mailbox and reaching the wait queue.
    fn park(&self, proc: *mut Process) {
        self.wait_queue.push(proc);
        self.waiting_procs.fetch_add(1, Ordering::SeqCst);

        // Safety: proc stays valid; it is owned by the wait queue now.
        let mailbox_nonempty = unsafe { !(*proc).mailbox().is_empty() };
        if mailbox_nonempty && self.wait_queue.remove(proc) {
            self.waiting_procs.fetch_sub(1, Ordering::SeqCst);
            // Safety: removal gave ownership back.
            unsafe {
                (*proc).set_state(ProcessState::Ready);
            }
            self.global_queue.push(proc);
        }
    }

    /// Wake a parked process: off the wait queue, onto the global run
    /// queue. No-op if the process is not parked (it may be running, or a
    /// concurrent wake got there first).
    pub fn wake(&self, proc: *mut Process) {
        if proc.is_null() {
            return;
        }
        if self.wait_queue.remove(proc) {
            self.waiting_procs.fetch_sub(1, Ordering::SeqCst);
            // Safety: removal transferred ownership to us.
            unsafe {
                (*proc).set_state(ProcessState::Ready);
            }
            self.global_queue.push(proc);
        }
    }

    /// Advisory deadlock check: every live process is parked.
    pub fn check_deadlock(&self) -> bool {
        let active = self.active_procs();
        let waiting = self.waiting_procs();
        if active > 0 && waiting == active {
            tracing::warn!(
                waiting,
                "potential deadlock: all live processes are waiting for messages"
            );
            eprintln!("[arnm] warning: potential deadlock: {waiting} processes all waiting");
            return true;
        }
        false
    }

    /// Worker scheduling loop. Returns when every process has exited or
    /// shutdown is requested.
    fn worker_main(&self, worker: &Worker) {
        TLS_WORKER.with(|cell| cell.set(worker));
        worker.running.store(true, Ordering::SeqCst);
        tracing::debug!(worker = worker.id, "worker running");

        let mut idle_naps = 0u32;

        while !self.shutdown.load(Ordering::SeqCst) {
            let proc = self.next_for(worker);

            if proc.is_null() {
                if self.active_procs() == 0 {
                    break;
                }
                idle_naps += 1;
                if idle_naps % DEADLOCK_CHECK_INTERVAL == 0 {
                    self.check_deadlock();
                }
                std::thread::sleep(IDLE_NAP);
                continue;
            }
            idle_naps = 0;

            // Safety: the pop transferred exclusive ownership to us.
            unsafe {
                debug_assert!(matches!(
                    (*proc).state(),
                    ProcessState::Ready | ProcessState::Waiting
                ));

                (*proc).set_state(ProcessState::Running);
                (*proc).worker_id = worker.id;
                (*proc).run_count += 1;
                worker.current.store(proc, Ordering::Relaxed);
                process::set_current(proc);
                worker.run_count.fetch_add(1, Ordering::Relaxed);

                arnm_context_switch(
                    worker.scheduler_ctx.get(),
                    std::ptr::addr_of!((*proc).context),
                );

                // The process yielded (or died) and switched back. Requeue
                // decisions happen here, after the context is fully saved,
                // so no other worker can resume a half-saved process.
                process::set_current(ptr::null_mut());
                worker.current.store(ptr::null_mut(), Ordering::Relaxed);

                match (*proc).state() {
                    ProcessState::Dead => Process::destroy(proc),
                    ProcessState::Waiting => self.park(proc),
                    ProcessState::Ready | ProcessState::Running => {
                        (*proc).set_state(ProcessState::Ready);
                        worker.local_queue.push(proc);
                    }
                }
            }
        }

        worker.running.store(false, Ordering::SeqCst);
        tracing::debug!(worker = worker.id, "worker stopped");
    }

    /// Run the scheduler: workers 1..N on fresh OS threads, worker 0 on
    /// the calling thread. Blocks until all processes have exited.
    pub fn run(self: &Arc<Self>) {
        let mut handles = Vec::new();
        for i in 1..self.workers.len() {
            let sched = Arc::clone(self);
            handles.push(std::thread::spawn(move || {
                sched.worker_main(&sched.workers[i]);
            }));
        }

        self.worker_main(&self.workers[0]);

        for handle in handles {
            let _ = handle.join();
        }
    }
}

/// Cooperative yield from inside a process: switch back to the worker's
/// scheduler context. The worker requeues (or parks, or destroys) the
/// process after the switch, once its context is fully saved.
pub fn yield_current() {
    let worker = current_worker();
    if worker.is_null() {
        return;
    }
    let proc = process::current();
    if proc.is_null() {
        return;
    }
    let Some(sched) = get() else {
        return;
    };

    // Safety: worker and proc belong to this thread right now.
    unsafe {
        if (*proc).state() == ProcessState::Dead {
            sched.active_procs.fetch_sub(1, Ordering::SeqCst);
        }

        arnm_context_switch(
            std::ptr::addr_of_mut!((*proc).context),
            (*worker).scheduler_ctx.get(),
        );
    }
}

/// Exit trampoline, installed under every process entry: mark the current
/// process dead and yield for the last time.
#[no_mangle]
pub extern "C" fn arnm_process_exit_trampoline() {
    let proc = process::current();
    if !proc.is_null() {
        // Safety: this thread is the process.
        unsafe {
            (*proc).set_state(ProcessState::Dead);
        }
        yield_current();
    }
    // A process context cannot return; if the switch ever falls through,
    // spin instead of running off the synthetic stack frame.
    loop {
        std::thread::park();
    }
}
