//! Lock-free MPSC mailbox.
//!
//! A linked list with a stable sentinel node: `head` always points at the
//! sentinel, `tail` at the most recently enqueued node. Producers race on
//! an atomic tail exchange; the single consumer advances `head` and
//! retires the old sentinel.
//!
//! Release/acquire pairing on `next` makes a successful `send`
//! happen-before the `receive` that observes it.

use crate::process::Process;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Queue node and wire representation of a message.
///
/// Layout contract with generated code: `tag` sits at offset 0.
#[repr(C)]
pub struct Message {
    pub tag: u64,
    pub data: *mut u8,
    pub size: usize,
    next: AtomicPtr<Message>,
}

impl Message {
    /// Heap-allocate a node. `size > 0` copies the payload into a fresh
    /// buffer the message owns; `size == 0` stores `data` as an opaque
    /// value and takes no ownership.
    fn create(tag: u64, data: *mut u8, size: usize) -> *mut Message {
        let payload = if size > 0 && !data.is_null() {
            let layout = match Layout::from_size_align(size, 8) {
                Ok(layout) => layout,
                Err(_) => return ptr::null_mut(),
            };
            // Safety: non-zero size checked above.
            let copy = unsafe { alloc(layout) };
            if copy.is_null() {
                handle_alloc_error(layout);
            }
            // Safety: both regions are `size` bytes, freshly disjoint.
            unsafe {
                ptr::copy_nonoverlapping(data, copy, size);
            }
            copy
        } else {
            data
        };

        Box::into_raw(Box::new(Message {
            tag,
            data: payload,
            size,
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Free a message and any owned payload.
    ///
    /// # Safety
    /// `msg` must have come from [`Message::create`] (or the FFI carrier
    /// path) and must not be referenced afterwards.
    pub unsafe fn free(msg: *mut Message) {
        if msg.is_null() {
            return;
        }
        let boxed = Box::from_raw(msg);
        if boxed.size > 0 && !boxed.data.is_null() {
            if let Ok(layout) = Layout::from_size_align(boxed.size, 8) {
                dealloc(boxed.data, layout);
            }
        }
    }
}

/// What to do when a bounded mailbox is full.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum OverflowPolicy {
    /// Sender yields and retries. Default for bounded mailboxes.
    #[default]
    Block,
    /// Silently discard the message.
    Drop,
    /// Abort the program.
    Panic,
}

/// Error from a non-blocking send attempt.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SendError {
    Full,
    AllocationFailed,
}

/// Multi-producer single-consumer message queue.
pub struct Mailbox {
    head: AtomicPtr<Message>,
    tail: AtomicPtr<Message>,
    /// Approximate size, for observability and overflow checks.
    count: AtomicUsize,
    /// Owning process, woken when a message arrives while it is parked.
    owner: AtomicPtr<Process>,
    /// 0 = unbounded.
    capacity: usize,
    policy: OverflowPolicy,
}

// Raw pointers are queue-internal; the MPSC discipline is upheld by the
// runtime (any thread enqueues, only the owner dequeues).
unsafe impl Send for Mailbox {}
unsafe impl Sync for Mailbox {}

impl Mailbox {
    /// Unbounded mailbox.
    pub fn new() -> Self {
        Self::with_capacity(0, OverflowPolicy::Block)
    }

    /// Bounded mailbox with the given overflow policy; `capacity == 0`
    /// means unbounded and never blocks a sender.
    pub fn with_capacity(capacity: usize, policy: OverflowPolicy) -> Self {
        let sentinel = Message::create(0, ptr::null_mut(), 0);
        Mailbox {
            head: AtomicPtr::new(sentinel),
            tail: AtomicPtr::new(sentinel),
            count: AtomicUsize::new(0),
            owner: AtomicPtr::new(ptr::null_mut()),
            capacity,
            policy,
        }
    }

    pub fn set_owner(&self, owner: *mut Process) {
        self.owner.store(owner, Ordering::Release);
    }

    pub fn owner(&self) -> *mut Process {
        self.owner.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.count.load(Ordering::SeqCst) >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count.load(Ordering::SeqCst) == 0
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Producer side: enqueue unconditionally (capacity is the caller's
    /// concern, see [`Mailbox::is_full`]). Wait-free apart from the
    /// allocation.
    pub fn send(&self, tag: u64, data: *mut u8, size: usize) -> Result<(), SendError> {
        let node = Message::create(tag, data, size);
        if node.is_null() {
            return Err(SendError::AllocationFailed);
        }

        // Swing the tail to the new node, then link the predecessor. A
        // consumer cannot see the node before the release store of `next`.
        let prev = self.tail.swap(node, Ordering::AcqRel);
        // Safety: prev is always a live node; the consumer never frees the
        // node currently reachable as tail predecessor before its `next`
        // is linked and consumed.
        unsafe {
            (*prev).next.store(node, Ordering::Release);
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Consumer side: dequeue one message if available.
    ///
    /// The canonical sentinel dequeue: advance `head` to its successor,
    /// move the successor's payload out (it becomes the new sentinel), and
    /// retire the old sentinel. Single-consumer only.
    ///
    /// # Safety
    /// Must only be called by the mailbox's single consumer.
    pub unsafe fn try_recv(&self) -> Option<OwnedMessage> {
        let head = self.head.load(Ordering::Relaxed);
        let next = (*head).next.load(Ordering::Acquire);
        if next.is_null() {
            return None;
        }

        // Move the payload out of the new sentinel exactly once.
        let tag = (*next).tag;
        let data = (*next).data;
        let size = (*next).size;
        (*next).data = ptr::null_mut();
        (*next).size = 0;

        self.head.store(next, Ordering::Relaxed);
        self.count.fetch_sub(1, Ordering::SeqCst);

        // Retire the old sentinel; its payload (if any) was consumed when
        // it was dequeued as a message.
        Message::free(head);

        Some(OwnedMessage { tag, data, size })
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        // Drain pending messages, then the sentinel.
        // Safety: drop has exclusive access.
        unsafe {
            while self.try_recv().is_some() {}
            let sentinel = self.head.load(Ordering::Relaxed);
            Message::free(sentinel);
        }
    }
}

/// A dequeued message with owned payload.
pub struct OwnedMessage {
    pub tag: u64,
    pub data: *mut u8,
    pub size: usize,
}

impl OwnedMessage {
    /// Convert into a heap `Message` for the C ABI; the consumer frees it
    /// with `arnm_message_free`.
    pub fn into_raw(self) -> *mut Message {
        let raw = Box::into_raw(Box::new(Message {
            tag: self.tag,
            data: self.data,
            size: self.size,
            next: AtomicPtr::new(ptr::null_mut()),
        }));
        std::mem::forget(self);
        raw
    }
}

impl Drop for OwnedMessage {
    fn drop(&mut self) {
        if self.size > 0 && !self.data.is_null() {
            if let Ok(layout) = Layout::from_size_align(self.size, 8) {
                // Safety: payload was allocated with this layout in
                // Message::create.
                unsafe {
                    dealloc(self.data, layout);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn empty_mailbox() {
        let mbox = Mailbox::new();
        assert!(mbox.is_empty());
        assert_eq!(mbox.len(), 0);
        assert!(unsafe { mbox.try_recv() }.is_none());
    }

    #[test]
    fn fifo_single_producer() {
        let mbox = Mailbox::new();
        for tag in 0..10u64 {
            mbox.send(tag, ptr::null_mut(), 0).ok();
        }
        assert_eq!(mbox.len(), 10);
        for expected in 0..10u64 {
            let msg = unsafe { mbox.try_recv() }.map(|m| m.tag);
            assert_eq!(msg, Some(expected));
        }
        assert!(mbox.is_empty());
    }

    #[test]
    fn payload_is_copied() {
        let mbox = Mailbox::new();
        let mut payload = [1u8, 2, 3, 4];
        mbox.send(7, payload.as_mut_ptr(), payload.len()).ok();
        // Mutating the source after send must not affect the message.
        payload[0] = 99;

        let msg = match unsafe { mbox.try_recv() } {
            Some(msg) => msg,
            None => panic!("message lost"),
        };
        assert_eq!(msg.tag, 7);
        assert_eq!(msg.size, 4);
        let bytes = unsafe { std::slice::from_raw_parts(msg.data, msg.size) };
        assert_eq!(bytes, &[1, 2, 3, 4]);
    }

    #[test]
    fn capacity_and_policy() {
        let mbox = Mailbox::with_capacity(2, OverflowPolicy::Drop);
        assert!(!mbox.is_full());
        mbox.send(1, ptr::null_mut(), 0).ok();
        mbox.send(2, ptr::null_mut(), 0).ok();
        assert!(mbox.is_full());
        assert_eq!(mbox.policy(), OverflowPolicy::Drop);
    }

    #[test]
    fn mpsc_interleaving_preserves_per_producer_order() {
        const PRODUCERS: u64 = 4;
        const PER_PRODUCER: u64 = 1000;

        let mbox = Arc::new(Mailbox::new());
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let mbox = Arc::clone(&mbox);
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        // Tag encodes (producer, sequence).
                        let tag = p << 32 | i;
                        while mbox.send(tag, ptr::null_mut(), 0).is_err() {}
                    }
                })
            })
            .collect();

        // Consumer runs concurrently with the producers.
        let mut last_seq = [None::<u64>; PRODUCERS as usize];
        let mut received = 0u64;
        while received < PRODUCERS * PER_PRODUCER {
            if let Some(msg) = unsafe { mbox.try_recv() } {
                let producer = (msg.tag >> 32) as usize;
                let seq = msg.tag & 0xFFFF_FFFF;
                if let Some(prev) = last_seq[producer] {
                    assert!(seq > prev, "producer {producer} reordered");
                }
                last_seq[producer] = Some(seq);
                received += 1;
            } else {
                std::hint::spin_loop();
            }
        }

        for handle in handles {
            let _ = handle.join();
        }
        assert!(mbox.is_empty());
    }

    #[test]
    fn drop_releases_pending_messages() {
        let mbox = Mailbox::new();
        let mut payload = [0u8; 16];
        for tag in 0..5 {
            mbox.send(tag, payload.as_mut_ptr(), payload.len()).ok();
        }
        drop(mbox); // must not leak or double-free
    }
}
