//! Memory management: ARC objects, guard-paged stacks, slab pool.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{fence, AtomicU32, Ordering};

/// Destructor invoked when an ARC object's refcount reaches zero.
pub type Destructor = unsafe extern "C" fn(*mut c_void);

/// Header prepended to every reference-counted allocation. The user
/// pointer points just past it.
#[repr(C)]
pub struct ObjectHeader {
    refcount: AtomicU32,
    dtor: Option<Destructor>,
    size: usize,
}

const HEADER_SIZE: usize = std::mem::size_of::<ObjectHeader>();

fn object_layout(size: usize) -> Layout {
    // 16-byte alignment covers every ARNm value type.
    match Layout::from_size_align(HEADER_SIZE + size, 16) {
        Ok(layout) => layout,
        Err(_) => Layout::new::<ObjectHeader>(),
    }
}

unsafe fn header_of(obj: *mut c_void) -> *mut ObjectHeader {
    obj.cast::<u8>().sub(HEADER_SIZE).cast()
}

/// Allocate a zeroed, reference-counted object with `refcount = 1`.
/// The returned pointer addresses the object body, just past the header.
pub fn arc_alloc(size: usize, dtor: Option<Destructor>) -> *mut c_void {
    let layout = object_layout(size);
    // Safety: layout has non-zero size (header included).
    let base = unsafe { alloc_zeroed(layout) };
    if base.is_null() {
        handle_alloc_error(layout);
    }
    let header = base.cast::<ObjectHeader>();
    // Safety: freshly allocated, exclusively owned.
    unsafe {
        (*header).refcount = AtomicU32::new(1);
        (*header).dtor = dtor;
        (*header).size = size;
        base.add(HEADER_SIZE).cast()
    }
}

/// Increment the reference count.
pub fn arc_retain(obj: *mut c_void) {
    if obj.is_null() {
        return;
    }
    // Safety: obj came from arc_alloc.
    unsafe {
        (*header_of(obj)).refcount.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decrement the reference count; the final release runs the destructor
/// and frees the whole block.
pub fn arc_release(obj: *mut c_void) {
    if obj.is_null() {
        return;
    }
    // Safety: obj came from arc_alloc.
    unsafe {
        let header = header_of(obj);
        let old = (*header).refcount.fetch_sub(1, Ordering::Release);
        if old == 1 {
            // Pair with the Release decrements of other owners before
            // touching the object's contents.
            fence(Ordering::Acquire);
            if let Some(dtor) = (*header).dtor {
                dtor(obj);
            }
            let layout = object_layout((*header).size);
            dealloc(header.cast(), layout);
        }
    }
}

/// Current reference count; 0 only for null.
pub fn arc_refcount(obj: *mut c_void) -> u32 {
    if obj.is_null() {
        return 0;
    }
    // Safety: obj came from arc_alloc.
    unsafe { (*header_of(obj)).refcount.load(Ordering::Relaxed) }
}

// ── Guard-paged process stacks ──────────────────────────────────────────

const PAGE_SIZE: usize = 4096;

/// Allocate a process stack from anonymous mapped memory, with the lowest
/// page protected as a guard. Returns the start of the writable region,
/// or null on mapping failure.
pub fn stack_alloc(size: usize) -> *mut u8 {
    let size = (size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
    let total = size + PAGE_SIZE;

    // Safety: plain anonymous mapping request.
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            total,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        return ptr::null_mut();
    }

    // Stack grows down into the guard page on overflow.
    // Safety: base..base+PAGE_SIZE is part of the fresh mapping.
    unsafe {
        libc::mprotect(base, PAGE_SIZE, libc::PROT_NONE);
        base.cast::<u8>().add(PAGE_SIZE)
    }
}

/// Release a stack returned by [`stack_alloc`].
pub fn stack_free(stack: *mut u8, size: usize) {
    if stack.is_null() {
        return;
    }
    let size = (size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
    let total = size + PAGE_SIZE;
    // Safety: reverses stack_alloc's offset past the guard page.
    unsafe {
        let base = stack.sub(PAGE_SIZE);
        libc::munmap(base.cast(), total);
    }
}

// ── Object pool ─────────────────────────────────────────────────────────

#[repr(C)]
struct PoolBlock {
    next: *mut PoolBlock,
}

/// Fixed-size block pool backed by a singly-linked free list.
///
/// Single-owner: not thread-safe.
pub struct MemoryPool {
    free_list: *mut PoolBlock,
    block_size: usize,
    allocated: usize,
}

impl MemoryPool {
    /// Block size is coerced up to at least pointer width so freed blocks
    /// can hold the free-list link.
    pub fn new(block_size: usize, initial_blocks: usize) -> Self {
        let block_size = block_size.max(std::mem::size_of::<PoolBlock>());
        let mut pool = MemoryPool {
            free_list: ptr::null_mut(),
            block_size,
            allocated: 0,
        };
        for _ in 0..initial_blocks {
            let block = pool.fresh_block();
            pool.push_free(block);
        }
        pool
    }

    fn layout(&self) -> Layout {
        match Layout::from_size_align(self.block_size, std::mem::align_of::<PoolBlock>()) {
            Ok(layout) => layout,
            Err(_) => Layout::new::<PoolBlock>(),
        }
    }

    fn fresh_block(&self) -> *mut PoolBlock {
        let layout = self.layout();
        // Safety: non-zero layout.
        let block = unsafe { alloc_zeroed(layout) };
        if block.is_null() {
            handle_alloc_error(layout);
        }
        block.cast()
    }

    fn push_free(&mut self, block: *mut PoolBlock) {
        // Safety: block is pool-owned and unused.
        unsafe {
            (*block).next = self.free_list;
        }
        self.free_list = block;
    }

    /// Pop from the free list, or allocate a fresh block.
    pub fn alloc(&mut self) -> *mut u8 {
        self.allocated += 1;
        if self.free_list.is_null() {
            return self.fresh_block().cast();
        }
        let block = self.free_list;
        // Safety: non-null head of the free list.
        self.free_list = unsafe { (*block).next };
        block.cast()
    }

    /// Return a block to the free list.
    pub fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        self.allocated -= 1;
        self.push_free(ptr.cast());
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        let layout = self.layout();
        let mut block = self.free_list;
        while !block.is_null() {
            // Safety: every free-list block came from this pool's layout.
            unsafe {
                let next = (*block).next;
                dealloc(block.cast(), layout);
                block = next;
            }
        }
    }
}
