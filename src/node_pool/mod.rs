//! A lock-free, size-classed free-list pool for tree nodes.
//!
//! Requests of up to [`MAX_POOLED_SIZE`] bytes are rounded up to one of
//! [`SIZE_CLASSES`] classes, [`CLASS_GRANULARITY`] bytes apart. Each class keeps
//! a Treiber stack of freed blocks. Memory handed to the pool is never given
//! back to the system while the pool is alive, only on [`NodePool::purge`] or
//! when the pool is dropped.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use thread_local::ThreadLocal;

use crate::error::PoolError;

mod allocator;
mod report;

pub use allocator::NodeAllocator;
pub use report::{ClassReport, PoolReport};

pub const SIZE_CLASSES: usize = 16;
pub const CLASS_GRANULARITY: usize = 8;
pub const MAX_POOLED_SIZE: usize = SIZE_CLASSES * CLASS_GRANULARITY;
/// Every pooled block is allocated with this alignment, so any class can serve
/// any request that doesn't ask for more.
pub const BLOCK_ALIGN: usize = 16;

// the free list heads pack a generation tag above the block address, so a
// stale head can never win a compare-exchange after it was popped and pushed back
const ADDR_BITS: u32 = if usize::BITS >= 64 { 48 } else { usize::BITS };
const ADDR_MASK: u64 = (1 << ADDR_BITS) - 1;

/// The pool used by every [`NodeAllocator`].
pub static NODE_POOL: LazyLock<NodePool> = LazyLock::new(NodePool::new);

/// Header written into a block while it sits in a free list.
#[repr(C)]
struct FreeBlock {
    /// address of the next free block (untagged), 0 for end of list
    next: AtomicU64,
}

const _: () = assert!(size_of::<FreeBlock>() <= CLASS_GRANULARITY);
const _: () = assert!(align_of::<FreeBlock>() <= BLOCK_ALIGN);

fn pack(addr: u64, tag: u64) -> u64 {
    (addr & ADDR_MASK) | (tag << ADDR_BITS)
}

fn unpack_addr(head: u64) -> u64 {
    head & ADDR_MASK
}

fn unpack_tag(head: u64) -> u64 {
    head >> ADDR_BITS
}

fn block_from_addr(addr: u64) -> Option<NonNull<FreeBlock>> {
    NonNull::new(std::ptr::with_exposed_provenance_mut(addr as usize))
}

/// The size class serving `layout`, or `None` if it goes straight to the system.
fn class_index(layout: Layout) -> Option<usize> {
    if layout.size() > MAX_POOLED_SIZE || layout.align() > BLOCK_ALIGN {
        return None
    }
    Some(layout.size().saturating_sub(1) / CLASS_GRANULARITY)
}

fn class_layout(index: usize) -> Layout {
    // SAFETY: every class size is a non-zero multiple of 8 well below isize::MAX, and BLOCK_ALIGN is a power of two
    unsafe { Layout::from_size_align_unchecked((index + 1) * CLASS_GRANULARITY, BLOCK_ALIGN) }
}

fn system_alloc(layout: Layout) -> Result<NonNull<u8>, PoolError> {
    // zero sized requests never reach here: they land in class 0
    debug_assert!(layout.size() != 0);
    // SAFETY: layout has a non-zero size
    let ptr = unsafe { std::alloc::alloc(layout) };
    NonNull::new(ptr).ok_or(PoolError::OutOfMemory { size: layout.size(), align: layout.align() })
}

/// One lock-free free list.
struct SizeClass {
    head: AtomicU64,
}

impl SizeClass {
    const fn new() -> Self {
        Self { head: AtomicU64::new(0) }
    }

    /// Tries once to pop the head block.
    ///
    /// Misses both when the list is empty and when another thread got to the
    /// head first; either way the caller falls back to the system.
    fn pop(&self) -> Result<NonNull<FreeBlock>, PopMiss> {
        let head = self.head.load(Ordering::Acquire);
        let block = block_from_addr(unpack_addr(head)).ok_or(PopMiss::Empty)?;

        // SAFETY: blocks are never released to the system while they can be
        //         reached from a head, so the header is readable even if some
        //         other thread popped this block in the meantime. In that case
        //         `next` may be garbage, but the tag has moved on and the
        //         compare-exchange below fails.
        let next = unsafe { block.as_ref() }.next.load(Ordering::Relaxed);
        let new_head = pack(next, unpack_tag(head).wrapping_add(1));

        match self.head.compare_exchange(head, new_head, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => Ok(block),
            Err(_) => Err(PopMiss::LostRace),
        }
    }

    /// Pushes a block back, retrying until the compare-exchange sticks.
    ///
    /// SAFETY: `block` must point to at least `CLASS_GRANULARITY` writable
    ///         bytes, aligned to `BLOCK_ALIGN`, that nobody else uses anymore.
    unsafe fn push(&self, block: NonNull<FreeBlock>) {
        // SAFETY: guaranteed by caller
        let header = unsafe {
            block.write(FreeBlock { next: AtomicU64::new(0) });
            block.as_ref()
        };
        let addr = block.as_ptr().expose_provenance() as u64;

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            header.next.store(unpack_addr(head), Ordering::Relaxed);
            let new_head = pack(addr, unpack_tag(head).wrapping_add(1));
            // Release so that the `next` store above is visible to whoever pops us
            match self.head.compare_exchange_weak(head, new_head, Ordering::Release, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => head = actual,
            }
        }
    }

    /// Unhooks the whole list in one swap.
    fn take_all(&self) -> Option<NonNull<FreeBlock>> {
        let head = self.head.swap(0, Ordering::AcqRel);
        block_from_addr(unpack_addr(head))
    }

    /// Counts the blocks currently in the list.
    ///
    /// SAFETY: no other thread may pop from or push to this list meanwhile.
    unsafe fn count(&self) -> usize {
        let mut n = 0;
        let mut current = block_from_addr(unpack_addr(self.head.load(Ordering::Acquire)));
        while let Some(block) = current {
            n += 1;
            // SAFETY: the list is quiescent, so every linked block is a live free block
            current = block_from_addr(unsafe { block.as_ref() }.next.load(Ordering::Relaxed));
        }
        n
    }
}

enum PopMiss {
    Empty,
    LostRace,
}

/// Bookkeeping for one thread. Only the owning thread writes to it, so the
/// atomics are uncontended; they're atomics just so `report` can read them.
struct Counters {
    minted: [AtomicUsize; SIZE_CLASSES],
    reused: [AtomicUsize; SIZE_CLASSES],
    recycled: [AtomicUsize; SIZE_CLASSES],
    spilled: [AtomicUsize; SIZE_CLASSES],
    oversized_allocs: AtomicUsize,
    oversized_frees: AtomicUsize,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            minted: [const { AtomicUsize::new(0) }; SIZE_CLASSES],
            reused: [const { AtomicUsize::new(0) }; SIZE_CLASSES],
            recycled: [const { AtomicUsize::new(0) }; SIZE_CLASSES],
            spilled: [const { AtomicUsize::new(0) }; SIZE_CLASSES],
            oversized_allocs: AtomicUsize::new(0),
            oversized_frees: AtomicUsize::new(0),
        }
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub struct NodePool {
    classes: [SizeClass; SIZE_CLASSES],
    counters: ThreadLocal<Counters>,
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePool {
    pub fn new() -> Self {
        Self {
            classes: [const { SizeClass::new() }; SIZE_CLASSES],
            counters: ThreadLocal::new(),
        }
    }

    /// The process-wide pool, created on first use.
    pub fn global() -> &'static NodePool {
        &NODE_POOL
    }

    fn counters(&self) -> &Counters {
        self.counters.get_or_default()
    }

    /// Hands out a block fitting `layout`.
    ///
    /// Pooled requests pop their class's free list, and only fail if the list
    /// is empty (or contended) *and* the system is out of memory. Anything
    /// bigger than [`MAX_POOLED_SIZE`] or aligned past [`BLOCK_ALIGN`] is
    /// passed to the system allocator as-is.
    pub fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, PoolError> {
        let Some(index) = class_index(layout) else {
            bump(&self.counters().oversized_allocs);
            return system_alloc(layout)
        };

        match self.classes[index].pop() {
            Ok(block) => {
                bump(&self.counters().reused[index]);
                return Ok(block.cast())
            }
            Err(PopMiss::LostRace) => trace!("Lost a pop race on class {index}, minting a fresh block"),
            Err(PopMiss::Empty) => {}
        }

        let block = system_alloc(class_layout(index))?;
        bump(&self.counters().minted[index]);
        trace!("Minted a {} byte block @ {:016x?}", class_layout(index).size(), block);
        Ok(block)
    }

    /// Gives a block back to the pool.
    ///
    /// SAFETY: `ptr` must have come from `self.alloc(layout)` with the same
    ///         `layout`, and must not be used after this call.
    pub unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        let Some(index) = class_index(layout) else {
            bump(&self.counters().oversized_frees);
            // SAFETY: oversized blocks come straight from the system allocator with this layout
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
            return
        };

        let addr = ptr.as_ptr().addr() as u64;
        if addr & !ADDR_MASK != 0 {
            // can't be packed next to a tag, so this one goes back to the system
            warn!("Block @ {:016x?} doesn't fit in a tagged free list head, releasing it", ptr);
            bump(&self.counters().spilled[index]);
            // SAFETY: pooled blocks are always allocated with `class_layout(index)`
            unsafe { std::alloc::dealloc(ptr.as_ptr(), class_layout(index)) };
            return
        }

        // SAFETY: the block is at least one class wide and BLOCK_ALIGN aligned, and the caller gave it up
        unsafe { self.classes[index].push(ptr.cast()) };
        bump(&self.counters().recycled[index]);
    }

    /// A snapshot of every class's free list plus the allocation counters.
    ///
    /// SAFETY: nothing may allocate from or free into this pool while the
    ///         report is being taken. The walk follows raw `next` links, and a
    ///         concurrent pop could hand one of them to a tree mid-walk.
    pub unsafe fn report(&self) -> PoolReport {
        let mut report = PoolReport::default();

        for (index, class) in self.classes.iter().enumerate() {
            let entry = &mut report.classes[index];
            entry.block_size = class_layout(index).size();
            // SAFETY: guaranteed by caller
            entry.retained = unsafe { class.count() };
        }

        for counters in self.counters.iter() {
            for (index, entry) in report.classes.iter_mut().enumerate() {
                entry.minted += counters.minted[index].load(Ordering::Relaxed);
                entry.reused += counters.reused[index].load(Ordering::Relaxed);
                entry.recycled += counters.recycled[index].load(Ordering::Relaxed);
                entry.spilled += counters.spilled[index].load(Ordering::Relaxed);
            }
            report.oversized_allocs += counters.oversized_allocs.load(Ordering::Relaxed);
            report.oversized_frees += counters.oversized_frees.load(Ordering::Relaxed);
        }

        report
    }

    /// Releases every retained block back to the system. Returns how many
    /// blocks were released.
    ///
    /// SAFETY: no other thread may be inside `alloc` for this pool; a pop that
    ///         already loaded a head would read a freed header.
    pub unsafe fn purge(&self) -> usize {
        let mut released = 0;
        for (index, class) in self.classes.iter().enumerate() {
            let mut n = 0;
            let mut current = class.take_all();
            while let Some(block) = current {
                // SAFETY: the list was unhooked above, so we own every block on it
                current = block_from_addr(unsafe { block.as_ref() }.next.load(Ordering::Relaxed));
                // SAFETY: pooled blocks are always allocated with `class_layout(index)`
                unsafe { std::alloc::dealloc(block.as_ptr().cast(), class_layout(index)) };
                n += 1;
            }
            if n != 0 {
                debug!("Released {n} blocks of {} bytes", class_layout(index).size());
            }
            // retained blocks that left the pool count as spilled
            self.counters().spilled[index].fetch_add(n, Ordering::Relaxed);
            released += n;
        }
        released
    }
}

impl Drop for NodePool {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means nobody else can be using the pool
        let released = unsafe { self.purge() };
        debug!("Tore down node pool, released {released} blocks");
    }
}
