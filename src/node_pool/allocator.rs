use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::NodePool;
use crate::error::PoolError;

/// A typed, stateless front end to the global [`NodePool`].
///
/// Every `NodeAllocator` is interchangeable with every other one: there's no
/// state to copy, and memory from one can be freed through another (even one
/// rebound to a different `T`, as long as the layout matches).
pub struct NodeAllocator<T>(PhantomData<fn() -> T>);

impl<T> NodeAllocator<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }

    /// The same allocator, handing out `U`s instead.
    pub const fn rebind<U>(self) -> NodeAllocator<U> {
        NodeAllocator(PhantomData)
    }

    pub fn pool(&self) -> &'static NodePool {
        NodePool::global()
    }

    /// Allocates uninitialized room for `count` contiguous `T`s.
    pub fn allocate(&self, count: usize) -> Result<NonNull<T>, PoolError> {
        let layout = Layout::array::<T>(count).map_err(|_| PoolError::CapacityOverflow { count })?;
        Ok(self.pool().alloc(layout)?.cast())
    }

    /// SAFETY: `ptr` must have come from `allocate(count)` on a `NodeAllocator<T>`
    ///         with the same `count`, and any `T`s in it must already be dropped.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        // SAFETY: `allocate` already checked this layout
        let layout = unsafe { Layout::from_size_align_unchecked(size_of::<T>() * count, align_of::<T>()) };
        // SAFETY: guaranteed by caller
        unsafe { self.pool().dealloc(ptr.cast(), layout) }
    }
}

// manual impls: none of these should need `T: Trait`

impl<T> Clone for NodeAllocator<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeAllocator<T> {}

impl<T> Default for NodeAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, U> PartialEq<NodeAllocator<U>> for NodeAllocator<T> {
    fn eq(&self, _: &NodeAllocator<U>) -> bool {
        true
    }
}

impl<T> Eq for NodeAllocator<T> {}

impl<T> fmt::Debug for NodeAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAllocator<{}>", std::any::type_name::<T>())
    }
}
