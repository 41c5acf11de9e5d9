use thiserror::Error;

/// Errors coming out of the [`NodePool`](crate::node_pool::NodePool) and
/// [`NodeAllocator`](crate::node_pool::NodeAllocator).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The system allocator handed back null.
    #[error("out of memory allocating {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },
    /// `count` nodes don't fit in a single `Layout`.
    #[error("cannot allocate {count} nodes: layout overflows isize")]
    CapacityOverflow { count: usize },
}

/// Errors returned by the read-only lookups on [`Map`](crate::Map).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// `key` is the `Debug` rendering of the key that was asked for.
    #[error("KeyError: {key}")]
    KeyNotFound { key: String },
}

/// A broken red-black (or bookkeeping) invariant, as found by
/// [`RBTree::validate`](crate::RBTree::validate).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("the root is red")]
    RedRoot,
    #[error("a red node has a red child")]
    RedChildOfRed,
    #[error("black height differs between paths ({left} vs {right})")]
    BlackHeightMismatch { left: usize, right: usize },
    #[error("in-order traversal is not sorted")]
    OutOfOrder,
    #[error("a child's parent link doesn't point back at its parent")]
    BrokenParentLink,
    #[error("cached leftmost node is not the minimum")]
    StaleLeftmost,
    #[error("cached rightmost node is not the maximum")]
    StaleRightmost,
    #[error("recorded length {recorded} but counted {counted} nodes")]
    LengthMismatch { recorded: usize, counted: usize },
}
