//! Single-threaded ordered containers. Each one owns its nodes outright; only
//! the node storage underneath is shared, through the global pool.

pub mod rbtree;
pub mod set;
pub mod map;
