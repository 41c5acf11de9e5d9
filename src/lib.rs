// #![allow(unused)]
#![deny(unsafe_op_in_unsafe_fn)]

#[macro_use]
extern crate log;

pub mod error;
pub mod logging;

// node storage
pub mod node_pool;

// not concurrent
pub mod non_concurrent;

pub use error::{InvariantViolation, MapError, PoolError};
pub use logging::{LogConfig, init_logging};
pub use node_pool::{ClassReport, NODE_POOL, NodeAllocator, NodePool, PoolReport};
pub use non_concurrent::map::{Map, MapEntry};
pub use non_concurrent::rbtree::{Color, Cursor, Iter, RBTree};
pub use non_concurrent::set::Set;
