//! B-Tree Engine
//!
//! Persistent, content-addressed B-tree over opaque ordered values.
//!
//! ## Responsibilities
//! - Maintain the resident node table, root pointer, and usage clock
//! - Grow by top-down splits on insertion (the root split is the only
//!   height increase)
//! - Spill cold nodes to byte storage bottom-up and fault them back in on
//!   demand
//! - Serve ordered range iteration across a mixed resident/persisted tree
//!
//! ## Node Identity
//!
//! A node is identified either by a small resident integer (valid for one
//! handle) or by the uppercase hex SHA-256 of its serialized bytes (stable,
//! survives persistence). Child lists may mix both at once; loading and
//! unloading rewrite the identities in place.

mod handle;
mod iterator;
mod node;

pub use handle::Tree;
pub use iterator::RangeIter;
pub use node::{Location, Node, NodeId};
