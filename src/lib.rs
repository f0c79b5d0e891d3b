//! # bramble
//!
//! A persistent, content-addressed B-tree index for append-only tuple
//! stores, with:
//! - Top-down node splits on insertion
//! - Write-through spilling of cold nodes to pluggable byte storage
//! - Transparent fault-in during ordered range iteration
//! - Named root snapshots and garbage identification
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Tree Handle                             │
//! │     (node table · root pointer · usage clock · config)      │
//! └──────────┬─────────────────────────────────┬────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │      Codec      │               │    Registry     │
//!   │ (JSON + DEFLATE │               │ (node metadata, │
//!   │  + SHA-256 key) │               │  :roots set)    │
//!   └────────┬────────┘               └────────┬────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │  Node Storage   │               │ Metadata Storage│
//!   │ (memory / dir)  │               │ (memory / dir)  │
//!   └─────────────────┘               └─────────────────┘
//! ```
//!
//! Nodes are either *resident* (in memory, identified by a small integer)
//! or *persisted* (immutable bytes addressed by their content hash). The
//! engine evicts least-used nodes bottom-up, so a parent pointer is only
//! ever rewritten to a hash whose bytes are already stored.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod registry;
pub mod storage;
pub mod tree;
pub mod value;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{BrambleError, Result};
pub use registry::{NodeMeta, Registry, RootSnapshot, ROOTS_KEY};
pub use storage::{ByteStorage, DirectoryStorage, MemoryStorage};
pub use tree::{Node, NodeId, RangeIter, Tree};
pub use value::{TreeValue, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bramble
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
