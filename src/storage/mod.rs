//! Storage Module
//!
//! Keyed blob storage for node bytes and metadata.
//!
//! ## Responsibilities
//! - Persist byte payloads under string keys (content hashes)
//! - Enumerate stored keys for garbage identification
//! - Remove keys the caller has decided are garbage
//!
//! Storage is an opaque capability: the tree engine dispatches through the
//! [`ByteStorage`] trait and never assumes a backend. Keys are content
//! hashes of the stored bytes, so overwriting an existing key rewrites
//! identical content.

mod directory;
mod memory;

pub use directory::DirectoryStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Keyed blob store capability
///
/// Methods take `&self`; backends use interior mutability where needed so a
/// storage handle can be shared (e.g. between a tree and a garbage sweeper).
pub trait ByteStorage: Send + Sync {
    /// Store bytes under a key, overwriting any previous content
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Fetch the bytes under a key, or `None` if the key is absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Enumerate every stored key (unspecified order)
    fn keys(&self) -> Result<Vec<String>>;

    /// Remove a key; absent keys are a no-op
    fn remove(&self, key: &str) -> Result<()>;
}
