//! In-memory storage backend
//!
//! HashMap-based byte storage with RwLock for shared access.
//! Uses parking_lot::RwLock which never poisons on panic.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::ByteStorage;
use crate::error::Result;

/// In-memory byte storage backed by a hash map
///
/// The default backend for both node bytes and metadata. Contents live for
/// the lifetime of the handle; nothing touches the filesystem.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteStorage for MemoryStorage {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }
}
