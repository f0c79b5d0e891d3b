//! Root registry and per-node metadata
//!
//! The metadata storage carries two kinds of records, both JSON:
//!
//! - Under each persisted node's storage key: a [`NodeMeta`] sidecar
//!   (`child_ids` for internal nodes, value count, payload size). This lets
//!   the engine walk and size a persisted tree without decompressing value
//!   payloads.
//! - Under the well-known key `":roots"`: the set of [`RootSnapshot`]
//!   records, one per named commit of the tree. The latest root is the one
//!   with the greatest `stored_time`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{BrambleError, Result};
use crate::storage::ByteStorage;
use crate::tree::Node;
use crate::value::TreeValue;

/// Well-known metadata key holding the root snapshot set
pub const ROOTS_KEY: &str = ":roots";

/// Per-node metadata sidecar, keyed by the node's storage key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Storage keys of the children; omitted for leaves, which terminates
    /// the reachability walk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub child_ids: Option<Vec<String>>,

    /// Number of values in the node
    pub value_count: usize,

    /// Size of the node's compressed payload in bytes
    pub storage_byte_count: usize,
}

impl NodeMeta {
    /// Build the sidecar for a node about to be persisted
    ///
    /// Fails if any child is still resident: a parent's metadata may only
    /// record storage keys, which is exactly what bottom-up eviction
    /// guarantees.
    pub(crate) fn for_node<V: TreeValue>(node: &Node<V>, byte_count: usize) -> Result<Self> {
        let child_ids = match node.child_list() {
            Some(children) => Some(
                children
                    .iter()
                    .map(|c| {
                        c.as_persisted().map(str::to_string).ok_or_else(|| {
                            BrambleError::InvariantViolation(
                                "persisting a node with resident children".to_string(),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };
        Ok(Self {
            child_ids,
            value_count: node.value_count(),
            storage_byte_count: byte_count,
        })
    }
}

/// A named commit of the tree: a content-hash root anchored to a wall-clock
/// time with caller-supplied metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSnapshot {
    /// Storage key of the committed root node
    pub storage_key: String,

    /// Nanoseconds since the Unix epoch at commit time
    pub stored_time: u128,

    /// Opaque caller-supplied metadata
    pub metadata: serde_json::Value,
}

/// Handle over the metadata storage
pub struct Registry {
    storage: Box<dyn ByteStorage>,
}

impl Registry {
    pub fn new(storage: Box<dyn ByteStorage>) -> Self {
        Self { storage }
    }

    /// Write a node's metadata sidecar
    pub fn put_node_meta(&self, key: &str, meta: &NodeMeta) -> Result<()> {
        let json =
            serde_json::to_vec(meta).map_err(|e| BrambleError::Serialize(e.to_string()))?;
        self.storage.put(key, &json)
    }

    /// Read a node's metadata sidecar
    pub fn node_meta(&self, key: &str) -> Result<NodeMeta> {
        let bytes = self
            .storage
            .get(key)?
            .ok_or_else(|| BrambleError::KeyNotFound(key.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| BrambleError::Decode {
            key: key.to_string(),
            byte_count: bytes.len(),
            reason: e.to_string(),
        })
    }

    /// Read the root snapshot set (empty if nothing has been committed)
    pub fn roots(&self) -> Result<Vec<RootSnapshot>> {
        match self.storage.get(ROOTS_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| BrambleError::Decode {
                key: ROOTS_KEY.to_string(),
                byte_count: bytes.len(),
                reason: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    /// The snapshot with the greatest `stored_time`, if any
    pub fn latest_root(&self) -> Result<Option<RootSnapshot>> {
        let roots = self.roots()?;
        Ok(roots.into_iter().max_by_key(|r| r.stored_time))
    }

    /// Append a snapshot to the root set
    pub fn append_root(&self, snapshot: &RootSnapshot) -> Result<()> {
        let mut roots = self.roots()?;
        if !roots.contains(snapshot) {
            roots.push(snapshot.clone());
        }
        let json =
            serde_json::to_vec(&roots).map_err(|e| BrambleError::Serialize(e.to_string()))?;
        self.storage.put(ROOTS_KEY, &json)
    }

    /// Collect every storage key reachable from `root_key` into `out`
    ///
    /// Walks metadata `child_ids` only; node payloads are never read. An
    /// entry without `child_ids` is a leaf and terminates its branch.
    pub fn collect_reachable(&self, root_key: &str, out: &mut BTreeSet<String>) -> Result<()> {
        let mut stack = vec![root_key.to_string()];
        while let Some(key) = stack.pop() {
            if !out.insert(key.clone()) {
                continue;
            }
            let meta = self.node_meta(&key)?;
            if let Some(children) = meta.child_ids {
                stack.extend(children);
            }
        }
        Ok(())
    }
}
