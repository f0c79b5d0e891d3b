//! Tree handle
//!
//! The core engine. Owns the resident node table, the root pointer, and the
//! usage clock, and coordinates split / load / unload / iterate against the
//! two storage handles.
//!
//! ## Concurrency
//!
//! Single-threaded cooperative: every mutating operation (including reads
//! that may fault nodes in) takes `&mut self`, so exclusive access is
//! enforced by the borrow checker. Multiple handles over the same storage
//! are permitted for readers of immutable persisted subtrees only.

use std::collections::{BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec;
use crate::config::Config;
use crate::error::{BrambleError, Result};
use crate::registry::{NodeMeta, Registry, RootSnapshot, ROOTS_KEY};
use crate::storage::ByteStorage;
use crate::tree::iterator::RangeIter;
use crate::tree::node::{Location, Node, NodeId};
use crate::value::TreeValue;

/// A persistent, content-addressed B-tree over values of type `V`
///
/// ## Concurrency:
/// - All mutation goes through `&mut self` (single writer per handle)
/// - The node table, usage clock, and root pointer update atomically within
///   each operation
/// - Unloading is write-through: bytes land in storage before the parent
///   pointer is rewritten, so an interrupted process never leaves the tree
///   pointing at an unstored hash
pub struct Tree<V: TreeValue> {
    /// Resident node table
    nodes: HashMap<u64, Node<V>>,

    /// Next resident id; monotonic, never reused within a handle
    next_node_id: u64,

    /// The current root (either variant)
    root: NodeId,

    /// Usage clock: resident id → priority (smaller = older = evicted first)
    usage: HashMap<u64, u64>,

    /// Next usage priority
    next_usage: u64,

    config: Config,

    /// Backend for node byte payloads
    node_storage: Box<dyn ByteStorage>,

    /// Metadata sidecars and the `:roots` set
    registry: Registry,

    /// The most recent snapshot committed through this handle, if any
    latest_root: Option<RootSnapshot>,
}

impl<V: TreeValue> Tree<V> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a fresh tree: a single empty leaf as root
    pub fn new(
        config: Config,
        node_storage: Box<dyn ByteStorage>,
        metadata_storage: Box<dyn ByteStorage>,
    ) -> Result<Self> {
        config.validate()?;
        let mut nodes = HashMap::new();
        nodes.insert(0, Node::leaf());
        Ok(Self {
            nodes,
            next_node_id: 1,
            root: NodeId::Resident(0),
            usage: HashMap::new(),
            next_usage: 0,
            config,
            node_storage,
            registry: Registry::new(metadata_storage),
            latest_root: None,
        })
    }

    /// Open a tree whose root is already persisted under `storage_key`
    ///
    /// Nothing is read eagerly; nodes fault in on first access.
    pub fn from_root(
        config: Config,
        node_storage: Box<dyn ByteStorage>,
        metadata_storage: Box<dyn ByteStorage>,
        storage_key: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            nodes: HashMap::new(),
            next_node_id: 0,
            root: NodeId::Persisted(storage_key.into()),
            usage: HashMap::new(),
            next_usage: 0,
            config,
            node_storage,
            registry: Registry::new(metadata_storage),
            latest_root: None,
        })
    }

    /// Resume from the snapshot with the greatest `stored_time` in `:roots`
    pub fn from_latest_root(
        config: Config,
        node_storage: Box<dyn ByteStorage>,
        metadata_storage: Box<dyn ByteStorage>,
    ) -> Result<Self> {
        let registry = Registry::new(metadata_storage);
        let snapshot = registry
            .latest_root()?
            .ok_or_else(|| BrambleError::KeyNotFound(ROOTS_KEY.to_string()))?;
        config.validate()?;
        Ok(Self {
            nodes: HashMap::new(),
            next_node_id: 0,
            root: NodeId::Persisted(snapshot.storage_key.clone()),
            usage: HashMap::new(),
            next_usage: 0,
            config,
            node_storage,
            registry,
            latest_root: Some(snapshot),
        })
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Insert a value, splitting full nodes top-down along the descent
    ///
    /// Inserting a value equal to an existing splitter is a no-op: splitters
    /// are true values of the tree, not duplicated in leaves. Faults
    /// persisted nodes in as the descent crosses them.
    pub fn insert(&mut self, value: V) -> Result<()> {
        let mut root_id = self.resident_root()?;
        if self.node(root_id)?.is_full(self.config.max_node_values) {
            // The only way the tree grows in height
            root_id = self.split_root(root_id)?;
        }

        let mut current = root_id;
        loop {
            // Every node the insertion visits records the usage clock, so
            // traversed ancestors stay warmer than untouched branches
            self.touch(current);
            if self.node(current)?.is_leaf() {
                self.node_mut(current)?.insert_value(value);
                return Ok(());
            }
            match self.node(current)?.locate(&value) {
                Location::OnSplitter(_) => return Ok(()),
                Location::InChild(index) => {
                    let child = self.node(current)?.children()[index].clone();
                    match child {
                        NodeId::Persisted(key) => {
                            // Fault in, then re-run the step: the loaded
                            // child may itself be full
                            self.load(Some(current), &key)?;
                        }
                        NodeId::Resident(child_id) => {
                            if self.node(child_id)?.is_full(self.config.max_node_values) {
                                // Re-pick against the updated splitters
                                self.split_child(current, index)?;
                            } else {
                                current = child_id;
                            }
                        }
                    }
                }
            }
        }
    }

    // =========================================================================
    // Range iteration
    // =========================================================================

    /// All stored values `>= start`, ascending, across node boundaries
    ///
    /// The iterator faults persisted nodes in as it crosses them, which
    /// mutates the handle; hence `&mut self` even for a read.
    pub fn iter_from(&mut self, start: &V) -> RangeIter<'_, V> {
        RangeIter::new(self, start.clone())
    }

    // =========================================================================
    // Load / unload / eviction
    // =========================================================================

    /// Evict least-used nodes bottom-up until at most `max_resident` remain
    pub fn unload_excess(&mut self, max_resident: usize) -> Result<()> {
        while self.nodes.len() > max_resident {
            let cursor = self.least_used_cursor()?;
            self.unload(&cursor)?;
        }
        Ok(())
    }

    /// Evict every resident node, leaving only the persisted root pointer
    pub fn unload_tree(&mut self) -> Result<()> {
        self.unload_excess(0)
    }

    // =========================================================================
    // Root registry
    // =========================================================================

    /// Commit the current tree: evict everything and append a snapshot of
    /// the persisted root to `:roots`
    pub fn store_root(&mut self, metadata: serde_json::Value) -> Result<RootSnapshot> {
        self.unload_tree()?;
        let storage_key = match &self.root {
            NodeId::Persisted(key) => key.clone(),
            NodeId::Resident(id) => {
                return Err(BrambleError::InvariantViolation(format!(
                    "root {} still resident after full unload",
                    id
                )))
            }
        };
        let stored_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| BrambleError::Storage(format!("system clock before epoch: {}", e)))?
            .as_nanos();
        let snapshot = RootSnapshot {
            storage_key,
            stored_time,
            metadata,
        };
        self.registry.append_root(&snapshot)?;
        tracing::info!(root = %snapshot.storage_key, "stored root snapshot");
        self.latest_root = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Read the root snapshot set
    pub fn roots(&self) -> Result<Vec<RootSnapshot>> {
        self.registry.roots()
    }

    /// Node-storage keys not reachable from any root snapshot
    ///
    /// The live set is the transitive closure over metadata `child_ids` of
    /// every root; payloads are never decompressed. Deciding what to do with
    /// the garbage is left to the caller.
    pub fn unused_storage_keys(&self) -> Result<BTreeSet<String>> {
        let mut live = BTreeSet::new();
        for root in self.registry.roots()? {
            self.registry.collect_reachable(&root.storage_key, &mut live)?;
        }
        let mut unused = BTreeSet::new();
        for key in self.node_storage.keys()? {
            if !live.contains(&key) {
                unused.insert(key);
            }
        }
        Ok(unused)
    }

    /// Remove every unused key from node storage; returns the count removed
    pub fn sweep_unused(&self) -> Result<usize> {
        let unused = self.unused_storage_keys()?;
        for key in &unused {
            self.node_storage.remove(key)?;
        }
        if !unused.is_empty() {
            tracing::debug!(count = unused.len(), "swept unused storage keys");
        }
        Ok(unused.len())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of resident nodes
    pub fn resident_count(&self) -> usize {
        self.nodes.len()
    }

    /// The current root id (either variant)
    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    /// Look up a resident node by id
    pub fn resident_node(&self, id: u64) -> Option<&Node<V>> {
        self.nodes.get(&id)
    }

    /// The most recent snapshot committed through this handle
    pub fn latest_root(&self) -> Option<&RootSnapshot> {
        self.latest_root.as_ref()
    }

    /// The node byte storage
    pub fn node_storage(&self) -> &dyn ByteStorage {
        self.node_storage.as_ref()
    }

    /// The metadata registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // =========================================================================
    // Private: node table
    // =========================================================================

    pub(crate) fn node(&self, id: u64) -> Result<&Node<V>> {
        self.nodes.get(&id).ok_or_else(|| {
            BrambleError::InvariantViolation(format!("resident node {} missing from table", id))
        })
    }

    fn node_mut(&mut self, id: u64) -> Result<&mut Node<V>> {
        self.nodes.get_mut(&id).ok_or_else(|| {
            BrambleError::InvariantViolation(format!("resident node {} missing from table", id))
        })
    }

    /// Install a node under a fresh resident id and stamp its usage
    fn alloc(&mut self, node: Node<V>) -> u64 {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(id, node);
        self.touch(id);
        id
    }

    /// Stamp the usage clock for a resident id
    fn touch(&mut self, id: u64) {
        self.usage.insert(id, self.next_usage);
        self.next_usage += 1;
    }

    // =========================================================================
    // Private: split
    // =========================================================================

    /// Grow the tree by one level: a new internal root over the old one
    fn split_root(&mut self, old_root: u64) -> Result<u64> {
        let new_root = self.alloc(Node::internal(vec![NodeId::Resident(old_root)]));
        self.root = NodeId::Resident(new_root);
        tracing::debug!(old_root, new_root, "split root");
        self.split_child(new_root, 0)?;
        Ok(new_root)
    }

    /// Split the (resident, full) child at `child_index` of `parent`
    fn split_child(&mut self, parent: u64, child_index: usize) -> Result<()> {
        let child_id = self
            .node(parent)?
            .children()
            .get(child_index)
            .and_then(NodeId::as_resident)
            .ok_or_else(|| {
                BrambleError::InvariantViolation(
                    "split target is not a resident child".to_string(),
                )
            })?;

        let (median, sibling) = self.node_mut(child_id)?.split()?;
        let sibling_id = self.alloc(sibling);

        // The median's sorted position among the parent's splitters matches
        // the child's slot, so the sibling goes immediately after it
        let parent_node = self.node_mut(parent)?;
        parent_node.insert_value(median);
        parent_node.insert_child(child_index + 1, NodeId::Resident(sibling_id))?;
        Ok(())
    }

    // =========================================================================
    // Private: load / unload
    // =========================================================================

    /// The root as a resident id, faulting it in if persisted
    pub(crate) fn resident_root(&mut self) -> Result<u64> {
        match &self.root {
            NodeId::Resident(id) => Ok(*id),
            NodeId::Persisted(key) => {
                let key = key.clone();
                self.load(None, &key)
            }
        }
    }

    /// Resolve a child reference to a resident id, faulting if needed
    pub(crate) fn ensure_child_resident(&mut self, parent: u64, child: NodeId) -> Result<u64> {
        match child {
            NodeId::Resident(id) => Ok(id),
            NodeId::Persisted(key) => self.load(Some(parent), &key),
        }
    }

    /// Fault a persisted node in: fetch, decode, install under a fresh
    /// resident id, and rewrite the referring pointer
    fn load(&mut self, parent: Option<u64>, key: &str) -> Result<u64> {
        let bytes = self
            .node_storage
            .get(key)?
            .ok_or_else(|| BrambleError::KeyNotFound(key.to_string()))?;
        let node = codec::decode_node(key, &bytes)?;
        let id = self.alloc(node);
        match parent {
            Some(parent_id) => {
                self.node_mut(parent_id)?
                    .replace_child(&NodeId::Persisted(key.to_string()), NodeId::Resident(id))?;
            }
            None => self.root = NodeId::Resident(id),
        }
        tracing::debug!(key, id, "loaded node");
        Ok(id)
    }

    /// Path from the root to the least-recently-used unloadable node:
    /// repeatedly descend into the resident child with the smallest usage
    /// priority, stopping at a leaf or a node with no resident children
    fn least_used_cursor(&self) -> Result<Vec<u64>> {
        let mut cursor = Vec::new();
        let mut current = match &self.root {
            NodeId::Resident(id) => *id,
            NodeId::Persisted(_) => return Ok(cursor),
        };
        loop {
            cursor.push(current);
            let next = self
                .node(current)?
                .children()
                .iter()
                .filter_map(NodeId::as_resident)
                .min_by_key(|id| self.usage.get(id).copied().unwrap_or(0));
            match next {
                Some(child) => current = child,
                None => return Ok(cursor),
            }
        }
    }

    /// Evict the node at the cursor's tail, write-through
    ///
    /// Bytes and metadata land in storage before the parent pointer (or the
    /// root pointer) is rewritten to the content hash.
    fn unload(&mut self, cursor: &[u64]) -> Result<String> {
        let (&id, ancestors) = cursor.split_last().ok_or_else(|| {
            BrambleError::InvariantViolation("unload of an empty cursor".to_string())
        })?;
        let node = self.node(id)?;
        if node.has_resident_children() {
            return Err(BrambleError::InvariantViolation(format!(
                "unload of node {} with resident children",
                id
            )));
        }

        let bytes = codec::encode_node(node)?;
        let key = codec::content_hash(&bytes);
        let meta = NodeMeta::for_node(node, bytes.len())?;
        self.node_storage.put(&key, &bytes)?;
        self.registry.put_node_meta(&key, &meta)?;

        match ancestors.last() {
            Some(&parent_id) => {
                self.node_mut(parent_id)?
                    .replace_child(&NodeId::Resident(id), NodeId::Persisted(key.clone()))?;
            }
            None => self.root = NodeId::Persisted(key.clone()),
        }
        self.nodes.remove(&id);
        self.usage.remove(&id);
        tracing::trace!(id, key = %key, "unloaded node");
        Ok(key)
    }
}
