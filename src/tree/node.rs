//! Node data model
//!
//! A node holds a sorted set of values and, for internal nodes, an ordered
//! child list one longer than the value list. The values of an internal node
//! act as splitters: everything under the child at index `i` sits strictly
//! between `values[i-1]` and `values[i]`.

use std::collections::BTreeSet;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::{BrambleError, Result};
use crate::value::TreeValue;

/// Identifier for a node: either resident in the node table or persisted
/// under its content hash.
///
/// Serialized untagged, so a persisted child list reads as a JSON array of
/// numbers and/or 64-char hex strings; both variants may appear in the same
/// list while a tree is partially unloaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    /// Small integer valid only within one in-memory tree handle
    Resident(u64),
    /// Uppercase hex SHA-256 of the node's serialized bytes
    Persisted(String),
}

impl NodeId {
    /// The resident id, if this is a resident reference
    pub fn as_resident(&self) -> Option<u64> {
        match self {
            NodeId::Resident(id) => Some(*id),
            NodeId::Persisted(_) => None,
        }
    }

    /// The storage key, if this is a persisted reference
    pub fn as_persisted(&self) -> Option<&str> {
        match self {
            NodeId::Resident(_) => None,
            NodeId::Persisted(key) => Some(key),
        }
    }

    pub fn is_resident(&self) -> bool {
        matches!(self, NodeId::Resident(_))
    }
}

/// Where a probe value sits relative to a node's splitters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The value equals the splitter at this index; it is already
    /// represented by the node and no descent is needed
    OnSplitter(usize),
    /// The value belongs under the child at this index
    InChild(usize),
}

/// A tree node: sorted values plus an optional ordered child list
///
/// `children` is `None` for leaves. The serialized form omits the child
/// list for leaves, which is also how the metadata sidecar distinguishes
/// leaves during the reachability walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Node<V: TreeValue> {
    values: BTreeSet<V>,
    #[serde(rename = "child_ids", skip_serializing_if = "Option::is_none", default)]
    children: Option<Vec<NodeId>>,
}

impl<V: TreeValue> Node<V> {
    /// A fresh empty leaf
    pub fn leaf() -> Self {
        Self {
            values: BTreeSet::new(),
            children: None,
        }
    }

    /// An internal node with the given children and no splitters yet
    pub(crate) fn internal(children: Vec<NodeId>) -> Self {
        Self {
            values: BTreeSet::new(),
            children: Some(children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Whether the fullness predicate holds for the given maximum
    pub fn is_full(&self, max_values: usize) -> bool {
        self.values.len() >= max_values
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// The sorted value set
    pub fn values(&self) -> &BTreeSet<V> {
        &self.values
    }

    /// Values greater than or equal to `start`, in ascending order
    pub fn values_from<'a>(&'a self, start: &V) -> impl Iterator<Item = &'a V> {
        self.values.range((Bound::Included(start), Bound::Unbounded))
    }

    /// Insert a value; returns false if it was already present
    pub fn insert_value(&mut self, value: V) -> bool {
        self.values.insert(value)
    }

    /// The child list (empty for leaves)
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// The child list, or `None` for a leaf
    pub fn child_list(&self) -> Option<&[NodeId]> {
        self.children.as_deref()
    }

    /// True if any child is still resident
    pub fn has_resident_children(&self) -> bool {
        self.children().iter().any(NodeId::is_resident)
    }

    /// The splitter to the right of the child at `index`, if any
    pub fn splitter_at(&self, index: usize) -> Option<&V> {
        self.values.iter().nth(index)
    }

    /// Locate `value` relative to this node's splitters: the first splitter
    /// equal to it wins; otherwise the first strictly greater splitter names
    /// the child; otherwise the last child.
    pub fn locate(&self, value: &V) -> Location {
        for (index, splitter) in self.values.iter().enumerate() {
            if value == splitter {
                return Location::OnSplitter(index);
            }
            if value < splitter {
                return Location::InChild(index);
            }
        }
        Location::InChild(self.values.len())
    }

    /// The element at index `len / 2`
    ///
    /// This is the arithmetic median only for odd lengths; splits only ever
    /// fire at the odd fullness maximum, so that is the only case the engine
    /// relies on.
    pub fn median(&self) -> Option<&V> {
        self.values.iter().nth(self.values.len() / 2)
    }

    /// Split this node around its median
    ///
    /// Keeps the lesser half (and lower children) in `self` and returns the
    /// median plus a new sibling holding the greater half (and upper
    /// children).
    pub(crate) fn split(&mut self) -> Result<(V, Node<V>)> {
        let mid = self.values.len() / 2;
        let mut rest = std::mem::take(&mut self.values).into_iter();
        self.values = rest.by_ref().take(mid).collect();
        let median = rest.next().ok_or_else(|| {
            BrambleError::InvariantViolation("split of a node with no values".to_string())
        })?;
        let greater: BTreeSet<V> = rest.collect();

        let upper_children = match &mut self.children {
            Some(children) => {
                debug_assert!(children.len() % 2 == 0);
                Some(children.split_off(children.len() / 2))
            }
            None => None,
        };

        Ok((
            median,
            Node {
                values: greater,
                children: upper_children,
            },
        ))
    }

    /// Insert a child reference at `index`
    pub(crate) fn insert_child(&mut self, index: usize, id: NodeId) -> Result<()> {
        match &mut self.children {
            Some(children) => {
                children.insert(index, id);
                Ok(())
            }
            None => Err(BrambleError::InvariantViolation(
                "cannot insert a child into a leaf".to_string(),
            )),
        }
    }

    /// Rewrite the child reference `old` to `new`
    pub(crate) fn replace_child(&mut self, old: &NodeId, new: NodeId) -> Result<()> {
        let children = self.children.as_mut().ok_or_else(|| {
            BrambleError::InvariantViolation("cannot rewrite a child of a leaf".to_string())
        })?;
        match children.iter().position(|c| c == old) {
            Some(index) => {
                children[index] = new;
                Ok(())
            }
            None => Err(BrambleError::InvariantViolation(format!(
                "child {:?} not present in parent",
                old
            ))),
        }
    }
}
