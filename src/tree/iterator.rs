//! Range iterator
//!
//! Lazy ascending iteration over all values `>= start`, crossing node
//! boundaries and faulting persisted nodes in on demand.
//!
//! ## How chunks work
//!
//! The iterator buffers one leaf at a time: the leaf's qualifying values
//! followed by the *splitter after the cursor*, the value in the nearest
//! ancestor that separates this subtree from the one to its right. That
//! splitter is a true value of the tree (splitters are not duplicated in
//! leaves), so it belongs in the output; it also doubles as the pivot for
//! finding the next leaf once the buffer drains. Descent and faulting only
//! happen when the consumer crosses a leaf boundary.
//!
//! Faulting rewrites child pointers in the handle, so each chunk re-descends
//! from the root rather than trusting a saved path.

use std::collections::VecDeque;

use crate::error::{BrambleError, Result};
use crate::tree::handle::Tree;
use crate::tree::node::Location;
use crate::value::TreeValue;

/// Ascending iterator over values `>= start`
///
/// Yields `Result<V>`: faulting a node can fail (absent key, decode error),
/// and the failure surfaces in-stream at the boundary where it happened.
pub struct RangeIter<'a, V: TreeValue> {
    tree: &'a mut Tree<V>,
    /// Current chunk: a leaf's tail plus its trailing splitter
    buffer: VecDeque<V>,
    /// Splitter to pivot the next chunk on once the buffer drains
    pivot: Option<V>,
    /// Start value, consumed by the first chunk
    start: Option<V>,
    done: bool,
}

impl<'a, V: TreeValue> RangeIter<'a, V> {
    pub(crate) fn new(tree: &'a mut Tree<V>, start: V) -> Self {
        Self {
            tree,
            buffer: VecDeque::new(),
            pivot: None,
            start: Some(start),
            done: false,
        }
    }

    /// First chunk: descend toward `start`
    ///
    /// If the descent hits `start` as a splitter the chunk is just `[start]`
    /// (the value lives in an internal node); continuation pivots on it.
    /// Otherwise the chunk is the reached leaf's tail `>= start`.
    fn seek(&mut self, start: &V) -> Result<()> {
        let mut current = self.tree.resident_root()?;
        let mut bound: Option<V> = None;
        loop {
            if self.tree.node(current)?.is_leaf() {
                let node = self.tree.node(current)?;
                self.buffer.extend(node.values_from(start).cloned());
                self.finish_chunk(bound);
                return Ok(());
            }
            match self.tree.node(current)?.locate(start) {
                Location::OnSplitter(_) => {
                    self.buffer.push_back(start.clone());
                    self.pivot = Some(start.clone());
                    return Ok(());
                }
                Location::InChild(index) => {
                    let node = self.tree.node(current)?;
                    if let Some(splitter) = node.splitter_at(index) {
                        bound = Some(splitter.clone());
                    }
                    let child = node.children()[index].clone();
                    current = self.tree.ensure_child_resident(current, child)?;
                }
            }
        }
    }

    /// Next chunk: the leaf immediately after the `pivot` splitter
    ///
    /// Finds the node holding `pivot`, steps into the child to its right,
    /// and descends that child's left spine to a leaf. Every value there is
    /// greater than `pivot`, so the whole leaf is buffered.
    fn advance(&mut self, pivot: &V) -> Result<()> {
        let mut current = self.tree.resident_root()?;
        let mut bound: Option<V> = None;

        // Locate the child immediately after the pivot splitter. Loads
        // never move splitters, so the pivot is still present somewhere on
        // this path.
        loop {
            if self.tree.node(current)?.is_leaf() {
                return Err(BrambleError::InvariantViolation(
                    "iterator pivot vanished from the tree".to_string(),
                ));
            }
            match self.tree.node(current)?.locate(pivot) {
                Location::OnSplitter(index) => {
                    let node = self.tree.node(current)?;
                    if let Some(splitter) = node.splitter_at(index + 1) {
                        bound = Some(splitter.clone());
                    }
                    let child = node.children()[index + 1].clone();
                    current = self.tree.ensure_child_resident(current, child)?;
                    break;
                }
                Location::InChild(index) => {
                    let node = self.tree.node(current)?;
                    if let Some(splitter) = node.splitter_at(index) {
                        bound = Some(splitter.clone());
                    }
                    let child = node.children()[index].clone();
                    current = self.tree.ensure_child_resident(current, child)?;
                }
            }
        }

        // Left spine down to the next leaf
        loop {
            if self.tree.node(current)?.is_leaf() {
                let node = self.tree.node(current)?;
                self.buffer.extend(node.values().iter().cloned());
                self.finish_chunk(bound);
                return Ok(());
            }
            let node = self.tree.node(current)?;
            if let Some(splitter) = node.splitter_at(0) {
                bound = Some(splitter.clone());
            }
            let child = node.children()[0].clone();
            current = self.tree.ensure_child_resident(current, child)?;
        }
    }

    /// Append the bounding splitter (if any) and arm it as the next pivot
    fn finish_chunk(&mut self, bound: Option<V>) {
        if let Some(splitter) = bound {
            self.buffer.push_back(splitter.clone());
            self.pivot = Some(splitter);
        }
    }
}

impl<'a, V: TreeValue> Iterator for RangeIter<'a, V> {
    type Item = Result<V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.buffer.pop_front() {
                return Some(Ok(value));
            }
            if self.done {
                return None;
            }
            let step = if let Some(start) = self.start.take() {
                self.seek(&start)
            } else if let Some(pivot) = self.pivot.take() {
                self.advance(&pivot)
            } else {
                self.done = true;
                continue;
            };
            if let Err(e) = step {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
