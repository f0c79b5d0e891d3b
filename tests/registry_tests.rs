//! Tests for the root registry and garbage identification
//!
//! These tests verify:
//! - Root snapshots accumulate with monotone stored times
//! - Reachability over metadata child ids
//! - Garbage identification and caller-driven sweeping
//! - Resuming a handle from the latest root

use std::collections::BTreeSet;
use std::thread::sleep;
use std::time::Duration;

use bramble::{
    BrambleError, Config, DirectoryStorage, MemoryStorage, NodeMeta, Registry, Tree,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn tree_with_max(max: usize) -> Tree<i64> {
    Tree::new(
        Config::builder().max_node_values(max).build().unwrap(),
        Box::new(MemoryStorage::new()),
        Box::new(MemoryStorage::new()),
    )
    .unwrap()
}

fn collect_from(tree: &mut Tree<i64>, start: i64) -> Vec<i64> {
    tree.iter_from(&start)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

// =============================================================================
// Registry Primitives
// =============================================================================

#[test]
fn test_roots_start_empty() {
    let registry = Registry::new(Box::new(MemoryStorage::new()));
    assert_eq!(registry.roots().unwrap(), vec![]);
    assert_eq!(registry.latest_root().unwrap(), None);
}

#[test]
fn test_node_meta_round_trip() {
    let registry = Registry::new(Box::new(MemoryStorage::new()));
    let meta = NodeMeta {
        child_ids: Some(vec!["A".repeat(64), "B".repeat(64)]),
        value_count: 1,
        storage_byte_count: 120,
    };

    registry.put_node_meta("KEY", &meta).unwrap();
    assert_eq!(registry.node_meta("KEY").unwrap(), meta);
}

#[test]
fn test_missing_node_meta_is_not_found() {
    let registry = Registry::new(Box::new(MemoryStorage::new()));
    let result = registry.node_meta("ABSENT");
    assert!(matches!(result, Err(BrambleError::KeyNotFound(_))));
}

#[test]
fn test_collect_reachable_walks_child_ids() {
    let registry = Registry::new(Box::new(MemoryStorage::new()));
    let leaf = NodeMeta {
        child_ids: None,
        value_count: 2,
        storage_byte_count: 40,
    };
    registry.put_node_meta("LEFT", &leaf).unwrap();
    registry.put_node_meta("RIGHT", &leaf).unwrap();
    registry
        .put_node_meta(
            "ROOT",
            &NodeMeta {
                child_ids: Some(vec!["LEFT".to_string(), "RIGHT".to_string()]),
                value_count: 1,
                storage_byte_count: 60,
            },
        )
        .unwrap();

    let mut reachable = BTreeSet::new();
    registry.collect_reachable("ROOT", &mut reachable).unwrap();

    let expected: BTreeSet<String> = ["ROOT", "LEFT", "RIGHT"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(reachable, expected);
}

// =============================================================================
// Root Snapshots
// =============================================================================

#[test]
fn test_store_root_twice_accumulates_monotone_snapshots() {
    let mut tree = tree_with_max(3);
    for v in 0..10 {
        tree.insert(v).unwrap();
    }
    let first = tree.store_root(serde_json::json!({})).unwrap();

    for v in 10..20 {
        tree.insert(v).unwrap();
    }
    sleep(Duration::from_millis(2));
    let second = tree.store_root(serde_json::json!({"batch": 2})).unwrap();

    let roots = tree.roots().unwrap();
    assert_eq!(roots.len(), 2);
    assert!(second.stored_time > first.stored_time);
    assert_ne!(first.storage_key, second.storage_key);
    assert_eq!(tree.latest_root().unwrap(), &second);

    // Both committed trees are fully anchored: nothing in node storage is
    // unreachable from the root set
    assert!(tree.unused_storage_keys().unwrap().is_empty());
}

#[test]
fn test_store_root_keeps_tree_readable() {
    let mut tree = tree_with_max(3);
    for v in 0..15 {
        tree.insert(v).unwrap();
    }
    tree.store_root(serde_json::json!({"tag": "checkpoint"})).unwrap();

    assert_eq!(tree.resident_count(), 0);
    assert_eq!(collect_from(&mut tree, 0), (0..15).collect::<Vec<_>>());
}

#[test]
fn test_snapshot_metadata_round_trips() {
    let mut tree = tree_with_max(3);
    tree.insert(1).unwrap();
    tree.store_root(serde_json::json!({"writer": "test", "generation": 7}))
        .unwrap();

    let roots = tree.roots().unwrap();
    assert_eq!(roots[0].metadata["generation"], 7);
    assert_eq!(roots[0].metadata["writer"], "test");
}

// =============================================================================
// Garbage Identification
// =============================================================================

#[test]
fn test_uncommitted_unload_leaves_garbage() {
    let mut tree = tree_with_max(3);
    for v in 0..10 {
        tree.insert(v).unwrap();
    }
    tree.store_root(serde_json::json!({})).unwrap();

    // Mutate and spill without committing: the rewritten path is orphaned
    for v in 10..15 {
        tree.insert(v).unwrap();
    }
    tree.unload_tree().unwrap();

    let unused = tree.unused_storage_keys().unwrap();
    assert!(!unused.is_empty());
}

#[test]
fn test_sweep_unused_removes_only_garbage() {
    let mut tree = tree_with_max(3);
    for v in 0..10 {
        tree.insert(v).unwrap();
    }
    let committed = tree.store_root(serde_json::json!({})).unwrap();

    for v in 10..15 {
        tree.insert(v).unwrap();
    }
    tree.unload_tree().unwrap();

    let unused = tree.unused_storage_keys().unwrap();
    let swept = tree.sweep_unused().unwrap();
    assert_eq!(swept, unused.len());
    assert!(tree.unused_storage_keys().unwrap().is_empty());

    // The committed tree survived the sweep
    let mut live = BTreeSet::new();
    tree.registry()
        .collect_reachable(&committed.storage_key, &mut live)
        .unwrap();
    for key in &live {
        assert!(tree.node_storage().get(key).unwrap().is_some());
    }
}

// =============================================================================
// Resuming From a Snapshot
// =============================================================================

#[test]
fn test_from_latest_root_resumes_committed_tree() {
    let temp = TempDir::new().unwrap();
    let nodes_dir = temp.path().join("nodes");
    let meta_dir = temp.path().join("meta");

    {
        let mut tree: Tree<i64> = Tree::new(
            Config::builder().max_node_values(3).build().unwrap(),
            Box::new(DirectoryStorage::open(&nodes_dir).unwrap()),
            Box::new(DirectoryStorage::open(&meta_dir).unwrap()),
        )
        .unwrap();
        for v in 0..20 {
            tree.insert(v).unwrap();
        }
        tree.store_root(serde_json::json!({})).unwrap();
    }

    let mut resumed: Tree<i64> = Tree::from_latest_root(
        Config::builder().max_node_values(3).build().unwrap(),
        Box::new(DirectoryStorage::open(&nodes_dir).unwrap()),
        Box::new(DirectoryStorage::open(&meta_dir).unwrap()),
    )
    .unwrap();

    assert_eq!(collect_from(&mut resumed, 0), (0..20).collect::<Vec<_>>());
}

#[test]
fn test_from_latest_root_without_roots_fails() {
    let result: Result<Tree<i64>, _> = Tree::from_latest_root(
        Config::default(),
        Box::new(MemoryStorage::new()),
        Box::new(MemoryStorage::new()),
    );

    assert!(matches!(result, Err(BrambleError::KeyNotFound(_))));
}

#[test]
fn test_resumed_tree_accepts_new_inserts() {
    let temp = TempDir::new().unwrap();
    let nodes_dir = temp.path().join("nodes");
    let meta_dir = temp.path().join("meta");

    {
        let mut tree: Tree<i64> = Tree::new(
            Config::builder().max_node_values(3).build().unwrap(),
            Box::new(DirectoryStorage::open(&nodes_dir).unwrap()),
            Box::new(DirectoryStorage::open(&meta_dir).unwrap()),
        )
        .unwrap();
        for v in 0..10 {
            tree.insert(v).unwrap();
        }
        tree.store_root(serde_json::json!({})).unwrap();
    }

    let mut resumed: Tree<i64> = Tree::from_latest_root(
        Config::builder().max_node_values(3).build().unwrap(),
        Box::new(DirectoryStorage::open(&nodes_dir).unwrap()),
        Box::new(DirectoryStorage::open(&meta_dir).unwrap()),
    )
    .unwrap();
    for v in 10..20 {
        resumed.insert(v).unwrap();
    }

    assert_eq!(collect_from(&mut resumed, 0), (0..20).collect::<Vec<_>>());
}
