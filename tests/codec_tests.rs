//! Tests for the node codec
//!
//! These tests verify:
//! - Encode/decode round-trips through compression
//! - Content-hash determinism and storage key format
//! - Decode failure forensics

use bramble::codec::{content_hash, decode_node, encode_node};
use bramble::{BrambleError, Node, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn leaf_with(values: &[i64]) -> Node<i64> {
    let mut node = Node::leaf();
    for &v in values {
        node.insert_value(v);
    }
    node
}

// =============================================================================
// Round-Trips
// =============================================================================

#[test]
fn test_empty_leaf_round_trips() {
    let node: Node<i64> = Node::leaf();
    let bytes = encode_node(&node).unwrap();
    let decoded: Node<i64> = decode_node("test", &bytes).unwrap();

    assert_eq!(decoded, node);
    assert!(decoded.is_leaf());
}

#[test]
fn test_leaf_round_trips() {
    let node = leaf_with(&[3, 1, 4, 1, 5, 9, 2, 6]);
    let bytes = encode_node(&node).unwrap();
    let decoded: Node<i64> = decode_node("test", &bytes).unwrap();

    assert_eq!(decoded, node);
    assert_eq!(
        decoded.values().iter().copied().collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6, 9]
    );
}

#[test]
fn test_heterogeneous_leaf_round_trips() {
    let mut node: Node<Value> = Node::leaf();
    node.insert_value(Value::from(42i64));
    node.insert_value(Value::from(2.5));
    node.insert_value(Value::from("name"));
    node.insert_value(Value::keyword("attr"));
    node.insert_value(Value::tuple(vec![Value::from(1i64), Value::from("x")]));

    let bytes = encode_node(&node).unwrap();
    let decoded: Node<Value> = decode_node("test", &bytes).unwrap();

    assert_eq!(decoded, node);
}

// =============================================================================
// Content Addressing
// =============================================================================

#[test]
fn test_equal_nodes_encode_to_equal_bytes() {
    // Insertion order must not leak into the encoding
    let a = leaf_with(&[1, 2, 3]);
    let b = leaf_with(&[3, 2, 1]);

    let bytes_a = encode_node(&a).unwrap();
    let bytes_b = encode_node(&b).unwrap();

    assert_eq!(bytes_a, bytes_b);
    assert_eq!(content_hash(&bytes_a), content_hash(&bytes_b));
}

#[test]
fn test_different_nodes_get_different_keys() {
    let bytes_a = encode_node(&leaf_with(&[1, 2, 3])).unwrap();
    let bytes_b = encode_node(&leaf_with(&[1, 2, 4])).unwrap();

    assert_ne!(content_hash(&bytes_a), content_hash(&bytes_b));
}

#[test]
fn test_storage_key_format() {
    let key = content_hash(&encode_node(&leaf_with(&[7])).unwrap());

    assert_eq!(key.len(), 64);
    assert!(key
        .chars()
        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
}

// =============================================================================
// Decode Failures
// =============================================================================

#[test]
fn test_garbage_bytes_fail_with_key_context() {
    let result: Result<Node<i64>, _> = decode_node("DEADBEEF", b"not deflate data");

    match result {
        Err(BrambleError::Decode { key, byte_count, .. }) => {
            assert_eq!(key, "DEADBEEF");
            assert_eq!(byte_count, 16);
        }
        other => panic!("expected decode error, got {:?}", other.map(|_| ())),
    }
}
