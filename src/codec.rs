//! Node codec
//!
//! Serialization, compression, and content hashing for persisted nodes.
//!
//! ## Payload Format
//!
//! A persisted node is DEFLATE-compressed JSON:
//!
//! ```text
//! {"values": [v, ...], "child_ids": [id, ...]}
//! ```
//!
//! `child_ids` is omitted for leaves. Child ids serialize as numbers
//! (resident) or 64-char hex strings (persisted); only all-persisted lists
//! ever reach storage because eviction is bottom-up.
//!
//! Encoding is deterministic: values serialize in sorted-set order and
//! fields in declaration order, so two equal nodes produce identical bytes
//! and therefore the same storage key.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::error::{BrambleError, Result};
use crate::tree::Node;
use crate::value::TreeValue;

/// Encode a node to its compressed byte payload
pub fn encode_node<V: TreeValue>(node: &Node<V>) -> Result<Vec<u8>> {
    let json =
        serde_json::to_vec(node).map_err(|e| BrambleError::Serialize(e.to_string()))?;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Decode a node from its compressed byte payload
///
/// `key` is the storage key the bytes were fetched under; it is carried into
/// any decode error for forensic logging. Values re-materialize into a
/// sorted set under `V`'s order.
pub fn decode_node<V: TreeValue>(key: &str, bytes: &[u8]) -> Result<Node<V>> {
    let mut json = Vec::new();
    DeflateDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| decode_error(key, bytes.len(), &e.to_string()))?;

    serde_json::from_slice(&json).map_err(|e| decode_error(key, bytes.len(), &e.to_string()))
}

/// Content hash of a byte payload: uppercase hex SHA-256, 64 characters
///
/// This is the storage key of a persisted node.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

fn decode_error(key: &str, byte_count: usize, reason: &str) -> BrambleError {
    BrambleError::Decode {
        key: key.to_string(),
        byte_count,
        reason: reason.to_string(),
    }
}
