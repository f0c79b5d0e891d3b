//! Error types for bramble
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BrambleError
pub type Result<T> = std::result::Result<T, BrambleError>;

/// Unified error type for bramble operations
#[derive(Debug, Error)]
pub enum BrambleError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    /// A storage key the tree believes in could not be fetched. Indicates
    /// storage corruption or a mismatch between node and metadata storage.
    #[error("Storage key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    /// Bytes under `key` failed to decompress or parse. Carries the key and
    /// the raw byte count for forensic logging.
    #[error("Failed to decode node at {key} ({byte_count} bytes): {reason}")]
    Decode {
        key: String,
        byte_count: usize,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialize(String),

    // -------------------------------------------------------------------------
    // Invariant Violations
    // -------------------------------------------------------------------------
    /// A structural invariant was broken. These are fatal programmer errors;
    /// the handle may be torn down.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
