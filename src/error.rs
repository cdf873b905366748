//! Error types surfaced by configuration and invariant checking.

use thiserror::Error;

/// Rejected map configuration.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("capacity {0} cannot be rounded up to a power of two")]
    CapacityOverflow(usize),
    #[error("load factor must be finite and at least 0.05, got {0}")]
    InvalidLoadFactor(f32),
}

/// A broken structural invariant found by `validate`. Any of these means a
/// bug in the map, never a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("bucket {bucket}: root is red")]
    RedRoot { bucket: usize },
    #[error("bucket {bucket}: red node has a red child")]
    RedRed { bucket: usize },
    #[error("bucket {bucket}: black height {left} on the left, {right} on the right")]
    BlackHeight {
        bucket: usize,
        left: usize,
        right: usize,
    },
    #[error("bucket {bucket}: parent link does not match the tree shape")]
    ParentLink { bucket: usize },
    #[error("bucket {bucket}: entries out of order")]
    OutOfOrder { bucket: usize },
    #[error("bucket {bucket}: duplicate key")]
    DuplicateKey { bucket: usize },
    #[error("bucket {bucket}: holds an entry that hashes to bucket {expected}")]
    Misplaced { bucket: usize, expected: usize },
    #[error("{reachable} entries reachable from the table but len is {len}")]
    LenMismatch { reachable: usize, len: usize },
    #[error("{linked} entries carry order links but len is {len}")]
    OrderLenMismatch { linked: usize, len: usize },
    #[error("order list head or tail is missing or not at an end")]
    OrderAnchor,
    #[error("order list back link does not match the forward walk")]
    OrderBackLink,
    #[error("order list walk visited {visited} entries but len is {len}")]
    OrderWalk { visited: usize, len: usize },
}
