//! Error types for DISPATCH operations

use thiserror::Error;

/// Durable keyed store errors.
///
/// These are infrastructure failures, not condition-failed writes. A caller
/// seeing one of these must treat the operation as unknown-outcome and may
/// retry; a retry will observe whatever state the first attempt left behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Record serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Delivery pipeline errors.
///
/// A delivery failure is never swallowed: the lease manager converts it into
/// a `Fail` transition so the conversation enters its error cooldown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery endpoint returned status {status}")]
    EndpointStatus { status: u16 },

    #[error("Delivery request failed: {reason}")]
    Request { reason: String },

    #[error("Delivery timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
