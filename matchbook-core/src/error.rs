//! Error types for matchbook operations

use thiserror::Error;

/// Validation errors raised at the decode boundary.
///
/// Raw payloads are turned into typed records in one place; anything
/// missing or malformed fails here instead of surfacing later as an
/// attribute-access failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Malformed payload: {reason}")]
    InvalidShape { reason: String },
}

/// Storage layer errors, shared by the ephemeral cache and the durable
/// result store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing container could not be fetched or created. Fatal at
    /// construction time.
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Read failed for {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Write failed for {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Master error type for all matchbook operations.
///
/// No operation retries internally; every variant is fatal to the call
/// that produced it and retry/backoff belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum MatchbookError {
    /// Non-200 status from the remote matching service.
    #[error("Invalid response code: {status}, url: {url}")]
    InvalidStatus { status: u16, url: String },

    /// The request never produced a usable response (connect failure,
    /// timeout, unreadable body).
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// 200 status but the service flagged the lookup as failed.
    #[error("Error returned by Civis: id: {error_id}, message: {message}, url: {url}")]
    Service {
        error_id: i64,
        message: String,
        url: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for matchbook operations.
pub type MatchbookResult<T> = Result<T, MatchbookError>;

// =============================================================================
// TESTS
// =============================================================================
