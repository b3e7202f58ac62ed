//! Error types for STRATA operations

use crate::identity::{RecordId, RecordType};
use thiserror::Error;

/// Backing-store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {record_type} with id {id}")]
    NotFound {
        record_type: RecordType,
        id: RecordId,
    },

    #[error("Backing store unavailable for {record_type}{}: {reason}", .id.map(|i| format!(" with id {i}")).unwrap_or_default())]
    Unavailable {
        record_type: RecordType,
        id: Option<RecordId>,
        reason: String,
    },

    #[error("Record already exists: {record_type} with id {id}")]
    AlreadyExists {
        record_type: RecordType,
        id: RecordId,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("No manifest registered for record type {record_type}")]
    UnknownType { record_type: RecordType },

    #[error("Malformed row for {record_type} with id {id}: {reason}")]
    MalformedRow {
        record_type: RecordType,
        id: RecordId,
        reason: String,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Cache-layer errors. Cache misses are control flow, never errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Cache corruption detected for {record_type} with id {id}")]
    Corruption {
        record_type: RecordType,
        id: RecordId,
    },

    #[error("Failed to serialize {record_type} with id {id}: {reason}")]
    Serialization {
        record_type: RecordType,
        id: RecordId,
        reason: String,
    },

    #[error("Failed to deserialize {record_type} with id {id}: {reason}")]
    Deserialization {
        record_type: RecordType,
        id: RecordId,
        reason: String,
    },
}

/// Unit-of-work contract violations. These are programming errors and are
/// fatal, not retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {operation}: unit of work is {state}, not Open")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Unknown attribute {attribute:?} on record type {record_type}")]
    UnknownAttribute {
        record_type: RecordType,
        attribute: String,
    },

    #[error("Attribute {attribute:?} on record type {record_type} is not an association")]
    NotAnAssociation {
        record_type: RecordType,
        attribute: String,
    },

    #[error("Association {attribute:?} on {record_type} targets {expected}, not {actual}")]
    AssociationTargetMismatch {
        record_type: RecordType,
        attribute: String,
        expected: RecordType,
        actual: RecordType,
    },
}

/// Master error type for all STRATA errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrataError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Result type alias for STRATA operations.
pub type StrataResult<T> = Result<T, StrataError>;

// =============================================================================
// TESTS
// =============================================================================
