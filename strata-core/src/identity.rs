//! Identity types for STRATA records

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// Scalar record identifier. Maps to a relational BIGINT primary key.
pub type RecordId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash for idempotent-put detection and integrity checks.
pub type ContentHash = [u8; 32];

/// Record type discriminator.
///
/// Wraps the type's declared name rather than enumerating types in this
/// crate, so domain crates can declare their own record types while the
/// cache and store still key on a cheap, copyable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordType(&'static str);

impl RecordType {
    /// Create a record type from its declared name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The declared type name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The (type, identifier) pair that names a record.
///
/// Globally unique and never reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub record_type: RecordType,
    pub id: RecordId,
}

impl Identity {
    /// Create an identity from a record type and id.
    pub const fn new(record_type: RecordType, id: RecordId) -> Self {
        Self { record_type, id }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.record_type, self.id)
    }
}

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_name_and_display() {
        let rt = RecordType::new("Language");
        assert_eq!(rt.name(), "Language");
        assert_eq!(rt.to_string(), "Language");
    }

    #[test]
    fn test_identity_display() {
        let identity = Identity::new(RecordType::new("Book"), 42);
        assert_eq!(identity.to_string(), "Book/42");
    }

    #[test]
    fn test_identity_equality_is_type_and_id() {
        let a = Identity::new(RecordType::new("Book"), 1);
        let b = Identity::new(RecordType::new("Book"), 1);
        let c = Identity::new(RecordType::new("Language"), 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let first = compute_content_hash(b"same bytes");
        let second = compute_content_hash(b"same bytes");
        let other = compute_content_hash(b"other bytes");
        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}
