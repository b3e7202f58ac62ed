//! Cache provider trait and entry types.

use serde_json::Value;
use strata_core::{
    compute_content_hash, CacheError, ContentHash, Identity, StrataResult, Timestamp,
};

/// A resolved record as held by the cache: the type-erased row, a content
/// hash for integrity checks, and when it was cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecord {
    pub row: Value,
    pub content_hash: ContentHash,
    pub cached_at: Timestamp,
}

impl CachedRecord {
    /// Build a cached record from a row, hashing its canonical JSON form.
    pub fn new(identity: &Identity, row: Value) -> StrataResult<Self> {
        let canonical = serde_json::to_string(&row).map_err(|e| CacheError::Serialization {
            record_type: identity.record_type,
            id: identity.id,
            reason: e.to_string(),
        })?;
        Ok(Self {
            content_hash: compute_content_hash(canonical.as_bytes()),
            cached_at: chrono::Utc::now(),
            row,
        })
    }
}

/// A cache entry is either a fully materialized record or a reference:
/// identity known, attributes not yet fetched. References stand in for
/// association members before traversal; resolving one goes through the
/// loader, which makes the fetch point explicit instead of hiding it
/// behind a proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Resolved(CachedRecord),
    Unresolved(Identity),
}

impl CacheEntry {
    /// Whether this entry holds a materialized record.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The materialized record, if resolved.
    pub fn as_resolved(&self) -> Option<&CachedRecord> {
        match self {
            Self::Resolved(record) => Some(record),
            Self::Unresolved(_) => None,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered by a resolved entry.
    pub hits: u64,
    /// Reads that found nothing, or only an unresolved reference.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Entries dropped by `evict_all`.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Pluggable cache backend.
///
/// Implementations must be thread-safe and own their synchronization:
/// concurrent readers and writers never lock externally. A miss is
/// `Ok(None)`, never an error; `get` must not reach the backing store.
pub trait CacheProvider: Send + Sync {
    /// Look up an entry. Counts a hit only for resolved entries.
    fn get(&self, identity: &Identity) -> StrataResult<Option<CacheEntry>>;

    /// Store an entry, returning whatever it replaced.
    fn put(&self, identity: Identity, entry: CacheEntry) -> StrataResult<Option<CacheEntry>>;

    /// Store an unresolved reference unless any entry already exists.
    /// Never downgrades a resolved entry.
    fn put_reference(&self, identity: Identity) -> StrataResult<()>;

    /// Drop every entry, regardless of type. Synchronous: when this
    /// returns, no subsequent read observes pre-eviction data.
    fn evict_all(&self) -> StrataResult<()>;

    /// Get cache statistics.
    fn stats(&self) -> StrataResult<CacheStats>;
}
