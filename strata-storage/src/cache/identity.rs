//! Identity cache: the typed, invariant-enforcing cache surface.

use super::traits::{CacheEntry, CacheProvider, CacheStats, CachedRecord};
use crate::cache::memory::InMemoryCacheProvider;
use serde_json::Value;
use std::sync::Arc;
use strata_core::{CacheError, Identity, Record, RecordId, StrataResult};

/// Configuration for the identity cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Compare content hashes when re-populating an already resolved
    /// identity; a mismatch is treated as corruption.
    pub verify_writes: bool,
    /// Pre-sized capacity for the in-memory provider.
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            verify_writes: true,
            initial_capacity: 256,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable write verification.
    pub fn with_verify_writes(mut self, verify: bool) -> Self {
        self.verify_writes = verify;
        self
    }

    /// Set the initial provider capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

/// Shared second-level cache keyed by record identity.
///
/// Enforces the caching invariants on top of a pluggable
/// [`CacheProvider`]:
///
/// - a resolved entry is read-only; re-inserting an identical value is an
///   idempotent overwrite
/// - a *different* resolved value for the same identity means the cache
///   can no longer be trusted: everything is evicted, then
///   [`CacheError::Corruption`] surfaces
/// - unresolved references never replace resolved entries
///
/// Reads never reach the backing store; a miss is `Ok(None)` and the
/// caller decides how to fall back. Cloning shares the provider.
#[derive(Clone)]
pub struct IdentityCache {
    provider: Arc<dyn CacheProvider>,
    verify_writes: bool,
}

impl IdentityCache {
    /// Create a cache over the given provider.
    pub fn new(provider: Arc<dyn CacheProvider>) -> Self {
        Self {
            provider,
            verify_writes: CacheConfig::default().verify_writes,
        }
    }

    /// Create a cache over the in-memory provider with default config.
    pub fn in_memory() -> Self {
        Self::in_memory_with(CacheConfig::default())
    }

    /// Create a cache over the in-memory provider with the given config.
    pub fn in_memory_with(config: CacheConfig) -> Self {
        Self {
            provider: Arc::new(InMemoryCacheProvider::with_capacity(config.initial_capacity)),
            verify_writes: config.verify_writes,
        }
    }

    /// Look up the raw entry for an identity.
    pub fn entry(&self, identity: &Identity) -> StrataResult<Option<CacheEntry>> {
        self.provider.get(identity)
    }

    /// Look up a resolved row. Unresolved references are misses.
    pub fn get_row(&self, identity: &Identity) -> StrataResult<Option<Value>> {
        Ok(self
            .provider
            .get(identity)?
            .as_ref()
            .and_then(CacheEntry::as_resolved)
            .map(|record| record.row.clone()))
    }

    /// Look up and deserialize a resolved record.
    pub fn get_record<T: Record>(&self, id: RecordId) -> StrataResult<Option<T>> {
        let identity = Identity::new(T::record_type(), id);
        let Some(row) = self.get_row(&identity)? else {
            return Ok(None);
        };
        let record = serde_json::from_value(row).map_err(|e| CacheError::Deserialization {
            record_type: identity.record_type,
            id: identity.id,
            reason: e.to_string(),
        })?;
        Ok(Some(record))
    }

    /// Populate the cache with a resolved row.
    ///
    /// Re-inserting an identical row is idempotent. If the identity was
    /// already resolved to *different* content the immutability invariant
    /// is broken: the whole cache is evicted before the error surfaces.
    pub fn insert_row(&self, identity: Identity, row: Value) -> StrataResult<()> {
        let record = CachedRecord::new(&identity, row)?;
        let content_hash = record.content_hash;
        let previous = self.provider.put(identity, CacheEntry::Resolved(record))?;
        if self.verify_writes {
            if let Some(CacheEntry::Resolved(existing)) = previous {
                if existing.content_hash != content_hash {
                    tracing::warn!(%identity, "resolved entry mismatch, evicting entire cache");
                    self.provider.evict_all()?;
                    return Err(CacheError::Corruption {
                        record_type: identity.record_type,
                        id: identity.id,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Serialize and populate the cache with a typed record.
    pub fn insert_record<T: Record>(&self, record: &T) -> StrataResult<()> {
        let identity = record.identity();
        let row = serde_json::to_value(record).map_err(|e| CacheError::Serialization {
            record_type: identity.record_type,
            id: identity.id,
            reason: e.to_string(),
        })?;
        self.insert_row(identity, row)
    }

    /// Record an unresolved reference for an association member. Has no
    /// effect when any entry already exists for the identity.
    pub fn insert_reference(&self, identity: Identity) -> StrataResult<()> {
        self.provider.put_reference(identity)
    }

    /// Drop every entry. Synchronous: completes before returning, so no
    /// load that starts afterwards can observe pre-eviction data.
    pub fn evict_all(&self) -> StrataResult<()> {
        self.provider.evict_all()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> StrataResult<CacheStats> {
        self.provider.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::BTreeSet;
    use strata_core::{AttributeDescriptor, RecordType, StrataError, TypeManifest};

    const COLOR: RecordType = RecordType::new("Color");

    static COLOR_MANIFEST: TypeManifest = TypeManifest::new(
        COLOR,
        &[
            AttributeDescriptor::scalar("id"),
            AttributeDescriptor::scalar("name"),
        ],
    );

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Color {
        id: i64,
        name: String,
    }

    impl Record for Color {
        fn record_type() -> RecordType {
            COLOR
        }

        fn manifest() -> &'static TypeManifest {
            &COLOR_MANIFEST
        }

        fn record_id(&self) -> i64 {
            self.id
        }

        fn association(&self, _attribute: &str) -> Option<&BTreeSet<i64>> {
            None
        }
    }

    fn make_color(id: i64, name: &str) -> Color {
        Color {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_get_miss_returns_none() {
        let cache = IdentityCache::in_memory();
        assert!(cache.get_record::<Color>(1).unwrap().is_none());
    }

    #[test]
    fn test_insert_then_get_roundtrip() {
        let cache = IdentityCache::in_memory();
        let color = make_color(1, "red");
        cache.insert_record(&color).unwrap();
        let cached = cache.get_record::<Color>(1).unwrap().unwrap();
        assert_eq!(cached, color);
    }

    #[test]
    fn test_identical_reinsert_is_idempotent() {
        let cache = IdentityCache::in_memory();
        let color = make_color(1, "red");
        cache.insert_record(&color).unwrap();
        cache.insert_record(&color).unwrap();
        assert_eq!(cache.stats().unwrap().entry_count, 1);
    }

    #[test]
    fn test_conflicting_reinsert_is_corruption_and_evicts_all() {
        let cache = IdentityCache::in_memory();
        cache.insert_record(&make_color(1, "red")).unwrap();
        cache.insert_record(&make_color(2, "blue")).unwrap();

        let err = cache.insert_record(&make_color(1, "crimson")).unwrap_err();
        assert_eq!(
            err,
            StrataError::Cache(CacheError::Corruption {
                record_type: COLOR,
                id: 1
            })
        );
        // The cache can no longer be trusted: everything is gone.
        assert_eq!(cache.stats().unwrap().entry_count, 0);
        assert!(cache.get_record::<Color>(2).unwrap().is_none());
    }

    #[test]
    fn test_verify_writes_disabled_lets_last_writer_win() {
        let cache = IdentityCache::in_memory_with(CacheConfig::new().with_verify_writes(false));
        cache.insert_record(&make_color(1, "red")).unwrap();
        cache.insert_record(&make_color(1, "crimson")).unwrap();
        let cached = cache.get_record::<Color>(1).unwrap().unwrap();
        assert_eq!(cached.name, "crimson");
    }

    #[test]
    fn test_reference_does_not_resolve_or_downgrade() {
        let cache = IdentityCache::in_memory();
        let identity = Identity::new(COLOR, 1);
        cache.insert_reference(identity).unwrap();
        assert!(cache.get_record::<Color>(1).unwrap().is_none());
        assert!(!cache.entry(&identity).unwrap().unwrap().is_resolved());

        cache.insert_record(&make_color(1, "red")).unwrap();
        cache.insert_reference(identity).unwrap();
        assert!(cache.entry(&identity).unwrap().unwrap().is_resolved());
    }

    #[test]
    fn test_insert_row_accepts_type_erased_rows() {
        let cache = IdentityCache::in_memory();
        let identity = Identity::new(COLOR, 9);
        cache
            .insert_row(identity, json!({"id": 9, "name": "teal"}))
            .unwrap();
        let cached = cache.get_record::<Color>(9).unwrap().unwrap();
        assert_eq!(cached.name, "teal");
    }

    #[test]
    fn test_evict_all_then_miss() {
        let cache = IdentityCache::in_memory();
        cache.insert_record(&make_color(1, "red")).unwrap();
        cache.evict_all().unwrap();
        assert!(cache.get_record::<Color>(1).unwrap().is_none());
        assert_eq!(cache.stats().unwrap().entry_count, 0);
    }
}
