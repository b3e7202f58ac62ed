//! In-memory cache provider.

use super::traits::{CacheEntry, CacheProvider, CacheStats};
use std::collections::HashMap;
use std::sync::RwLock;
use strata_core::{CacheError, Identity, StrataResult};

/// Process-wide in-memory cache over an `RwLock`-guarded map.
///
/// Read-mostly: `get` takes the read lock; only population and eviction
/// take the write lock. Eviction and expiry policy beyond `evict_all`
/// belongs to whichever provider replaces this one.
#[derive(Debug, Default)]
pub struct InMemoryCacheProvider {
    entries: RwLock<HashMap<Identity, CacheEntry>>,
    stats: RwLock<CacheStats>,
}

impl InMemoryCacheProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with pre-sized storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    fn record_read(&self, hit: bool) -> StrataResult<()> {
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        if hit {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        Ok(())
    }
}

impl CacheProvider for InMemoryCacheProvider {
    fn get(&self, identity: &Identity) -> StrataResult<Option<CacheEntry>> {
        let entry = {
            let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
            entries.get(identity).cloned()
        };
        let hit = entry.as_ref().is_some_and(CacheEntry::is_resolved);
        self.record_read(hit)?;
        Ok(entry)
    }

    fn put(&self, identity: Identity, entry: CacheEntry) -> StrataResult<Option<CacheEntry>> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let previous = entries.insert(identity, entry);
        let count = entries.len() as u64;
        drop(entries);
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        stats.entry_count = count;
        Ok(previous)
    }

    fn put_reference(&self, identity: Identity) -> StrataResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries
            .entry(identity)
            .or_insert(CacheEntry::Unresolved(identity));
        let count = entries.len() as u64;
        drop(entries);
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        stats.entry_count = count;
        Ok(())
    }

    fn evict_all(&self) -> StrataResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let evicted = entries.len() as u64;
        entries.clear();
        drop(entries);
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        stats.evictions += evicted;
        stats.entry_count = 0;
        Ok(())
    }

    fn stats(&self) -> StrataResult<CacheStats> {
        self.stats
            .read()
            .map(|s| *s)
            .map_err(|_| CacheError::LockPoisoned.into())
    }
}
