//! Global cache invalidation.

use strata_core::StrataResult;
use strata_storage::IdentityCache;

/// Drops every identity-cache entry after bulk writes.
///
/// Invalidation is always global and synchronous: partial invalidation
/// would require dependency tracking across associations, which this
/// layer does not attempt. When `invalidate_all` returns, no subsequent
/// load can observe pre-invalidation cached data.
pub struct Invalidator {
    cache: IdentityCache,
}

impl Invalidator {
    /// Create an invalidator for the shared identity cache.
    pub fn new(cache: IdentityCache) -> Self {
        Self { cache }
    }

    /// Evict every cache entry, regardless of type.
    pub fn invalidate_all(&self) -> StrataResult<()> {
        tracing::info!("invalidating identity cache");
        self.cache.evict_all()
    }
}
