//! Shared second-level cache keyed by record identity.
//!
//! The identity cache outlives any single unit of work: every successful
//! backing-store read populates it, and later operations resolve records
//! from it without touching the store. Entries are read-only once
//! resolved; the only mutation besides population is the global,
//! synchronous `evict_all`.
//!
//! # Pluggable provider
//!
//! [`IdentityCache`] owns the caching invariants (idempotent puts,
//! corruption detection, no downgrade of resolved entries) and delegates
//! storage to a [`CacheProvider`]. The provider owns its own
//! synchronization, so callers never lock around cache access; swapping
//! the in-memory provider for another key-value store touches nothing in
//! the loader or unit-of-work layers.

pub mod identity;
pub mod memory;
pub mod traits;

pub use identity::{CacheConfig, IdentityCache};
pub use memory::InMemoryCacheProvider;
pub use traits::{CacheEntry, CacheProvider, CacheStats, CachedRecord};
