//! Backing-store traits and row types.
//!
//! The backing store is an external collaborator: it owns persistence,
//! transactions, and the declared attribute manifests. The loader never
//! talks to it except through [`BackingStore`], so a relational engine
//! can replace [`crate::MemoryStore`] without touching the cache or
//! session layers.

use serde_json::Value;
use std::fmt;
use strata_core::{
    FetchPlan, Identity, Record, RecordId, RecordType, StoreError, StrataResult, TypeManifest,
};
use uuid::Uuid;

/// Opaque handle for a store transaction, minted by `begin_transaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionToken(Uuid);

impl TransactionToken {
    /// Mint a fresh token. UUIDv7, so tokens sort by creation time.
    pub fn mint() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One fetched row: the record's identity plus its assembled JSON object.
///
/// The row always carries the record's association identity arrays; the
/// fetch plan only controls whether peer rows are materialized alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRow {
    pub identity: Identity,
    pub row: Value,
}

/// Result of a single backing-store query.
///
/// `associated` holds the deduplicated peer rows for every association
/// attribute named in the fetch plan, in deterministic (type, id) order.
/// It is empty for scalar-only plans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSet {
    pub records: Vec<FetchedRow>,
    pub associated: Vec<FetchedRow>,
}

/// Backing-store call counters, used to assert round-trip behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of `fetch_by_id` queries issued.
    pub fetch_by_id_calls: u64,
    /// Number of `fetch_all` queries issued.
    pub fetch_all_calls: u64,
    /// Number of rows persisted.
    pub persist_calls: u64,
    /// Transactions begun but not yet committed or rolled back.
    pub open_transactions: u64,
}

impl StoreStats {
    /// Total queries issued against the store.
    pub fn total_fetches(&self) -> u64 {
        self.fetch_by_id_calls + self.fetch_all_calls
    }
}

/// The backing relational store.
///
/// Implementations must be thread-safe (`Send + Sync`) and synchronous:
/// every call blocks the caller until the store answers. Each
/// `fetch_by_id`/`fetch_all` call counts as exactly one query.
pub trait BackingStore: Send + Sync {
    // === Transactions ===

    /// Begin a transaction scoped to one unit of work.
    fn begin_transaction(&self) -> StrataResult<TransactionToken>;

    /// Commit a transaction. Completing an unknown token is an error.
    fn commit(&self, tx: TransactionToken) -> StrataResult<()>;

    /// Roll back a transaction. Completing an unknown token is an error.
    fn rollback(&self, tx: TransactionToken) -> StrataResult<()>;

    // === Fetching ===

    /// Fetch one record by identity.
    ///
    /// Returns `Ok(None)` when the record does not exist; the caller
    /// decides whether that is an error. Peer rows for association
    /// attributes named in the plan are materialized in the same query.
    fn fetch_by_id(
        &self,
        record_type: RecordType,
        id: RecordId,
        plan: &FetchPlan,
    ) -> StrataResult<Option<FetchSet>>;

    /// Fetch every record of a type in one query.
    fn fetch_all(&self, record_type: RecordType, plan: &FetchPlan) -> StrataResult<FetchSet>;

    // === Writing (fixture setup; records are immutable once persisted) ===

    /// Persist a new row. A duplicate identity is `AlreadyExists`.
    fn persist(&self, record_type: RecordType, id: RecordId, row: Value) -> StrataResult<()>;

    // === Metadata ===

    /// The declared attribute manifest for a record type.
    fn manifest(&self, record_type: RecordType) -> StrataResult<&'static TypeManifest>;

    /// Snapshot of the store's call counters.
    fn stats(&self) -> StoreStats;

    /// Serialize and persist a typed record.
    fn persist_record<T: Record>(&self, record: &T) -> StrataResult<()>
    where
        Self: Sized,
    {
        let row = serde_json::to_value(record).map_err(|e| StoreError::MalformedRow {
            record_type: T::record_type(),
            id: record.record_id(),
            reason: e.to_string(),
        })?;
        self.persist(T::record_type(), record.record_id(), row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_tokens_are_unique() {
        let a = TransactionToken::mint();
        let b = TransactionToken::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_store_stats_total_fetches() {
        let stats = StoreStats {
            fetch_by_id_calls: 3,
            fetch_all_calls: 2,
            ..Default::default()
        };
        assert_eq!(stats.total_fetches(), 5);
    }
}
