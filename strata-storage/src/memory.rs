//! In-memory backing store.
//!
//! Stand-in for the relational collaborator: scalar rows live in
//! per-type tables, association pairs in named link tables. Each
//! association's pair set is stored exactly once, in the owning
//! orientation, and both directions are derived from it on fetch, so the
//! two sides of a relation can never disagree.

use crate::traits::{BackingStore, FetchSet, FetchedRow, StoreStats, TransactionToken};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use strata_core::{
    AttributeKind, FetchPlan, Identity, ManifestRegistry, RecordId, RecordType, StoreError,
    StrataResult, TypeManifest,
};

type ScalarTables = HashMap<RecordType, BTreeMap<RecordId, Value>>;
type LinkTables = HashMap<&'static str, BTreeSet<(RecordId, RecordId)>>;

/// In-memory relational store over `RwLock`-guarded tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    manifests: ManifestRegistry,
    tables: RwLock<ScalarTables>,
    links: RwLock<LinkTables>,
    transactions: RwLock<HashSet<TransactionToken>>,
    stats: RwLock<StoreStats>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create a store over the given manifest registry.
    pub fn new(manifests: ManifestRegistry) -> Self {
        Self {
            manifests,
            ..Default::default()
        }
    }

    /// Simulate a transport failure: while offline, every call fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of persisted rows for a record type.
    pub fn row_count(&self, record_type: RecordType) -> usize {
        self.tables
            .read()
            .map(|t| t.get(&record_type).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn bump<F: FnOnce(&mut StoreStats)>(&self, f: F) -> StrataResult<()> {
        let mut stats = self.stats.write().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut stats);
        Ok(())
    }

    /// Members of one link table, oriented for the given owner side.
    fn link_members(
        links: &LinkTables,
        link_table: &str,
        inverted: bool,
        owner: RecordId,
    ) -> Vec<RecordId> {
        let Some(pairs) = links.get(link_table) else {
            return Vec::new();
        };
        pairs
            .iter()
            .filter_map(|&(a, b)| {
                if inverted {
                    (b == owner).then_some(a)
                } else {
                    (a == owner).then_some(b)
                }
            })
            .collect()
    }

    /// Assemble a full row: stored scalars plus the association identity
    /// arrays derived from the link tables.
    fn assemble_row(
        manifest: &TypeManifest,
        id: RecordId,
        scalars: &Value,
        links: &LinkTables,
    ) -> StrataResult<Value> {
        let Value::Object(scalars) = scalars else {
            return Err(StoreError::MalformedRow {
                record_type: manifest.record_type,
                id,
                reason: "stored row is not an object".to_string(),
            }
            .into());
        };
        let mut obj = scalars.clone();
        for attr in manifest.associations() {
            if let AttributeKind::Association {
                link_table,
                inverted,
                ..
            } = attr.kind
            {
                let mut members = Self::link_members(links, link_table, inverted, id);
                members.sort_unstable();
                obj.insert(
                    attr.name.to_string(),
                    Value::Array(members.into_iter().map(Value::from).collect()),
                );
            }
        }
        Ok(Value::Object(obj))
    }

    /// Materialize the distinct peer rows for every association attribute
    /// named in the plan. Inner-join semantics: members without a stored
    /// row are skipped.
    fn collect_associated(
        &self,
        manifest: &TypeManifest,
        plan: &FetchPlan,
        owner_ids: &[RecordId],
        tables: &ScalarTables,
        links: &LinkTables,
    ) -> StrataResult<Vec<FetchedRow>> {
        let mut seen: BTreeSet<Identity> = BTreeSet::new();
        let mut rows = Vec::new();
        for attr in manifest.associations() {
            if !plan.contains(attr.name) {
                continue;
            }
            let AttributeKind::Association {
                target,
                link_table,
                inverted,
            } = attr.kind
            else {
                continue;
            };
            let target_manifest = self
                .manifests
                .get(target)
                .ok_or(StoreError::UnknownType {
                    record_type: target,
                })?;
            let target_table = tables.get(&target);
            for owner in owner_ids {
                for member in Self::link_members(links, link_table, inverted, *owner) {
                    let identity = Identity::new(target, member);
                    if !seen.insert(identity) {
                        continue;
                    }
                    if let Some(scalars) = target_table.and_then(|t| t.get(&member)) {
                        rows.push(FetchedRow {
                            identity,
                            row: Self::assemble_row(target_manifest, member, scalars, links)?,
                        });
                    }
                }
            }
        }
        rows.sort_by_key(|r| r.identity);
        Ok(rows)
    }
}

impl BackingStore for MemoryStore {
    fn begin_transaction(&self) -> StrataResult<TransactionToken> {
        if self.is_offline() {
            return Err(StoreError::TransactionFailed {
                reason: "backing store offline".to_string(),
            }
            .into());
        }
        let token = TransactionToken::mint();
        self.transactions
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(token);
        self.bump(|s| s.open_transactions += 1)?;
        Ok(token)
    }

    fn commit(&self, tx: TransactionToken) -> StrataResult<()> {
        if self.is_offline() {
            return Err(StoreError::TransactionFailed {
                reason: "backing store offline".to_string(),
            }
            .into());
        }
        let removed = self
            .transactions
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(&tx);
        if !removed {
            return Err(StoreError::TransactionFailed {
                reason: format!("unknown transaction {tx}"),
            }
            .into());
        }
        self.bump(|s| s.open_transactions -= 1)
    }

    fn rollback(&self, tx: TransactionToken) -> StrataResult<()> {
        if self.is_offline() {
            return Err(StoreError::TransactionFailed {
                reason: "backing store offline".to_string(),
            }
            .into());
        }
        let removed = self
            .transactions
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(&tx);
        if !removed {
            return Err(StoreError::TransactionFailed {
                reason: format!("unknown transaction {tx}"),
            }
            .into());
        }
        self.bump(|s| s.open_transactions -= 1)
    }

    fn fetch_by_id(
        &self,
        record_type: RecordType,
        id: RecordId,
        plan: &FetchPlan,
    ) -> StrataResult<Option<FetchSet>> {
        if self.is_offline() {
            return Err(StoreError::Unavailable {
                record_type,
                id: Some(id),
                reason: "backing store offline".to_string(),
            }
            .into());
        }
        let manifest = self
            .manifests
            .get(record_type)
            .ok_or(StoreError::UnknownType { record_type })?;
        self.bump(|s| s.fetch_by_id_calls += 1)?;

        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let links = self.links.read().map_err(|_| StoreError::LockPoisoned)?;
        let Some(scalars) = tables.get(&record_type).and_then(|t| t.get(&id)) else {
            return Ok(None);
        };
        let row = FetchedRow {
            identity: Identity::new(record_type, id),
            row: Self::assemble_row(manifest, id, scalars, &links)?,
        };
        let associated = self.collect_associated(manifest, plan, &[id], &tables, &links)?;
        Ok(Some(FetchSet {
            records: vec![row],
            associated,
        }))
    }

    fn fetch_all(&self, record_type: RecordType, plan: &FetchPlan) -> StrataResult<FetchSet> {
        if self.is_offline() {
            return Err(StoreError::Unavailable {
                record_type,
                id: None,
                reason: "backing store offline".to_string(),
            }
            .into());
        }
        let manifest = self
            .manifests
            .get(record_type)
            .ok_or(StoreError::UnknownType { record_type })?;
        self.bump(|s| s.fetch_all_calls += 1)?;

        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let links = self.links.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut records = Vec::new();
        let mut ids = Vec::new();
        if let Some(table) = tables.get(&record_type) {
            for (id, scalars) in table {
                records.push(FetchedRow {
                    identity: Identity::new(record_type, *id),
                    row: Self::assemble_row(manifest, *id, scalars, &links)?,
                });
                ids.push(*id);
            }
        }
        let associated = self.collect_associated(manifest, plan, &ids, &tables, &links)?;
        Ok(FetchSet {
            records,
            associated,
        })
    }

    fn persist(&self, record_type: RecordType, id: RecordId, row: Value) -> StrataResult<()> {
        if self.is_offline() {
            return Err(StoreError::Unavailable {
                record_type,
                id: Some(id),
                reason: "backing store offline".to_string(),
            }
            .into());
        }
        let manifest = self
            .manifests
            .get(record_type)
            .ok_or(StoreError::UnknownType { record_type })?;
        let Value::Object(fields) = row else {
            return Err(StoreError::MalformedRow {
                record_type,
                id,
                reason: "row is not an object".to_string(),
            }
            .into());
        };

        let malformed = |reason: String| StoreError::MalformedRow {
            record_type,
            id,
            reason,
        };

        // Split the row: scalars stay in the type's table, association
        // members become identity pairs in the owning link table.
        let mut scalars = Map::new();
        let mut pairs: Vec<(&'static str, (RecordId, RecordId))> = Vec::new();
        for (key, value) in fields {
            let Some(attr) = manifest.attribute(&key) else {
                return Err(malformed(format!("undeclared attribute {key:?}")).into());
            };
            match attr.kind {
                AttributeKind::Scalar => {
                    scalars.insert(key, value);
                }
                AttributeKind::Association {
                    link_table,
                    inverted,
                    ..
                } => {
                    let Value::Array(members) = value else {
                        return Err(
                            malformed(format!("association {key:?} is not an array")).into()
                        );
                    };
                    for member in members {
                        let member = member.as_i64().ok_or_else(|| {
                            malformed(format!("association {key:?} member is not an id"))
                        })?;
                        let pair = if inverted { (member, id) } else { (id, member) };
                        pairs.push((link_table, pair));
                    }
                }
            }
        }
        if let Some(declared) = scalars.get("id").and_then(Value::as_i64) {
            if declared != id {
                return Err(malformed(format!("row id {declared} does not match {id}")).into());
            }
        }

        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut links = self.links.write().map_err(|_| StoreError::LockPoisoned)?;
        let table = tables.entry(record_type).or_default();
        if table.contains_key(&id) {
            return Err(StoreError::AlreadyExists { record_type, id }.into());
        }
        table.insert(id, Value::Object(scalars));
        for (link_table, pair) in pairs {
            links.entry(link_table).or_default().insert(pair);
        }
        drop(links);
        drop(tables);
        self.bump(|s| s.persist_calls += 1)
    }

    fn manifest(&self, record_type: RecordType) -> StrataResult<&'static TypeManifest> {
        self.manifests
            .get(record_type)
            .ok_or_else(|| StoreError::UnknownType { record_type }.into())
    }

    fn stats(&self) -> StoreStats {
        self.stats.read().map(|s| *s).unwrap_or_default()
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use strata_core::AttributeDescriptor;

    const ITEM: RecordType = RecordType::new("Item");

    static ITEM_MANIFEST: TypeManifest = TypeManifest::new(
        ITEM,
        &[
            AttributeDescriptor::scalar("id"),
            AttributeDescriptor::scalar("name"),
        ],
    );

    fn make_store() -> MemoryStore {
        let mut registry = ManifestRegistry::new();
        registry.register(&ITEM_MANIFEST);
        MemoryStore::new(registry)
    }

    fn plan() -> FetchPlan {
        FetchPlan::new(ITEM, vec!["id", "name"])
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Fetching an id that was never persisted returns Ok(None).
        #[test]
        fn prop_fetch_missing_returns_none(id in 0i64..10_000) {
            let store = make_store();
            let result = store.fetch_by_id(ITEM, id, &plan()).unwrap();
            prop_assert!(result.is_none());
        }

        /// Persist then fetch returns the same scalar values.
        #[test]
        fn prop_persist_fetch_roundtrip(id in 0i64..10_000, name in "[a-z]{1,16}") {
            let store = make_store();
            store.persist(ITEM, id, json!({"id": id, "name": name})).unwrap();
            let set = store.fetch_by_id(ITEM, id, &plan()).unwrap().unwrap();
            prop_assert_eq!(&set.records[0].row["name"], &json!(name));
            prop_assert_eq!(set.records[0].identity, Identity::new(ITEM, id));
        }

        /// Identity is never reused: a second persist for the same id fails.
        #[test]
        fn prop_duplicate_persist_fails(id in 0i64..10_000) {
            let store = make_store();
            store.persist(ITEM, id, json!({"id": id, "name": "first"})).unwrap();
            let result = store.persist(ITEM, id, json!({"id": id, "name": "second"}));
            prop_assert!(result.is_err());
        }

        /// fetch_all returns every persisted row in ascending id order.
        #[test]
        fn prop_fetch_all_ordered(ids in proptest::collection::btree_set(0i64..1_000, 0..20)) {
            let store = make_store();
            for id in &ids {
                store.persist(ITEM, *id, json!({"id": id, "name": "x"})).unwrap();
            }
            let set = store.fetch_all(ITEM, &plan()).unwrap();
            let fetched: Vec<_> = set.records.iter().map(|r| r.identity.id).collect();
            let expected: Vec<_> = ids.into_iter().collect();
            prop_assert_eq!(fetched, expected);
        }
    }
}
