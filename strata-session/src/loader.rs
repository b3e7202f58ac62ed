//! The loader: cache-first load algorithm over the backing store.

use crate::fetch_graph::FetchGraphBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{
    AttributeKind, CacheError, FetchMode, Identity, Record, RecordId, SessionError, StoreError,
    StrataResult, TypeManifest,
};
use strata_storage::{BackingStore, FetchSet, FetchedRow, IdentityCache};

/// What a load request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// One record by its identifier.
    ById(RecordId),
    /// Every record of the type.
    All,
}

/// Session-scoped first-tier cache: identity to resolved row, local to
/// one unit of work and discarded when it closes.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<Identity, Value>,
}

impl SessionCache {
    /// Create an empty session cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, identity: &Identity) -> Option<&Value> {
        self.entries.get(identity)
    }

    pub(crate) fn insert(&mut self, identity: Identity, row: Value) {
        self.entries.insert(identity, row);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of rows resolved within this operation.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the operation has resolved anything yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orchestrates load requests across the session cache, the identity
/// cache, and the backing store.
///
/// For by-identity loads the tiers are consulted in that order and the
/// first hit short-circuits; load-all always issues exactly one store
/// query and is never answered from cache. Every row a query returns is
/// written back into both cache tiers before the records are handed to
/// the caller.
pub struct Loader<S: BackingStore> {
    store: Arc<S>,
    cache: IdentityCache,
}

impl<S: BackingStore> Loader<S> {
    /// Create a loader over a store and the shared identity cache.
    pub fn new(store: Arc<S>, cache: IdentityCache) -> Self {
        Self { store, cache }
    }

    /// The shared identity cache this loader populates.
    pub fn identity_cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Load records per the selector and fetch mode.
    pub fn load<T: Record>(
        &self,
        session: &mut SessionCache,
        selector: Selector,
        mode: FetchMode,
    ) -> StrataResult<Vec<T>> {
        match selector {
            Selector::ById(id) => self.load_by_id(session, id, mode).map(|r| vec![r]),
            Selector::All => self.load_all(session, mode),
        }
    }

    /// Load one record by identifier: session cache, then identity
    /// cache, then the backing store. A store miss is `NotFound`.
    pub fn load_by_id<T: Record>(
        &self,
        session: &mut SessionCache,
        id: RecordId,
        mode: FetchMode,
    ) -> StrataResult<T> {
        let identity = Identity::new(T::record_type(), id);
        if let Some(row) = session.get(&identity) {
            return deserialize_row(identity, row.clone());
        }
        if let Some(row) = self.cache.get_row(&identity)? {
            session.insert(identity, row.clone());
            return deserialize_row(identity, row);
        }

        tracing::debug!(%identity, "cache miss, fetching from store");
        let plan = FetchGraphBuilder::plan_for::<T>(mode);
        let set = self
            .store
            .fetch_by_id(T::record_type(), id, &plan)?
            .ok_or(StoreError::NotFound {
                record_type: T::record_type(),
                id,
            })?;
        self.absorb(session, &set, T::manifest())?;
        let fetched = set.records.first().ok_or(StoreError::NotFound {
            record_type: T::record_type(),
            id,
        })?;
        deserialize_row(identity, fetched.row.clone())
    }

    /// Load every record of a type in one backing-store query.
    pub fn load_all<T: Record>(
        &self,
        session: &mut SessionCache,
        mode: FetchMode,
    ) -> StrataResult<Vec<T>> {
        let plan = FetchGraphBuilder::plan_for::<T>(mode);
        let set = self.store.fetch_all(T::record_type(), &plan)?;
        tracing::debug!(
            record_type = %T::record_type(),
            count = set.records.len(),
            eager = mode.is_eager(),
            "loaded all records"
        );
        self.absorb(session, &set, T::manifest())?;
        set.records
            .iter()
            .map(|fetched| deserialize_row(fetched.identity, fetched.row.clone()))
            .collect()
    }

    /// Resolve an association's members into peer records.
    ///
    /// Each member re-enters the by-identity path, so members already
    /// resolved in either cache tier cost zero store queries and each
    /// distinct uncached member costs exactly one.
    pub fn resolve_association<T: Record, P: Record>(
        &self,
        session: &mut SessionCache,
        record: &T,
        attribute: &str,
    ) -> StrataResult<Vec<P>> {
        let manifest = T::manifest();
        let descriptor =
            manifest
                .attribute(attribute)
                .ok_or_else(|| SessionError::UnknownAttribute {
                    record_type: manifest.record_type,
                    attribute: attribute.to_string(),
                })?;
        let AttributeKind::Association { target, .. } = descriptor.kind else {
            return Err(SessionError::NotAnAssociation {
                record_type: manifest.record_type,
                attribute: attribute.to_string(),
            }
            .into());
        };
        if target != P::record_type() {
            return Err(SessionError::AssociationTargetMismatch {
                record_type: manifest.record_type,
                attribute: attribute.to_string(),
                expected: target,
                actual: P::record_type(),
            }
            .into());
        }
        let members = record
            .association(attribute)
            .ok_or_else(|| SessionError::UnknownAttribute {
                record_type: manifest.record_type,
                attribute: attribute.to_string(),
            })?;
        members
            .iter()
            .map(|id| self.load_by_id(session, *id, FetchMode::Lazy))
            .collect()
    }

    /// Write every fetched row into both cache tiers, then record
    /// unresolved references for association members nothing has
    /// materialized yet.
    fn absorb(
        &self,
        session: &mut SessionCache,
        set: &FetchSet,
        manifest: &TypeManifest,
    ) -> StrataResult<()> {
        for fetched in set.records.iter().chain(&set.associated) {
            self.cache.insert_row(fetched.identity, fetched.row.clone())?;
            session.insert(fetched.identity, fetched.row.clone());
        }
        for fetched in &set.records {
            self.mark_references(manifest, fetched)?;
        }
        Ok(())
    }

    fn mark_references(
        &self,
        manifest: &TypeManifest,
        fetched: &FetchedRow,
    ) -> StrataResult<()> {
        let Some(fields) = fetched.row.as_object() else {
            return Ok(());
        };
        for attr in manifest.associations() {
            let AttributeKind::Association { target, .. } = attr.kind else {
                continue;
            };
            let Some(Value::Array(members)) = fields.get(attr.name) else {
                continue;
            };
            for member in members {
                if let Some(id) = member.as_i64() {
                    self.cache.insert_reference(Identity::new(target, id))?;
                }
            }
        }
        Ok(())
    }
}

fn deserialize_row<T: Record>(identity: Identity, row: Value) -> StrataResult<T> {
    serde_json::from_value(row).map_err(|e| {
        CacheError::Deserialization {
            record_type: identity.record_type,
            id: identity.id,
            reason: e.to_string(),
        }
        .into()
    })
}
