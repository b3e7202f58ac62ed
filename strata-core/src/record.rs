//! Record trait for persistable, cacheable domain values.

use crate::identity::{Identity, RecordId, RecordType};
use crate::manifest::TypeManifest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

/// A typed, immutable-once-persisted domain value.
///
/// Implementations must serialize to a JSON object whose fields match the
/// declared manifest: one field per scalar, and one sorted identity array
/// per association. Association attributes hold peer identities only,
/// never embedded copies; resolving them into peer records goes through
/// the loader.
///
/// # Implementation Requirements
///
/// - `record_type()` and `manifest()` must agree and be constant per type
/// - `record_id()` must return the unique identifier for this instance
/// - `association()` must return the identity set for every association
///   attribute named in the manifest, and `None` otherwise
/// - Implementations must be `Clone`, `Serialize`, and `DeserializeOwned`
///   for cache storage, and `Send + Sync + 'static` for shared use
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The record type discriminator for this type.
    fn record_type() -> RecordType;

    /// The declared attribute manifest for this type.
    fn manifest() -> &'static TypeManifest;

    /// The unique identifier of this instance.
    fn record_id(&self) -> RecordId;

    /// The identity set of the named association attribute.
    fn association(&self, attribute: &str) -> Option<&BTreeSet<RecordId>>;

    /// The (type, id) identity of this instance.
    fn identity(&self) -> Identity {
        Identity::new(Self::record_type(), self.record_id())
    }
}
