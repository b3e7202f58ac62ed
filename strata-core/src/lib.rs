//! STRATA Core - Record Types and Metadata
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! Defines record identity, the attribute manifest metadata that drives
//! fetch planning, and the error taxonomy for the whole workspace.

pub mod error;
pub mod identity;
pub mod manifest;
pub mod plan;
pub mod record;

pub use error::{CacheError, SessionError, StoreError, StrataError, StrataResult};
pub use identity::{
    compute_content_hash, ContentHash, Identity, RecordId, RecordType, Timestamp,
};
pub use manifest::{AttributeDescriptor, AttributeKind, ManifestRegistry, TypeManifest};
pub use plan::{FetchMode, FetchPlan};
pub use record::Record;
