//! STRATA Test Utilities
//!
//! Centralized fixtures for the STRATA workspace: the demo catalog
//! domain (books and the languages they are published in), its attribute
//! manifests, and the seed data used by integration tests and examples.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strata_core::{
    AttributeDescriptor, ManifestRegistry, Record, RecordId, RecordType, StrataResult,
    TypeManifest,
};
use strata_storage::{BackingStore, MemoryStore};

// Re-export the types every fixture consumer ends up importing anyway.
pub use strata_core::{FetchMode, Identity, StrataError};
pub use strata_storage::IdentityCache;

// ============================================================================
// CATALOG DOMAIN
// ============================================================================

/// Record type for languages a book is published in.
pub const LANGUAGE: RecordType = RecordType::new("Language");

/// Record type for books.
pub const BOOK: RecordType = RecordType::new("Book");

/// Declared attributes of [`Language`]: scalars only.
pub static LANGUAGE_MANIFEST: TypeManifest = TypeManifest::new(
    LANGUAGE,
    &[
        AttributeDescriptor::scalar("id"),
        AttributeDescriptor::scalar("code"),
        AttributeDescriptor::scalar("name"),
    ],
);

/// Declared attributes of [`Book`], including the many-to-many language
/// association realized through the `b2l` link table.
pub static BOOK_MANIFEST: TypeManifest = TypeManifest::new(
    BOOK,
    &[
        AttributeDescriptor::scalar("id"),
        AttributeDescriptor::scalar("name"),
        AttributeDescriptor::association("languages", LANGUAGE, "b2l"),
    ],
);

/// A language, identified by an ISO code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: RecordId,
    pub code: String,
    pub name: String,
}

impl Language {
    pub fn new(id: RecordId, code: &str, name: &str) -> Self {
        Self {
            id,
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

impl Record for Language {
    fn record_type() -> RecordType {
        LANGUAGE
    }

    fn manifest() -> &'static TypeManifest {
        &LANGUAGE_MANIFEST
    }

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn association(&self, _attribute: &str) -> Option<&BTreeSet<RecordId>> {
        None
    }
}

/// A book and the identities of the languages it is published in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: RecordId,
    pub name: String,
    pub languages: BTreeSet<RecordId>,
}

impl Book {
    pub fn new(id: RecordId, name: &str, languages: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            languages: languages.into_iter().collect(),
        }
    }
}

impl Record for Book {
    fn record_type() -> RecordType {
        BOOK
    }

    fn manifest() -> &'static TypeManifest {
        &BOOK_MANIFEST
    }

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn association(&self, attribute: &str) -> Option<&BTreeSet<RecordId>> {
        (attribute == "languages").then_some(&self.languages)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Registry with both catalog manifests.
pub fn catalog_registry() -> ManifestRegistry {
    let mut registry = ManifestRegistry::new();
    registry.register(&LANGUAGE_MANIFEST);
    registry.register(&BOOK_MANIFEST);
    registry
}

/// Empty in-memory store configured for the catalog domain.
pub fn catalog_store() -> MemoryStore {
    MemoryStore::new(catalog_registry())
}

/// Persist the scenario data: three languages and two atlases that share
/// Arabic.
pub fn seed_catalog(store: &MemoryStore) -> StrataResult<()> {
    let tx = store.begin_transaction()?;
    store.persist_record(&Language::new(1, "SQ", "Albanian"))?;
    store.persist_record(&Language::new(2, "AR", "Arabic"))?;
    store.persist_record(&Language::new(3, "HY", "Armenian"))?;
    store.persist_record(&Book::new(1, "World Atlas 1", [1, 2]))?;
    store.persist_record(&Book::new(2, "World Atlas 2", [2, 3]))?;
    store.commit(tx)
}
