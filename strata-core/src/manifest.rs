//! Declared attribute manifests for record types.
//!
//! Each record type declares its attributes (scalars and associations)
//! once, as process-wide read-only metadata. The fetch-graph builder and
//! the backing store both consume these manifests, so fetch plans and row
//! assembly always agree on the attribute set and its ordering.

use crate::identity::RecordType;
use std::collections::HashMap;

/// Kind of a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Plain column value, always fetched with the row.
    Scalar,
    /// Many-to-many relation to `target`, realized as identity pairs in
    /// the named link table. An `inverted` association reads the same
    /// pair set from the peer side, so both directions always reflect
    /// one underlying set of identity pairs.
    Association {
        target: RecordType,
        link_table: &'static str,
        inverted: bool,
    },
}

/// A single declared attribute of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub kind: AttributeKind,
}

impl AttributeDescriptor {
    /// Declare a scalar attribute.
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: AttributeKind::Scalar,
        }
    }

    /// Declare an association attribute owning the link table.
    pub const fn association(
        name: &'static str,
        target: RecordType,
        link_table: &'static str,
    ) -> Self {
        Self {
            name,
            kind: AttributeKind::Association {
                target,
                link_table,
                inverted: false,
            },
        }
    }

    /// Declare the inverse side of an association declared elsewhere.
    pub const fn inverse_association(
        name: &'static str,
        target: RecordType,
        link_table: &'static str,
    ) -> Self {
        Self {
            name,
            kind: AttributeKind::Association {
                target,
                link_table,
                inverted: true,
            },
        }
    }

    /// Whether this attribute is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, AttributeKind::Scalar)
    }

    /// Whether this attribute is an association.
    pub fn is_association(&self) -> bool {
        matches!(self.kind, AttributeKind::Association { .. })
    }
}

/// The full declared attribute set of a record type, in declaration order.
///
/// Declaration order is the canonical attribute ordering: fetch plans
/// built from a manifest are deterministic because they never reorder it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeManifest {
    pub record_type: RecordType,
    pub attributes: &'static [AttributeDescriptor],
}

impl TypeManifest {
    /// Create a manifest. Intended for `static` declarations.
    pub const fn new(
        record_type: RecordType,
        attributes: &'static [AttributeDescriptor],
    ) -> Self {
        Self {
            record_type,
            attributes,
        }
    }

    /// Look up a declared attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Iterate the scalar attributes, in declaration order.
    pub fn scalars(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| a.is_scalar())
    }

    /// Iterate the association attributes, in declaration order.
    pub fn associations(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| a.is_association())
    }
}

/// Process-wide registry mapping record types to their manifests.
///
/// Built once at store construction and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ManifestRegistry {
    by_type: HashMap<RecordType, &'static TypeManifest>,
}

impl ManifestRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manifest, replacing any previous manifest for the type.
    pub fn register(&mut self, manifest: &'static TypeManifest) {
        self.by_type.insert(manifest.record_type, manifest);
    }

    /// Look up the manifest for a record type.
    pub fn get(&self, record_type: RecordType) -> Option<&'static TypeManifest> {
        self.by_type.get(&record_type).copied()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET: RecordType = RecordType::new("Widget");
    const TAG: RecordType = RecordType::new("Tag");

    static WIDGET_MANIFEST: TypeManifest = TypeManifest::new(
        WIDGET,
        &[
            AttributeDescriptor::scalar("id"),
            AttributeDescriptor::scalar("label"),
            AttributeDescriptor::association("tags", TAG, "widget_tags"),
        ],
    );

    #[test]
    fn test_attribute_lookup() {
        let attr = WIDGET_MANIFEST.attribute("tags").unwrap();
        assert!(attr.is_association());
        assert!(WIDGET_MANIFEST.attribute("missing").is_none());
    }

    #[test]
    fn test_scalar_and_association_partition() {
        let scalars: Vec<_> = WIDGET_MANIFEST.scalars().map(|a| a.name).collect();
        let assocs: Vec<_> = WIDGET_MANIFEST.associations().map(|a| a.name).collect();
        assert_eq!(scalars, vec!["id", "label"]);
        assert_eq!(assocs, vec!["tags"]);
    }

    #[test]
    fn test_inverse_association_shares_link_table() {
        let owning = AttributeDescriptor::association("tags", TAG, "widget_tags");
        let inverse = AttributeDescriptor::inverse_association("widgets", WIDGET, "widget_tags");
        match (owning.kind, inverse.kind) {
            (
                AttributeKind::Association {
                    link_table: a,
                    inverted: false,
                    ..
                },
                AttributeKind::Association {
                    link_table: b,
                    inverted: true,
                    ..
                },
            ) => assert_eq!(a, b),
            _ => panic!("expected association descriptors"),
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ManifestRegistry::new();
        assert!(registry.is_empty());
        registry.register(&WIDGET_MANIFEST);
        assert_eq!(registry.len(), 1);
        let found = registry.get(WIDGET).unwrap();
        assert_eq!(found.record_type, WIDGET);
        assert!(registry.get(TAG).is_none());
    }
}
