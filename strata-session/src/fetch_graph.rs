//! Fetch plans computed from declared attribute manifests.

use strata_core::{FetchMode, FetchPlan, Record, TypeManifest};

/// Builds fetch plans from a type's declared attribute set.
///
/// Deterministic by construction: plans list attributes in manifest
/// declaration order, so the same type and mode always produce an
/// identical plan and the backing collaborator may cache query plans
/// keyed on it.
pub struct FetchGraphBuilder;

impl FetchGraphBuilder {
    /// Plan naming every declared attribute, associations included.
    ///
    /// A load using this plan materializes the records and all their
    /// association members in a single backing-store round trip, instead
    /// of one round trip per member on first access.
    pub fn full_plan(manifest: &TypeManifest) -> FetchPlan {
        FetchPlan::new(
            manifest.record_type,
            manifest.attributes.iter().map(|a| a.name).collect(),
        )
    }

    /// Plan naming only the scalar attributes; associations stay
    /// unresolved references.
    pub fn minimal_plan(manifest: &TypeManifest) -> FetchPlan {
        FetchPlan::new(
            manifest.record_type,
            manifest.scalars().map(|a| a.name).collect(),
        )
    }

    /// The plan for a fetch mode: full when eager, minimal when lazy.
    pub fn plan(manifest: &TypeManifest, mode: FetchMode) -> FetchPlan {
        match mode {
            FetchMode::Eager => Self::full_plan(manifest),
            FetchMode::Lazy => Self::minimal_plan(manifest),
        }
    }

    /// Typed convenience for [`Self::plan`].
    pub fn plan_for<T: Record>(mode: FetchMode) -> FetchPlan {
        Self::plan(T::manifest(), mode)
    }
}
