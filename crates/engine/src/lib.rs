//! # facet-engine
//!
//! Operational core of the Facet variant pipeline: the host capability
//! traits and the four components driving them — metadata registry,
//! variant swap engine, bulk replace coordinator, and export
//! orchestrator. Shared vocabulary (formats, tiers, naming codec,
//! metadata schema, configuration, errors) lives in `facet-common`.
//!
//! Everything runs synchronously against an injected [`SceneBackend`]
//! and [`FormatAdapters`] pair; the in-memory doubles in [`memory`]
//! stand in for the host in tests.
//!
//! ## Table of Contents
//! 1. Scene backend trait (`scene`)
//! 2. Format adapter trait (`adapters`)
//! 3. Metadata registry (`registry`)
//! 4. Variant swap engine (`swap`)
//! 5. Bulk replace coordinator (`replace`)
//! 6. Export orchestrator (`export`)
//! 7. In-memory host doubles (`memory`)

pub mod adapters;
pub mod export;
pub mod memory;
pub mod registry;
pub mod replace;
pub mod scene;
pub mod swap;

pub use adapters::{AdapterFailure, FormatAdapters};
pub use export::{export_family, ExportReport, ExportRequest, VariantRecord, VariantStatus, PIVOT_EPSILON};
pub use registry::{AssetFamily, FamilyGrouping};
pub use replace::{
    replace_all, replace_family, BulkReport, FamilyOutcome, FamilyPhase, InstancingPolicy,
    MemberOutcome, ReplaceRequest,
};
pub use scene::SceneBackend;
pub use swap::{import_variant, swap_variant, SwapOutcome, SwapTarget};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::adapters::{AdapterFailure, FormatAdapters};
    pub use crate::export::{export_family, ExportReport, ExportRequest};
    pub use crate::memory::{FileAdapters, MemoryScene};
    pub use crate::registry::{self, AssetFamily, FamilyGrouping};
    pub use crate::replace::{replace_all, BulkReport, InstancingPolicy, ReplaceRequest};
    pub use crate::scene::SceneBackend;
    pub use crate::swap::{import_variant, swap_variant, SwapOutcome, SwapTarget};
    pub use facet_common::{
        ComponentMetadata, NodeId, ProjectConfig, ResolutionTier, Result, StorageFormat,
        VariantError, WorldTransform,
    };
}
