//! # facet-common
//!
//! Shared vocabulary for the Facet variant pipeline: storage formats and
//! resolution tiers, the naming-convention codec, the component metadata
//! schema, project configuration, and the error taxonomy. Everything
//! here is host-independent; the operational engine lives in
//! `facet-engine`.
//!
//! ## Table of Contents
//! 1. Error taxonomy (`error`)
//! 2. Scene vocabulary (`types`)
//! 3. Formats and tiers (`format`)
//! 4. Naming codec (`naming`)
//! 5. Component metadata (`metadata`)
//! 6. Project configuration (`config`)

pub mod config;
pub mod error;
pub mod format;
pub mod metadata;
pub mod naming;
pub mod types;

pub use config::{default_tiers, ProjectConfig};
pub use error::{Result, VariantError};
pub use format::{ResolutionTier, StorageFormat};
pub use metadata::{attr, ComponentMetadata, FamilyKey};
pub use naming::{parse_asset_name, retarget_name, variant_file, AssetIdentity, SOURCE_SUFFIX};
pub use types::{AttributeKind, AttributeValue, NodeId, SceneError, WorldTransform};
