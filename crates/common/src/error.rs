//! Error taxonomy for the Facet variant pipeline.
//!
//! Every failure here is recoverable at the call site: bulk operations
//! record the error against the offending node or family and keep
//! scanning, they never unwind across items.
//!
//! ## Table of Contents
//! 1. VariantError - main error enum
//! 2. Result type alias

use glam::Vec3;
use std::path::PathBuf;
use thiserror::Error;

use crate::format::StorageFormat;
use crate::types::{AttributeKind, NodeId, SceneError};

/// Result type alias for variant pipeline operations.
pub type Result<T> = std::result::Result<T, VariantError>;

/// Errors that can occur while exporting, swapping, or bulk-replacing
/// asset variants.
#[derive(Error, Debug)]
pub enum VariantError {
    /// Operation requested on a node without the component marker —
    /// rejected before any mutation
    #[error("{0} is not a managed component node")]
    NotManaged(NodeId),

    /// Target variant file absent on disk — the live node is untouched
    #[error("variant file not available: {}", path.display())]
    VariantUnavailable { path: PathBuf },

    /// Asset name does not carry the expected token where the naming
    /// convention requires it, so substitution would be ambiguous
    #[error("asset name {name:?} does not carry expected token {tier:?}")]
    NamingMismatch { name: String, tier: String },

    /// Export precondition: rotate and scale pivots must coincide at
    /// the origin
    #[error("pivot misaligned on {node}: rotate pivot {rotate_pivot}, scale pivot {scale_pivot}")]
    PivotMisaligned {
        node: NodeId,
        rotate_pivot: Vec3,
        scale_pivot: Vec3,
    },

    /// Metadata attribute already exists under an incompatible kind
    #[error("attribute {attribute:?} on {node} already exists as {actual}, expected {expected}")]
    AttributeConflict {
        node: NodeId,
        attribute: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },

    /// Node layout does not match the convention an operation relies on
    #[error("unexpected hierarchy under {node}: {reason}")]
    HierarchyMismatch { node: NodeId, reason: String },

    /// Host import command failed — the pre-swap node is left intact
    #[error("import adapter failed for {format} file {}: {reason}", path.display())]
    ImportAdapterFailure {
        format: StorageFormat,
        path: PathBuf,
        reason: String,
    },

    /// Host export command failed
    #[error("export adapter failed for {format} file {}: {reason}", path.display())]
    ExportAdapterFailure {
        format: StorageFormat,
        path: PathBuf,
        reason: String,
    },

    /// Filesystem operation outside the adapters (directory creation,
    /// existence probes) failed
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tagged node whose attributes cannot be interpreted (unknown
    /// format token, malformed tier, ...)
    #[error("corrupt metadata on {node}: {reason}")]
    CorruptMetadata { node: NodeId, reason: String },

    /// Texture relocation into the asset's `textures/` directory failed
    #[error("texture relocation into {} failed: {reason}", path.display())]
    TextureRelocationFailure { path: PathBuf, reason: String },

    /// Scene backend error
    #[error("scene backend: {0}")]
    Scene(#[from] SceneError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
