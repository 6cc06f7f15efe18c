//! # FormatAdapters — Host Import/Export Capability
//!
//! One export/import pair per [`StorageFormat`], supplied by the host
//! application, plus the two thin I/O facilities the pipeline leans on:
//! texture relocation and viewport capture. The engine dispatches by
//! format value through [`FormatAdapters::export_variant`] /
//! [`FormatAdapters::import_variant`].
//!
//! Import contract: adapters materialize a transform node whose first
//! child carries the format's reference attribute
//! ([`StorageFormat::reference_attribute`]) set to the source file
//! path. The in-place swap path retargets that attribute instead of
//! re-importing.

use std::path::{Path, PathBuf};
use thiserror::Error;

use facet_common::{NodeId, StorageFormat};

use crate::scene::SceneBackend;

/// Failure reported by a host adapter command. The engine wraps it with
/// the format and path context before surfacing it.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct AdapterFailure(pub String);

impl AdapterFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Host import/export commands, one pair per storage format.
pub trait FormatAdapters<B: SceneBackend> {
    fn export_native(
        &mut self,
        scene: &mut B,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure>;

    fn import_native(&mut self, scene: &mut B, path: &Path) -> Result<NodeId, AdapterFailure>;

    /// Fails when the export root has no exportable children.
    fn export_point_cache(
        &mut self,
        scene: &mut B,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure>;

    fn import_point_cache(&mut self, scene: &mut B, path: &Path)
        -> Result<NodeId, AdapterFailure>;

    fn export_renderer_proxy(
        &mut self,
        scene: &mut B,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure>;

    fn import_renderer_proxy(
        &mut self,
        scene: &mut B,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure>;

    fn export_realtime_cache(
        &mut self,
        scene: &mut B,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure>;

    fn import_realtime_cache(
        &mut self,
        scene: &mut B,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure>;

    /// Copy texture dependencies of `root` into `textures_dir` and
    /// retarget the references. Returns the number of files copied.
    /// UDIM and other sequence expansion is host-side behavior.
    fn relocate_textures(
        &mut self,
        scene: &mut B,
        root: NodeId,
        textures_dir: &Path,
    ) -> Result<usize, AdapterFailure>;

    /// Best-effort still capture of the current view. `None` means no
    /// image was produced; callers treat that as non-fatal.
    fn capture_viewport(&mut self, path: &Path, width: u32, height: u32) -> Option<PathBuf>;

    // ── format dispatch ────────────────────────────────────────

    fn export_variant(
        &mut self,
        scene: &mut B,
        format: StorageFormat,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure> {
        match format {
            StorageFormat::Native => self.export_native(scene, root, path),
            StorageFormat::PointCache => self.export_point_cache(scene, root, path),
            StorageFormat::RendererProxy => self.export_renderer_proxy(scene, root, path),
            StorageFormat::RealtimeCache => self.export_realtime_cache(scene, root, path),
        }
    }

    fn import_variant(
        &mut self,
        scene: &mut B,
        format: StorageFormat,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure> {
        match format {
            StorageFormat::Native => self.import_native(scene, path),
            StorageFormat::PointCache => self.import_point_cache(scene, path),
            StorageFormat::RendererProxy => self.import_renderer_proxy(scene, path),
            StorageFormat::RealtimeCache => self.import_realtime_cache(scene, path),
        }
    }
}
