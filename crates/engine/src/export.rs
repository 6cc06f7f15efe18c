//! # Export Orchestrator
//!
//! Turns a conventionally structured export root (one child group per
//! resolution tier) into the full on-disk variant set, tagging each
//! tier group with the metadata the registry consumes later.
//!
//! The export runs inside a normalization bracket: the root's world
//! transform is recorded and zeroed first and restored on every exit
//! path, success or failure. Before anything touches the filesystem the
//! pivot gate runs: rotate and scale pivots must coincide at the
//! origin, otherwise the whole export is rejected — a baked-in offset
//! would corrupt every derived variant at once.
//!
//! ## Table of Contents
//! 1. ExportRequest
//! 2. VariantRecord / ExportReport
//! 3. export_family — entry point and bracket
//! 4. export pass — pivot gate, tier groups, per-format dispatch

use glam::Vec3;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use facet_common::{
    AssetIdentity, ComponentMetadata, NodeId, ProjectConfig, ResolutionTier, Result,
    StorageFormat, VariantError, WorldTransform,
};

use crate::adapters::FormatAdapters;
use crate::registry;
use crate::scene::SceneBackend;

/// Tolerance for the pivot gate and transform comparisons.
pub const PIVOT_EPSILON: f32 = 1e-4;

// ─────────────────────────────────────────────
// 1. ExportRequest
// ─────────────────────────────────────────────

/// One export run: which asset name to write under, which formats, and
/// which of the auxiliary artifacts to produce.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportRequest {
    /// Operator-chosen asset name (combined with the project's code and
    /// scene prefix into the full identity)
    pub asset: String,
    /// Formats to write for every tier group
    pub formats: Vec<StorageFormat>,
    /// Also write the unresolved `_src.ma` snapshot
    pub include_source: bool,
    /// Copy texture dependencies into `textures/` and retarget them
    pub relocate_textures: bool,
    /// Capture a `_preview.png` of the current view (best-effort)
    pub capture_preview: bool,
}

impl ExportRequest {
    pub fn new(asset: impl Into<String>, formats: Vec<StorageFormat>) -> Self {
        Self {
            asset: asset.into(),
            formats,
            include_source: false,
            relocate_textures: false,
            capture_preview: false,
        }
    }
}

// ─────────────────────────────────────────────
// 2. Report
// ─────────────────────────────────────────────

#[derive(Debug)]
pub enum VariantStatus {
    Written,
    Failed(VariantError),
}

/// One (tier, format) cell of the export matrix.
#[derive(Debug)]
pub struct VariantRecord {
    pub tier: ResolutionTier,
    pub format: StorageFormat,
    pub path: PathBuf,
    pub status: VariantStatus,
}

/// Everything one `export_family` call produced.
#[derive(Debug)]
pub struct ExportReport {
    pub asset_root: PathBuf,
    pub variants: Vec<VariantRecord>,
    /// Tier groups skipped because they had no exportable content
    pub skipped_tiers: Vec<ResolutionTier>,
    /// `_src.ma` outcome, when requested
    pub source: Option<std::result::Result<PathBuf, VariantError>>,
    /// Number of texture files relocated, when requested
    pub textures: Option<std::result::Result<usize, VariantError>>,
    /// Preview image, when requested and the capture produced one
    pub preview: Option<PathBuf>,
}

impl ExportReport {
    pub fn written(&self) -> usize {
        self.variants
            .iter()
            .filter(|v| matches!(v.status, VariantStatus::Written))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.variants
            .iter()
            .all(|v| matches!(v.status, VariantStatus::Written))
            && !matches!(self.source, Some(Err(_)))
            && !matches!(self.textures, Some(Err(_)))
    }
}

// ─────────────────────────────────────────────
// 3. Entry point
// ─────────────────────────────────────────────

/// Export every tier group under `root` into the selected formats.
///
/// The root's transform is zeroed for the duration and restored on all
/// exit paths. Fails fast — before any file is written — when the
/// pivot gate rejects the root or the tier-group layout does not match
/// the configured ladder.
pub fn export_family<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    root: NodeId,
    request: &ExportRequest,
) -> Result<ExportReport>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    if request.asset.is_empty() {
        return Err(VariantError::Config("asset name must not be empty".into()));
    }
    if request.formats.is_empty() {
        return Err(VariantError::Config(
            "at least one export format is required".into(),
        ));
    }

    let original = scene.world_transform(root)?;
    scene.set_world_transform(root, &WorldTransform::IDENTITY)?;

    let pass = export_pass(scene, adapters, config, root, request);
    let restore = scene.set_world_transform(root, &original);

    match (pass, restore) {
        (Ok(report), Ok(())) => Ok(report),
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Err(restore_err)) => {
            warn!(%root, error = %restore_err, "transform restore failed after export error");
            Err(e)
        }
    }
}

// ─────────────────────────────────────────────
// 4. Export pass
// ─────────────────────────────────────────────

fn export_pass<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    root: NodeId,
    request: &ExportRequest,
) -> Result<ExportReport>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    check_pivot(scene, root)?;

    let identity = config.identity(request.asset.clone());
    let tier_groups = tier_groups(scene, config, root)?;
    let asset_root = identity.asset_root(&config.component_root);

    let mut report = ExportReport {
        asset_root: asset_root.clone(),
        variants: Vec::new(),
        skipped_tiers: Vec::new(),
        source: None,
        textures: None,
        preview: None,
    };

    for (tier, group) in &tier_groups {
        if scene.children(*group)?.is_empty() {
            warn!(tier = %tier, "tier group has no exportable content, skipping");
            report.skipped_tiers.push(tier.clone());
            continue;
        }
        for &format in &request.formats {
            let path = identity.variant_path(&config.component_root, tier, format);
            let status = export_variant(scene, adapters, config, &identity, *group, tier, format, &path);
            if matches!(status, VariantStatus::Written) {
                info!(tier = %tier, %format, file = %path.display(), "variant written");
            }
            report.variants.push(VariantRecord {
                tier: tier.clone(),
                format,
                path,
                status,
            });
        }
    }

    if request.include_source {
        report.source = Some(export_source(scene, adapters, &identity, config, root));
    }
    if request.relocate_textures {
        let textures_dir = identity.textures_dir(&config.component_root);
        report.textures = Some(
            ensure_dir(&textures_dir).and_then(|_| {
                adapters
                    .relocate_textures(scene, root, &textures_dir)
                    .map_err(|e| VariantError::TextureRelocationFailure {
                        path: textures_dir.clone(),
                        reason: e.0,
                    })
            }),
        );
    }
    if request.capture_preview {
        let preview = identity.preview_path(&config.component_root);
        ensure_dir(preview.parent().unwrap_or(Path::new("")))?;
        let (width, height) = config.preview_size;
        report.preview = adapters.capture_viewport(&preview, width, height);
        if report.preview.is_none() {
            warn!(file = %preview.display(), "viewport capture produced no image");
        }
    }

    Ok(report)
}

/// Rotate and scale pivots must coincide at the origin.
fn check_pivot<B: SceneBackend>(scene: &B, root: NodeId) -> Result<()> {
    let rotate_pivot = scene.rotate_pivot(root)?;
    let scale_pivot = scene.scale_pivot(root)?;
    if rotate_pivot.abs_diff_eq(Vec3::ZERO, PIVOT_EPSILON)
        && scale_pivot.abs_diff_eq(Vec3::ZERO, PIVOT_EPSILON)
    {
        Ok(())
    } else {
        Err(VariantError::PivotMisaligned {
            node: root,
            rotate_pivot,
            scale_pivot,
        })
    }
}

/// Resolve the per-tier child groups of the export root. Every
/// configured tier must be present by name.
fn tier_groups<B: SceneBackend>(
    scene: &B,
    config: &ProjectConfig,
    root: NodeId,
) -> Result<Vec<(ResolutionTier, NodeId)>> {
    let children = scene.children(root)?;
    let mut named = Vec::with_capacity(children.len());
    for child in children {
        named.push((scene.name(child)?, child));
    }

    let mut groups = Vec::with_capacity(config.resolution_tiers.len());
    for tier in &config.resolution_tiers {
        match named.iter().find(|(name, _)| name == tier.as_str()) {
            Some(&(_, group)) => groups.push((tier.clone(), group)),
            None => {
                return Err(VariantError::HierarchyMismatch {
                    node: root,
                    reason: format!("missing tier group {:?}", tier.as_str()),
                })
            }
        }
    }
    Ok(groups)
}

#[allow(clippy::too_many_arguments)]
fn export_variant<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    identity: &AssetIdentity,
    group: NodeId,
    tier: &ResolutionTier,
    format: StorageFormat,
    path: &Path,
) -> VariantStatus
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let result = (|| -> Result<()> {
        ensure_dir(path.parent().unwrap_or(Path::new("")))?;
        adapters
            .export_variant(scene, format, group, path)
            .map_err(|e| VariantError::ExportAdapterFailure {
                format,
                path: path.to_path_buf(),
                reason: e.0,
            })?;
        let metadata = ComponentMetadata {
            asset_dir: identity.asset_root(&config.component_root),
            asset_name: identity.asset_name(tier),
            file_format: format,
            resolution_type: tier.clone(),
            project_code: config.project_code.clone(),
            scene: config.scene_prefix.clone(),
        };
        registry::tag_exported(scene, group, &metadata)
    })();

    match result {
        Ok(()) => VariantStatus::Written,
        Err(e) => {
            warn!(tier = %tier, %format, error = %e, "variant export failed");
            VariantStatus::Failed(e)
        }
    }
}

fn export_source<B, A>(
    scene: &mut B,
    adapters: &mut A,
    identity: &AssetIdentity,
    config: &ProjectConfig,
    root: NodeId,
) -> std::result::Result<PathBuf, VariantError>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let path = identity.source_path(&config.component_root);
    ensure_dir(path.parent().unwrap_or(Path::new("")))?;
    adapters
        .export_native(scene, root, &path)
        .map_err(|e| VariantError::ExportAdapterFailure {
            format: StorageFormat::Native,
            path: path.clone(),
            reason: e.0,
        })?;
    info!(file = %path.display(), "source snapshot written");
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| VariantError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })
}
