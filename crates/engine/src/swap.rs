//! # Variant Swap Engine
//!
//! Per-node logic for moving a managed node to a different resolution
//! tier or storage format.
//!
//! Two paths:
//! - **same format** — retarget the representation's file-reference
//!   attribute and update the name/tier metadata pair in place; the
//!   node handle survives.
//! - **different format** — import the target variant, carry the world
//!   transform and parent slot over, and only then delete the original.
//!   Destruction is strictly the last step: every failure before it
//!   leaves the pre-swap node untouched.
//!
//! ## Table of Contents
//! 1. SwapTarget / SwapOutcome
//! 2. swap_variant — the single entry point
//! 3. import_variant — standalone materialize-and-tag

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use facet_common::{
    parse_asset_name, retarget_name, variant_file, AttributeValue, ComponentMetadata, NodeId,
    ProjectConfig, ResolutionTier, Result, StorageFormat, VariantError,
};

use crate::adapters::FormatAdapters;
use crate::registry;
use crate::scene::SceneBackend;

// ─────────────────────────────────────────────
// 1. SwapTarget / SwapOutcome
// ─────────────────────────────────────────────

/// Requested destination of a swap.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwapTarget {
    pub format: StorageFormat,
    pub tier: ResolutionTier,
}

/// What a successful swap did.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// Node already matched the target; nothing touched
    Unchanged { node: NodeId },
    /// Same-format tier change: the reference attribute was retargeted
    Retargeted { node: NodeId, path: PathBuf },
    /// Cross-format reimport: `replaced` was deleted, `node` took its
    /// place
    Reimported {
        replaced: NodeId,
        node: NodeId,
        path: PathBuf,
    },
}

impl SwapOutcome {
    /// The live node after the swap.
    pub fn node(&self) -> NodeId {
        match self {
            Self::Unchanged { node }
            | Self::Retargeted { node, .. }
            | Self::Reimported { node, .. } => *node,
        }
    }
}

// ─────────────────────────────────────────────
// 2. swap_variant
// ─────────────────────────────────────────────

/// Move a managed node to `target`.
///
/// Precondition: the node is managed; otherwise [`VariantError::NotManaged`]
/// and no mutation. A missing target file is
/// [`VariantError::VariantUnavailable`] and likewise leaves the node
/// fully untouched.
pub fn swap_variant<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    node: NodeId,
    target: &SwapTarget,
) -> Result<SwapOutcome>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let metadata = registry::read_metadata(scene, node)?;

    if metadata.file_format == target.format && metadata.resolution_type == target.tier {
        debug!(%node, "swap target matches current variant, nothing to do");
        return Ok(SwapOutcome::Unchanged { node });
    }

    let new_name = retarget_name(&metadata.asset_name, &metadata.resolution_type, &target.tier)?;
    let path = variant_file(&metadata.asset_dir, target.format, &new_name);
    if !path.is_file() {
        return Err(VariantError::VariantUnavailable { path });
    }

    if metadata.file_format == target.format {
        swap_in_place(scene, node, target, &new_name, path)
    } else {
        swap_reimport(scene, adapters, config, node, &metadata, target, path)
    }
}

/// Same-format tier change. No node is created or destroyed; the
/// representation child's reference attribute and the name/tier
/// metadata pair move together.
fn swap_in_place<B: SceneBackend>(
    scene: &mut B,
    node: NodeId,
    target: &SwapTarget,
    new_name: &str,
    path: PathBuf,
) -> Result<SwapOutcome> {
    let reference = target.format.reference_attribute();
    let representation = representation_child(scene, node, target.format)?;
    let previous = scene
        .attribute(representation, reference)?
        .ok_or_else(|| VariantError::HierarchyMismatch {
            node,
            reason: format!("representation child lacks the {reference:?} attribute"),
        })?;

    scene.set_attribute(
        representation,
        reference,
        AttributeValue::String(path.to_string_lossy().into_owned()),
    )?;
    if let Err(e) = registry::update_tier(scene, node, new_name, &target.tier) {
        // Back out the retarget so the node stays on its old variant.
        let _ = scene.set_attribute(representation, reference, previous);
        return Err(e);
    }

    info!(%node, file = %path.display(), "retargeted variant in place");
    Ok(SwapOutcome::Retargeted { node, path })
}

/// Cross-format replacement. Order matters: the replacement is fully
/// built, transformed, and tagged before the original is deleted, so
/// any failure up to that point aborts with the scene unchanged (the
/// partially built replacement is discarded).
fn swap_reimport<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    node: NodeId,
    metadata: &ComponentMetadata,
    target: &SwapTarget,
    path: PathBuf,
) -> Result<SwapOutcome>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let transform = scene.world_transform(node)?;
    let parent = scene.parent(node)?;

    let replacement = materialize(
        scene,
        adapters,
        config,
        target.format,
        &path,
        &metadata.project_code,
        &metadata.scene,
    )?;

    if let Err(e) = scene.set_world_transform(replacement, &transform) {
        let _ = scene.delete_node(replacement);
        return Err(e.into());
    }

    // Point of no return: replacement verified, original goes away.
    scene.delete_node(node)?;
    if parent.is_some() {
        scene.reparent(replacement, parent)?;
    }

    info!(
        old = %node,
        new = %replacement,
        file = %path.display(),
        "replaced variant across formats"
    );
    Ok(SwapOutcome::Reimported {
        replaced: node,
        node: replacement,
        path,
    })
}

/// The node's backing representation: its first child, which must carry
/// the format's reference attribute.
fn representation_child<B: SceneBackend>(
    scene: &B,
    node: NodeId,
    format: StorageFormat,
) -> Result<NodeId> {
    let children = scene.children(node)?;
    let first = children
        .first()
        .copied()
        .ok_or_else(|| VariantError::HierarchyMismatch {
            node,
            reason: "node has no representation child".into(),
        })?;
    if scene
        .attribute_kind(first, format.reference_attribute())?
        .is_none()
    {
        return Err(VariantError::HierarchyMismatch {
            node,
            reason: format!(
                "representation child lacks the {:?} attribute",
                format.reference_attribute()
            ),
        });
    }
    Ok(first)
}

// ─────────────────────────────────────────────
// 3. import_variant
// ─────────────────────────────────────────────

/// Materialize a variant file as a fresh managed node, taking
/// provenance from the active project configuration. Used for direct
/// operator imports; the reimport swap path goes through the same
/// machinery with the replaced node's provenance instead.
pub fn import_variant<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    format: StorageFormat,
    path: &Path,
) -> Result<NodeId>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    materialize(
        scene,
        adapters,
        config,
        format,
        path,
        &config.project_code,
        &config.scene_prefix,
    )
}

fn materialize<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    format: StorageFormat,
    path: &Path,
    project_code: &str,
    scene_name: &str,
) -> Result<NodeId>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    if !path.is_file() {
        return Err(VariantError::VariantUnavailable {
            path: path.to_path_buf(),
        });
    }

    // Interpret the name before any host call, so a nonconforming file
    // is rejected without touching the scene.
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| VariantError::NamingMismatch {
            name: path.to_string_lossy().into_owned(),
            tier: String::new(),
        })?;
    let (_, tier) = parse_asset_name(stem, &config.resolution_tiers)?;

    let node = adapters.import_variant(scene, format, path).map_err(|e| {
        VariantError::ImportAdapterFailure {
            format,
            path: path.to_path_buf(),
            reason: e.0,
        }
    })?;

    let metadata = ComponentMetadata {
        asset_dir: asset_dir_for(path, format),
        asset_name: stem.to_string(),
        file_format: format,
        resolution_type: tier,
        project_code: project_code.to_string(),
        scene: scene_name.to_string(),
    };
    if let Err(e) = registry::tag_exported(scene, node, &metadata) {
        let _ = scene.delete_node(node);
        return Err(e);
    }

    debug!(%node, file = %path.display(), "imported variant");
    Ok(node)
}

/// Asset root for a variant file: the file's directory, minus the
/// format subdirectory when the file actually sits in one.
fn asset_dir_for(path: &Path, format: StorageFormat) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    if let Some(sub) = format.subdir() {
        if parent.file_name().is_some_and(|n| n == sub) {
            if let Some(asset_root) = parent.parent() {
                return asset_root.to_path_buf();
            }
        }
    }
    parent.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FileAdapters, MemoryScene};
    use facet_common::WorldTransform;
    use glam::Vec3;

    /// Scene with one managed renderer-proxy node and variant files for
    /// hiRes/midRes on disk.
    struct Fixture {
        scene: MemoryScene,
        adapters: FileAdapters,
        config: ProjectConfig,
        node: NodeId,
        _tmp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::default();
        config.project_code = "DFH".into();
        config.scene_prefix = "fhsj".into();
        config.component_root = tmp.path().to_path_buf();

        let identity = config.identity("rock");
        let asset_root = identity.asset_root(&config.component_root);
        for tier_token in ["hiRes", "midRes"] {
            let tier = config.tier(tier_token).unwrap().clone();
            for format in [StorageFormat::RendererProxy, StorageFormat::RealtimeCache] {
                let path = identity.variant_path(&config.component_root, &tier, format);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, format!("{format} {tier_token}\n")).unwrap();
            }
        }

        let mut scene = MemoryScene::new();
        let node = scene.create_node("DFH_fhsj_rock_hiRes_ass", None).unwrap();
        let shape = scene.create_node("rockShape", Some(node)).unwrap();
        scene
            .add_attribute(
                shape,
                StorageFormat::RendererProxy.reference_attribute(),
                facet_common::AttributeKind::String,
            )
            .unwrap();
        let hi = config.tier("hiRes").unwrap().clone();
        let current = identity.variant_path(
            &config.component_root,
            &hi,
            StorageFormat::RendererProxy,
        );
        scene
            .set_attribute(
                shape,
                StorageFormat::RendererProxy.reference_attribute(),
                AttributeValue::String(current.to_string_lossy().into_owned()),
            )
            .unwrap();

        registry::tag_exported(
            &mut scene,
            node,
            &ComponentMetadata {
                asset_dir: asset_root,
                asset_name: "DFH_fhsj_rock_hiRes".into(),
                file_format: StorageFormat::RendererProxy,
                resolution_type: hi,
                project_code: "DFH".into(),
                scene: "fhsj".into(),
            },
        )
        .unwrap();

        Fixture {
            scene,
            adapters: FileAdapters::default(),
            config,
            node,
            _tmp: tmp,
        }
    }

    fn target(format: StorageFormat, tier: &str, config: &ProjectConfig) -> SwapTarget {
        SwapTarget {
            format,
            tier: config.tier(tier).unwrap().clone(),
        }
    }

    #[test]
    fn test_in_place_tier_swap() {
        let mut fx = fixture();
        let placed = WorldTransform {
            translation: Vec3::new(4.0, 0.0, -2.0),
            rotation: Vec3::new(0.0, 45.0, 0.0),
            scale: Vec3::splat(2.0),
        };
        fx.scene.set_world_transform(fx.node, &placed).unwrap();

        let outcome = swap_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            fx.node,
            &target(StorageFormat::RendererProxy, "midRes", &fx.config),
        )
        .unwrap();

        // Same handle, updated metadata, untouched transform.
        assert_eq!(outcome.node(), fx.node);
        assert!(matches!(outcome, SwapOutcome::Retargeted { .. }));
        let meta = registry::read_metadata(&fx.scene, fx.node).unwrap();
        assert_eq!(meta.asset_name, "DFH_fhsj_rock_midRes");
        assert_eq!(meta.resolution_type.as_str(), "midRes");
        meta.verify().unwrap();
        assert!(fx
            .scene
            .world_transform(fx.node)
            .unwrap()
            .approx_eq(&placed, 1e-4));

        // The representation now points at the midRes file.
        let shape = fx.scene.children(fx.node).unwrap()[0];
        let reference = fx
            .scene
            .attribute(shape, StorageFormat::RendererProxy.reference_attribute())
            .unwrap()
            .unwrap();
        assert!(reference.as_str().unwrap().ends_with("DFH_fhsj_rock_midRes.ass"));
        // No import went through the adapters for an in-place swap.
        assert_eq!(fx.adapters.import_count, 0);
    }

    #[test]
    fn test_swap_to_same_variant_is_noop() {
        let mut fx = fixture();
        let outcome = swap_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            fx.node,
            &target(StorageFormat::RendererProxy, "hiRes", &fx.config),
        )
        .unwrap();
        assert_eq!(outcome, SwapOutcome::Unchanged { node: fx.node });
    }

    #[test]
    fn test_missing_variant_leaves_node_untouched() {
        let mut fx = fixture();
        let before = registry::read_metadata(&fx.scene, fx.node).unwrap();
        let node_count = fx.scene.node_count();

        // proxyRes was never written to disk.
        let err = swap_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            fx.node,
            &target(StorageFormat::RendererProxy, "proxyRes", &fx.config),
        )
        .unwrap_err();

        assert!(matches!(err, VariantError::VariantUnavailable { .. }));
        assert_eq!(registry::read_metadata(&fx.scene, fx.node).unwrap(), before);
        assert_eq!(fx.scene.node_count(), node_count);
    }

    #[test]
    fn test_cross_format_swap_replaces_node() {
        let mut fx = fixture();
        let placed = WorldTransform {
            translation: Vec3::new(-1.0, 3.0, 8.0),
            rotation: Vec3::new(10.0, 0.0, 0.0),
            scale: Vec3::ONE,
        };
        fx.scene.set_world_transform(fx.node, &placed).unwrap();
        let group = fx.scene.create_node("set_grp", None).unwrap();
        fx.scene.reparent(fx.node, Some(group)).unwrap();

        let outcome = swap_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            fx.node,
            &target(StorageFormat::RealtimeCache, "midRes", &fx.config),
        )
        .unwrap();

        let SwapOutcome::Reimported { replaced, node: new_node, .. } = outcome else {
            panic!("expected a reimport outcome");
        };
        assert_eq!(replaced, fx.node);
        assert!(!fx.scene.exists(fx.node));
        assert!(fx.scene.exists(new_node));

        // Transform and parent slot carried over, metadata rebuilt.
        assert!(fx
            .scene
            .world_transform(new_node)
            .unwrap()
            .approx_eq(&placed, 1e-4));
        assert_eq!(fx.scene.parent(new_node).unwrap(), Some(group));
        let meta = registry::read_metadata(&fx.scene, new_node).unwrap();
        assert_eq!(meta.file_format, StorageFormat::RealtimeCache);
        assert_eq!(meta.resolution_type.as_str(), "midRes");
        assert_eq!(meta.asset_name, "DFH_fhsj_rock_midRes");
        assert_eq!(meta.project_code, "DFH");
        assert_eq!(fx.adapters.import_count, 1);
    }

    #[test]
    fn test_import_failure_preserves_original() {
        let mut fx = fixture();
        fx.adapters.fail_imports = true;
        let before = registry::read_metadata(&fx.scene, fx.node).unwrap();

        let err = swap_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            fx.node,
            &target(StorageFormat::RealtimeCache, "midRes", &fx.config),
        )
        .unwrap_err();

        assert!(matches!(err, VariantError::ImportAdapterFailure { .. }));
        assert!(fx.scene.exists(fx.node));
        assert_eq!(registry::read_metadata(&fx.scene, fx.node).unwrap(), before);
    }

    #[test]
    fn test_swap_rejects_unmanaged_node() {
        let mut fx = fixture();
        let plain = fx.scene.create_node("plain", None).unwrap();
        let err = swap_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            plain,
            &target(StorageFormat::Native, "hiRes", &fx.config),
        )
        .unwrap_err();
        assert!(matches!(err, VariantError::NotManaged(_)));
    }

    #[test]
    fn test_import_variant_tags_from_config() {
        let mut fx = fixture();
        let identity = fx.config.identity("rock");
        let path = identity.variant_path(
            &fx.config.component_root,
            fx.config.tier("midRes").unwrap(),
            StorageFormat::RealtimeCache,
        );

        let node = import_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            StorageFormat::RealtimeCache,
            &path,
        )
        .unwrap();

        let meta = registry::read_metadata(&fx.scene, node).unwrap();
        assert_eq!(meta.file_format, StorageFormat::RealtimeCache);
        assert_eq!(meta.asset_dir, identity.asset_root(&fx.config.component_root));
        assert_eq!(meta.project_code, "DFH");
        assert_eq!(meta.scene, "fhsj");

        // The representation child carries the reference attribute.
        let shape = fx.scene.children(node).unwrap()[0];
        let reference = fx
            .scene
            .attribute(shape, StorageFormat::RealtimeCache.reference_attribute())
            .unwrap()
            .unwrap();
        assert_eq!(reference.as_str().unwrap(), path.to_string_lossy());
    }

    #[test]
    fn test_import_variant_rejects_nonconforming_name() {
        let mut fx = fixture();
        let stray = fx.config.component_root.join("whatever.abc");
        std::fs::write(&stray, "cache\n").unwrap();

        let err = import_variant(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            StorageFormat::RealtimeCache,
            &stray,
        )
        .unwrap_err();
        assert!(matches!(err, VariantError::NamingMismatch { .. }));
        assert_eq!(fx.adapters.import_count, 0);
    }
}
