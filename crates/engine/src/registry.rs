//! # Component Metadata Registry
//!
//! Reads and writes the component schema on live scene nodes, and
//! groups tagged nodes into asset families for bulk operations. The
//! registry is the only code that touches the metadata attributes;
//! everything else works with [`ComponentMetadata`] values.
//!
//! ## Table of Contents
//! 1. tag_exported / update_tier — writing metadata
//! 2. is_managed / read_metadata — reading metadata
//! 3. all_managed_nodes / group_by_family — scene enumeration

use tracing::{debug, warn};

use facet_common::{
    attr, AttributeValue, ComponentMetadata, FamilyKey, NodeId, ResolutionTier, Result,
    StorageFormat, VariantError,
};

use crate::scene::SceneBackend;

// ─────────────────────────────────────────────
// 1. Writing metadata
// ─────────────────────────────────────────────

/// Idempotently ensure the full component schema exists on `node`, then
/// overwrite every value from `metadata`.
///
/// Kind conflicts are detected across the whole schema before anything
/// is written, so a failing call leaves the node untouched.
pub fn tag_exported<B: SceneBackend>(
    scene: &mut B,
    node: NodeId,
    metadata: &ComponentMetadata,
) -> Result<()> {
    metadata.verify()?;

    for (name, kind) in attr::SCHEMA {
        if let Some(actual) = scene.attribute_kind(node, name)? {
            if actual != kind {
                return Err(VariantError::AttributeConflict {
                    node,
                    attribute: name.to_string(),
                    expected: kind,
                    actual,
                });
            }
        }
    }

    for (name, kind) in attr::SCHEMA {
        scene.add_attribute(node, name, kind)?;
    }
    for (name, value) in metadata.to_attributes() {
        scene.set_attribute(node, name, value)?;
    }

    debug!(%node, asset = %metadata.asset_name, format = %metadata.file_format, "tagged component node");
    Ok(())
}

/// Atomically move a node's name/tier pair: both attributes change or
/// neither does (the first write is rolled back if the second fails).
pub fn update_tier<B: SceneBackend>(
    scene: &mut B,
    node: NodeId,
    asset_name: &str,
    tier: &ResolutionTier,
) -> Result<()> {
    let previous = scene
        .attribute(node, attr::ASSET_NAME)?
        .ok_or(VariantError::NotManaged(node))?;

    scene.set_attribute(node, attr::ASSET_NAME, AttributeValue::from(asset_name))?;
    if let Err(e) = scene.set_attribute(
        node,
        attr::RESOLUTION_TYPE,
        AttributeValue::from(tier.as_str()),
    ) {
        // Keep the invariant: back out the name write.
        if scene
            .set_attribute(node, attr::ASSET_NAME, previous)
            .is_err()
        {
            warn!(%node, "rollback of assetName failed after resolutionType write error");
        }
        return Err(e.into());
    }
    Ok(())
}

// ─────────────────────────────────────────────
// 2. Reading metadata
// ─────────────────────────────────────────────

/// True iff the node carries the component marker set to `true`.
pub fn is_managed<B: SceneBackend>(scene: &B, node: NodeId) -> bool {
    matches!(
        scene.attribute(node, attr::IS_COMPONENT),
        Ok(Some(AttributeValue::Bool(true)))
    )
}

/// Read the full metadata record off a managed node.
///
/// Unmanaged nodes fail with [`VariantError::NotManaged`]; a marker
/// with a broken schema behind it is reported as corrupt rather than
/// silently skipped, and a name/tier disagreement as
/// [`VariantError::NamingMismatch`].
pub fn read_metadata<B: SceneBackend>(scene: &B, node: NodeId) -> Result<ComponentMetadata> {
    if !is_managed(scene, node) {
        return Err(VariantError::NotManaged(node));
    }

    let string_attr = |name: &str| -> Result<String> {
        match scene.attribute(node, name)? {
            Some(AttributeValue::String(s)) => Ok(s),
            Some(other) => Err(VariantError::CorruptMetadata {
                node,
                reason: format!("attribute {name:?} is {}, expected string", other.kind()),
            }),
            None => Err(VariantError::Scene(facet_common::SceneError::AttributeMissing {
                node,
                name: name.to_string(),
            })),
        }
    };

    let format_token = string_attr(attr::FILE_FORMAT)?;
    let file_format =
        StorageFormat::from_token(&format_token).ok_or_else(|| VariantError::CorruptMetadata {
            node,
            reason: format!("unknown fileFormat token {format_token:?}"),
        })?;
    let tier_token = string_attr(attr::RESOLUTION_TYPE)?;
    let resolution_type =
        ResolutionTier::new(tier_token.clone()).map_err(|_| VariantError::CorruptMetadata {
            node,
            reason: format!("malformed resolutionType token {tier_token:?}"),
        })?;

    let metadata = ComponentMetadata {
        asset_dir: string_attr(attr::ASSET_DIR)?.into(),
        asset_name: string_attr(attr::ASSET_NAME)?,
        file_format,
        resolution_type,
        project_code: string_attr(attr::PROJECT_CODE)?,
        scene: string_attr(attr::SCENE)?,
    };
    metadata.verify()?;
    Ok(metadata)
}

// ─────────────────────────────────────────────
// 3. Scene enumeration
// ─────────────────────────────────────────────

/// Every node in the scene carrying the component marker.
pub fn all_managed_nodes<B: SceneBackend>(scene: &B) -> Vec<NodeId> {
    scene
        .nodes_with_attribute(attr::IS_COMPONENT)
        .into_iter()
        .filter(|&n| is_managed(scene, n))
        .collect()
}

/// One asset family: every managed node sharing a logical identity.
/// Member order is scene enumeration order; the first member is the
/// master candidate for instanced bulk replaces.
#[derive(Debug, Clone)]
pub struct AssetFamily {
    pub key: FamilyKey,
    pub members: Vec<NodeId>,
}

/// Result of grouping a node set into families. Nodes whose metadata
/// cannot be read are isolated into `skipped` instead of failing the
/// scan.
#[derive(Debug, Default)]
pub struct FamilyGrouping {
    /// Families in first-seen order
    pub families: Vec<AssetFamily>,
    /// Nodes excluded from grouping, with the reason
    pub skipped: Vec<(NodeId, VariantError)>,
}

/// Group nodes into asset families by base name + provenance.
pub fn group_by_family<B: SceneBackend>(
    scene: &B,
    nodes: &[NodeId],
    tiers: &[ResolutionTier],
) -> FamilyGrouping {
    let mut grouping = FamilyGrouping::default();
    let mut index: std::collections::HashMap<FamilyKey, usize> = std::collections::HashMap::new();

    for &node in nodes {
        let key = match read_metadata(scene, node).and_then(|m| m.family_key(tiers)) {
            Ok(key) => key,
            Err(e) => {
                warn!(%node, error = %e, "excluding node from family grouping");
                grouping.skipped.push((node, e));
                continue;
            }
        };
        match index.get(&key) {
            Some(&i) => grouping.families[i].members.push(node),
            None => {
                index.insert(key.clone(), grouping.families.len());
                grouping.families.push(AssetFamily {
                    key,
                    members: vec![node],
                });
            }
        }
    }
    grouping
}
