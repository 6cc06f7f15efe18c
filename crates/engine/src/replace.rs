//! # Bulk Replace Coordinator
//!
//! Applies the swap engine across whole asset families. A family with
//! one member is swapped directly; a family with several members gets
//! one heavy import (the master) and lightweight instances or
//! independent duplicates for the rest, so shared geometry is never
//! re-imported per member.
//!
//! Failures are isolated at both levels: a member failure is recorded
//! and the family continues, a family failure is recorded and the scan
//! continues. Nothing here aborts the bulk operation.
//!
//! ## Table of Contents
//! 1. ReplaceRequest / InstancingPolicy
//! 2. FamilyPhase / outcomes / BulkReport
//! 3. replace_all / replace_family

use tracing::{info, warn};

use facet_common::{
    ComponentMetadata, FamilyKey, NodeId, ProjectConfig, ResolutionTier, Result, StorageFormat,
    VariantError,
};

use crate::adapters::FormatAdapters;
use crate::registry::{self, AssetFamily};
use crate::scene::SceneBackend;
use crate::swap::{self, SwapTarget};

// ─────────────────────────────────────────────
// 1. Request
// ─────────────────────────────────────────────

/// How the non-master members of a multi-node family are rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InstancingPolicy {
    /// Lightweight instances sharing the master's heavy data
    Instance,
    /// Independent deep copies per member
    Duplicate,
}

/// Target of a bulk replace.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplaceRequest {
    pub format: StorageFormat,
    pub tier: ResolutionTier,
    pub policy: InstancingPolicy,
}

impl ReplaceRequest {
    fn target(&self) -> SwapTarget {
        SwapTarget {
            format: self.format,
            tier: self.tier.clone(),
        }
    }
}

// ─────────────────────────────────────────────
// 2. Outcomes
// ─────────────────────────────────────────────

/// Progress of one family through the master/instance scheme. Left at
/// the stage reached when a failure stopped the family early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FamilyPhase {
    NotStarted,
    MasterSwapped,
    InstancesLinked,
    Done,
}

/// Result for one pre-swap member node.
#[derive(Debug)]
pub struct MemberOutcome {
    /// The node as it was enumerated, before the replace
    pub node: NodeId,
    /// The node standing in its place afterwards, when it succeeded
    pub replacement: Option<NodeId>,
    pub error: Option<VariantError>,
}

impl MemberOutcome {
    fn ok(node: NodeId, replacement: NodeId) -> Self {
        Self {
            node,
            replacement: Some(replacement),
            error: None,
        }
    }

    fn failed(node: NodeId, error: VariantError) -> Self {
        Self {
            node,
            replacement: None,
            error: Some(error),
        }
    }
}

/// Result for one family.
#[derive(Debug)]
pub struct FamilyOutcome {
    pub key: FamilyKey,
    pub phase: FamilyPhase,
    pub members: Vec<MemberOutcome>,
}

impl FamilyOutcome {
    pub fn succeeded(&self) -> bool {
        self.phase == FamilyPhase::Done && self.members.iter().all(|m| m.error.is_none())
    }
}

/// Aggregate of a whole-scene replace.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub families: Vec<FamilyOutcome>,
    /// Nodes that could not even be grouped (unreadable metadata)
    pub skipped: Vec<(NodeId, VariantError)>,
}

impl BulkReport {
    pub fn replaced(&self) -> usize {
        self.families
            .iter()
            .flat_map(|f| &f.members)
            .filter(|m| m.replacement.is_some())
            .count()
    }

    pub fn failures(&self) -> usize {
        self.skipped.len()
            + self
                .families
                .iter()
                .flat_map(|f| &f.members)
                .filter(|m| m.error.is_some())
                .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

// ─────────────────────────────────────────────
// 3. Coordinator
// ─────────────────────────────────────────────

/// Replace every managed node in the scene with the requested variant.
pub fn replace_all<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    request: &ReplaceRequest,
) -> BulkReport
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let nodes = registry::all_managed_nodes(scene);
    let grouping = registry::group_by_family(scene, &nodes, &config.resolution_tiers);

    let mut report = BulkReport {
        families: Vec::with_capacity(grouping.families.len()),
        skipped: grouping.skipped,
    };
    for family in &grouping.families {
        report
            .families
            .push(replace_family(scene, adapters, config, family, request));
    }

    info!(
        families = report.families.len(),
        replaced = report.replaced(),
        failures = report.failures(),
        "bulk replace finished"
    );
    report
}

/// Replace one family. Never propagates an error; everything lands in
/// the returned outcome.
pub fn replace_family<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    family: &AssetFamily,
    request: &ReplaceRequest,
) -> FamilyOutcome
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let mut outcome = FamilyOutcome {
        key: family.key.clone(),
        phase: FamilyPhase::NotStarted,
        members: Vec::with_capacity(family.members.len()),
    };

    if let [node] = family.members[..] {
        match swap_preserving_transform(scene, adapters, config, node, request) {
            Ok(replacement) => {
                outcome.members.push(MemberOutcome::ok(node, replacement));
                outcome.phase = FamilyPhase::Done;
            }
            Err(e) => {
                warn!(family = %family.key, %node, error = %e, "singleton replace failed");
                outcome.members.push(MemberOutcome::failed(node, e));
            }
        }
        return outcome;
    }

    // Multi-member: one heavy swap for the master, then cheap copies.
    let master = family.members[0];
    let new_master =
        match swap::swap_variant(scene, adapters, config, master, &request.target()) {
            Ok(swap_outcome) => {
                let node = swap_outcome.node();
                outcome.members.push(MemberOutcome::ok(master, node));
                node
            }
            Err(e) => {
                warn!(family = %family.key, %master, error = %e, "master swap failed, family skipped");
                outcome.members.push(MemberOutcome::failed(master, e));
                return outcome;
            }
        };
    outcome.phase = FamilyPhase::MasterSwapped;

    let master_metadata = registry::read_metadata(scene, new_master).ok();
    for (index, &member) in family.members.iter().enumerate().skip(1) {
        match link_member(
            scene,
            &family.key,
            new_master,
            master_metadata.as_ref(),
            member,
            request,
            index,
        ) {
            Ok(copy) => outcome.members.push(MemberOutcome::ok(member, copy)),
            Err(e) => {
                warn!(family = %family.key, %member, error = %e, "member replace failed");
                outcome.members.push(MemberOutcome::failed(member, e));
            }
        }
    }
    outcome.phase = FamilyPhase::InstancesLinked;

    if outcome.members.iter().all(|m| m.error.is_none()) {
        outcome.phase = FamilyPhase::Done;
    }
    outcome
}

/// Swap one node and re-apply its pre-swap world transform afterwards.
/// The reimport path restores the transform itself; re-applying keeps
/// the in-place path behaviorally identical.
fn swap_preserving_transform<B, A>(
    scene: &mut B,
    adapters: &mut A,
    config: &ProjectConfig,
    node: NodeId,
    request: &ReplaceRequest,
) -> Result<NodeId>
where
    B: SceneBackend,
    A: FormatAdapters<B>,
{
    let transform = scene.world_transform(node)?;
    let outcome = swap::swap_variant(scene, adapters, config, node, &request.target())?;
    scene.set_world_transform(outcome.node(), &transform)?;
    Ok(outcome.node())
}

/// Rebuild one non-master member as a copy of the swapped master. The
/// copy is created, transformed, parented, and tagged before the
/// member is deleted; a failure anywhere discards the copy and leaves
/// the member as it was.
fn link_member<B: SceneBackend>(
    scene: &mut B,
    key: &FamilyKey,
    master: NodeId,
    master_metadata: Option<&ComponentMetadata>,
    member: NodeId,
    request: &ReplaceRequest,
    index: usize,
) -> Result<NodeId> {
    let transform = scene.world_transform(member)?;
    let parent = scene.parent(member)?;

    let copy = match request.policy {
        InstancingPolicy::Instance => {
            let name = format!("{}_{}{}", key.base_name, request.format.token(), index);
            scene.instance(master, &name)?
        }
        InstancingPolicy::Duplicate => {
            let name = format!("{}_dup{}", scene.name(member)?, index);
            scene.duplicate(master, &name)?
        }
    };

    let built = (|| -> Result<()> {
        scene.set_world_transform(copy, &transform)?;
        if parent.is_some() {
            scene.reparent(copy, parent)?;
        }
        // Instances come up untagged (the host copies the transform
        // node, not its attributes); re-tag so the copy stays managed.
        if let Some(metadata) = master_metadata {
            registry::tag_exported(scene, copy, metadata)?;
        }
        Ok(())
    })();
    if let Err(e) = built {
        let _ = scene.delete_node(copy);
        return Err(e);
    }

    // Destructive step last.
    scene.delete_node(member)?;
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FileAdapters, MemoryScene};
    use facet_common::{AttributeKind, AttributeValue, WorldTransform};
    use glam::Vec3;

    struct Fixture {
        scene: MemoryScene,
        adapters: FileAdapters,
        config: ProjectConfig,
        _tmp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::default();
        config.project_code = "DFH".into();
        config.scene_prefix = "fhsj".into();
        config.component_root = tmp.path().to_path_buf();
        Fixture {
            scene: MemoryScene::new(),
            adapters: FileAdapters::default(),
            config,
            _tmp: tmp,
        }
    }

    /// Write variant files for an asset across the given tiers/formats.
    fn write_variants(config: &ProjectConfig, asset: &str, tiers: &[&str], formats: &[StorageFormat]) {
        let identity = config.identity(asset);
        for tier_token in tiers {
            let tier = config.tier(tier_token).unwrap();
            for format in formats {
                let path = identity.variant_path(&config.component_root, tier, *format);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, format!("{format} {tier_token}\n")).unwrap();
            }
        }
    }

    /// Managed renderer-proxy node placed at `translation`.
    fn managed_node(
        scene: &mut MemoryScene,
        config: &ProjectConfig,
        asset: &str,
        tier_token: &str,
        translation: Vec3,
    ) -> NodeId {
        let identity = config.identity(asset);
        let tier = config.tier(tier_token).unwrap().clone();
        let node = scene
            .create_node(&format!("{}_{}_ass", identity.base_name(), tier_token), None)
            .unwrap();
        let shape = scene.create_node("repShape", Some(node)).unwrap();
        let reference = StorageFormat::RendererProxy.reference_attribute();
        scene
            .add_attribute(shape, reference, AttributeKind::String)
            .unwrap();
        let current = identity.variant_path(&config.component_root, &tier, StorageFormat::RendererProxy);
        scene
            .set_attribute(
                shape,
                reference,
                AttributeValue::String(current.to_string_lossy().into_owned()),
            )
            .unwrap();
        registry::tag_exported(
            scene,
            node,
            &ComponentMetadata {
                asset_dir: identity.asset_root(&config.component_root),
                asset_name: identity.asset_name(&tier),
                file_format: StorageFormat::RendererProxy,
                resolution_type: tier,
                project_code: config.project_code.clone(),
                scene: config.scene_prefix.clone(),
            },
        )
        .unwrap();
        scene
            .set_world_transform(
                node,
                &WorldTransform {
                    translation,
                    rotation: Vec3::ZERO,
                    scale: Vec3::ONE,
                },
            )
            .unwrap();
        node
    }

    fn request(format: StorageFormat, tier: &str, policy: InstancingPolicy, config: &ProjectConfig) -> ReplaceRequest {
        ReplaceRequest {
            format,
            tier: config.tier(tier).unwrap().clone(),
            policy,
        }
    }

    #[test]
    fn test_singleton_family_direct_swap() {
        let mut fx = fixture();
        write_variants(
            &fx.config,
            "rock",
            &["hiRes", "proxyRes"],
            &[StorageFormat::RendererProxy, StorageFormat::PointCache],
        );
        let placed = Vec3::new(5.0, 0.0, 1.0);
        let node = managed_node(&mut fx.scene, &fx.config, "rock", "hiRes", placed);
        let before = fx.scene.node_count();

        let report = replace_all(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            &request(
                StorageFormat::PointCache,
                "proxyRes",
                InstancingPolicy::Instance,
                &fx.config,
            ),
        );

        assert!(report.is_clean());
        assert_eq!(report.replaced(), 1);
        assert_eq!(report.families.len(), 1);
        assert_eq!(report.families[0].phase, FamilyPhase::Done);

        // One node replaced one node; transform carried over.
        let replacement = report.families[0].members[0].replacement.unwrap();
        assert!(!fx.scene.exists(node));
        assert_eq!(fx.scene.node_count(), before);
        assert_eq!(
            fx.scene.world_transform(replacement).unwrap().translation,
            placed
        );
        let meta = registry::read_metadata(&fx.scene, replacement).unwrap();
        assert_eq!(meta.file_format, StorageFormat::PointCache);
        assert_eq!(meta.resolution_type.as_str(), "proxyRes");
    }

    #[test]
    fn test_instanced_family_imports_once() {
        let mut fx = fixture();
        write_variants(
            &fx.config,
            "tree",
            &["hiRes", "proxyRes"],
            &[StorageFormat::RendererProxy, StorageFormat::RealtimeCache],
        );
        let spots = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 2.0),
            Vec3::new(-4.0, 1.0, 7.0),
        ];
        let members: Vec<NodeId> = spots
            .iter()
            .map(|&p| managed_node(&mut fx.scene, &fx.config, "tree", "hiRes", p))
            .collect();

        let report = replace_all(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            &request(
                StorageFormat::RealtimeCache,
                "proxyRes",
                InstancingPolicy::Instance,
                &fx.config,
            ),
        );

        assert!(report.is_clean());
        assert_eq!(report.families.len(), 1);
        let family = &report.families[0];
        assert_eq!(family.phase, FamilyPhase::Done);
        assert_eq!(family.members.len(), 3);

        // Exactly one heavy import; the other members are instances of
        // the new master.
        assert_eq!(fx.adapters.import_count, 1);
        let new_master = family.members[0].replacement.unwrap();
        for (member_outcome, expected) in family.members.iter().zip(spots) {
            let replacement = member_outcome.replacement.unwrap();
            assert_eq!(
                fx.scene.world_transform(replacement).unwrap().translation,
                expected
            );
            assert!(registry::is_managed(&fx.scene, replacement));
        }
        for member_outcome in &family.members[1..] {
            let instance = member_outcome.replacement.unwrap();
            assert_eq!(fx.scene.instanced_from(instance), Some(new_master));
        }
        for original in members {
            assert!(!fx.scene.exists(original));
        }
    }

    #[test]
    fn test_duplicate_policy_makes_independent_copies() {
        let mut fx = fixture();
        write_variants(
            &fx.config,
            "bush",
            &["hiRes", "midRes"],
            &[StorageFormat::RendererProxy, StorageFormat::PointCache],
        );
        for p in [Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)] {
            managed_node(&mut fx.scene, &fx.config, "bush", "hiRes", p);
        }

        let report = replace_all(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            &request(
                StorageFormat::PointCache,
                "midRes",
                InstancingPolicy::Duplicate,
                &fx.config,
            ),
        );

        assert!(report.is_clean());
        let family = &report.families[0];
        let copy = family.members[1].replacement.unwrap();
        assert_eq!(fx.scene.instanced_from(copy), None);
        assert!(registry::is_managed(&fx.scene, copy));
        assert_eq!(fx.adapters.import_count, 1);
    }

    #[test]
    fn test_family_failures_are_isolated() {
        let mut fx = fixture();
        // "rock" has its target variant on disk, "tree" does not.
        write_variants(
            &fx.config,
            "rock",
            &["hiRes", "proxyRes"],
            &[StorageFormat::RendererProxy, StorageFormat::PointCache],
        );
        write_variants(
            &fx.config,
            "tree",
            &["hiRes"],
            &[StorageFormat::RendererProxy],
        );
        managed_node(&mut fx.scene, &fx.config, "rock", "hiRes", Vec3::ZERO);
        let tree = managed_node(&mut fx.scene, &fx.config, "tree", "hiRes", Vec3::ONE);

        let report = replace_all(
            &mut fx.scene,
            &mut fx.adapters,
            &fx.config,
            &request(
                StorageFormat::PointCache,
                "proxyRes",
                InstancingPolicy::Instance,
                &fx.config,
            ),
        );

        assert_eq!(report.families.len(), 2);
        assert_eq!(report.replaced(), 1);
        assert_eq!(report.failures(), 1);

        let failed = report
            .families
            .iter()
            .find(|f| f.key.base_name == "DFH_fhsj_tree")
            .unwrap();
        assert_eq!(failed.phase, FamilyPhase::NotStarted);
        assert!(matches!(
            failed.members[0].error,
            Some(VariantError::VariantUnavailable { .. })
        ));
        // The failed family's node is untouched.
        assert!(fx.scene.exists(tree));
    }
}
