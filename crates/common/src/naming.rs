//! # Naming Convention Codec
//!
//! Pure functions mapping (project, scene, asset, tier, format) to
//! filesystem paths and derived identifiers, and back. Stateless; every
//! path the pipeline touches is derived here and nowhere else.
//!
//! Layout per asset root `{root}/{project}_{scene}_{asset}/`:
//!
//! ```text
//! {project}_{scene}_{asset}_{tier}.ma            native snapshot
//! alembic/{project}_{scene}_{asset}_{tier}.abc   point cache
//! cache/{project}_{scene}_{asset}_{tier}.abc     realtime cache
//! ass/{project}_{scene}_{asset}_{tier}.ass       renderer proxy
//! {project}_{scene}_{asset}_src.ma               unresolved source
//! textures/...                                   relocated textures
//! {project}_{scene}_{asset}_preview.png          viewport capture
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VariantError};
use crate::format::{ResolutionTier, StorageFormat};

/// Suffix used in place of a tier token for the unresolved source
/// snapshot.
pub const SOURCE_SUFFIX: &str = "src";

/// Logical identity of one asset component within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetIdentity {
    /// Project code, e.g. `DFH`
    pub project_code: String,
    /// Scene prefix within the project, e.g. `fhsj`
    pub scene: String,
    /// Operator-chosen asset name; may itself contain underscores
    pub asset: String,
}

impl AssetIdentity {
    pub fn new(
        project_code: impl Into<String>,
        scene: impl Into<String>,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            project_code: project_code.into(),
            scene: scene.into(),
            asset: asset.into(),
        }
    }

    /// `{project}_{scene}_{asset}` — the family grouping key and the
    /// stem every variant name is built from.
    pub fn base_name(&self) -> String {
        format!("{}_{}_{}", self.project_code, self.scene, self.asset)
    }

    /// `{project}_{scene}_{asset}_{tier}`
    pub fn asset_name(&self, tier: &ResolutionTier) -> String {
        format!("{}_{}", self.base_name(), tier)
    }

    /// Directory holding every variant of this asset. This is the value
    /// recorded in the `assetDir` attribute; it never includes a
    /// format subdirectory.
    pub fn asset_root(&self, component_root: &Path) -> PathBuf {
        component_root.join(self.base_name())
    }

    /// Full path of one variant file.
    pub fn variant_path(
        &self,
        component_root: &Path,
        tier: &ResolutionTier,
        format: StorageFormat,
    ) -> PathBuf {
        variant_file(
            &self.asset_root(component_root),
            format,
            &self.asset_name(tier),
        )
    }

    /// Path of the unresolved source snapshot (`..._src.ma`).
    pub fn source_path(&self, component_root: &Path) -> PathBuf {
        self.asset_root(component_root)
            .join(format!("{}_{}.ma", self.base_name(), SOURCE_SUFFIX))
    }

    /// Path of the viewport preview image.
    pub fn preview_path(&self, component_root: &Path) -> PathBuf {
        self.asset_root(component_root)
            .join(format!("{}_preview.png", self.base_name()))
    }

    /// Directory for relocated texture dependencies.
    pub fn textures_dir(&self, component_root: &Path) -> PathBuf {
        self.asset_root(component_root).join("textures")
    }

    /// Rebuild an identity from a tiered asset name and known
    /// provenance. Fails with [`VariantError::NamingMismatch`] when the
    /// name does not carry the `{project}_{scene}_` prefix or a
    /// configured tier suffix.
    pub fn from_asset_name(
        name: &str,
        project_code: &str,
        scene: &str,
        tiers: &[ResolutionTier],
    ) -> Result<(Self, ResolutionTier)> {
        let (base, tier) = parse_asset_name(name, tiers)?;
        let prefix = format!("{project_code}_{scene}_");
        let asset = base
            .strip_prefix(&prefix)
            .ok_or_else(|| VariantError::NamingMismatch {
                name: name.to_string(),
                tier: prefix,
            })?;
        Ok((
            Self::new(project_code, scene, asset),
            tier,
        ))
    }
}

/// Join an asset root, optional format subdirectory, and file name into
/// the on-disk variant path.
pub fn variant_file(asset_dir: &Path, format: StorageFormat, asset_name: &str) -> PathBuf {
    let file = format!("{}.{}", asset_name, format.extension());
    match format.subdir() {
        Some(sub) => asset_dir.join(sub).join(file),
        None => asset_dir.join(file),
    }
}

/// Split `{base}_{tier}` into its base name and tier by exact match of
/// the trailing `_`-separated token against the configured tier list.
///
/// The tier must appear as the entire final segment; anything else is a
/// [`VariantError::NamingMismatch`]. Matching against the configured
/// list (rather than substring-replacing whatever trails the last `_`)
/// is what makes cross-format retargeting unambiguous.
pub fn parse_asset_name(name: &str, tiers: &[ResolutionTier]) -> Result<(String, ResolutionTier)> {
    for tier in tiers {
        if let Some(base) = name.strip_suffix(tier.as_str()) {
            if let Some(base) = base.strip_suffix('_') {
                if !base.is_empty() {
                    return Ok((base.to_string(), tier.clone()));
                }
            }
        }
    }
    Err(VariantError::NamingMismatch {
        name: name.to_string(),
        tier: tiers
            .iter()
            .map(ResolutionTier::as_str)
            .collect::<Vec<_>>()
            .join("|"),
    })
}

/// Substitute the trailing tier token of `name`, requiring the current
/// tier to be present exactly where expected.
pub fn retarget_name(
    name: &str,
    current: &ResolutionTier,
    target: &ResolutionTier,
) -> Result<String> {
    let suffix = format!("_{current}");
    match name.strip_suffix(&suffix) {
        Some(base) if !base.is_empty() => Ok(format!("{base}_{target}")),
        _ => Err(VariantError::NamingMismatch {
            name: name.to_string(),
            tier: current.as_str().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Vec<ResolutionTier> {
        ["proxyRes", "midRes", "hiRes"]
            .into_iter()
            .map(|t| ResolutionTier::new(t).unwrap())
            .collect()
    }

    fn identity() -> AssetIdentity {
        AssetIdentity::new("DFH", "fhsj", "rock_big")
    }

    #[test]
    fn test_variant_paths() {
        let root = Path::new("/proj/component");
        let id = identity();
        let hi = ResolutionTier::new("hiRes").unwrap();

        assert_eq!(
            id.variant_path(root, &hi, StorageFormat::Native),
            Path::new("/proj/component/DFH_fhsj_rock_big/DFH_fhsj_rock_big_hiRes.ma")
        );
        assert_eq!(
            id.variant_path(root, &hi, StorageFormat::PointCache),
            Path::new("/proj/component/DFH_fhsj_rock_big/alembic/DFH_fhsj_rock_big_hiRes.abc")
        );
        assert_eq!(
            id.variant_path(root, &hi, StorageFormat::RealtimeCache),
            Path::new("/proj/component/DFH_fhsj_rock_big/cache/DFH_fhsj_rock_big_hiRes.abc")
        );
        assert_eq!(
            id.variant_path(root, &hi, StorageFormat::RendererProxy),
            Path::new("/proj/component/DFH_fhsj_rock_big/ass/DFH_fhsj_rock_big_hiRes.ass")
        );
        assert_eq!(
            id.source_path(root),
            Path::new("/proj/component/DFH_fhsj_rock_big/DFH_fhsj_rock_big_src.ma")
        );
    }

    #[test]
    fn test_parse_round_trip() {
        // derivePath then parseIdentity recovers the base for every tier
        let id = identity();
        for tier in tiers() {
            let name = id.asset_name(&tier);
            let (base, parsed) = parse_asset_name(&name, &tiers()).unwrap();
            assert_eq!(base, id.base_name());
            assert_eq!(parsed, tier);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_tier() {
        let err = parse_asset_name("DFH_fhsj_rock_src", &tiers()).unwrap_err();
        assert!(matches!(err, VariantError::NamingMismatch { .. }));
    }

    #[test]
    fn test_parse_rejects_embedded_tier() {
        // Tier token appearing mid-name must not match
        let err = parse_asset_name("DFH_hiRes_rock", &tiers()).unwrap_err();
        assert!(matches!(err, VariantError::NamingMismatch { .. }));
        // ...and a bare tier with no base is rejected too
        assert!(parse_asset_name("hiRes", &tiers()).is_err());
    }

    #[test]
    fn test_retarget_name() {
        let hi = ResolutionTier::new("hiRes").unwrap();
        let proxy = ResolutionTier::new("proxyRes").unwrap();
        assert_eq!(
            retarget_name("DFH_fhsj_rock_hiRes", &hi, &proxy).unwrap(),
            "DFH_fhsj_rock_proxyRes"
        );
        assert!(retarget_name("DFH_fhsj_rock_midRes", &hi, &proxy).is_err());
    }

    #[test]
    fn test_identity_from_asset_name() {
        let (id, tier) =
            AssetIdentity::from_asset_name("DFH_fhsj_rock_big_midRes", "DFH", "fhsj", &tiers())
                .unwrap();
        assert_eq!(id, identity());
        assert_eq!(tier.as_str(), "midRes");

        assert!(
            AssetIdentity::from_asset_name("XXX_fhsj_rock_midRes", "DFH", "fhsj", &tiers())
                .is_err()
        );
    }
}
