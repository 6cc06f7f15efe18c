//! Project configuration for the variant pipeline.
//!
//! Loaded once per session from a TOML file or environment variables;
//! carries the naming-convention inputs (project code, scene prefix,
//! component root) and the ordered resolution-tier ladder.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VariantError};
use crate::format::ResolutionTier;
use crate::naming::AssetIdentity;

/// Main configuration for a Facet session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project code embedded in every asset name, e.g. `DFH`
    pub project_code: String,

    /// Scene prefix embedded in every asset name, e.g. `fhsj`
    pub scene_prefix: String,

    /// Root directory all asset roots are created under
    pub component_root: PathBuf,

    /// Ordered tier ladder; order is presentation-only
    pub resolution_tiers: Vec<ResolutionTier>,

    /// Viewport preview capture size
    #[serde(default = "default_preview_size")]
    pub preview_size: (u32, u32),
}

fn default_preview_size() -> (u32, u32) {
    (1280, 720)
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_code: "PRJ".into(),
            scene_prefix: "main".into(),
            component_root: PathBuf::from("./component"),
            resolution_tiers: default_tiers(),
            preview_size: default_preview_size(),
        }
    }
}

/// The stock three-tier ladder.
pub fn default_tiers() -> Vec<ResolutionTier> {
    ["proxyRes", "midRes", "hiRes"]
        .into_iter()
        .map(|t| ResolutionTier::new(t).expect("stock tier tokens are valid"))
        .collect()
}

impl ProjectConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            VariantError::Config(format!(
                "failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| VariantError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset. Tiers come from `FACET_TIERS` as a
    /// comma-separated list.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let resolution_tiers = match std::env::var("FACET_TIERS") {
            Ok(raw) => raw
                .split(',')
                .map(|t| ResolutionTier::new(t.trim()))
                .collect::<Result<Vec<_>>>()?,
            Err(_) => defaults.resolution_tiers,
        };
        let config = Self {
            project_code: std::env::var("FACET_PROJECT_CODE")
                .unwrap_or(defaults.project_code),
            scene_prefix: std::env::var("FACET_SCENE_PREFIX")
                .unwrap_or(defaults.scene_prefix),
            component_root: std::env::var("FACET_COMPONENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.component_root),
            resolution_tiers,
            preview_size: defaults.preview_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_code.is_empty() || self.project_code.contains('_') {
            return Err(VariantError::Config(
                "project_code must be non-empty and free of underscores".into(),
            ));
        }
        if self.scene_prefix.is_empty() || self.scene_prefix.contains('_') {
            return Err(VariantError::Config(
                "scene_prefix must be non-empty and free of underscores".into(),
            ));
        }
        if self.resolution_tiers.is_empty() {
            return Err(VariantError::Config(
                "at least one resolution tier is required".into(),
            ));
        }
        for (i, tier) in self.resolution_tiers.iter().enumerate() {
            if self.resolution_tiers[..i].contains(tier) {
                return Err(VariantError::Config(format!(
                    "duplicate resolution tier {tier:?}"
                )));
            }
        }
        Ok(())
    }

    /// Look up a configured tier by token.
    pub fn tier(&self, token: &str) -> Option<&ResolutionTier> {
        self.resolution_tiers.iter().find(|t| t.as_str() == token)
    }

    /// Identity of an asset under this project's naming convention.
    pub fn identity(&self, asset: impl Into<String>) -> AssetIdentity {
        AssetIdentity::new(self.project_code.clone(), self.scene_prefix.clone(), asset)
    }
}
