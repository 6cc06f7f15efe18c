//! # Storage Formats & Resolution Tiers
//!
//! The two axes of a variant: which on-disk representation it is
//! ([`StorageFormat`]) and which quality level it carries
//! ([`ResolutionTier`]). Formats are a closed set with fixed extensions
//! and directory layout; tiers are project-configured tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, VariantError};

/// On-disk representation of an asset variant.
///
/// Each format maps to exactly one file extension, one subdirectory of
/// the asset root (native snapshots sit directly in the root), and one
/// reference attribute on the imported node's backing representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageFormat {
    /// Native host scene snapshot (`.ma`)
    Native,
    /// Alembic point cache (`alembic/*.abc`)
    PointCache,
    /// Renderer stand-in proxy (`ass/*.ass`)
    RendererProxy,
    /// Real-time viewer cache (`cache/*.abc`)
    RealtimeCache,
}

impl StorageFormat {
    /// All formats, in dispatch order.
    pub const ALL: [StorageFormat; 4] = [
        StorageFormat::Native,
        StorageFormat::PointCache,
        StorageFormat::RendererProxy,
        StorageFormat::RealtimeCache,
    ];

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Native => "ma",
            Self::PointCache | Self::RealtimeCache => "abc",
            Self::RendererProxy => "ass",
        }
    }

    /// Subdirectory of the asset root holding this format's files.
    /// Native snapshots live directly in the asset root.
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            Self::Native => None,
            Self::PointCache => Some("alembic"),
            Self::RendererProxy => Some("ass"),
            Self::RealtimeCache => Some("cache"),
        }
    }

    /// Attribute on the representation node that points at the backing
    /// file. `dso` and `cacheFileName` are the host's own attribute
    /// names; the other two formats are assigned one so the in-place
    /// swap path is uniform across formats.
    pub fn reference_attribute(&self) -> &'static str {
        match self {
            Self::Native => "sourceFile",
            Self::PointCache => "abcFile",
            Self::RendererProxy => "dso",
            Self::RealtimeCache => "cacheFileName",
        }
    }

    /// Token stored in the `fileFormat` node attribute. Matches the
    /// values the original host-side tool wrote, so scenes tagged by
    /// either generation group identically.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Native => "mayaAscii",
            Self::PointCache => "abc",
            Self::RendererProxy => "ass",
            Self::RealtimeCache => "gpuCache",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "mayaAscii" | "ma" => Some(Self::Native),
            "abc" => Some(Self::PointCache),
            "ass" => Some(Self::RendererProxy),
            "gpuCache" => Some(Self::RealtimeCache),
            _ => None,
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Named quality level of a variant (`proxyRes`, `midRes`, `hiRes`, ...).
///
/// The token is embedded as the trailing `_`-separated segment of asset
/// names and as the `resolutionType` attribute value, so it must be a
/// single clean path- and name-safe word. Ordering of tiers is carried
/// by the project configuration; the tier itself has no rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResolutionTier(String);

impl ResolutionTier {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty()
            || token
                .chars()
                .any(|c| c == '_' || c == '/' || c == '\\' || c == '.' || c.is_whitespace())
        {
            return Err(VariantError::Config(format!(
                "invalid resolution tier token {token:?}: must be a non-empty word without '_', path separators, or whitespace"
            )));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResolutionTier {
    type Error = VariantError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ResolutionTier> for String {
    fn from(tier: ResolutionTier) -> Self {
        tier.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_layout() {
        assert_eq!(StorageFormat::Native.subdir(), None);
        assert_eq!(StorageFormat::PointCache.subdir(), Some("alembic"));
        assert_eq!(StorageFormat::RealtimeCache.subdir(), Some("cache"));
        assert_eq!(StorageFormat::RendererProxy.extension(), "ass");
        assert_eq!(StorageFormat::RealtimeCache.extension(), "abc");
    }

    #[test]
    fn test_format_token_round_trip() {
        for format in StorageFormat::ALL {
            assert_eq!(StorageFormat::from_token(format.token()), Some(format));
        }
        assert_eq!(StorageFormat::from_token("usd"), None);
    }

    #[test]
    fn test_tier_validation() {
        assert!(ResolutionTier::new("proxyRes").is_ok());
        assert!(ResolutionTier::new("").is_err());
        assert!(ResolutionTier::new("hi_res").is_err());
        assert!(ResolutionTier::new("hi res").is_err());
        assert!(ResolutionTier::new("hi/res").is_err());
    }
}
