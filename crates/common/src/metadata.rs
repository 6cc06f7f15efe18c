//! # Component Metadata Schema
//!
//! The durable identity of a managed scene node, serialized to and from
//! the host's untyped attribute store under a fixed set of attribute
//! names. The names are the wire format: scenes tagged by earlier
//! generations of the tool group and swap exactly like freshly tagged
//! ones.
//!
//! ## Table of Contents
//! 1. attr - attribute name constants and schema
//! 2. ComponentMetadata - typed provenance record
//! 3. FamilyKey - logical-asset grouping key

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, VariantError};
use crate::format::{ResolutionTier, StorageFormat};
use crate::naming::parse_asset_name;
use crate::types::{AttributeKind, AttributeValue};

/// Attribute names and kinds of the component schema.
pub mod attr {
    use crate::types::AttributeKind;

    /// Marker attribute; presence + `true` makes a node managed.
    pub const IS_COMPONENT: &str = "isComponent";
    /// Asset root directory, excluding any format subdirectory.
    pub const ASSET_DIR: &str = "assetDir";
    /// Tiered asset name, `{project}_{scene}_{asset}_{tier}`.
    pub const ASSET_NAME: &str = "assetName";
    /// Storage format token, see `StorageFormat::token`.
    pub const FILE_FORMAT: &str = "fileFormat";
    /// Resolution tier token.
    pub const RESOLUTION_TYPE: &str = "resolutionType";
    /// Project code copied from the exporting session.
    pub const PROJECT_CODE: &str = "projectCode";
    /// Scene prefix copied from the exporting session.
    pub const SCENE: &str = "scene";

    /// Full schema in write order.
    pub const SCHEMA: [(&str, AttributeKind); 7] = [
        (IS_COMPONENT, AttributeKind::Bool),
        (ASSET_DIR, AttributeKind::String),
        (ASSET_NAME, AttributeKind::String),
        (FILE_FORMAT, AttributeKind::String),
        (RESOLUTION_TYPE, AttributeKind::String),
        (PROJECT_CODE, AttributeKind::String),
        (SCENE, AttributeKind::String),
    ];
}

/// Provenance record attached to a managed node.
///
/// Owned by the live node: destroyed with it and recreated fresh on any
/// replacement — it never migrates between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// Asset root directory (no format subdirectory)
    pub asset_dir: PathBuf,
    /// `{project}_{scene}_{asset}_{tier}`; always ends with the tier
    /// recorded in `resolution_type`
    pub asset_name: String,
    pub file_format: StorageFormat,
    pub resolution_type: ResolutionTier,
    pub project_code: String,
    pub scene: String,
}

impl ComponentMetadata {
    /// Verify the name/tier invariant: `asset_name` must end with
    /// `_{resolution_type}`.
    pub fn verify(&self) -> Result<()> {
        let suffix = format!("_{}", self.resolution_type);
        if self.asset_name.ends_with(&suffix) && self.asset_name.len() > suffix.len() {
            Ok(())
        } else {
            Err(VariantError::NamingMismatch {
                name: self.asset_name.clone(),
                tier: self.resolution_type.as_str().to_string(),
            })
        }
    }

    /// Attribute values in schema write order, marker included.
    pub fn to_attributes(&self) -> [(&'static str, AttributeValue); 7] {
        [
            (attr::IS_COMPONENT, AttributeValue::Bool(true)),
            (
                attr::ASSET_DIR,
                AttributeValue::String(self.asset_dir.to_string_lossy().into_owned()),
            ),
            (attr::ASSET_NAME, AttributeValue::from(self.asset_name.as_str())),
            (attr::FILE_FORMAT, AttributeValue::from(self.file_format.token())),
            (
                attr::RESOLUTION_TYPE,
                AttributeValue::from(self.resolution_type.as_str()),
            ),
            (attr::PROJECT_CODE, AttributeValue::from(self.project_code.as_str())),
            (attr::SCENE, AttributeValue::from(self.scene.as_str())),
        ]
    }

    /// Grouping key for bulk operations: asset name with the tier token
    /// stripped, plus provenance.
    pub fn family_key(&self, tiers: &[ResolutionTier]) -> Result<FamilyKey> {
        let (base, _) = parse_asset_name(&self.asset_name, tiers)?;
        Ok(FamilyKey {
            base_name: base,
            project_code: self.project_code.clone(),
            scene: self.scene.clone(),
        })
    }
}

/// Identity shared by every member of an asset family, across tiers and
/// formats. Derived on demand; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyKey {
    /// Asset name with the tier token stripped
    pub base_name: String,
    pub project_code: String,
    pub scene: String,
}

impl fmt::Display for FamilyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.base_name, self.project_code, self.scene)
    }
}
