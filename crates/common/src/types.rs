//! # Scene Vocabulary
//!
//! Handle, transform, and attribute types exchanged with the host scene
//! graph. The host's node store is untyped and string-keyed; everything
//! crossing that boundary is expressed as an [`AttributeValue`].
//!
//! ## Table of Contents
//! 1. NodeId — opaque scene node handle
//! 2. WorldTransform — TRS snapshot in world space
//! 3. AttributeValue / AttributeKind — typed view of the host attribute store
//! 4. SceneError — failures surfaced by the scene backend

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────
// 1. NodeId
// ─────────────────────────────────────────────

/// Opaque handle to a live scene node, minted by the scene backend.
///
/// Handles are never reused within a session; a deleted node's handle
/// stays dangling and any operation through it fails with
/// [`SceneError::NodeNotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Mint a fresh handle. Only scene backends should call this.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: first group of the UUID is enough to identify a
        // node in logs and error messages.
        let s = self.0.to_string();
        write!(f, "node:{}", &s[..8])
    }
}

// ─────────────────────────────────────────────
// 2. WorldTransform
// ─────────────────────────────────────────────

/// World-space TRS snapshot of a node.
///
/// Rotation is kept as XYZ Euler degrees, matching what the host query
/// returns and what gets written back verbatim on restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldTransform {
    pub translation: Vec3,
    /// XYZ Euler rotation in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl WorldTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Component-wise comparison within `epsilon`, for verifying that a
    /// swap or export restored a transform.
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && self.rotation.abs_diff_eq(other.rotation, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
    }

    pub fn is_identity(&self, epsilon: f32) -> bool {
        self.approx_eq(&Self::IDENTITY, epsilon)
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ─────────────────────────────────────────────
// 3. AttributeValue / AttributeKind
// ─────────────────────────────────────────────

/// Value stored under a string key on a scene node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    String(String),
    Int(i64),
    Float(f64),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Bool(_) => AttributeKind::Bool,
            Self::String(_) => AttributeKind::String,
            Self::Int(_) => AttributeKind::Int,
            Self::Float(_) => AttributeKind::Float,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Declared type of a node attribute. Adding an attribute that already
/// exists under a different kind is a schema conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Bool,
    String,
    Int,
    Float,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────
// 4. SceneError
// ─────────────────────────────────────────────

/// Failures surfaced by a scene backend implementation.
#[derive(Error, Debug)]
pub enum SceneError {
    /// Handle does not resolve to a live node
    #[error("scene node {0} not found")]
    NodeNotFound(NodeId),

    /// Expected attribute is absent from the node
    #[error("attribute {name:?} missing on {node}")]
    AttributeMissing { node: NodeId, name: String },

    /// Attribute exists under an incompatible kind
    #[error("attribute {name:?} on {node} is {actual}, expected {expected}")]
    AttributeKindConflict {
        node: NodeId,
        name: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },

    /// Structural operation rejected by the host (cycles, root deletes, ...)
    #[error("invalid scene operation on {node}: {reason}")]
    InvalidOperation { node: NodeId, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_approx_eq() {
        let a = WorldTransform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: Vec3::ONE,
        };
        let mut b = a;
        b.translation.x += 1e-6;
        assert!(a.approx_eq(&b, 1e-4));
        b.translation.x += 1.0;
        assert!(!a.approx_eq(&b, 1e-4));
    }

    #[test]
    fn test_attribute_kind() {
        assert_eq!(AttributeValue::from("hiRes").kind(), AttributeKind::String);
        assert_eq!(AttributeValue::from(true).kind(), AttributeKind::Bool);
        assert_eq!(AttributeValue::Int(3).kind(), AttributeKind::Int);
    }

    #[test]
    fn test_node_id_unique() {
        assert_ne!(NodeId::mint(), NodeId::mint());
    }
}
