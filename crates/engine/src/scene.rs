//! # SceneBackend — Host Scene Graph Capability
//!
//! The scene graph is the host application's; the engine never touches
//! it except through this trait, injected into every operation. That
//! keeps the core testable against an in-memory double
//! ([`crate::memory::MemoryScene`]) and keeps host bindings thin: each
//! method maps onto one host command.
//!
//! The model is single-client and synchronous — the engine assumes it
//! is the sole mutator for the duration of an operation and takes no
//! locks of its own.

use glam::Vec3;
use facet_common::{AttributeKind, AttributeValue, NodeId, SceneError, WorldTransform};

/// Injected scene-graph capability.
///
/// Query methods take `&self`, mutations `&mut self`. All node access
/// is by [`NodeId`]; a handle that no longer resolves fails with
/// [`SceneError::NodeNotFound`].
pub trait SceneBackend {
    // ── structure ──────────────────────────────────────────────

    /// Create an empty transform node, optionally under a parent.
    fn create_node(&mut self, name: &str, parent: Option<NodeId>)
        -> Result<NodeId, SceneError>;

    /// Delete a node and its entire subtree.
    fn delete_node(&mut self, node: NodeId) -> Result<(), SceneError>;

    /// Move a node under a new parent (`None` = scene root).
    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError>;

    fn rename(&mut self, node: NodeId, name: &str) -> Result<(), SceneError>;

    /// Create a lightweight instance sharing `source`'s heavy data.
    fn instance(&mut self, source: NodeId, name: &str) -> Result<NodeId, SceneError>;

    /// Create an independent deep copy of `source`.
    fn duplicate(&mut self, source: NodeId, name: &str) -> Result<NodeId, SceneError>;

    // ── queries ────────────────────────────────────────────────

    fn exists(&self, node: NodeId) -> bool;

    fn name(&self, node: NodeId) -> Result<String, SceneError>;

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError>;

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, SceneError>;

    /// Current operator selection, in selection order.
    fn selection(&self) -> Vec<NodeId>;

    // ── attributes ─────────────────────────────────────────────

    /// Declared kind of an attribute, `None` if absent.
    fn attribute_kind(&self, node: NodeId, name: &str) -> Result<Option<AttributeKind>, SceneError>;

    /// Declare an attribute. Adding an existing attribute of the same
    /// kind is a no-op; a different kind fails with
    /// [`SceneError::AttributeKindConflict`].
    fn add_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        kind: AttributeKind,
    ) -> Result<(), SceneError>;

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<AttributeValue>, SceneError>;

    /// Write an attribute value. The attribute must have been declared.
    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), SceneError>;

    /// Every node in the scene carrying the named attribute, in a
    /// stable scene order.
    fn nodes_with_attribute(&self, name: &str) -> Vec<NodeId>;

    // ── transforms ─────────────────────────────────────────────

    fn world_transform(&self, node: NodeId) -> Result<WorldTransform, SceneError>;

    fn set_world_transform(
        &mut self,
        node: NodeId,
        transform: &WorldTransform,
    ) -> Result<(), SceneError>;

    fn rotate_pivot(&self, node: NodeId) -> Result<Vec3, SceneError>;

    fn scale_pivot(&self, node: NodeId) -> Result<Vec3, SceneError>;
}
