//! # In-Memory Host Doubles
//!
//! A scene backend and format-adapter pair with no host application
//! behind them: [`MemoryScene`] keeps the node graph in a hash map,
//! [`FileAdapters`] writes and reads plain files. Together they let the
//! whole pipeline run end to end in tests (and headless demos) against
//! a real filesystem, which matters because file existence is the
//! pipeline's source of truth for variant availability.
//!
//! ## Table of Contents
//! 1. MemoryScene — node graph double
//! 2. FileAdapters — import/export double

use glam::Vec3;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use facet_common::{
    AttributeKind, AttributeValue, NodeId, SceneError, StorageFormat, WorldTransform,
};

use crate::adapters::{AdapterFailure, FormatAdapters};
use crate::scene::SceneBackend;

// ─────────────────────────────────────────────
// 1. MemoryScene
// ─────────────────────────────────────────────

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, AttributeValue>,
    transform: WorldTransform,
    rotate_pivot: Vec3,
    scale_pivot: Vec3,
    /// Set when this node is a lightweight instance of another node
    instanced_from: Option<NodeId>,
}

impl NodeData {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            transform: WorldTransform::IDENTITY,
            rotate_pivot: Vec3::ZERO,
            scale_pivot: Vec3::ZERO,
            instanced_from: None,
        }
    }
}

/// Scene backend double holding the node graph in memory.
///
/// Transforms are stored flat (every node's transform is its world
/// transform), which is all the pipeline's capture/restore logic needs.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: HashMap<NodeId, NodeData>,
    /// Creation order, for stable enumeration
    order: Vec<NodeId>,
    roots: Vec<NodeId>,
    selection: Vec<NodeId>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Source node of an instance, `None` for ordinary nodes.
    pub fn instanced_from(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.instanced_from)
    }

    pub fn set_pivots(
        &mut self,
        node: NodeId,
        rotate_pivot: Vec3,
        scale_pivot: Vec3,
    ) -> Result<(), SceneError> {
        let data = self.get_mut(node)?;
        data.rotate_pivot = rotate_pivot;
        data.scale_pivot = scale_pivot;
        Ok(())
    }

    pub fn select(&mut self, nodes: &[NodeId]) {
        self.selection = nodes.to_vec();
    }

    fn get(&self, node: NodeId) -> Result<&NodeData, SceneError> {
        self.nodes.get(&node).ok_or(SceneError::NodeNotFound(node))
    }

    fn get_mut(&mut self, node: NodeId) -> Result<&mut NodeData, SceneError> {
        self.nodes
            .get_mut(&node)
            .ok_or(SceneError::NodeNotFound(node))
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) {
            if let Some(parent_data) = self.nodes.get_mut(&parent) {
                parent_data.children.retain(|&c| c != node);
            }
        } else {
            self.roots.retain(|&r| r != node);
        }
    }

    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut collected = vec![node];
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes.get(&current) {
                for &child in &data.children {
                    collected.push(child);
                    stack.push(child);
                }
            }
        }
        collected
    }

    fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes.get(&n).and_then(|d| d.parent);
        }
        false
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::mint();
        match data.parent {
            Some(parent) => {
                if let Some(parent_data) = self.nodes.get_mut(&parent) {
                    parent_data.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.nodes.insert(id, data);
        self.order.push(id);
        id
    }
}

impl SceneBackend for MemoryScene {
    fn create_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
    ) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        Ok(self.insert(NodeData::new(name, parent)))
    }

    fn delete_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        self.get(node)?;
        self.detach(node);
        for id in self.subtree(node) {
            self.nodes.remove(&id);
            self.order.retain(|&n| n != id);
            self.roots.retain(|&n| n != id);
            self.selection.retain(|&n| n != id);
        }
        Ok(())
    }

    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        self.get(node)?;
        if let Some(new_parent) = parent {
            self.get(new_parent)?;
            if self.is_descendant_of(new_parent, node) {
                return Err(SceneError::InvalidOperation {
                    node,
                    reason: "cannot reparent a node under its own subtree".into(),
                });
            }
        }
        self.detach(node);
        match parent {
            Some(new_parent) => {
                if let Some(parent_data) = self.nodes.get_mut(&new_parent) {
                    parent_data.children.push(node);
                }
            }
            None => self.roots.push(node),
        }
        self.get_mut(node)?.parent = parent;
        Ok(())
    }

    fn rename(&mut self, node: NodeId, name: &str) -> Result<(), SceneError> {
        self.get_mut(node)?.name = name.to_string();
        Ok(())
    }

    fn instance(&mut self, source: NodeId, name: &str) -> Result<NodeId, SceneError> {
        let source_data = self.get(source)?;
        let mut data = NodeData::new(name, None);
        // The host copies the transform node and shares the heavy data
        // underneath; custom attributes stay behind.
        data.transform = source_data.transform;
        data.rotate_pivot = source_data.rotate_pivot;
        data.scale_pivot = source_data.scale_pivot;
        data.instanced_from = Some(source);
        Ok(self.insert(data))
    }

    fn duplicate(&mut self, source: NodeId, name: &str) -> Result<NodeId, SceneError> {
        let source_data = self.get(source)?.clone();
        let mut data = NodeData::new(name, None);
        data.transform = source_data.transform;
        data.rotate_pivot = source_data.rotate_pivot;
        data.scale_pivot = source_data.scale_pivot;
        data.attributes = source_data.attributes.clone();
        let copy = self.insert(data);
        // Deep-copy the subtree.
        for &child in &source_data.children {
            let child_name = self.get(child)?.name.clone();
            let child_copy = self.duplicate(child, &child_name)?;
            self.reparent(child_copy, Some(copy))?;
        }
        Ok(copy)
    }

    fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn name(&self, node: NodeId) -> Result<String, SceneError> {
        Ok(self.get(node)?.name.clone())
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.get(node)?.parent)
    }

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, SceneError> {
        Ok(self.get(node)?.children.clone())
    }

    fn selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn attribute_kind(
        &self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<AttributeKind>, SceneError> {
        Ok(self.get(node)?.attributes.get(name).map(|v| v.kind()))
    }

    fn add_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        kind: AttributeKind,
    ) -> Result<(), SceneError> {
        let existing = self.get(node)?.attributes.get(name).map(|v| v.kind());
        match existing {
            Some(actual) if actual != kind => Err(SceneError::AttributeKindConflict {
                node,
                name: name.to_string(),
                expected: kind,
                actual,
            }),
            Some(_) => Ok(()),
            None => {
                let default = match kind {
                    AttributeKind::Bool => AttributeValue::Bool(false),
                    AttributeKind::String => AttributeValue::String(String::new()),
                    AttributeKind::Int => AttributeValue::Int(0),
                    AttributeKind::Float => AttributeValue::Float(0.0),
                };
                self.get_mut(node)?.attributes.insert(name.to_string(), default);
                Ok(())
            }
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<AttributeValue>, SceneError> {
        Ok(self.get(node)?.attributes.get(name).cloned())
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), SceneError> {
        let data = self.get_mut(node)?;
        match data.attributes.get(name) {
            Some(existing) if existing.kind() != value.kind() => {
                Err(SceneError::AttributeKindConflict {
                    node,
                    name: name.to_string(),
                    expected: existing.kind(),
                    actual: value.kind(),
                })
            }
            Some(_) => {
                data.attributes.insert(name.to_string(), value);
                Ok(())
            }
            None => Err(SceneError::AttributeMissing {
                node,
                name: name.to_string(),
            }),
        }
    }

    fn nodes_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.attributes.contains_key(name))
            })
            .collect()
    }

    fn world_transform(&self, node: NodeId) -> Result<WorldTransform, SceneError> {
        Ok(self.get(node)?.transform)
    }

    fn set_world_transform(
        &mut self,
        node: NodeId,
        transform: &WorldTransform,
    ) -> Result<(), SceneError> {
        self.get_mut(node)?.transform = *transform;
        Ok(())
    }

    fn rotate_pivot(&self, node: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.get(node)?.rotate_pivot)
    }

    fn scale_pivot(&self, node: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.get(node)?.scale_pivot)
    }
}

// ─────────────────────────────────────────────
// 2. FileAdapters
// ─────────────────────────────────────────────

/// Format-adapter double backed by plain files.
///
/// Exports write a small text snapshot; imports read the file back and
/// materialize the contractual node shape (a transform whose first
/// child carries the format's reference attribute). Counters and
/// failure switches let tests steer and observe the host boundary.
#[derive(Debug)]
pub struct FileAdapters {
    /// Fail every import command, to exercise adapter-failure paths
    pub fail_imports: bool,
    /// Report "no image produced" from viewport captures
    pub captures_available: bool,
    /// Import commands executed
    pub import_count: usize,
    /// Export commands executed
    pub export_count: usize,
}

impl Default for FileAdapters {
    fn default() -> Self {
        Self::new()
    }
}

impl FileAdapters {
    /// Attribute holding a texture file reference on mesh nodes.
    pub const TEXTURE_ATTRIBUTE: &'static str = "fileTextureName";

    pub fn new() -> Self {
        Self {
            fail_imports: false,
            captures_available: true,
            import_count: 0,
            export_count: 0,
        }
    }

    fn write_snapshot(
        &mut self,
        scene: &MemoryScene,
        format: StorageFormat,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure> {
        let name = scene
            .name(root)
            .map_err(|e| AdapterFailure(e.to_string()))?;
        let children = scene
            .children(root)
            .map_err(|e| AdapterFailure(e.to_string()))?;
        std::fs::write(
            path,
            format!("{} snapshot of {name} ({} children)\n", format.token(), children.len()),
        )
        .map_err(|e| AdapterFailure(e.to_string()))?;
        self.export_count += 1;
        Ok(())
    }

    fn read_into_scene(
        &mut self,
        scene: &mut MemoryScene,
        format: StorageFormat,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure> {
        if self.fail_imports {
            return Err(AdapterFailure("import command rejected".into()));
        }
        std::fs::read_to_string(path).map_err(|e| AdapterFailure(e.to_string()))?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AdapterFailure(format!("unreadable file name: {}", path.display())))?;
        let suffix = match format {
            StorageFormat::Native => String::new(),
            StorageFormat::PointCache => "_abc".into(),
            StorageFormat::RendererProxy => "_ass".into(),
            StorageFormat::RealtimeCache => "_gpuCache".into(),
        };

        let transform = scene
            .create_node(&format!("{stem}{suffix}"), None)
            .map_err(|e| AdapterFailure(e.to_string()))?;
        let shape = scene
            .create_node(&format!("{stem}Shape"), Some(transform))
            .map_err(|e| AdapterFailure(e.to_string()))?;
        scene
            .add_attribute(shape, format.reference_attribute(), AttributeKind::String)
            .and_then(|_| {
                scene.set_attribute(
                    shape,
                    format.reference_attribute(),
                    AttributeValue::String(path.to_string_lossy().into_owned()),
                )
            })
            .map_err(|e| AdapterFailure(e.to_string()))?;

        self.import_count += 1;
        Ok(transform)
    }
}

impl FormatAdapters<MemoryScene> for FileAdapters {
    fn export_native(
        &mut self,
        scene: &mut MemoryScene,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure> {
        self.write_snapshot(scene, StorageFormat::Native, root, path)
    }

    fn import_native(
        &mut self,
        scene: &mut MemoryScene,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure> {
        self.read_into_scene(scene, StorageFormat::Native, path)
    }

    fn export_point_cache(
        &mut self,
        scene: &mut MemoryScene,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure> {
        let children = scene
            .children(root)
            .map_err(|e| AdapterFailure(e.to_string()))?;
        if children.is_empty() {
            return Err(AdapterFailure("export root has no exportable children".into()));
        }
        self.write_snapshot(scene, StorageFormat::PointCache, root, path)
    }

    fn import_point_cache(
        &mut self,
        scene: &mut MemoryScene,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure> {
        self.read_into_scene(scene, StorageFormat::PointCache, path)
    }

    fn export_renderer_proxy(
        &mut self,
        scene: &mut MemoryScene,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure> {
        self.write_snapshot(scene, StorageFormat::RendererProxy, root, path)
    }

    fn import_renderer_proxy(
        &mut self,
        scene: &mut MemoryScene,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure> {
        self.read_into_scene(scene, StorageFormat::RendererProxy, path)
    }

    fn export_realtime_cache(
        &mut self,
        scene: &mut MemoryScene,
        root: NodeId,
        path: &Path,
    ) -> Result<(), AdapterFailure> {
        self.write_snapshot(scene, StorageFormat::RealtimeCache, root, path)
    }

    fn import_realtime_cache(
        &mut self,
        scene: &mut MemoryScene,
        path: &Path,
    ) -> Result<NodeId, AdapterFailure> {
        self.read_into_scene(scene, StorageFormat::RealtimeCache, path)
    }

    fn relocate_textures(
        &mut self,
        scene: &mut MemoryScene,
        root: NodeId,
        textures_dir: &Path,
    ) -> Result<usize, AdapterFailure> {
        std::fs::create_dir_all(textures_dir).map_err(|e| AdapterFailure(e.to_string()))?;

        let mut copied = 0;
        for node in scene.subtree(root) {
            let Ok(Some(AttributeValue::String(source))) =
                scene.attribute(node, Self::TEXTURE_ATTRIBUTE)
            else {
                continue;
            };
            let source = PathBuf::from(source);
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let target = textures_dir.join(file_name);
            if !target.is_file() {
                std::fs::copy(&source, &target).map_err(|e| AdapterFailure(e.to_string()))?;
                copied += 1;
            }
            scene
                .set_attribute(
                    node,
                    Self::TEXTURE_ATTRIBUTE,
                    AttributeValue::String(target.to_string_lossy().into_owned()),
                )
                .map_err(|e| AdapterFailure(e.to_string()))?;
        }
        Ok(copied)
    }

    fn capture_viewport(&mut self, path: &Path, width: u32, height: u32) -> Option<PathBuf> {
        if !self.captures_available {
            return None;
        }
        std::fs::write(path, format!("capture {width}x{height}\n"))
            .ok()
            .map(|_| path.to_path_buf())
    }
}
