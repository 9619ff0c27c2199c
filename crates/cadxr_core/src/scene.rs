//! Scene graph types for cadxr.
//!
//! The scene is a hierarchy of named layers, mirroring how CAD documents
//! organize content: every node has a unique string key, an optional parent,
//! a local transform, and optionally a mesh with a material. The same graph
//! maps onto a USD stage (Xform/Mesh prims) and a glTF node tree.

use std::collections::HashMap;
use std::sync::Arc;

use cadxr_math::{Aabb, Mat4, Transform};
use thiserror::Error;

use crate::material::{Image, Material};
use crate::mesh::Mesh;

/// Index of a node within its scene.
pub type NodeId = usize;

/// Errors from scene graph mutations.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("duplicate node key: {0}")]
    DuplicateKey(String),

    #[error("unknown parent key: {0}")]
    UnknownParent(String),

    #[error("unknown material id: {0}")]
    UnknownMaterial(usize),

    #[error("invalid node key: {0:?} (must be non-empty, no '/' characters)")]
    InvalidKey(String),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// A node in the scene hierarchy.
#[derive(Clone, Debug)]
pub struct Node {
    /// Unique key within the scene
    pub key: String,

    /// Parent node, `None` for roots
    pub parent: Option<NodeId>,

    /// Child nodes in insertion order
    pub children: Vec<NodeId>,

    /// Local transform relative to the parent
    pub transform: Transform,

    /// Mesh geometry (shared; layers carry no mesh)
    pub mesh: Option<Arc<Mesh>>,

    /// Material id into the scene's material table
    pub material: Option<usize>,
}

impl Node {
    fn new(key: String, parent: Option<NodeId>) -> Self {
        Self {
            key,
            parent,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            mesh: None,
            material: None,
        }
    }

    /// Whether the node carries geometry.
    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }
}

/// A complete scene: node hierarchy plus material table.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Scene name (usually the stage/file name)
    pub name: String,

    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    roots: Vec<NodeId>,

    /// Materials referenced by nodes through dense ids
    pub materials: Vec<Material>,

    /// Texture images referenced by material texture indices
    pub images: Vec<Image>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an empty layer node and return its id.
    ///
    /// `parent` is the key of an existing node, or `None` for a root layer.
    pub fn add_layer(&mut self, key: impl Into<String>, parent: Option<&str>) -> SceneResult<NodeId> {
        self.insert_node(key.into(), parent, None, None)
    }

    /// Add a node carrying a mesh (and optionally a material) and return its id.
    pub fn add_mesh_node(
        &mut self,
        key: impl Into<String>,
        parent: Option<&str>,
        mesh: Arc<Mesh>,
        material: Option<usize>,
    ) -> SceneResult<NodeId> {
        self.insert_node(key.into(), parent, Some(mesh), material)
    }

    fn insert_node(
        &mut self,
        key: String,
        parent: Option<&str>,
        mesh: Option<Arc<Mesh>>,
        material: Option<usize>,
    ) -> SceneResult<NodeId> {
        if key.is_empty() || key.contains('/') {
            return Err(SceneError::InvalidKey(key));
        }
        if self.index.contains_key(&key) {
            return Err(SceneError::DuplicateKey(key));
        }
        let parent_id = match parent {
            Some(parent_key) => Some(
                self.node_id(parent_key)
                    .ok_or_else(|| SceneError::UnknownParent(parent_key.to_string()))?,
            ),
            None => None,
        };
        if let Some(material_id) = material {
            if material_id >= self.materials.len() {
                return Err(SceneError::UnknownMaterial(material_id));
            }
        }

        let id = self.nodes.len();
        let mut node = Node::new(key.clone(), parent_id);
        node.mesh = mesh;
        node.material = material;
        self.nodes.push(node);
        self.index.insert(key, id);

        match parent_id {
            Some(parent_id) => self.nodes[parent_id].children.push(id),
            None => self.roots.push(id),
        }

        Ok(id)
    }

    /// Add a material to the scene and return its id.
    pub fn add_material(&mut self, material: Material) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Get a material by id.
    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Add a texture image to the scene and return its index.
    ///
    /// Texture references in materials (`TextureInfo::index`) point into
    /// this table.
    pub fn add_image(&mut self, image: Image) -> u32 {
        self.images.push(image);
        (self.images.len() - 1) as u32
    }

    /// Set the local transform of a node.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform = transform;
        }
    }

    /// Look up a node id by key.
    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Look up a node by key.
    pub fn node(&self, key: &str) -> Option<&Node> {
        self.node_id(key).map(|id| &self.nodes[id])
    }

    /// Get a node by id.
    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable node by id.
    pub fn node_by_id_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Root node ids in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// All nodes, indexable by `NodeId`.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The slash-separated path of a node (e.g. `/world/element`).
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            segments.push(node.key.as_str());
            current = node.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// World transform of a node (parents applied first).
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            chain.push(node.transform.to_matrix());
            current = node.parent;
        }

        let mut world = Mat4::IDENTITY;
        for matrix in chain.into_iter().rev() {
            world *= matrix;
        }
        world
    }

    /// Depth-first traversal order over the whole hierarchy.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Total node count.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes carrying geometry.
    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.has_mesh()).count()
    }

    /// Number of materials in the table.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Total triangle count across all mesh nodes.
    pub fn total_triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| n.mesh.as_ref())
            .map(|m| m.triangle_count())
            .sum()
    }

    /// World-space bounding box of all mesh nodes.
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for id in 0..self.nodes.len() {
            if let Some(mesh) = &self.nodes[id].mesh {
                let world = self.world_transform(id);
                bounds = bounds.union(&mesh.bounds.transformed(&world));
            }
        }
        bounds
    }
}
