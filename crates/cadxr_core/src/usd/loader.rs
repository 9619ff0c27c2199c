//! USDA stage loading.
//!
//! Turns parsed prims into a `Scene`, preserving the Xform hierarchy as
//! layers and resolving `material:binding` targets against the Material
//! prims found anywhere on the stage.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cadxr_math::Transform;
use thiserror::Error;

use crate::material::Material;
use crate::mesh::{Mesh, MeshError};
use crate::scene::{Scene, SceneError};
use crate::usd::parser::{parse_usda, ParseError};
use crate::usd::types::{UsdMesh, UsdPrim, UsdXform};

/// Errors that can occur during USD loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("mesh error in prim {path}: {source}")]
    Mesh {
        path: String,
        #[source]
        source: MeshError,
    },

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Load a USDA file and return a `Scene`.
pub fn load_usda<P: AsRef<Path>>(path: P) -> LoadResult<Scene> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    let content = std::fs::read_to_string(path)?;
    load_usda_from_string(&content, name)
}

/// Load a USDA stage from a string (useful for testing).
pub fn load_usda_from_string(content: &str, name: &str) -> LoadResult<Scene> {
    let prims = parse_usda(content)?;

    let mut builder = SceneBuilder::new(name);
    builder.collect_materials(&prims);
    for prim in &prims {
        builder.process_prim(prim, None)?;
    }

    let scene = builder.finish();
    log::info!(
        "loaded USD stage {:?}: {} nodes, {} meshes, {} materials",
        name,
        scene.node_count(),
        scene.mesh_count(),
        scene.material_count()
    );
    Ok(scene)
}

/// Internal builder for constructing a Scene from USD prims.
struct SceneBuilder {
    scene: Scene,
    /// Map from Material prim path to material table id
    material_map: HashMap<String, usize>,
}

impl SceneBuilder {
    fn new(name: &str) -> Self {
        Self {
            scene: Scene::new(name),
            material_map: HashMap::new(),
        }
    }

    /// Register all Material prims up front so bindings resolve regardless
    /// of where the Materials scope sits in the file.
    fn collect_materials(&mut self, prims: &[UsdPrim]) {
        for prim in prims {
            match prim {
                UsdPrim::Material(material) => {
                    let id = self
                        .scene
                        .add_material(Material::from_preview_surface(&material.surface));
                    self.material_map.insert(material.path.clone(), id);
                }
                UsdPrim::Xform(xform) => self.collect_materials(&xform.children),
                _ => {}
            }
        }
    }

    fn process_prim(&mut self, prim: &UsdPrim, parent: Option<&str>) -> LoadResult<()> {
        match prim {
            UsdPrim::Xform(xform) => self.process_xform(xform, parent),
            UsdPrim::Mesh(mesh) => self.process_mesh(mesh, parent),
            // Materials were collected up front; unknown prims are skipped
            UsdPrim::Material(_) | UsdPrim::Unknown(_) => Ok(()),
        }
    }

    fn process_xform(&mut self, xform: &UsdXform, parent: Option<&str>) -> LoadResult<()> {
        // A pure Materials container contributes nothing to the hierarchy
        if xform.children.iter().all(|c| matches!(c, UsdPrim::Material(_) | UsdPrim::Unknown(_)))
            && !xform.children.is_empty()
        {
            return Ok(());
        }

        let key = self.unique_key(&xform.name);
        let id = self.scene.add_layer(&key, parent)?;
        self.scene
            .set_transform(id, Transform::from_matrix(xform.transform));

        for child in &xform.children {
            self.process_prim(child, Some(&key))?;
        }
        Ok(())
    }

    fn process_mesh(&mut self, usd_mesh: &UsdMesh, parent: Option<&str>) -> LoadResult<()> {
        let mut mesh = Mesh::from_faces(
            usd_mesh.points.clone(),
            &usd_mesh.face_vertex_counts,
            &usd_mesh.face_vertex_indices,
            usd_mesh.normals.clone(),
        )
        .map_err(|source| LoadError::Mesh {
            path: usd_mesh.path.clone(),
            source,
        })?;
        mesh.uvs = usd_mesh.uvs.clone();
        mesh.ensure_normals();

        let material = usd_mesh
            .material_binding
            .as_ref()
            .and_then(|binding| self.resolve_binding(binding));
        if usd_mesh.material_binding.is_some() && material.is_none() {
            log::warn!(
                "mesh {} binds unknown material {:?}",
                usd_mesh.path,
                usd_mesh.material_binding
            );
        }

        let key = self.unique_key(&usd_mesh.name);
        let id = self
            .scene
            .add_mesh_node(&key, parent, Arc::new(mesh), material)?;
        self.scene
            .set_transform(id, Transform::from_matrix(usd_mesh.transform));
        Ok(())
    }

    /// Resolve a binding path, matching the full path or its last segment.
    fn resolve_binding(&self, binding: &str) -> Option<usize> {
        if let Some(&id) = self.material_map.get(binding) {
            return Some(id);
        }
        self.material_map
            .iter()
            .find(|(path, _)| path.rsplit('/').next() == binding.rsplit('/').next())
            .map(|(_, &id)| id)
    }

    /// Scene keys are unique; USD only requires sibling uniqueness.
    fn unique_key(&self, name: &str) -> String {
        if self.scene.node_id(name).is_none() {
            return name.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", name, n);
            if self.scene.node_id(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    fn finish(self) -> Scene {
        self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_simple_mesh() {
        let usda = r#"
def Mesh "Triangle"
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
    int[] faceVertexCounts = [3]
    int[] faceVertexIndices = [0, 1, 2]
}
"#;

        let scene = load_usda_from_string(usda, "test").unwrap();

        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.total_triangle_count(), 1);

        // Normals were computed on load
        let node = scene.node("Triangle").unwrap();
        assert!(node.mesh.as_ref().unwrap().has_normals());
    }

    #[test]
    fn test_load_hierarchy_preserved() {
        let usda = r#"
def Xform "world"
{
    double3 xformOp:translate = (10, 0, 0)

    def Mesh "element"
    {
        point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0), (0, 1, 0)]
        int[] faceVertexCounts = [4]
        int[] faceVertexIndices = [0, 1, 2, 3]
    }
}
"#;

        let scene = load_usda_from_string(usda, "test").unwrap();

        assert_eq!(scene.node_count(), 2);
        let element = scene.node_id("element").unwrap();
        assert_eq!(scene.path(element), "/world/element");

        // Quad was triangulated, parent transform applies
        assert_eq!(scene.total_triangle_count(), 2);
        let origin = scene
            .world_transform(element)
            .transform_point3(cadxr_math::Vec3::ZERO);
        assert!((origin.x - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_load_material_binding() {
        let usda = r#"
def Xform "world"
{
    def Mesh "element"
    {
        point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
        int[] faceVertexCounts = [3]
        int[] faceVertexIndices = [0, 1, 2]
        rel material:binding = </Materials/Plaster>
    }
}

def Scope "Materials"
{
    def Material "Plaster"
    {
        def Shader "Shader"
        {
            uniform token info:id = "UsdPreviewSurface"
            color3f inputs:diffuseColor = (1, 0.4, 0)
            float inputs:roughness = 0.5
        }
    }
}
"#;

        let scene = load_usda_from_string(usda, "test").unwrap();

        assert_eq!(scene.material_count(), 1);
        let node = scene.node("element").unwrap();
        let material = scene.material(node.material.unwrap()).unwrap();
        assert_eq!(material.name.as_deref(), Some("Plaster"));

        let pbr = material.pbr_metallic_roughness.as_ref().unwrap();
        let base = pbr.base_color_factor.unwrap();
        assert!((base[0] - 1.0).abs() < 0.001);
        assert!((base[1] - 0.4).abs() < 0.001);

        // The Materials scope itself is not a scene node
        assert!(scene.node("Materials").is_none());
    }

    #[test]
    fn test_duplicate_names_get_unique_keys() {
        let usda = r#"
def Xform "a"
{
    def Mesh "part"
    {
        point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
        int[] faceVertexCounts = [3]
        int[] faceVertexIndices = [0, 1, 2]
    }
}

def Xform "b"
{
    def Mesh "part"
    {
        point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
        int[] faceVertexCounts = [3]
        int[] faceVertexIndices = [0, 1, 2]
    }
}
"#;
        let scene = load_usda_from_string(usda, "test").unwrap();
        assert_eq!(scene.mesh_count(), 2);
        assert!(scene.node("part").is_some());
        assert!(scene.node("part_1").is_some());
    }

    #[test]
    fn test_unknown_binding_loads_without_material() {
        let usda = r#"
def Mesh "element"
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
    int[] faceVertexCounts = [3]
    int[] faceVertexIndices = [0, 1, 2]
    rel material:binding = </Materials/Missing>
}
"#;
        let scene = load_usda_from_string(usda, "test").unwrap();
        assert!(scene.node("element").unwrap().material.is_none());
    }
}
