//! glTF import.
//!
//! Reads `.gltf` and `.glb` files into a `Scene`. Buffers resolve from the
//! GLB BIN chunk, base64 data URIs, or external files next to the document.
//! Triangles only; other primitive modes are skipped with a warning.

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cadxr_math::{Mat4, Quat, Transform, Vec3};
use thiserror::Error;

use crate::gltf::glb::{is_glb, parse_glb, GlbError};
use crate::gltf::types::*;
use crate::material::Image;
use crate::scene::{Scene, SceneError};

/// Errors that can occur during glTF import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GLB error: {0}")]
    Glb(#[from] GlbError),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("buffer {0} cannot be resolved")]
    MissingBuffer(usize),

    #[error("accessor {index}: {message}")]
    BadAccessor { index: usize, message: String },

    #[error("unsupported index component type: {0}")]
    UnsupportedComponentType(u32),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Load a glTF or GLB file into a scene.
pub fn load_gltf<P: AsRef<Path>>(path: P) -> ImportResult<Scene> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");

    let (doc, bin): (GltfDocument, Option<Vec<u8>>) = if is_glb(&bytes) {
        let chunks = parse_glb(&bytes)?;
        (serde_json::from_slice(&chunks.json)?, chunks.bin)
    } else {
        (serde_json::from_slice(&bytes)?, None)
    };

    let buffers = resolve_buffers(&doc, bin, path.parent())?;
    let reader = AccessorReader {
        doc: &doc,
        buffers: &buffers,
    };

    let mut scene = Scene::new(name);
    for material in &doc.materials {
        scene.add_material(material.to_material());
    }
    for image in &doc.images {
        scene.add_image(Image {
            uri: image.uri.clone(),
            mime_type: image.mime_type,
            name: image.name.clone(),
        });
    }

    let scene_index = doc.scene.unwrap_or(0);
    let roots: Vec<usize> = doc
        .scenes
        .get(scene_index)
        .map(|s| s.nodes.clone())
        .unwrap_or_else(|| (0..doc.nodes.len()).collect());
    for root in roots {
        import_node(&doc, &reader, &mut scene, root, None)?;
    }

    log::info!(
        "loaded {}: {} nodes, {} meshes, {} materials",
        path.display(),
        scene.node_count(),
        scene.mesh_count(),
        scene.material_count()
    );
    Ok(scene)
}

/// Resolve every document buffer to its bytes.
fn resolve_buffers(
    doc: &GltfDocument,
    bin: Option<Vec<u8>>,
    base_dir: Option<&Path>,
) -> ImportResult<Vec<Vec<u8>>> {
    let mut bin = bin;
    doc.buffers
        .iter()
        .enumerate()
        .map(|(i, buffer)| match &buffer.uri {
            None => bin.take().ok_or(ImportError::MissingBuffer(i)),
            Some(uri) if uri.starts_with("data:") => {
                let payload = uri
                    .split_once(";base64,")
                    .map(|(_, data)| data)
                    .ok_or(ImportError::MissingBuffer(i))?;
                Ok(BASE64.decode(payload)?)
            }
            Some(uri) => {
                let path = match base_dir {
                    Some(dir) => dir.join(uri),
                    None => Path::new(uri).to_path_buf(),
                };
                Ok(std::fs::read(path)?)
            }
        })
        .collect()
}

fn import_node(
    doc: &GltfDocument,
    reader: &AccessorReader,
    scene: &mut Scene,
    index: usize,
    parent: Option<&str>,
) -> ImportResult<()> {
    let Some(node) = doc.nodes.get(index) else {
        return Ok(());
    };

    let base = node
        .name
        .clone()
        .unwrap_or_else(|| format!("node_{}", index));
    let key = unique_key(scene, &base);

    let mesh = match node.mesh.and_then(|m| doc.meshes.get(m)) {
        Some(gltf_mesh) => reader.read_mesh(gltf_mesh)?,
        None => None,
    };

    let id = match mesh {
        Some((mesh, material)) => scene.add_mesh_node(&key, parent, Arc::new(mesh), material)?,
        None => scene.add_layer(&key, parent)?,
    };
    scene.set_transform(id, node_transform(node));

    for &child in &node.children {
        import_node(doc, reader, scene, child, Some(&key))?;
    }
    Ok(())
}

/// The local transform of a glTF node, from its matrix or TRS fields.
fn node_transform(node: &GltfNode) -> Transform {
    if let Some(matrix) = node.matrix {
        return Transform::from_matrix(Mat4::from_cols_array(&matrix));
    }
    Transform {
        translation: node.translation.map(Vec3::from).unwrap_or(Vec3::ZERO),
        rotation: node
            .rotation
            .map(Quat::from_array)
            .unwrap_or(Quat::IDENTITY),
        scale: node.scale.map(Vec3::from).unwrap_or(Vec3::ONE),
    }
}

fn unique_key(scene: &Scene, base: &str) -> String {
    if scene.node_id(base).is_none() {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if scene.node_id(&candidate).is_none() {
            return candidate;
        }
        n += 1;
    }
}

/// Decodes accessor data out of the resolved buffers.
struct AccessorReader<'a> {
    doc: &'a GltfDocument,
    buffers: &'a [Vec<u8>],
}

impl AccessorReader<'_> {
    /// Read a glTF mesh into one merged `Mesh` and its material.
    ///
    /// Multiple primitives concatenate with an index offset; the material
    /// of the first primitive that has one wins.
    fn read_mesh(&self, gltf_mesh: &GltfMesh) -> ImportResult<Option<(crate::mesh::Mesh, Option<usize>)>> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut uvs: Vec<[f32; 2]> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut material = None;

        for primitive in &gltf_mesh.primitives {
            if primitive.mode.unwrap_or(MODE_TRIANGLES) != MODE_TRIANGLES {
                log::warn!(
                    "skipping non-triangle primitive in mesh {:?}",
                    gltf_mesh.name
                );
                continue;
            }
            let Some(&position_accessor) = primitive.attributes.get("POSITION") else {
                continue;
            };

            let offset = positions.len() as u32;
            let prim_positions = self.read_vec3s(position_accessor)?;
            let count = prim_positions.len();
            positions.extend(prim_positions);

            if let Some(&accessor) = primitive.attributes.get("NORMAL") {
                normals.extend(self.read_vec3s(accessor)?);
            } else {
                normals.resize(positions.len(), Vec3::ZERO);
            }
            if let Some(&accessor) = primitive.attributes.get("TEXCOORD_0") {
                uvs.extend(self.read_vec2s(accessor)?);
            } else {
                uvs.resize(positions.len(), [0.0, 0.0]);
            }

            match primitive.indices {
                Some(accessor) => {
                    indices.extend(self.read_indices(accessor)?.into_iter().map(|i| i + offset));
                }
                // Non-indexed: consecutive vertices form triangles
                None => indices.extend(offset..offset + count as u32),
            }

            if material.is_none() {
                material = primitive.material;
            }
        }

        if positions.is_empty() {
            return Ok(None);
        }

        let has_normals = normals.iter().any(|n| *n != Vec3::ZERO);
        let has_uvs = uvs.iter().any(|uv| *uv != [0.0, 0.0]);
        let mut mesh = crate::mesh::Mesh::new(
            positions,
            indices,
            has_normals.then_some(normals),
        );
        mesh.uvs = has_uvs.then_some(uvs);
        mesh.ensure_normals();
        Ok(Some((mesh, material)))
    }

    fn accessor_bytes(&self, index: usize, element_size: usize) -> ImportResult<&[u8]> {
        let accessor = self
            .doc
            .accessors
            .get(index)
            .ok_or_else(|| ImportError::BadAccessor {
                index,
                message: "no such accessor".to_string(),
            })?;
        let view_index = accessor.buffer_view.ok_or_else(|| ImportError::BadAccessor {
            index,
            message: "sparse accessors not supported".to_string(),
        })?;
        let view = self
            .doc
            .buffer_views
            .get(view_index)
            .ok_or_else(|| ImportError::BadAccessor {
                index,
                message: format!("no such buffer view: {}", view_index),
            })?;
        let buffer = self
            .buffers
            .get(view.buffer)
            .ok_or(ImportError::MissingBuffer(view.buffer))?;

        // Offsets and counts come straight from the file, so the range
        // arithmetic itself can overflow
        let range = view
            .byte_offset
            .checked_add(accessor.byte_offset)
            .and_then(|start| {
                let length = accessor.count.checked_mul(element_size)?;
                Some(start..start.checked_add(length)?)
            })
            .ok_or_else(|| ImportError::BadAccessor {
                index,
                message: "accessor range overflows".to_string(),
            })?;
        buffer
            .get(range)
            .ok_or_else(|| ImportError::BadAccessor {
                index,
                message: "accessor range outside buffer".to_string(),
            })
    }

    fn read_vec3s(&self, index: usize) -> ImportResult<Vec<Vec3>> {
        let bytes = self.accessor_bytes(index, 12)?;
        Ok(bytes
            .chunks_exact(12)
            .map(|c| {
                Vec3::new(
                    f32_at(c, 0),
                    f32_at(c, 4),
                    f32_at(c, 8),
                )
            })
            .collect())
    }

    fn read_vec2s(&self, index: usize) -> ImportResult<Vec<[f32; 2]>> {
        let bytes = self.accessor_bytes(index, 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| [f32_at(c, 0), f32_at(c, 4)])
            .collect())
    }

    fn read_indices(&self, index: usize) -> ImportResult<Vec<u32>> {
        let component_type = self
            .doc
            .accessors
            .get(index)
            .map(|a| a.component_type)
            .unwrap_or(COMPONENT_U32);

        match component_type {
            COMPONENT_U8 => Ok(self
                .accessor_bytes(index, 1)?
                .iter()
                .map(|&b| b as u32)
                .collect()),
            COMPONENT_U16 => Ok(self
                .accessor_bytes(index, 2)?
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect()),
            COMPONENT_U32 => Ok(self
                .accessor_bytes(index, 4)?
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()),
            other => Err(ImportError::UnsupportedComponentType(other)),
        }
    }
}

fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::exporter::export_gltf;
    use crate::material::Material;
    use crate::mesh::Mesh;
    use std::sync::Arc;

    fn triangle() -> Arc<Mesh> {
        Arc::new(Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
            None,
        ))
    }

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("sample");
        let orange = scene.add_material(Material::from_color("orange", [1.0, 0.4, 0.0, 1.0]));
        let world = scene.add_layer("world", None).unwrap();
        scene.set_transform(
            world,
            Transform::from_translation(Vec3::new(0.0, 0.0, 2.0)),
        );
        scene
            .add_mesh_node("element", Some("world"), triangle(), Some(orange))
            .unwrap();
        scene
    }

    #[test]
    fn test_glb_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.glb");
        export_gltf(&sample_scene(), &path, true).unwrap();

        let loaded = load_gltf(&path).unwrap();

        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.mesh_count(), 1);
        assert_eq!(loaded.total_triangle_count(), 1);

        let element = loaded.node_id("element").unwrap();
        assert_eq!(loaded.path(element), "/world/element");
        let origin = loaded
            .world_transform(element)
            .transform_point3(Vec3::ZERO);
        assert!((origin.z - 2.0).abs() < 0.001);

        let material = loaded
            .material(loaded.node_by_id(element).unwrap().material.unwrap())
            .unwrap();
        assert_eq!(material.name.as_deref(), Some("orange"));
    }

    #[test]
    fn test_embedded_gltf_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf");
        export_gltf(&sample_scene(), &path, true).unwrap();

        let loaded = load_gltf(&path).unwrap();
        assert_eq!(loaded.total_triangle_count(), 1);

        let mesh = loaded.node("element").unwrap().mesh.as_ref().unwrap().clone();
        assert!((mesh.positions[1].x - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_external_buffer_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf");
        export_gltf(&sample_scene(), &path, false).unwrap();

        let loaded = load_gltf(&path).unwrap();
        assert_eq!(loaded.total_triangle_count(), 1);
    }

    #[test]
    fn test_duplicate_node_names_get_unique_keys() {
        let mut doc = GltfDocument::default();
        doc.nodes = vec![
            GltfNode {
                name: Some("part".to_string()),
                ..Default::default()
            },
            GltfNode {
                name: Some("part".to_string()),
                ..Default::default()
            },
        ];
        doc.scenes = vec![GltfScene {
            name: None,
            nodes: vec![0, 1],
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.gltf");
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let loaded = load_gltf(&path).unwrap();
        assert!(loaded.node("part").is_some());
        assert!(loaded.node("part_1").is_some());
    }

    #[test]
    fn test_missing_buffer_is_error() {
        let mut doc = GltfDocument::default();
        doc.buffers = vec![GltfBuffer {
            byte_length: 4,
            uri: None,
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gltf");
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        assert!(matches!(
            load_gltf(&path),
            Err(ImportError::MissingBuffer(0))
        ));
    }

    #[test]
    fn test_oversized_accessor_count_is_error() {
        let payload = BASE64.encode([0u8; 12]);
        let mut doc = GltfDocument::default();
        doc.buffers = vec![GltfBuffer {
            byte_length: 12,
            uri: Some(format!("data:application/octet-stream;base64,{}", payload)),
        }];
        doc.buffer_views = vec![GltfBufferView {
            buffer: 0,
            byte_offset: 0,
            byte_length: 12,
            target: None,
        }];
        // count * element size would wrap around usize
        doc.accessors = vec![GltfAccessor {
            buffer_view: Some(0),
            component_type: COMPONENT_F32,
            count: usize::MAX / 2,
            element_type: "VEC3".to_string(),
            ..Default::default()
        }];
        doc.meshes = vec![GltfMesh {
            name: None,
            primitives: vec![GltfPrimitive {
                attributes: [("POSITION".to_string(), 0)].into(),
                ..Default::default()
            }],
        }];
        doc.nodes = vec![GltfNode {
            name: Some("part".to_string()),
            mesh: Some(0),
            ..Default::default()
        }];
        doc.scenes = vec![GltfScene {
            name: None,
            nodes: vec![0],
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.gltf");
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        assert!(matches!(
            load_gltf(&path),
            Err(ImportError::BadAccessor { index: 0, .. })
        ));
    }
}
