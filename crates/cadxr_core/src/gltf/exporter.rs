//! glTF export.
//!
//! Serializes a `Scene` into glTF 2.0. Three output forms, chosen from the
//! file extension and the `embed` flag:
//!
//! - `.glb`: binary container, geometry and textures in the BIN chunk
//! - `.gltf` with `embed`: self-contained JSON, buffers as base64 data URIs
//! - `.gltf` without: JSON plus a sidecar `.bin` file, textures by URI

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::gltf::glb::encode_glb;
use crate::gltf::types::*;
use crate::material::MimeType;
use crate::mesh::Mesh;
use crate::scene::Scene;
use crate::texture::{TextureCache, TextureError};

/// Errors that can occur during glTF export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("unsupported output format: {0:?} (expected .gltf or .glb)")]
    UnsupportedFormat(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

enum OutputKind {
    Glb,
    Embedded,
    External,
}

/// Export a scene as glTF.
///
/// The output form follows the file extension; `embed` selects data-URI
/// buffers for `.gltf` output and is implied for `.glb`.
pub fn export_gltf<P: AsRef<Path>>(scene: &Scene, path: P, embed: bool) -> ExportResult<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let kind = match extension.as_str() {
        "glb" => OutputKind::Glb,
        "gltf" if embed => OutputKind::Embedded,
        "gltf" => OutputKind::External,
        other => return Err(ExportError::UnsupportedFormat(other.to_string())),
    };

    let base_dir = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let mut builder = DocumentBuilder::new(scene, TextureCache::with_base_dir(base_dir));
    builder.build(&kind);
    let DocumentBuilder { mut doc, bin, .. } = builder;

    match kind {
        OutputKind::Glb => {
            if !bin.is_empty() {
                doc.buffers = vec![GltfBuffer {
                    byte_length: bin.len(),
                    uri: None,
                }];
            }
            let json = serde_json::to_vec(&doc)?;
            let payload = (!bin.is_empty()).then_some(bin.as_slice());
            std::fs::write(path, encode_glb(&json, payload))?;
        }
        OutputKind::Embedded => {
            if !bin.is_empty() {
                doc.buffers = vec![GltfBuffer {
                    byte_length: bin.len(),
                    uri: Some(format!(
                        "data:application/octet-stream;base64,{}",
                        BASE64.encode(&bin)
                    )),
                }];
            }
            std::fs::write(path, serde_json::to_vec_pretty(&doc)?)?;
        }
        OutputKind::External => {
            if !bin.is_empty() {
                let bin_name = format!(
                    "{}.bin",
                    path.file_stem().and_then(|s| s.to_str()).unwrap_or("buffer")
                );
                std::fs::write(path.with_file_name(&bin_name), &bin)?;
                doc.buffers = vec![GltfBuffer {
                    byte_length: bin.len(),
                    uri: Some(bin_name),
                }];
            }
            std::fs::write(path, serde_json::to_vec_pretty(&doc)?)?;
        }
    }

    log::info!(
        "exported {} ({} nodes, {} triangles, {} materials)",
        path.display(),
        scene.node_count(),
        scene.total_triangle_count(),
        scene.material_count()
    );
    Ok(())
}

/// Builds the glTF document and binary payload from a scene.
struct DocumentBuilder<'a> {
    scene: &'a Scene,
    doc: GltfDocument,
    bin: Vec<u8>,
    textures: TextureCache,
}

impl<'a> DocumentBuilder<'a> {
    fn new(scene: &'a Scene, textures: TextureCache) -> Self {
        Self {
            scene,
            doc: GltfDocument::default(),
            bin: Vec::new(),
            textures,
        }
    }

    fn build(&mut self, kind: &OutputKind) {
        self.build_materials();
        self.build_images(kind);
        self.build_nodes();

        self.doc.scenes = vec![GltfScene {
            name: (!self.scene.name.is_empty()).then(|| self.scene.name.clone()),
            nodes: self.scene.roots().to_vec(),
        }];
        self.doc.scene = Some(0);
    }

    fn build_materials(&mut self) {
        let scene = self.scene;
        let mut extensions_used: Vec<String> = Vec::new();
        for material in &scene.materials {
            let wire = GltfMaterial::from(material);
            for name in wire.extension_names() {
                if !extensions_used.iter().any(|n| n == name) {
                    extensions_used.push(name.to_string());
                }
            }
            self.doc.materials.push(wire);
        }
        self.doc.extensions_used = extensions_used;
    }

    fn build_images(&mut self, kind: &OutputKind) {
        let scene = self.scene;
        for image in &scene.images {
            let mut wire = GltfImage {
                uri: image.uri.clone(),
                mime_type: image.mime_type,
                buffer_view: None,
                name: image.name.clone(),
            };

            // Embed the image bytes where the output form is self-contained;
            // an unloadable file falls back to the external reference
            if let Some(uri) = &image.uri {
                match kind {
                    OutputKind::Glb => match self.textures.load(uri) {
                        Ok(texture) => {
                            let view = self.push_bytes(&texture.bytes, None);
                            wire.buffer_view = Some(view);
                            wire.mime_type = Some(texture.mime_type);
                            wire.uri = None;
                        }
                        Err(err) => log::warn!("texture {} not embedded: {}", uri, err),
                    },
                    OutputKind::Embedded => match self.textures.load(uri) {
                        Ok(texture) => {
                            let mime = match texture.mime_type {
                                MimeType::Png => "image/png",
                                MimeType::Jpeg => "image/jpeg",
                            };
                            wire.uri = Some(format!(
                                "data:{};base64,{}",
                                mime,
                                BASE64.encode(&texture.bytes)
                            ));
                            wire.mime_type = Some(texture.mime_type);
                        }
                        Err(err) => log::warn!("texture {} not embedded: {}", uri, err),
                    },
                    OutputKind::External => {}
                }
            }

            self.doc.images.push(wire);
        }

        // One texture per image; material texture indices line up with both
        for i in 0..self.doc.images.len() {
            self.doc.textures.push(GltfTexture {
                sampler: None,
                source: Some(i),
            });
        }
    }

    fn build_nodes(&mut self) {
        let scene = self.scene;
        for node in scene.nodes() {
            let mesh = node.mesh.as_ref().map(|mesh| {
                let index = self.doc.meshes.len();
                let primitive = self.build_primitive(mesh, node.material);
                self.doc.meshes.push(GltfMesh {
                    name: Some(node.key.clone()),
                    primitives: vec![primitive],
                });
                index
            });

            let matrix = node.transform.to_matrix();
            self.doc.nodes.push(GltfNode {
                name: Some(node.key.clone()),
                children: node.children.clone(),
                mesh,
                matrix: (!node.transform.is_identity()).then(|| matrix.to_cols_array()),
                translation: None,
                rotation: None,
                scale: None,
            });
        }
    }

    fn build_primitive(&mut self, mesh: &Mesh, material: Option<usize>) -> GltfPrimitive {
        let mut attributes = std::collections::BTreeMap::new();

        let flat: Vec<f32> = mesh.positions.iter().flat_map(|p| p.to_array()).collect();
        let (min, max) = component_bounds(&mesh.positions);
        attributes.insert(
            "POSITION".to_string(),
            self.push_f32_accessor(&flat, "VEC3", mesh.positions.len(), Some(min), Some(max)),
        );

        if let Some(normals) = &mesh.normals {
            let flat: Vec<f32> = normals.iter().flat_map(|n| n.to_array()).collect();
            attributes.insert(
                "NORMAL".to_string(),
                self.push_f32_accessor(&flat, "VEC3", normals.len(), None, None),
            );
        }
        if let Some(uvs) = &mesh.uvs {
            let flat: Vec<f32> = uvs.iter().flatten().copied().collect();
            attributes.insert(
                "TEXCOORD_0".to_string(),
                self.push_f32_accessor(&flat, "VEC2", uvs.len(), None, None),
            );
        }

        let index_view = self.push_bytes(
            bytemuck::cast_slice(&mesh.indices),
            Some(TARGET_ELEMENT_ARRAY_BUFFER),
        );
        let indices = self.push_accessor(GltfAccessor {
            buffer_view: Some(index_view),
            byte_offset: 0,
            component_type: COMPONENT_U32,
            count: mesh.indices.len(),
            element_type: "SCALAR".to_string(),
            min: None,
            max: None,
        });

        GltfPrimitive {
            attributes,
            indices: Some(indices),
            material,
            mode: Some(MODE_TRIANGLES),
        }
    }

    fn push_f32_accessor(
        &mut self,
        values: &[f32],
        element_type: &str,
        count: usize,
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
    ) -> usize {
        let view = self.push_bytes(bytemuck::cast_slice(values), Some(TARGET_ARRAY_BUFFER));
        self.push_accessor(GltfAccessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type: COMPONENT_F32,
            count,
            element_type: element_type.to_string(),
            min,
            max,
        })
    }

    fn push_accessor(&mut self, accessor: GltfAccessor) -> usize {
        self.doc.accessors.push(accessor);
        self.doc.accessors.len() - 1
    }

    /// Append bytes to the binary payload, 4-byte aligned, and record a
    /// buffer view for them.
    fn push_bytes(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let byte_offset = self.bin.len();
        self.bin.extend_from_slice(bytes);

        self.doc.buffer_views.push(GltfBufferView {
            buffer: 0,
            byte_offset,
            byte_length: bytes.len(),
            target,
        });
        self.doc.buffer_views.len() - 1
    }
}

/// Per-component min and max of a point set, required on POSITION accessors.
fn component_bounds(points: &[cadxr_math::Vec3]) -> (Vec<f32>, Vec<f32>) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for p in points {
        for (i, v) in p.to_array().iter().enumerate() {
            min[i] = min[i].min(*v);
            max[i] = max[i].max(*v);
        }
    }
    (min.to_vec(), max.to_vec())
}
