//! glTF 2.0 document structures.
//!
//! Serde mappings for the parts of the glTF JSON schema the exporter and
//! importer touch. Material parameters reuse the schema types from
//! [`crate::material`]; `GltfMaterial` adds the `extensions` wrapper the
//! file format requires for the KHR material extensions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::material::{
    AlphaMode, Clearcoat, Ior, Material, MimeType, NormalTextureInfo, OcclusionTextureInfo,
    PbrMetallicRoughness, PbrSpecularGlossiness, Specular, TextureInfo, Transmission,
};

// Accessor component types
pub const COMPONENT_U8: u32 = 5121;
pub const COMPONENT_U16: u32 = 5123;
pub const COMPONENT_U32: u32 = 5125;
pub const COMPONENT_F32: u32 = 5126;

// Buffer view targets
pub const TARGET_ARRAY_BUFFER: u32 = 34962;
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

// Primitive modes
pub const MODE_TRIANGLES: u32 = 4;

/// A complete glTF JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfDocument {
    pub asset: GltfAsset,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<GltfScene>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<GltfNode>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<GltfMesh>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<GltfAccessor>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<GltfBufferView>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<GltfBuffer>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<GltfMaterial>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<GltfImage>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<GltfTexture>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samplers: Vec<GltfSampler>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfAsset {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for GltfAsset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: Some(concat!("cadxr ", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfScene {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<usize>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,

    /// Column-major 4x4 matrix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f32; 16]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,

    /// Unit quaternion (x, y, z, w)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfMesh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub primitives: Vec<GltfPrimitive>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfPrimitive {
    /// Attribute name to accessor index (POSITION, NORMAL, TEXCOORD_0)
    pub attributes: BTreeMap<String, usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfAccessor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,

    #[serde(skip_serializing_if = "is_zero")]
    pub byte_offset: usize,

    pub component_type: u32,

    pub count: usize,

    #[serde(rename = "type")]
    pub element_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfBufferView {
    pub buffer: usize,

    #[serde(skip_serializing_if = "is_zero")]
    pub byte_offset: usize,

    pub byte_length: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfBuffer {
    pub byte_length: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfTexture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfSampler {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<u32>,
}

/// A material as written into the glTF JSON.
///
/// Core parameters sit at the top level, the KHR material models under
/// `extensions`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GltfMaterial {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<NormalTextureInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<OcclusionTextureInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_factor: Option<[f32; 3]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<AlphaMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_sided: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<GltfMaterialExtensions>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GltfMaterialExtensions {
    #[serde(
        rename = "KHR_materials_pbrSpecularGlossiness",
        skip_serializing_if = "Option::is_none"
    )]
    pub pbr_specular_glossiness: Option<PbrSpecularGlossiness>,

    #[serde(
        rename = "KHR_materials_transmission",
        skip_serializing_if = "Option::is_none"
    )]
    pub transmission: Option<Transmission>,

    #[serde(
        rename = "KHR_materials_clearcoat",
        skip_serializing_if = "Option::is_none"
    )]
    pub clearcoat: Option<Clearcoat>,

    #[serde(rename = "KHR_materials_ior", skip_serializing_if = "Option::is_none")]
    pub ior: Option<Ior>,

    #[serde(
        rename = "KHR_materials_specular",
        skip_serializing_if = "Option::is_none"
    )]
    pub specular: Option<Specular>,
}

impl GltfMaterialExtensions {
    fn is_empty(&self) -> bool {
        self.pbr_specular_glossiness.is_none()
            && self.transmission.is_none()
            && self.clearcoat.is_none()
            && self.ior.is_none()
            && self.specular.is_none()
    }
}

impl From<&Material> for GltfMaterial {
    fn from(material: &Material) -> Self {
        let extensions = GltfMaterialExtensions {
            pbr_specular_glossiness: material.pbr_specular_glossiness.clone(),
            transmission: material.transmission.clone(),
            clearcoat: material.clearcoat.clone(),
            ior: material.ior.clone(),
            specular: material.specular.clone(),
        };

        Self {
            name: material.name.clone(),
            pbr_metallic_roughness: material.pbr_metallic_roughness.clone(),
            normal_texture: material.normal_texture.clone(),
            occlusion_texture: material.occlusion_texture.clone(),
            emissive_texture: material.emissive_texture.clone(),
            emissive_factor: (material.emissive_factor != [0.0, 0.0, 0.0])
                .then_some(material.emissive_factor),
            alpha_mode: (material.alpha_mode != AlphaMode::Opaque).then_some(material.alpha_mode),
            alpha_cutoff: material.alpha_cutoff,
            // glTF defaults to single sided
            double_sided: material.double_sided.then_some(true),
            extensions: (!extensions.is_empty()).then_some(extensions),
        }
    }
}

impl GltfMaterial {
    /// Convert back into the schema material model.
    pub fn to_material(&self) -> Material {
        let extensions = self.extensions.clone().unwrap_or_default();
        Material {
            name: self.name.clone(),
            pbr_metallic_roughness: self.pbr_metallic_roughness.clone(),
            normal_texture: self.normal_texture.clone(),
            occlusion_texture: self.occlusion_texture.clone(),
            emissive_texture: self.emissive_texture.clone(),
            emissive_factor: self.emissive_factor.unwrap_or([0.0, 0.0, 0.0]),
            alpha_mode: self.alpha_mode.unwrap_or_default(),
            alpha_cutoff: self.alpha_cutoff,
            double_sided: self.double_sided.unwrap_or(false),
            pbr_specular_glossiness: extensions.pbr_specular_glossiness,
            transmission: extensions.transmission,
            clearcoat: extensions.clearcoat,
            ior: extensions.ior,
            specular: extensions.specular,
        }
    }

    /// Names of the KHR extensions this material uses.
    pub fn extension_names(&self) -> Vec<&'static str> {
        let Some(ext) = &self.extensions else {
            return Vec::new();
        };
        let mut names = Vec::new();
        if ext.pbr_specular_glossiness.is_some() {
            names.push("KHR_materials_pbrSpecularGlossiness");
        }
        if ext.transmission.is_some() {
            names.push("KHR_materials_transmission");
        }
        if ext.clearcoat.is_some() {
            names.push("KHR_materials_clearcoat");
        }
        if ext.ior.is_some() {
            names.push("KHR_materials_ior");
        }
        if ext.specular.is_some() {
            names.push("KHR_materials_specular");
        }
        names
    }
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Transmission;

    #[test]
    fn test_document_field_names() {
        let doc = GltfDocument {
            buffer_views: vec![GltfBufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 12,
                target: Some(TARGET_ARRAY_BUFFER),
            }],
            buffers: vec![GltfBuffer {
                byte_length: 12,
                uri: None,
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"bufferViews\""));
        assert!(json.contains("\"byteLength\""));
        assert!(json.contains("\"version\":\"2.0\""));
        // Zero byteOffset is omitted
        assert!(!json.contains("\"byteOffset\""));
    }

    #[test]
    fn test_material_extensions_wrapper() {
        let mut material = Material::from_color("glass", [1.0, 1.0, 1.0, 1.0]);
        material.transmission = Some(Transmission {
            transmission_factor: Some(0.9),
            transmission_texture: None,
        });

        let wire = GltfMaterial::from(&material);
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"KHR_materials_transmission\""));
        assert!(json.contains("\"transmissionFactor\":0.9"));
        assert_eq!(wire.extension_names(), vec!["KHR_materials_transmission"]);

        let back = wire.to_material();
        assert_eq!(
            back.transmission.unwrap().transmission_factor,
            Some(0.9)
        );
        assert!(back.double_sided);
    }

    #[test]
    fn test_accessor_type_field_renamed() {
        let accessor = GltfAccessor {
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: COMPONENT_F32,
            count: 3,
            element_type: "VEC3".to_string(),
            min: None,
            max: None,
        };
        let json = serde_json::to_string(&accessor).unwrap();
        assert!(json.contains("\"type\":\"VEC3\""));
        assert!(json.contains("\"componentType\":5126"));
    }
}
