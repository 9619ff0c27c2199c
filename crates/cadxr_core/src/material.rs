//! Material definitions following the glTF 2.0 material schema.
//!
//! The type set mirrors the glTF material schema and the Khronos extensions
//! used for CAD-quality surfaces:
//!
//! - `KHR_materials_pbrSpecularGlossiness`
//! - `KHR_materials_transmission`
//! - `KHR_materials_clearcoat`
//! - `KHR_materials_ior`
//! - `KHR_materials_specular`
//! - `KHR_texture_transform`
//!
//! All types serialize with serde, so a material survives JSON storage and
//! the realtime database unchanged. `to_preview_surface` flattens a material
//! to the UsdPreviewSurface parameter set for USD interchange.

use cadxr_math::Vec3;
use serde::{Deserialize, Serialize};

/// Image MIME types allowed for glTF textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
}

/// The alpha rendering mode of the material.
///
/// Specifies the interpretation of the alpha value of the base color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaMode {
    /// The alpha value is ignored, the rendered output is fully opaque.
    #[default]
    Opaque,
    /// Fully opaque or fully transparent depending on `alpha_cutoff`.
    Mask,
    /// The alpha value composites the source over the background.
    Blend,
}

/// A material following the glTF 2.0 material schema.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// The name of the material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Metallic-roughness parameters from PBR methodology
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,

    /// The tangent space normal texture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<NormalTextureInfo>,

    /// The occlusion texture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<OcclusionTextureInfo>,

    /// The emissive texture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureInfo>,

    /// The factors for the emissive color of the material
    #[serde(default = "default_emissive_factor")]
    pub emissive_factor: [f32; 3],

    /// The alpha rendering mode
    #[serde(default)]
    pub alpha_mode: AlphaMode,

    /// The alpha cutoff value (only meaningful for `AlphaMode::Mask`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f32>,

    /// Whether the material is double sided
    #[serde(default = "default_true")]
    pub double_sided: bool,

    // Extensions. Specular-glossiness excludes the other extension models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_specular_glossiness: Option<PbrSpecularGlossiness>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearcoat: Option<Clearcoat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ior: Option<Ior>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular: Option<Specular>,
}

fn default_emissive_factor() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn default_true() -> bool {
    true
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            pbr_metallic_roughness: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: default_emissive_factor(),
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: None,
            double_sided: true,
            pbr_specular_glossiness: None,
            transmission: None,
            clearcoat: None,
            ior: None,
            specular: None,
        }
    }
}

impl Material {
    /// Create a named material with default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Create a simple metallic-roughness material from a base color.
    pub fn from_color(name: impl Into<String>, rgba: [f32; 4]) -> Self {
        Self {
            name: Some(name.into()),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: Some(rgba),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Check if this material references any textures.
    pub fn has_textures(&self) -> bool {
        self.normal_texture.is_some()
            || self.occlusion_texture.is_some()
            || self.emissive_texture.is_some()
            || self
                .pbr_metallic_roughness
                .as_ref()
                .map(|p| p.base_color_texture.is_some() || p.metallic_roughness_texture.is_some())
                .unwrap_or(false)
    }

    /// Check if this material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emissive_factor.iter().any(|&c| c > 0.0) || self.emissive_texture.is_some()
    }

    /// Flatten to the UsdPreviewSurface parameter set.
    ///
    /// Textured inputs collapse to their factors; specular-glossiness
    /// materials are approximated through their diffuse factor.
    pub fn to_preview_surface(&self) -> PreviewSurface {
        let mut surface = PreviewSurface {
            name: self.name.clone().unwrap_or_default(),
            ..Default::default()
        };

        if let Some(pbr) = &self.pbr_metallic_roughness {
            if let Some(base) = pbr.base_color_factor {
                surface.diffuse_color = Vec3::new(base[0], base[1], base[2]);
                surface.opacity = base[3];
            }
            if let Some(metallic) = pbr.metallic_factor {
                surface.metallic = metallic;
            }
            if let Some(roughness) = pbr.roughness_factor {
                surface.roughness = roughness;
            }
        } else if let Some(sg) = &self.pbr_specular_glossiness {
            if let Some(diffuse) = sg.diffuse_factor {
                surface.diffuse_color = Vec3::new(diffuse[0], diffuse[1], diffuse[2]);
                surface.opacity = diffuse[3];
            }
            if let Some(glossiness) = sg.glossiness_factor {
                surface.roughness = 1.0 - glossiness;
            }
        }

        surface.emissive_color = Vec3::from(self.emissive_factor);
        if let Some(ior) = &self.ior {
            if let Some(value) = ior.ior {
                surface.ior = value;
            }
        }

        surface
    }

    /// Build a metallic-roughness material from preview surface parameters.
    pub fn from_preview_surface(surface: &PreviewSurface) -> Self {
        Self {
            name: (!surface.name.is_empty()).then(|| surface.name.clone()),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: Some([
                    surface.diffuse_color.x,
                    surface.diffuse_color.y,
                    surface.diffuse_color.z,
                    surface.opacity,
                ]),
                metallic_factor: Some(surface.metallic),
                roughness_factor: Some(surface.roughness),
                ..Default::default()
            }),
            emissive_factor: surface.emissive_color.to_array(),
            alpha_mode: if surface.opacity < 1.0 {
                AlphaMode::Blend
            } else {
                AlphaMode::Opaque
            },
            ior: (surface.ior != default_ior()).then_some(Ior {
                ior: Some(surface.ior),
            }),
            ..Default::default()
        }
    }
}

/// The metallic-roughness material model from PBR methodology.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    /// Base color RGBA factor (glTF default [1, 1, 1, 1])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<[f32; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,

    /// Metalness (glTF default 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_factor: Option<f32>,

    /// Roughness (glTF default 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness_factor: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

/// The specular-glossiness material model
/// (`KHR_materials_pbrSpecularGlossiness`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrSpecularGlossiness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_factor: Option<[f32; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_texture: Option<TextureInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_factor: Option<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossiness_factor: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_glossiness_texture: Option<TextureInfo>,
}

/// A reference to a texture with optional UV set and transform.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    /// Index into the scene's texture table
    pub index: u32,

    /// The TEXCOORD set used by this texture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tex_coord: Option<u32>,

    /// UV transform (`KHR_texture_transform`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_transform: Option<TextureTransform>,
}

/// The tangent space normal texture.
///
/// Texels are XYZ normal vectors in tangent space; `scale` multiplies the
/// X and Y components.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfo {
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tex_coord: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_transform: Option<TextureTransform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
}

/// The occlusion texture.
///
/// Occlusion is sampled from the R channel; `strength` scales the effect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfo {
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tex_coord: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_transform: Option<TextureTransform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

/// Per-texture UV shifting and scaling (`KHR_texture_transform`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureTransform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<[f32; 2]>,

    /// Rotation in radians, counter-clockwise around the UV origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tex_coord: Option<u32>,
}

/// A texture image source.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Optical transmission (`KHR_materials_transmission`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_factor: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_texture: Option<TextureInfo>,
}

/// Specular reflectance (`KHR_materials_specular`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specular {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_factor: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_texture: Option<TextureInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_color_factor: Option<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_color_texture: Option<TextureInfo>,
}

/// Index of refraction (`KHR_materials_ior`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ior {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ior: Option<f32>,
}

/// The clearcoat material layer (`KHR_materials_clearcoat`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clearcoat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearcoat_factor: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearcoat_texture: Option<TextureInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearcoat_roughness_factor: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearcoat_roughness_texture: Option<TextureInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearcoat_normal_texture: Option<NormalTextureInfo>,
}

fn default_ior() -> f32 {
    1.5
}

/// Flat UsdPreviewSurface-style parameter set.
///
/// The lossy common denominator between the glTF material model and USD
/// preview shaders.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewSurface {
    pub name: String,
    pub diffuse_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive_color: Vec3,
    pub opacity: f32,
    pub ior: f32,
}

impl Default for PreviewSurface {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::splat(0.5), // Grey default
            metallic: 0.0,
            roughness: 0.5,
            emissive_color: Vec3::ZERO,
            opacity: 1.0,
            ior: default_ior(),
        }
    }
}
