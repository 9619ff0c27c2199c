//! Parsed USD prim intermediate representation.
//!
//! These types hold prims as they appear in the USDA text, before the
//! loader turns them into a `Scene`.

use cadxr_math::{Mat4, Vec3};

use crate::material::PreviewSurface;

/// A parsed USD prim.
#[derive(Clone, Debug)]
pub enum UsdPrim {
    /// A transform (or Scope) node with children
    Xform(UsdXform),

    /// A mesh geometry prim
    Mesh(UsdMesh),

    /// A Material prim carrying a UsdPreviewSurface shader
    Material(UsdMaterial),

    /// An unknown or unsupported prim type (skipped by the loader)
    Unknown(String),
}

impl UsdPrim {
    /// The prim path, if the prim kind carries one.
    pub fn path(&self) -> Option<&str> {
        match self {
            UsdPrim::Xform(x) => Some(&x.path),
            UsdPrim::Mesh(m) => Some(&m.path),
            UsdPrim::Material(m) => Some(&m.path),
            UsdPrim::Unknown(_) => None,
        }
    }
}

/// A USD Xform or Scope prim.
#[derive(Clone, Debug, Default)]
pub struct UsdXform {
    /// Prim path (e.g. `/world/group`)
    pub path: String,

    /// Prim name (last path component)
    pub name: String,

    /// Combined local transform from xformOps
    pub transform: Mat4,

    /// Child prims
    pub children: Vec<UsdPrim>,
}

/// A USD Mesh prim.
#[derive(Clone, Debug, Default)]
pub struct UsdMesh {
    /// Prim path
    pub path: String,

    /// Prim name
    pub name: String,

    /// Vertex positions
    pub points: Vec<Vec3>,

    /// Number of vertices per face
    pub face_vertex_counts: Vec<u32>,

    /// Vertex indices for each face
    pub face_vertex_indices: Vec<u32>,

    /// Vertex normals (optional)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates from `primvars:st` (optional)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Local transform
    pub transform: Mat4,

    /// Bound material prim path (`rel material:binding`)
    pub material_binding: Option<String>,
}

/// A USD Material prim with its preview shader parameters.
#[derive(Clone, Debug, Default)]
pub struct UsdMaterial {
    /// Prim path (binding target)
    pub path: String,

    /// Prim name
    pub name: String,

    /// Flattened UsdPreviewSurface inputs
    pub surface: PreviewSurface,
}

/// Transform operation types found in USD xformOps.
#[derive(Clone, Debug)]
pub enum XformOp {
    /// `xformOp:translate`
    Translate(Vec3),

    /// Rotation in degrees around a single axis
    RotateX(f32),
    RotateY(f32),
    RotateZ(f32),

    /// `xformOp:rotateXYZ`, Euler angles in degrees
    RotateXyz(Vec3),

    /// `xformOp:scale`
    Scale(Vec3),

    /// `xformOp:transform`, full 4x4 matrix
    Transform(Mat4),
}

impl XformOp {
    /// Convert this operation to a transformation matrix.
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            XformOp::Translate(t) => Mat4::from_translation(*t),
            XformOp::RotateX(deg) => Mat4::from_rotation_x(deg.to_radians()),
            XformOp::RotateY(deg) => Mat4::from_rotation_y(deg.to_radians()),
            XformOp::RotateZ(deg) => Mat4::from_rotation_z(deg.to_radians()),
            XformOp::RotateXyz(euler) => {
                Mat4::from_rotation_x(euler.x.to_radians())
                    * Mat4::from_rotation_y(euler.y.to_radians())
                    * Mat4::from_rotation_z(euler.z.to_radians())
            }
            XformOp::Scale(s) => Mat4::from_scale(*s),
            XformOp::Transform(m) => *m,
        }
    }
}

/// Combine a list of xformOps into a single matrix.
pub fn compose_xform_ops(ops: &[XformOp]) -> Mat4 {
    let mut result = Mat4::IDENTITY;
    for op in ops {
        result *= op.to_matrix();
    }
    result
}
