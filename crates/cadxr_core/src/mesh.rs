//! Mesh geometry for the cadxr scene graph.
//!
//! A format-agnostic triangle mesh that can be populated from USD, glTF or
//! OBJ data and written back out by the format modules. Polygonal input is
//! triangulated at construction so the writers only ever see triangles.

use std::path::Path;

use cadxr_math::{Aabb, Vec3};
use thiserror::Error;

/// Errors that can occur while constructing or loading a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("face vertex index {index} out of range (vertex count {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("face vertex counts sum ({sum}) does not match index count ({indices})")]
    FaceCountMismatch { sum: usize, indices: usize },

    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),
}

pub type MeshResult<T> = Result<T, MeshError>;

/// A mesh consisting of vertex positions, optional normals and UVs, and
/// triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - computed on demand)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and triangle indices.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Create a new mesh with UV coordinates.
    pub fn new_with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// Create a mesh from polygonal faces (USD-style counts + indices).
    ///
    /// N-gons are converted to triangles with fan triangulation: a face
    /// `[0, 1, 2, 3]` becomes `(0,1,2)` and `(0,2,3)`. Faces with fewer than
    /// three vertices are skipped.
    pub fn from_faces(
        positions: Vec<Vec3>,
        face_vertex_counts: &[u32],
        face_vertex_indices: &[u32],
        normals: Option<Vec<Vec3>>,
    ) -> MeshResult<Self> {
        let sum: usize = face_vertex_counts.iter().map(|&c| c as usize).sum();
        if sum != face_vertex_indices.len() {
            return Err(MeshError::FaceCountMismatch {
                sum,
                indices: face_vertex_indices.len(),
            });
        }

        for &index in face_vertex_indices {
            if index as usize >= positions.len() {
                return Err(MeshError::IndexOutOfRange {
                    index,
                    vertex_count: positions.len(),
                });
            }
        }

        let mut indices = Vec::new();
        let mut offset = 0usize;
        for &count in face_vertex_counts {
            let count = count as usize;
            if count < 3 {
                log::warn!("skipping degenerate face with {} vertices", count);
                offset += count;
                continue;
            }
            for i in 1..(count - 1) {
                indices.push(face_vertex_indices[offset]);
                indices.push(face_vertex_indices[offset + i]);
                indices.push(face_vertex_indices[offset + i + 1]);
            }
            offset += count;
        }

        Ok(Self::new(positions, indices, normals))
    }

    /// Load the first model of an OBJ file as a mesh.
    pub fn from_obj<P: AsRef<Path>>(path: P) -> MeshResult<Self> {
        let (models, _materials) = tobj::load_obj(
            path.as_ref(),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();

        // Merge all models into one mesh, offsetting indices
        for model in &models {
            let mesh = &model.mesh;
            let base = positions.len() as u32;

            for chunk in mesh.positions.chunks_exact(3) {
                positions.push(Vec3::new(chunk[0], chunk[1], chunk[2]));
            }
            for chunk in mesh.normals.chunks_exact(3) {
                normals.push(Vec3::new(chunk[0], chunk[1], chunk[2]));
            }
            for chunk in mesh.texcoords.chunks_exact(2) {
                uvs.push([chunk[0], chunk[1]]);
            }
            indices.extend(mesh.indices.iter().map(|&i| base + i));
        }

        let normals = (normals.len() == positions.len()).then_some(normals);
        let uvs = (uvs.len() == positions.len()).then_some(uvs);

        log::debug!(
            "loaded OBJ {}: {} vertices, {} triangles",
            path.as_ref().display(),
            positions.len(),
            indices.len() / 3
        );

        Ok(Self::new_with_uvs(positions, indices, normals, uvs))
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Replaces any existing normals. Each vertex normal is the normalized
    /// sum of the (area-weighted) face normals of the faces sharing it.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks(3) {
            if face.len() < 3 {
                continue;
            }

            let i0 = face[0] as usize;
            let i1 = face[1] as usize;
            let i2 = face[2] as usize;

            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let p1 = self.positions[i1];
            let p2 = self.positions[i2];

            // Cross product length is proportional to face area,
            // so larger faces weigh more
            let face_normal = (p1 - p0).cross(p2 - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y; // Default up normal for degenerate cases
            }
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has per-vertex normals, computing them if necessary.
    ///
    /// Also recomputes when the existing normals don't match the vertex
    /// count (face-varying normals from USD).
    pub fn ensure_normals(&mut self) {
        let should_compute = match &self.normals {
            None => true,
            Some(normals) => normals.len() != self.positions.len(),
        };

        if should_compute {
            if let Some(existing) = &self.normals {
                log::debug!(
                    "normals length ({}) does not match vertex count ({}), recomputing",
                    existing.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2], None);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
    }

    #[test]
    fn test_from_faces_quad() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_faces(positions, &[4], &[0, 1, 2, 3], None).unwrap();

        // Quad (0,1,2,3) -> triangles (0,1,2) and (0,2,3)
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_from_faces_skips_degenerate() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let mesh = Mesh::from_faces(positions, &[2, 3], &[0, 1, 0, 1, 2], None).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_from_faces_rejects_bad_index() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let err = Mesh::from_faces(positions, &[3], &[0, 1, 7], None).unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfRange { index: 7, .. }));
    }

    #[test]
    fn test_from_faces_rejects_count_mismatch() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let err = Mesh::from_faces(positions, &[4], &[0, 1, 2], None).unwrap_err();
        assert!(matches!(err, MeshError::FaceCountMismatch { .. }));
    }

    #[test]
    fn test_compute_normals() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        // CCW winding viewed from +Z produces a +Z normal
        let mut mesh = Mesh::new(positions, vec![0, 1, 2], None);
        mesh.compute_normals();

        let normals = mesh.normals.as_ref().unwrap();
        for normal in normals {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_ensure_normals_recomputes_mismatched() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut mesh = Mesh::new(positions, vec![0, 1, 2], Some(vec![Vec3::Z; 9]));
        mesh.ensure_normals();
        assert_eq!(mesh.normals.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_bounds_computation() {
        let positions = vec![
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::ZERO,
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2], None);

        assert_eq!(mesh.bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.bounds.max, Vec3::new(4.0, 5.0, 6.0));
    }
}
