// Re-export glam for convenience
pub use glam::*;

mod aabb;
pub use aabb::Aabb;

mod transform;
pub use transform::Transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_mat4_point_roundtrip() {
        let mat = Mat4::from_translation(Vec3::new(10.0, 20.0, 30.0));
        let point = Vec3::new(1.0, 2.0, 3.0);
        let back = mat.inverse().transform_point3(mat.transform_point3(point));
        assert!((back - point).length() < 0.001);
    }
}
