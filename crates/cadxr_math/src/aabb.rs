use glam::{Mat4, Vec3};

/// Axis-aligned bounding box stored as min/max corners.
///
/// Interchange formats (glTF accessor min/max, USD extents) want corner
/// vectors, so that is the canonical representation here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty AABB (contains nothing).
    ///
    /// `min > max` on every axis, so any union with a real box or point
    /// replaces it.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Create an AABB from two corner points (in any order).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Compute the bounding box of a set of points.
    pub fn from_point_cloud(points: &[Vec3]) -> Self {
        let mut aabb = Self::empty();
        for &p in points {
            aabb.expand(p);
        }
        aabb
    }

    /// Grow the box to contain a point.
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether the box contains nothing.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Whether a point is inside (inclusive).
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the corner-to-corner extent vector.
    pub fn diagonal(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// The 8 corner points of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Transform the box by a matrix.
    ///
    /// Transforms all 8 corners and bounds the result, so the output stays
    /// axis-aligned under rotation.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut result = Self::empty();
        for corner in self.corners() {
            result.expand(matrix.transform_point3(corner));
        }
        result
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 5.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(10.0, 10.0, 5.0));
    }

    #[test]
    fn test_aabb_empty_union() {
        let empty = Aabb::empty();
        assert!(empty.is_empty());

        let real = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let union = empty.union(&real);
        assert_eq!(union, real);
    }

    #[test]
    fn test_aabb_from_point_cloud() {
        let points = [
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::ZERO,
        ];
        let aabb = Aabb::from_point_cloud(&points);

        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_aabb_contains() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::splat(2.0));
        assert!(aabb.contains(Vec3::ONE));
        assert!(aabb.contains(Vec3::ZERO));
        assert!(!aabb.contains(Vec3::splat(3.0)));
    }

    #[test]
    fn test_aabb_centroid() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::splat(10.0));
        assert_eq!(aabb.centroid(), Vec3::splat(5.0));
    }

    #[test]
    fn test_aabb_transformed_translation() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let mat = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let moved = aabb.transformed(&mat);

        assert!((moved.min - Vec3::new(5.0, 0.0, 0.0)).length() < 0.001);
        assert!((moved.max - Vec3::new(6.0, 1.0, 1.0)).length() < 0.001);
    }

    #[test]
    fn test_aabb_transformed_rotation_stays_bounding() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mat = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let rotated = aabb.transformed(&mat);

        // A rotated unit cube needs a larger axis-aligned box
        assert!(rotated.max.x > 1.0);
        assert!(rotated.contains(Vec3::new(1.0, 1.0, 1.0)));
    }
}
