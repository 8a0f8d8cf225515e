//! Bounding volumes for extents and draw-item bounds

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty (inverted) box; expanding it by any point yields that point
    pub const EMPTY: Self = Self {
        min: Vec3::new(f32::MAX, f32::MAX, f32::MAX),
        max: Vec3::new(f32::MIN, f32::MIN, f32::MIN),
    };

    /// Unit cube centered at the origin
    pub const UNIT: Self = Self {
        min: Vec3::new(-0.5, -0.5, -0.5),
        max: Vec3::new(0.5, 0.5, 0.5),
    };

    /// Create from min and max points
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create from a set of points
    pub fn from_points(points: &[Vec3]) -> Self {
        points
            .iter()
            .fold(Self::EMPTY, |aabb, &point| aabb.expand_to_include(point))
    }

    /// Get the center point
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (full extents)
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if the AABB is empty (inverted)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand to include a point
    #[inline]
    pub fn expand_to_include(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Union of two boxes
    #[inline]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Check if a point is inside
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Check if another box is fully contained
    ///
    /// An empty box is contained by anything.
    #[inline]
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.contains_point(other.min) && self.contains_point(other.max))
    }

    /// Transform the box by a matrix (result is still axis-aligned)
    pub fn transform(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        self.corners()
            .iter()
            .fold(Self::EMPTY, |aabb, &corner| {
                aabb.expand_to_include(matrix.transform_point3(corner))
            })
    }

    /// Get the 8 corners
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Matrix mapping `Aabb::UNIT` onto this box
    pub fn unit_cube_transform(&self) -> Mat4 {
        if self.is_empty() {
            return Mat4::from_scale(Vec3::ZERO);
        }
        Mat4::from_translation(self.center()) * Mat4::from_scale(self.size())
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(&[Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 2.0, 3.0)]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
        assert!(Aabb::from_points(&[]).is_empty());
    }

    #[test]
    fn test_aabb_contains() {
        let outer = Aabb::new(Vec3::ZERO, Vec3::ONE * 2.0);
        let inner = Aabb::new(Vec3::splat(0.5), Vec3::ONE);
        assert!(outer.contains_aabb(&inner));
        assert!(!inner.contains_aabb(&outer));
        assert!(inner.contains_aabb(&Aabb::EMPTY));
    }

    #[test]
    fn test_aabb_transform() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let moved = aabb.transform(&Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_unit_cube_transform() {
        let aabb = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 5.0, 7.0));
        let mapped = Aabb::UNIT.transform(&aabb.unit_cube_transform());
        assert!((mapped.min - aabb.min).length() < 1e-5);
        assert!((mapped.max - aabb.max).length() < 1e-5);
    }
}
