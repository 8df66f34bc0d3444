//! Axis-aligned bounding boxes for growth-time overlap queries
//!
//! These boxes live in creature-local space and are only consulted while
//! growing new parts; the simulated pose is owned by the physics scene.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned box with `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Build a box from its center and half-extents.
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// True iff the projections overlap on all three axes. Intervals are
    /// closed, so touching faces count as overlapping.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// True iff the point lies inside the box, boundary included.
    pub fn contains_point(&self, point: Vec3) -> bool {
        (self.min.x <= point.x && point.x <= self.max.x)
            && (self.min.y <= point.y && point.y <= self.max.y)
            && (self.min.z <= point.z && point.z <= self.max.z)
    }

    /// Signed gap from the point to the box, per axis: zero on every axis
    /// where the point lies inside the box's slab, otherwise the vector
    /// component pointing from the point to the nearest face.
    pub fn distance_to_point(&self, point: Vec3) -> Vec3 {
        let mut distance = Vec3::ZERO;
        for axis in 0..3 {
            if point[axis] <= self.min[axis] {
                distance[axis] = self.min[axis] - point[axis];
            } else if point[axis] >= self.max[axis] {
                distance[axis] = self.max[axis] - point[axis];
            }
        }
        distance
    }

    /// Shift the box by `delta`.
    pub fn translate(&mut self, delta: Vec3) {
        self.min += delta;
        self.max += delta;
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_half_extents() {
        let bounds = BoundingBox::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(bounds.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.half_extents(), Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(bounds.min, Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(bounds.max, Vec3::new(1.5, 3.0, 4.5));
    }

    #[test]
    fn test_overlap_requires_all_axes() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        // Separated on x only.
        let c = BoundingBox::new(Vec3::new(3.0, 0.0, 0.0), Vec3::ONE);
        assert!(!a.overlaps(&c));

        // Overlapping on x and y but separated on z.
        let d = BoundingBox::new(Vec3::new(0.5, 0.5, 5.0), Vec3::ONE);
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_touching_faces_count_as_overlap() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::new(2.0, 0.0, 0.0), Vec3::ONE);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_contains_point() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert!(bounds.contains_point(Vec3::ZERO));
        assert!(bounds.contains_point(Vec3::new(1.0, 1.0, 1.0)));
        assert!(!bounds.contains_point(Vec3::new(1.1, 0.0, 0.0)));
    }

    #[test]
    fn test_distance_to_point() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);

        // Inside: zero on every axis.
        assert_eq!(bounds.distance_to_point(Vec3::new(0.5, -0.5, 0.0)), Vec3::ZERO);

        // Outside on x only.
        let gap = bounds.distance_to_point(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(gap, Vec3::new(-2.0, 0.0, 0.0));

        // Below min on y.
        let gap = bounds.distance_to_point(Vec3::new(0.0, -4.0, 0.0));
        assert_eq!(gap, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_translate() {
        let mut bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        bounds.translate(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.half_extents(), Vec3::ONE);
    }
}
