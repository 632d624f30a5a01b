//! Axis-aligned bounding box.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned box.
///
/// Used for hold-fixed regions (points outside the box are pinned during
/// deformation) and as a coarse bound for lattice placement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two corners, correcting swapped components.
    #[must_use]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self {
            min: Point3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Point3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }

    /// Create a box enclosing an iterator of points.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Self { min, max }
    }

    /// Whether a coordinate component lies inside the box along `axis`.
    #[inline]
    #[must_use]
    pub fn contains_component(&self, axis: usize, value: f64) -> bool {
        value >= self.min[axis] && value <= self.max[axis]
    }

    /// Whether the box contains a point (boundary inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|axis| self.contains_component(axis, point[axis]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrects_swapped_corners() {
        let b = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0));
        assert_eq!(b.min.x, 0.0);
        assert_eq!(b.max.x, 1.0);
    }

    #[test]
    fn contains_is_inclusive() {
        let b = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(b.contains(&Point3::new(0.0, 0.5, 1.0)));
        assert!(!b.contains(&Point3::new(1.5, 0.5, 0.5)));
        assert!(b.contains_component(1, 0.5));
        assert!(!b.contains_component(2, -0.1));
    }
}
