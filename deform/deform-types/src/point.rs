//! Mesh point with per-point cached scalars.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mesh node.
///
/// Coordinates are always stored with three components; planar meshes keep
/// `z = 0`. The wall distance is a cache written by the wall-distance
/// stiffness policy, and the grid velocity is only present for dynamic-mesh
/// runs.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshPoint {
    /// Spatial coordinate.
    pub coord: Point3<f64>,
    /// Whether the point lies on any boundary marker.
    pub boundary: bool,
    /// Cached distance to the nearest deforming surface.
    pub wall_distance: Option<f64>,
    /// Grid velocity for dynamic meshes.
    pub grid_velocity: Option<Vector3<f64>>,
}

impl MeshPoint {
    /// Create an interior point at the given coordinate.
    #[inline]
    #[must_use]
    pub const fn new(coord: Point3<f64>) -> Self {
        Self {
            coord,
            boundary: false,
            wall_distance: None,
            grid_velocity: None,
        }
    }

    /// Create a point from raw coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use deform_types::MeshPoint;
    ///
    /// let p = MeshPoint::from_coords(1.0, 2.0, 3.0);
    /// assert_eq!(p.coord.y, 2.0);
    /// assert!(!p.boundary);
    /// ```
    #[inline]
    #[must_use]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}
