//! The deformation mesh container.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::{Edge, Element, ElementKind, Marker, MeshPoint};

/// A volumetric (or planar) mesh prepared for pseudo-elastic deformation.
///
/// The mesh owns its points, elements, edges and boundary markers. Points
/// are mutated in place by the deformation driver; elements are immutable
/// once read.
///
/// # Example
///
/// ```
/// use deform_types::{DeformMesh, ElementKind, MeshPoint};
///
/// let mut mesh = DeformMesh::new(2).unwrap();
/// mesh.push_point(MeshPoint::from_coords(0.0, 0.0, 0.0));
/// mesh.push_point(MeshPoint::from_coords(1.0, 0.0, 0.0));
/// mesh.push_point(MeshPoint::from_coords(0.0, 1.0, 0.0));
/// mesh.add_element(ElementKind::Triangle, &[0, 1, 2]).unwrap();
///
/// assert_eq!(mesh.num_points(), 3);
/// assert_eq!(mesh.num_elements(), 1);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeformMesh {
    dim: usize,
    /// Mesh points, indexed by the node indices of elements and markers.
    pub points: Vec<MeshPoint>,
    /// Mesh elements.
    pub elements: Vec<Element>,
    /// Mesh edges (only consumed for the minimum-edge-length scale).
    pub edges: Vec<Edge>,
    /// Boundary markers.
    pub markers: Vec<Marker>,
}

impl DeformMesh {
    /// Create an empty mesh of the given spatial dimension (2 or 3).
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UnsupportedDimension`] for any other dimension.
    pub fn new(dim: usize) -> MeshResult<Self> {
        if dim != 2 && dim != 3 {
            return Err(MeshError::UnsupportedDimension(dim));
        }
        Ok(Self {
            dim,
            points: Vec::new(),
            elements: Vec::new(),
            edges: Vec::new(),
            markers: Vec::new(),
        })
    }

    /// Spatial dimension of the mesh (2 or 3).
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Append a point and return its index.
    pub fn push_point(&mut self, point: MeshPoint) -> u32 {
        let index = self.points.len() as u32;
        self.points.push(point);
        index
    }

    /// Append an element after validating topology and node indices.
    ///
    /// # Errors
    ///
    /// Returns an error when the node count does not match the topology,
    /// when a node index is out of range, or when a volume topology is used
    /// in a planar mesh (and vice versa).
    pub fn add_element(&mut self, kind: ElementKind, nodes: &[u32]) -> MeshResult<()> {
        if kind.is_volume() != (self.dim == 3) {
            return Err(MeshError::DimensionMismatch {
                kind,
                dim: self.dim,
            });
        }
        let element = Element::new(kind, nodes)?;
        for &node in element.nodes() {
            if node as usize >= self.points.len() {
                return Err(MeshError::InvalidPointIndex {
                    index: node,
                    point_count: self.points.len(),
                });
            }
        }
        self.elements.push(element);
        Ok(())
    }

    /// Append an edge.
    pub fn add_edge(&mut self, a: u32, b: u32) {
        self.edges.push(Edge::new(a, b));
    }

    /// Append a marker, flagging its points as boundary points.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidPointIndex`] if a vertex references a
    /// point outside the mesh.
    pub fn add_marker(&mut self, marker: Marker) -> MeshResult<()> {
        for vertex in &marker.vertices {
            let point = vertex.point as usize;
            if point >= self.points.len() {
                return Err(MeshError::InvalidPointIndex {
                    index: vertex.point,
                    point_count: self.points.len(),
                });
            }
            self.points[point].boundary = true;
        }
        self.markers.push(marker);
        Ok(())
    }

    /// Coordinate of a point.
    #[inline]
    #[must_use]
    pub fn coord(&self, point: u32) -> Point3<f64> {
        self.points[point as usize].coord
    }

    /// Overwrite the coordinate of a point.
    #[inline]
    pub fn set_coord(&mut self, point: u32, coord: Point3<f64>) {
        self.points[point as usize].coord = coord;
    }

    /// Find a marker index by name.
    #[must_use]
    pub fn marker_index(&self, name: &str) -> Option<usize> {
        self.markers.iter().position(|m| m.name == name)
    }

    /// Minimum edge length over the local mesh, `None` if there are no edges.
    #[must_use]
    pub fn min_edge_length(&self) -> Option<f64> {
        self.edges
            .iter()
            .map(|e| (self.coord(e.b) - self.coord(e.a)).norm())
            .min_by(f64::total_cmp)
    }

    /// Reset the prescribed variation of every boundary vertex to zero.
    ///
    /// Called at the start of each shape-parametrization pass.
    pub fn reset_var_coords(&mut self) {
        for marker in &mut self.markers {
            for vertex in &mut marker.vertices {
                vertex.var_coord.fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundaryVertex, MarkerKind, Vector3};

    fn unit_square() -> DeformMesh {
        let mut mesh = DeformMesh::new(2).unwrap();
        mesh.push_point(MeshPoint::from_coords(0.0, 0.0, 0.0));
        mesh.push_point(MeshPoint::from_coords(1.0, 0.0, 0.0));
        mesh.push_point(MeshPoint::from_coords(1.0, 1.0, 0.0));
        mesh.push_point(MeshPoint::from_coords(0.0, 1.0, 0.0));
        mesh.add_element(ElementKind::Quadrilateral, &[0, 1, 2, 3])
            .unwrap();
        mesh
    }

    #[test]
    fn rejects_bad_dimension() {
        assert!(DeformMesh::new(4).is_err());
        assert!(DeformMesh::new(2).is_ok());
    }

    #[test]
    fn rejects_volume_element_in_planar_mesh() {
        let mut mesh = unit_square();
        assert!(mesh
            .add_element(ElementKind::Tetrahedron, &[0, 1, 2, 3])
            .is_err());
    }

    #[test]
    fn rejects_out_of_range_node() {
        let mut mesh = unit_square();
        assert!(mesh
            .add_element(ElementKind::Triangle, &[0, 1, 9])
            .is_err());
    }

    #[test]
    fn marker_flags_boundary_points() {
        let mut mesh = unit_square();
        let mut marker = Marker::new("wall", MarkerKind::Deforming);
        marker.vertices.push(BoundaryVertex::new(0, Vector3::y()));
        marker.vertices.push(BoundaryVertex::new(1, Vector3::y()));
        mesh.add_marker(marker).unwrap();

        assert!(mesh.points[0].boundary);
        assert!(mesh.points[1].boundary);
        assert!(!mesh.points[2].boundary);
    }

    #[test]
    fn min_edge_length() {
        let mut mesh = unit_square();
        assert!(mesh.min_edge_length().is_none());
        mesh.add_edge(0, 1);
        mesh.add_edge(0, 2);
        let min = mesh.min_edge_length().unwrap();
        assert!((min - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reset_var_coords_zeroes_all_vertices() {
        let mut mesh = unit_square();
        let mut marker = Marker::new("wall", MarkerKind::Deforming);
        let mut vertex = BoundaryVertex::new(0, Vector3::y());
        vertex.var_coord = Vector3::new(0.1, 0.2, 0.0);
        marker.vertices.push(vertex);
        mesh.add_marker(marker).unwrap();

        mesh.reset_var_coords();
        assert_eq!(mesh.markers[0].vertices[0].var_coord, Vector3::zeros());
    }
}
