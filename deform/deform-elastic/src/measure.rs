//! Signed element measures and mesh-validity checking.
//!
//! Planar elements use the signed cross-product area; volume elements use
//! the scalar triple product, with the pyramid, prism and hexahedron
//! decomposed into fixed tetrahedral fans. The fan vertex orderings are a
//! convention inherited from the mesh format and are preserved verbatim,
//! not re-derived.
//!
//! An element is degenerate when its signed measure drops below `-EPS`;
//! degeneracy is counted and reported, never fatal.

use tracing::warn;

use deform_comm::Communicator;
use deform_types::{DeformMesh, Element, ElementKind};

use crate::shape::MAX_NODES;

/// Degeneracy threshold on the signed measure.
pub const EPS: f64 = 1e-16;

/// Globally reduced mesh quality after a validity pass.
#[derive(Debug, Clone, Copy)]
pub struct MeshQuality {
    /// Minimum signed element measure.
    pub min_measure: f64,
    /// Maximum signed element measure.
    pub max_measure: f64,
    /// Number of elements with measure below `-EPS`.
    pub invalid: u64,
}

/// Signed measure (area in the plane, volume otherwise) of an element
/// given its corner coordinates.
#[must_use]
pub fn signed_measure(kind: ElementKind, corners: &[[f64; 3]; MAX_NODES]) -> f64 {
    match kind {
        ElementKind::Triangle => triangle_area(corners, [0, 1, 2]),
        ElementKind::Quadrilateral => {
            triangle_area(corners, [0, 1, 2]) + triangle_area(corners, [0, 2, 3])
        }
        ElementKind::Tetrahedron => tet_volume(corners, [0, 1, 2, 3]),
        ElementKind::Pyramid => {
            tet_volume(corners, [0, 1, 2, 4]) + tet_volume(corners, [0, 2, 3, 4])
        }
        ElementKind::Prism => {
            tet_volume(corners, [0, 2, 1, 5])
                + tet_volume(corners, [0, 5, 1, 4])
                + tet_volume(corners, [0, 5, 4, 3])
        }
        ElementKind::Hexahedron => {
            tet_volume(corners, [0, 1, 2, 5])
                + tet_volume(corners, [0, 2, 7, 5])
                + tet_volume(corners, [0, 2, 3, 7])
                + tet_volume(corners, [0, 5, 7, 4])
                + tet_volume(corners, [2, 7, 5, 6])
        }
    }
}

/// Signed area of the triangle `(a, b, c)` via the in-plane cross product.
fn triangle_area(corners: &[[f64; 3]; MAX_NODES], [a, b, c]: [usize; 3]) -> f64 {
    let u = [corners[a][0] - corners[c][0], corners[a][1] - corners[c][1]];
    let v = [corners[b][0] - corners[c][0], corners[b][1] - corners[c][1]];
    0.5 * (u[0] * v[1] - u[1] * v[0])
}

/// Signed volume of the tetrahedron `(a, b, c, d)` via the scalar triple
/// product.
fn tet_volume(corners: &[[f64; 3]; MAX_NODES], [a, b, c, d]: [usize; 4]) -> f64 {
    let mut r1 = [0.0; 3];
    let mut r2 = [0.0; 3];
    let mut r3 = [0.0; 3];
    for dim in 0..3 {
        r1[dim] = corners[b][dim] - corners[a][dim];
        r2[dim] = corners[c][dim] - corners[a][dim];
        r3[dim] = corners[d][dim] - corners[a][dim];
    }
    let cross = [
        r1[1] * r2[2] - r1[2] * r2[1],
        r1[2] * r2[0] - r1[0] * r2[2],
        r1[0] * r2[1] - r1[1] * r2[0],
    ];
    (cross[0] * r3[0] + cross[1] * r3[1] + cross[2] * r3[2]) / 6.0
}

/// Gather the corner coordinates of an element.
fn element_corners(mesh: &DeformMesh, element: &Element) -> [[f64; 3]; MAX_NODES] {
    let mut corners = [[0.0; 3]; MAX_NODES];
    for (slot, &node) in corners.iter_mut().zip(element.nodes()) {
        let coord = mesh.coord(node);
        *slot = [coord.x, coord.y, coord.z];
    }
    corners
}

/// Check every element and reduce the results over all ranks.
///
/// Returns the global minimum/maximum signed measure and the global count
/// of degenerate elements; a nonzero count is logged on the primary rank.
#[must_use]
pub fn check_mesh(mesh: &DeformMesh, comm: &dyn Communicator) -> MeshQuality {
    let mut min_measure = f64::MAX;
    let mut max_measure = f64::MIN;
    let mut invalid = 0_u64;

    for element in &mesh.elements {
        let corners = element_corners(mesh, element);
        let measure = signed_measure(element.kind(), &corners);
        min_measure = min_measure.min(measure);
        max_measure = max_measure.max(measure);
        if measure < -EPS {
            invalid += 1;
        }
    }

    let quality = MeshQuality {
        min_measure: comm.min_f64(min_measure),
        max_measure: comm.max_f64(max_measure),
        invalid: comm.sum_u64(invalid),
    };
    if quality.invalid != 0 && comm.is_primary() {
        warn!(
            invalid = quality.invalid,
            min_measure = quality.min_measure,
            "mesh contains elements with negative measure"
        );
    }
    quality
}
