//! Dirichlet boundary conditions for the elastic system.
//!
//! Prescribed surface displacements and fixed-zone constraints become
//! identity rows of the block system. The marker passes run in a fixed
//! override order — later passes win where markers share points:
//!
//! 1. every marker that is neither a symmetry plane nor an inter-partition
//!    boundary is pinned to zero;
//! 2. symmetry planes (3-D) pin only the displacement component along the
//!    plane axis, chosen as the coordinate with the smallest RMS magnitude
//!    over the plane's vertices;
//! 3. deforming markers impose their prescribed variation, scaled by the
//!    increment fraction;
//! 4. near-field markers are pinned to zero regardless of earlier passes.
//!
//! If a hold-fixed box is configured, every coordinate component outside
//! the box is pinned to zero, overriding everything else.

use deform_types::{Aabb, DeformMesh, MarkerKind};

use crate::system::BlockSystem;

/// Pin one scalar DOF to a prescribed value.
fn impose(system: &mut BlockSystem, index: usize, value: f64) {
    system.rhs[index] = value;
    system.sol[index] = value;
    system.matrix.clear_row(index);
}

/// Apply the Dirichlet passes for one increment.
///
/// `increments` is the configured number of nonlinear increments; each
/// increment imposes `var_coord / increments` so that the full prescribed
/// displacement accumulates over the increment loop.
pub fn apply_boundary_conditions(
    mesh: &DeformMesh,
    system: &mut BlockSystem,
    increments: usize,
    hold_fixed: Option<&Aabb>,
) {
    let dim = mesh.dim();
    #[allow(clippy::cast_precision_loss)]
    let increment_fraction = 1.0 / increments.max(1) as f64;

    // Pass 1: zero displacement on every plain boundary marker.
    for marker in &mesh.markers {
        if matches!(
            marker.kind,
            MarkerKind::SymmetryPlane | MarkerKind::InterPartition
        ) {
            continue;
        }
        for vertex in &marker.vertices {
            for d in 0..dim {
                impose(system, vertex.point as usize * dim + d, 0.0);
            }
        }
    }

    // Pass 2: symmetry planes pin only the normal-axis component.
    if dim == 3 {
        for marker in &mesh.markers {
            if marker.kind != MarkerKind::SymmetryPlane || marker.vertices.is_empty() {
                continue;
            }
            let mut mean = [0.0_f64; 3];
            for vertex in &marker.vertices {
                let coord = mesh.coord(vertex.point);
                for d in 0..3 {
                    mean[d] += coord[d] * coord[d];
                }
            }
            for value in &mut mean {
                *value = value.sqrt();
            }
            let axis = (0..3).min_by(|&a, &b| mean[a].total_cmp(&mean[b])).unwrap_or(0);

            for vertex in &marker.vertices {
                impose(system, vertex.point as usize * dim + axis, 0.0);
            }
        }
    }

    // Pass 3: deforming markers impose the prescribed variation. Some of
    // their points may sit on a symmetry plane, so the rows are cleared
    // again.
    for marker in &mesh.markers {
        if !marker.is_deforming() {
            continue;
        }
        for vertex in &marker.vertices {
            for d in 0..dim {
                impose(
                    system,
                    vertex.point as usize * dim + d,
                    vertex.var_coord[d] * increment_fraction,
                );
            }
        }
    }

    // Pass 4: the near-field plane never moves.
    for marker in &mesh.markers {
        if marker.kind != MarkerKind::NearField {
            continue;
        }
        for vertex in &marker.vertices {
            for d in 0..dim {
                impose(system, vertex.point as usize * dim + d, 0.0);
            }
        }
    }

    // Hold-fixed region: pin every coordinate component outside the box.
    if let Some(hold) = hold_fixed {
        for (point, mesh_point) in mesh.points.iter().enumerate() {
            for d in 0..dim {
                if !hold.contains_component(d, mesh_point.coord[d]) {
                    impose(system, point * dim + d, 0.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deform_types::{BoundaryVertex, Marker, MeshPoint, Point3, Vector3};

    /// Four points on a line, three markers: a far field on point 0, a
    /// deforming wall on points 1-2, a near field on point 2.
    fn mesh_with_markers() -> DeformMesh {
        let mut mesh = DeformMesh::new(2).unwrap();
        for x in 0..4 {
            mesh.push_point(MeshPoint::from_coords(f64::from(x), 0.0, 0.0));
        }
        let mut outer = Marker::new("outer", MarkerKind::FarField);
        outer.vertices.push(BoundaryVertex::new(0, Vector3::y()));
        mesh.add_marker(outer).unwrap();

        let mut wall = Marker::new("wall", MarkerKind::Deforming);
        let mut v1 = BoundaryVertex::new(1, Vector3::y());
        v1.var_coord = Vector3::new(0.1, 0.0, 0.0);
        let mut v2 = BoundaryVertex::new(2, Vector3::y());
        v2.var_coord = Vector3::new(0.2, 0.0, 0.0);
        wall.vertices.push(v1);
        wall.vertices.push(v2);
        mesh.add_marker(wall).unwrap();

        let mut near = Marker::new("near", MarkerKind::NearField);
        near.vertices.push(BoundaryVertex::new(2, Vector3::y()));
        mesh.add_marker(near).unwrap();
        mesh
    }

    #[test]
    fn deforming_overrides_zero_and_near_field_overrides_deforming() {
        let mesh = mesh_with_markers();
        let mut system = BlockSystem::new(4, 2);
        apply_boundary_conditions(&mesh, &mut system, 1, None);

        // Far field pinned.
        assert_relative_eq!(system.sol[0], 0.0);
        // Deforming vertex keeps its variation.
        assert_relative_eq!(system.sol[2], 0.1);
        // Shared with the near field: pinned back to zero.
        assert_relative_eq!(system.sol[4], 0.0);
        // Interior point untouched.
        assert_relative_eq!(system.matrix.entry(6, 6), 0.0);
    }

    #[test]
    fn increments_scale_the_prescribed_variation() {
        let mesh = mesh_with_markers();
        let mut system = BlockSystem::new(4, 2);
        apply_boundary_conditions(&mesh, &mut system, 4, None);
        assert_relative_eq!(system.sol[2], 0.025);
        assert_relative_eq!(system.rhs[2], 0.025);
    }

    #[test]
    fn symmetry_plane_pins_only_the_plane_axis() {
        let mut mesh = DeformMesh::new(3).unwrap();
        // A z = 0 plane: z has the smallest RMS coordinate.
        mesh.push_point(MeshPoint::from_coords(1.0, 2.0, 0.0));
        mesh.push_point(MeshPoint::from_coords(2.0, 1.0, 0.0));
        let mut plane = Marker::new("sym", MarkerKind::SymmetryPlane);
        plane.vertices.push(BoundaryVertex::new(0, Vector3::z()));
        plane.vertices.push(BoundaryVertex::new(1, Vector3::z()));
        mesh.add_marker(plane).unwrap();

        let mut system = BlockSystem::new(2, 3);
        apply_boundary_conditions(&mesh, &mut system, 1, None);

        // Only the z rows became identity rows.
        assert_relative_eq!(system.matrix.entry(2, 2), 1.0);
        assert_relative_eq!(system.matrix.entry(5, 5), 1.0);
        assert_relative_eq!(system.matrix.entry(0, 0), 0.0);
        assert_relative_eq!(system.matrix.entry(1, 1), 0.0);
    }

    #[test]
    fn hold_fixed_box_pins_outside_components() {
        let mesh = mesh_with_markers();
        let mut system = BlockSystem::new(4, 2);
        // Populate a dummy interior row first so clearing is observable.
        let mut block = [0.0; 9];
        block[0] = 7.0;
        block[3] = 7.0;
        system.matrix.add_block(3, 3, &block);

        let hold = Aabb::new(Point3::new(-0.5, -0.5, -0.5), Point3::new(2.5, 0.5, 0.5));
        apply_boundary_conditions(&mesh, &mut system, 1, Some(&hold));

        // Point 3 at x = 3 lies outside the box: x row pinned.
        assert_relative_eq!(system.matrix.entry(6, 6), 1.0);
        assert_relative_eq!(system.sol[6], 0.0);
    }
}
