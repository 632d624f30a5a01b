//! Distance to the nearest deforming surface.
//!
//! The wall-distance stiffness policy needs, for every mesh point, the
//! distance to the closest vertex of any deforming marker — against the
//! *global* boundary, not just the local partition. Each rank therefore
//! gathers every rank's deforming-boundary coordinates and runs a
//! brute-force nearest-neighbor search; the result is cached on the mesh
//! points.

use tracing::info;

use deform_comm::Communicator;
use deform_types::DeformMesh;

/// Compute and cache the wall distance of every mesh point.
///
/// Returns the number of (global) deforming-boundary vertices gathered.
/// With no deforming vertex anywhere, the distances are left untouched.
pub fn compute_wall_distances(mesh: &mut DeformMesh, comm: &dyn Communicator) -> usize {
    if comm.is_primary() {
        info!("computing distances to the nearest deforming surface");
    }

    // Flatten the local deforming-boundary coordinates (always three
    // components, so ranks of planar meshes stay aligned).
    let mut local = Vec::new();
    for marker in mesh.markers.iter().filter(|m| m.is_deforming()) {
        for vertex in &marker.vertices {
            let coord = mesh.coord(vertex.point);
            local.extend_from_slice(&[coord.x, coord.y, coord.z]);
        }
    }

    let global = comm.all_gather_f64(&local);
    let n_boundary = global.len() / 3;
    if n_boundary == 0 {
        return 0;
    }

    for point in &mut mesh.points {
        let c = point.coord;
        let mut best = f64::MAX;
        for wall in global.chunks_exact(3) {
            let d2 = (c.x - wall[0]).powi(2) + (c.y - wall[1]).powi(2) + (c.z - wall[2]).powi(2);
            if d2 < best {
                best = d2;
            }
        }
        point.wall_distance = Some(best.sqrt());
    }
    n_boundary
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deform_comm::SerialComm;
    use deform_types::{BoundaryVertex, Marker, MarkerKind, MeshPoint, Vector3};

    #[test]
    fn distances_measure_to_the_deforming_marker_only() {
        let mut mesh = DeformMesh::new(2).unwrap();
        let wall = mesh.push_point(MeshPoint::from_coords(0.0, 0.0, 0.0));
        let far = mesh.push_point(MeshPoint::from_coords(10.0, 0.0, 0.0));
        let interior = mesh.push_point(MeshPoint::from_coords(3.0, 4.0, 0.0));

        let mut moving = Marker::new("wall", MarkerKind::Deforming);
        moving.vertices.push(BoundaryVertex::new(wall, Vector3::y()));
        mesh.add_marker(moving).unwrap();
        let mut outer = Marker::new("outer", MarkerKind::FarField);
        outer.vertices.push(BoundaryVertex::new(far, Vector3::y()));
        mesh.add_marker(outer).unwrap();

        let gathered = compute_wall_distances(&mut mesh, &SerialComm);
        assert_eq!(gathered, 1);

        assert_relative_eq!(mesh.points[interior as usize].wall_distance.unwrap(), 5.0);
        assert_relative_eq!(mesh.points[wall as usize].wall_distance.unwrap(), 0.0);
        // The far-field vertex measures to the deforming wall, not itself.
        assert_relative_eq!(mesh.points[far as usize].wall_distance.unwrap(), 10.0);
    }

    #[test]
    fn no_deforming_boundary_leaves_distances_unset() {
        let mut mesh = DeformMesh::new(2).unwrap();
        mesh.push_point(MeshPoint::from_coords(0.0, 0.0, 0.0));
        assert_eq!(compute_wall_distances(&mut mesh, &SerialComm), 0);
        assert!(mesh.points[0].wall_distance.is_none());
    }
}
