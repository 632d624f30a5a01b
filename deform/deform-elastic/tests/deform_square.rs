//! End-to-end deformation of a small quadrilateral mesh.

use approx::assert_relative_eq;
use deform_comm::SerialComm;
use deform_elastic::{deform_volume, DeformConfig, GmresSolver, StiffnessPolicy};
use deform_types::{
    BoundaryVertex, DeformMesh, ElementKind, Marker, MarkerKind, MeshPoint, Vector3,
};

/// A 3x3-node unit square of four quadrilaterals. The left edge is the
/// deforming marker (prescribed x-displacement 0.1); the rest of the
/// boundary is a pinned far field. Point 4 is the only interior point.
fn square_mesh() -> DeformMesh {
    let mut mesh = DeformMesh::new(2).unwrap();
    for j in 0..3 {
        for i in 0..3 {
            mesh.push_point(MeshPoint::from_coords(
                f64::from(i) * 0.5,
                f64::from(j) * 0.5,
                0.0,
            ));
        }
    }
    for j in 0..2_u32 {
        for i in 0..2_u32 {
            let p = |ii: u32, jj: u32| jj * 3 + ii;
            mesh.add_element(
                ElementKind::Quadrilateral,
                &[p(i, j), p(i + 1, j), p(i + 1, j + 1), p(i, j + 1)],
            )
            .unwrap();
        }
    }

    let mut outer = Marker::new("outer", MarkerKind::FarField);
    for point in [0, 1, 2, 5, 8, 7, 6] {
        outer.vertices.push(BoundaryVertex::new(point, Vector3::y()));
    }
    mesh.add_marker(outer).unwrap();

    let mut wall = Marker::new("wall", MarkerKind::Deforming);
    for point in [0, 3, 6] {
        let mut vertex = BoundaryVertex::new(point, Vector3::x());
        vertex.var_coord = Vector3::new(0.1, 0.0, 0.0);
        wall.vertices.push(vertex);
    }
    mesh.add_marker(wall).unwrap();
    mesh
}

#[test]
fn dirichlet_values_are_imposed_exactly() {
    let mut mesh = square_mesh();
    let outcome = deform_volume(
        &mut mesh,
        &DeformConfig::default(),
        &GmresSolver::default(),
        &SerialComm,
    )
    .unwrap();

    assert_eq!(outcome.increments.len(), 1);
    assert!(outcome.increments[0].converged);
    assert_eq!(outcome.invalid_elements, 0);

    // Deforming marker: moved by exactly the prescribed variation,
    // including the corner points shared with the far field.
    for point in [0_u32, 3, 6] {
        let coord = mesh.coord(point);
        assert_relative_eq!(coord.x, 0.1, epsilon = 1e-14);
    }
    // Pinned far-field points: exactly untouched.
    assert_relative_eq!(mesh.coord(1).x, 0.5, epsilon = 1e-14);
    assert_relative_eq!(mesh.coord(1).y, 0.0, epsilon = 1e-14);
    assert_relative_eq!(mesh.coord(5).x, 1.0, epsilon = 1e-14);

    // The interior point follows the boundary partway.
    let interior = mesh.coord(4);
    assert!(
        interior.x > 0.5 && interior.x < 0.6,
        "interior x = {}",
        interior.x
    );
    assert_relative_eq!(interior.y, 0.5, epsilon = 1e-6);
}

#[test]
fn increments_accumulate_to_the_full_variation() {
    let mut reference = square_mesh();
    deform_volume(
        &mut reference,
        &DeformConfig::default(),
        &GmresSolver::default(),
        &SerialComm,
    )
    .unwrap();

    let mut mesh = square_mesh();
    let outcome = deform_volume(
        &mut mesh,
        &DeformConfig::default().with_increments(2),
        &GmresSolver::default(),
        &SerialComm,
    )
    .unwrap();
    assert_eq!(outcome.increments.len(), 2);

    // The deforming edge reaches the full prescribed displacement.
    for point in [0_u32, 3, 6] {
        assert_relative_eq!(mesh.coord(point).x, 0.1, epsilon = 1e-12);
    }
    // And the incremental path lands near the single-shot result.
    assert_relative_eq!(mesh.coord(4).x, reference.coord(4).x, epsilon = 1e-3);
}

#[test]
fn wall_distance_stiffness_also_converges() {
    let mut mesh = square_mesh();
    // The minimum-edge scale needs edges.
    for j in 0..3_u32 {
        for i in 0..2_u32 {
            mesh.add_edge(j * 3 + i, j * 3 + i + 1);
            mesh.add_edge(i * 3 + j, (i + 1) * 3 + j);
        }
    }

    let config = DeformConfig::default().with_stiffness(StiffnessPolicy::WallDistance);
    let outcome = deform_volume(&mut mesh, &config, &GmresSolver::default(), &SerialComm).unwrap();
    assert!(outcome.increments[0].converged);
    assert_eq!(outcome.invalid_elements, 0);
    assert!(mesh.points[4].wall_distance.is_some());
    assert_relative_eq!(mesh.coord(3).x, 0.1, epsilon = 1e-12);
}
