//! Surface-point parametrization and re-evaluation.
//!
//! The first time a box is defined, every deforming-boundary vertex inside
//! it is inverse-mapped to lattice parameters and cached on the box. After
//! control-point edits, the cached parameters are pushed back through the
//! forward map and the difference becomes the vertex's prescribed variation
//! (`var_coord`), which the elastic solver consumes as a Dirichlet value.
//!
//! Nested boxes propagate edits through their control points: a child box's
//! lattice is itself parametrized in the parent's frame, re-evaluated
//! whenever the parent deforms.

use nalgebra::Point3;
use rand::Rng;
use tracing::{debug, info, warn};

use deform_comm::Communicator;
use deform_types::DeformMesh;

use crate::error::FfdResult;
use crate::inverse::{invert, InversionConfig};
use crate::lattice::{FfdBox, SurfacePoint};

/// Snap threshold for coordinate variations.
const EPS: f64 = 1e-16;

/// Invert every deforming-boundary vertex inside the box and cache the
/// resulting parameters.
///
/// The inversion runs against the degree-(1,1,1) reduction of the box,
/// which is exact for parallelepiped lattices and keeps the Newton
/// objective well conditioned. Vertices whose parameters land outside the
/// unit cube (within tolerance) are logged and excluded from the box's
/// support set; this is not an error for the overall deformation.
///
/// Returns the globally reduced maximum round-trip error.
pub fn parametrize_surface<R: Rng + ?Sized>(
    mesh: &DeformMesh,
    ffd_box: &mut FfdBox,
    config: &InversionConfig,
    comm: &dyn Communicator,
    rng: &mut R,
) -> f64 {
    let reduced = ffd_box.reduced();
    let mut guess = Point3::new(0.5, 0.5, 0.5);
    let mut max_diff: f64 = 0.0;

    ffd_box.surface_points.clear();
    for (marker_idx, marker) in mesh.markers.iter().enumerate() {
        if !marker.is_deforming() {
            continue;
        }
        for (vertex_idx, vertex) in marker.vertices.iter().enumerate() {
            let cart = mesh.coord(vertex.point);
            if !ffd_box.contains(&cart) {
                continue;
            }

            let outcome = invert(&reduced, &cart, &guess, config, rng);
            if !FfdBox::param_in_range(&outcome.param) {
                warn!(
                    point = vertex.point,
                    param = ?outcome.param,
                    box_tag = ffd_box.tag(),
                    "surface point inverts outside the unit cube; excluded"
                );
                continue;
            }

            let diff = (reduced.eval(&outcome.param) - cart).norm();
            max_diff = max_diff.max(diff);
            guess = outcome.param;

            ffd_box.surface_points.push(SurfacePoint {
                marker: marker_idx,
                vertex: vertex_idx,
                point: vertex.point,
                param: outcome.param,
                cart,
            });
        }
    }

    let max_diff = comm.max_f64(max_diff);
    info!(
        box_tag = ffd_box.tag(),
        surface_points = ffd_box.surface_points.len(),
        max_diff,
        "computed parametric coordinates"
    );
    max_diff
}

/// Re-invert the cached surface points after their cartesian coordinates
/// moved (current mesh coordinate plus prescribed variation).
///
/// Each inversion is warm-started from the cached parameters. Returns the
/// globally reduced maximum round-trip error.
pub fn update_surface_params<R: Rng + ?Sized>(
    mesh: &DeformMesh,
    ffd_box: &mut FfdBox,
    config: &InversionConfig,
    comm: &dyn Communicator,
    rng: &mut R,
) -> f64 {
    let mut max_diff: f64 = 0.0;

    for idx in 0..ffd_box.surface_points.len() {
        let cached = ffd_box.surface_points[idx].clone();
        let vertex = &mesh.markers[cached.marker].vertices[cached.vertex];
        let target = mesh.coord(cached.point) + vertex.var_coord;

        let outcome = invert(ffd_box, &target, &cached.param, config, rng);
        let diff = (ffd_box.eval(&outcome.param) - target).norm();
        max_diff = max_diff.max(diff);

        let entry = &mut ffd_box.surface_points[idx];
        entry.param = outcome.param;
        entry.cart = target;
    }

    let max_diff = comm.max_f64(max_diff);
    debug!(
        box_tag = ffd_box.tag(),
        max_diff, "updated parametric coordinates"
    );
    max_diff
}

/// Re-evaluate the cached surface points with the current control points
/// and write the prescribed variations onto the mesh markers.
///
/// Variation components below the numeric snap threshold are zeroed; the
/// out-of-plane component of a planar mesh is always zero. Returns the
/// globally reduced maximum displacement.
pub fn apply_surface(
    mesh: &mut DeformMesh,
    ffd_box: &mut FfdBox,
    comm: &dyn Communicator,
) -> f64 {
    let mut max_diff: f64 = 0.0;
    let dim = mesh.dim();

    for idx in 0..ffd_box.surface_points.len() {
        let cached = ffd_box.surface_points[idx].clone();
        let new_cart = ffd_box.eval(&cached.param);
        let old_cart = mesh.coord(cached.point);

        let mut variation = new_cart - old_cart;
        for d in 0..3 {
            if variation[d].abs() <= EPS || d >= dim {
                variation[d] = 0.0;
            }
        }
        max_diff = max_diff.max(variation.norm());

        mesh.markers[cached.marker].vertices[cached.vertex].var_coord = variation;
        ffd_box.surface_points[idx].cart = new_cart;
    }

    let max_diff = comm.max_f64(max_diff);
    debug!(
        box_tag = ffd_box.tag(),
        max_diff, "updated cartesian coordinates"
    );
    max_diff
}

/// Parametrize a child box's control points in the parent's frame.
///
/// # Errors
///
/// Propagates lattice-index errors (which indicate mismatched boxes).
pub fn parametrize_child<R: Rng + ?Sized>(
    parent: &FfdBox,
    child: &mut FfdBox,
    config: &InversionConfig,
    rng: &mut R,
) -> FfdResult<()> {
    let [lo, mo, no] = child.orders();
    let mut guess = Point3::new(0.5, 0.5, 0.5);
    for k in 0..no {
        for j in 0..mo {
            for i in 0..lo {
                let cart = child.control_point(i, j, k);
                let outcome = invert(parent, &cart, &guess, config, rng);
                guess = outcome.param;
                child.set_param_control_point(i, j, k, outcome.param)?;
            }
        }
    }
    debug!(
        parent = parent.tag(),
        child = child.tag(),
        "parametrized child control points"
    );
    Ok(())
}

/// Re-evaluate a child box's control points through the (deformed) parent.
///
/// Parameters are clipped to the unit cube before evaluation, and the
/// child's new lattice is snapshotted as its original configuration.
///
/// # Errors
///
/// Propagates lattice-index errors (which indicate mismatched boxes).
pub fn update_child(parent: &FfdBox, child: &mut FfdBox) -> FfdResult<()> {
    let [lo, mo, no] = child.orders();
    for k in 0..no {
        for j in 0..mo {
            for i in 0..lo {
                let mut param = child.param_control_point(i, j, k);
                for d in 0..3 {
                    param[d] = param[d].clamp(0.0, 1.0);
                }
                let cart = parent.eval(&param);
                child.set_control_point(i, j, k, cart)?;
            }
        }
    }
    child.snapshot_control_points();
    debug!(
        parent = parent.tag(),
        child = child.tag(),
        "updated child control points"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deform_comm::SerialComm;
    use deform_types::{BoundaryVertex, Marker, MarkerKind, MeshPoint, Vector3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_box(l: usize, m: usize, n: usize) -> FfdBox {
        let mut lattice = FfdBox::new("BOX", l, m, n).unwrap();
        lattice.set_unit_corners();
        lattice.init_parallelepiped();
        lattice
    }

    /// A 3-D mesh with a single deforming marker of three points inside the
    /// unit cube and one outside it.
    fn marked_mesh() -> DeformMesh {
        let mut mesh = DeformMesh::new(3).unwrap();
        let inside = [
            [0.25, 0.5, 0.5],
            [0.5, 0.25, 0.5],
            [0.75, 0.5, 0.25],
        ];
        let mut marker = Marker::new("wall", MarkerKind::Deforming);
        for coords in inside {
            let p = mesh.push_point(MeshPoint::from_coords(coords[0], coords[1], coords[2]));
            marker.vertices.push(BoundaryVertex::new(p, Vector3::y()));
        }
        let outside = mesh.push_point(MeshPoint::from_coords(2.0, 2.0, 2.0));
        marker.vertices.push(BoundaryVertex::new(outside, Vector3::y()));
        mesh.add_marker(marker).unwrap();
        mesh
    }

    #[test]
    fn parametrize_caches_only_points_inside_the_box() {
        let mesh = marked_mesh();
        let mut lattice = unit_box(2, 2, 2);
        let mut rng = StdRng::seed_from_u64(3);

        let max_diff = parametrize_surface(
            &mesh,
            &mut lattice,
            &InversionConfig::default(),
            &SerialComm,
            &mut rng,
        );
        assert_eq!(lattice.surface_points.len(), 3);
        assert!(max_diff < 1e-6);
        assert_relative_eq!(lattice.surface_points[0].param.x, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn apply_surface_writes_variations_after_an_edit() {
        let mut mesh = marked_mesh();
        let mut lattice = unit_box(2, 2, 2);
        let mut rng = StdRng::seed_from_u64(3);
        parametrize_surface(
            &mesh,
            &mut lattice,
            &InversionConfig::default(),
            &SerialComm,
            &mut rng,
        );

        // Undeformed lattice: variations stay at inversion roundoff.
        let max_diff = apply_surface(&mut mesh, &mut lattice, &SerialComm);
        assert_relative_eq!(max_diff, 0.0, epsilon = 1e-8);

        lattice
            .move_control_point(1, 1, 1, &Vector3::new(0.0, 0.0, 0.3))
            .unwrap();
        let max_diff = apply_surface(&mut mesh, &mut lattice, &SerialComm);
        assert!(max_diff > 0.0);

        let var = mesh.markers[0].vertices[0].var_coord;
        assert!(var.z > 0.0, "interior surface point should move up");
    }

    #[test]
    fn child_round_trips_through_an_undeformed_parent() {
        let parent = unit_box(2, 2, 2);
        let mut child = FfdBox::new("CHILD", 1, 1, 1).unwrap();
        // A nested box occupying the middle of the parent.
        child.set_corner(0, Point3::new(0.25, 0.25, 0.25));
        child.set_corner(1, Point3::new(0.75, 0.25, 0.25));
        child.set_corner(2, Point3::new(0.75, 0.75, 0.25));
        child.set_corner(3, Point3::new(0.25, 0.75, 0.25));
        child.set_corner(4, Point3::new(0.25, 0.25, 0.75));
        child.set_corner(5, Point3::new(0.75, 0.25, 0.75));
        child.set_corner(6, Point3::new(0.75, 0.75, 0.75));
        child.set_corner(7, Point3::new(0.25, 0.75, 0.75));
        child.init_parallelepiped();
        let before: Vec<_> = child.control_points().to_vec();

        let mut rng = StdRng::seed_from_u64(11);
        parametrize_child(&parent, &mut child, &InversionConfig::default(), &mut rng).unwrap();
        update_child(&parent, &mut child).unwrap();

        for (got, want) in child.control_points().iter().zip(&before) {
            assert!((got - want).norm() < 1e-6);
        }
    }
}
