//! Shape design variables and the deformation orchestrator.
//!
//! A design variable turns an amplitude into a boundary displacement field:
//! either by displacing FFD control points (with the lattice blending
//! spreading the edit smoothly over the cached surface points), or through
//! an analytic bump function applied directly to the deforming markers.
//!
//! [`apply_design_variables`] walks the FFD boxes level by level so that
//! edits to a coarse parent propagate onto the control points of the boxes
//! nested inside it.

use nalgebra::Vector3;
use rand::Rng;
use tracing::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use deform_comm::Communicator;
use deform_types::DeformMesh;

use crate::error::{FfdError, FfdResult};
use crate::inverse::InversionConfig;
use crate::lattice::FfdBox;
use crate::metadata::FfdCollection;
use crate::surface::{
    apply_surface, parametrize_child, parametrize_surface, update_child, update_surface_params,
};

/// Exponent of the sine bump (controls the bump width).
const BUMP_POWER: f64 = 3.0;

/// A single shape design variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DesignVariable {
    /// Displace one control point (or a whole lattice slab) of a box.
    ///
    /// A `None` index spans every node along that axis, so a single
    /// variable can move a full row, plane or sub-lattice.
    ControlPoint {
        /// Tag of the box to edit.
        box_tag: String,
        /// Lattice index per axis; `None` is a wildcard.
        index: [Option<usize>; 3],
        /// Displacement direction, scaled by the amplitude.
        direction: Vector3<f64>,
    },

    /// Planar variant: displace the `(i, j)` node on both out-of-plane
    /// layers of a one-cell-thick box.
    ControlPoint2d {
        /// Tag of the box to edit.
        box_tag: String,
        /// In-plane lattice index.
        index: [usize; 2],
        /// In-plane displacement direction, scaled by the amplitude.
        direction: Vector3<f64>,
    },

    /// Hicks-Henne sine bump on an airfoil-like deforming boundary.
    ///
    /// The bump `sin(pi * x^e)^3` with `e = log(0.5) / log(location)`
    /// peaks at `location` on the unit chord; it is added to the upper or
    /// lower surface, selected by the vertex normal.
    HicksHenne {
        /// Apply to the upper surface (`true`) or the lower one.
        upper: bool,
        /// Chordwise bump location in `(0, 1)`.
        location: f64,
    },
}

/// A design variable with its amplitude and reset semantics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DesignRequest {
    /// The design variable to apply.
    pub variable: DesignVariable,
    /// Amplitude multiplying the variable's direction or bump.
    pub amplitude: f64,
    /// Restore the original (undeformed) state before applying.
    pub reset: bool,
}

/// First-time setup: rebuild every box's lattice through the unit support
/// box and invert all deforming-boundary vertices into it.
///
/// Returns the maximum parametrization round-trip error over all boxes.
///
/// # Errors
///
/// Returns [`FfdError::MissingDefinition`] when the collection has no
/// boxes.
pub fn initialize_parametrization<R: Rng + ?Sized>(
    mesh: &DeformMesh,
    collection: &mut FfdCollection,
    inversion: &InversionConfig,
    comm: &dyn Communicator,
    rng: &mut R,
) -> FfdResult<f64> {
    collection.require_boxes()?;

    let mut unit = FfdBox::new("UNIT", 1, 1, 1)?;
    unit.set_unit_corners();
    unit.init_parallelepiped();

    let mut max_diff: f64 = 0.0;
    for ffd_box in &mut collection.boxes {
        unit.set_support_lattice(ffd_box);
        unit.apply_support_lattice(ffd_box)?;
        max_diff = max_diff.max(parametrize_surface(mesh, ffd_box, inversion, comm, rng));
    }
    Ok(max_diff)
}

/// Apply a set of design variables and write the resulting boundary
/// displacement field onto the mesh markers.
///
/// Bump variables act on the markers directly. Lattice variables are
/// applied walking the nesting levels from coarse to fine: per box, child
/// control points are parametrized in this box's frame, the box's own
/// surface parameters are refreshed when it is nested, the matching
/// variables are applied, the cached surface points are re-evaluated, and
/// finally parents are re-parametrized and children re-evaluated.
///
/// Returns the maximum surface displacement produced.
///
/// # Errors
///
/// Returns [`FfdError::UnknownTag`] if a lattice variable addresses a box
/// that is not in the collection, and [`FfdError::MissingDefinition`] if
/// lattice variables are given without any box.
pub fn apply_design_variables<R: Rng + ?Sized>(
    mesh: &mut DeformMesh,
    collection: &mut FfdCollection,
    requests: &[DesignRequest],
    inversion: &InversionConfig,
    comm: &dyn Communicator,
    rng: &mut R,
) -> FfdResult<f64> {
    let mut max_diff: f64 = 0.0;

    // Analytic bumps do not involve the lattice walk.
    for request in requests {
        if let DesignVariable::HicksHenne { upper, location } = request.variable {
            apply_hicks_henne(mesh, upper, location, request.amplitude, request.reset, comm);
        }
    }

    let lattice_requests: Vec<&DesignRequest> = requests
        .iter()
        .filter(|r| !matches!(r.variable, DesignVariable::HicksHenne { .. }))
        .collect();
    if lattice_requests.is_empty() {
        return Ok(max_diff);
    }
    collection.require_boxes()?;
    for request in &lattice_requests {
        let tag = match &request.variable {
            DesignVariable::ControlPoint { box_tag, .. }
            | DesignVariable::ControlPoint2d { box_tag, .. } => box_tag,
            DesignVariable::HicksHenne { .. } => continue,
        };
        if collection.find(tag).is_none() {
            return Err(FfdError::UnknownTag(tag.clone()));
        }
    }

    let levels = collection.n_level.max(1);
    for level in 0..levels {
        for box_idx in 0..collection.boxes.len() {
            if collection.boxes[box_idx].level() != level {
                continue;
            }

            // Child control points expressed in this box's frame.
            for child_idx in child_indices(collection, box_idx)? {
                let (parent, child) = pair_mut(&mut collection.boxes, box_idx, child_idx);
                parametrize_child(parent, child, inversion, rng)?;
            }

            // A nested box re-inverts its surface cache first: the parent
            // level has already displaced the boundary.
            if level > 0 {
                update_surface_params(mesh, &mut collection.boxes[box_idx], inversion, comm, rng);
            }

            let mut edited = false;
            for request in &lattice_requests {
                edited |= apply_lattice_variable(
                    &mut collection.boxes[box_idx],
                    request,
                )?;
            }

            if edited {
                max_diff = max_diff.max(apply_surface(
                    mesh,
                    &mut collection.boxes[box_idx],
                    comm,
                ));
            }

            // Reparametrize parents and push the new lattice onto children.
            for parent_idx in parent_indices(collection, box_idx)? {
                update_surface_params(mesh, &mut collection.boxes[parent_idx], inversion, comm, rng);
            }
            for child_idx in child_indices(collection, box_idx)? {
                let (parent, child) = pair_mut(&mut collection.boxes, box_idx, child_idx);
                update_child(parent, child)?;
            }
        }
    }

    info!(max_diff, "applied design variables");
    Ok(max_diff)
}

/// Apply one lattice variable to a box; returns whether the box matched.
fn apply_lattice_variable(ffd_box: &mut FfdBox, request: &DesignRequest) -> FfdResult<bool> {
    match &request.variable {
        DesignVariable::ControlPoint {
            box_tag,
            index,
            direction,
        } => {
            if ffd_box.tag() != box_tag.as_str() {
                return Ok(false);
            }
            if request.reset {
                ffd_box.reset_control_points();
            }
            let movement = direction * request.amplitude;
            let [lo, mo, no] = ffd_box.orders();
            let range = |axis: usize, fixed: Option<usize>| match fixed {
                Some(v) => v..v + 1,
                None => 0..[lo, mo, no][axis],
            };
            for i in range(0, index[0]) {
                for j in range(1, index[1]) {
                    for k in range(2, index[2]) {
                        ffd_box.move_control_point(i, j, k, &movement)?;
                    }
                }
            }
            Ok(true)
        }
        DesignVariable::ControlPoint2d {
            box_tag,
            index,
            direction,
        } => {
            if ffd_box.tag() != box_tag.as_str() {
                return Ok(false);
            }
            if request.reset {
                ffd_box.reset_control_points();
            }
            let mut movement = direction * request.amplitude;
            movement.z = 0.0;
            // Both out-of-plane layers of the one-cell-thick box.
            ffd_box.move_control_point(index[0], index[1], 0, &movement)?;
            ffd_box.move_control_point(index[0], index[1], 1, &movement)?;
            Ok(true)
        }
        DesignVariable::HicksHenne { .. } => Ok(false),
    }
}

/// Add a Hicks-Henne sine bump to the deforming markers.
///
/// The chord frame is derived from the marker geometry itself: the
/// trailing point is the vertex of largest `x`, the leading point the
/// vertex farthest from it (both reduced over all ranks), and the angle of
/// attack between them is removed before the bump is evaluated on the unit
/// chord.
pub fn apply_hicks_henne(
    mesh: &mut DeformMesh,
    upper: bool,
    location: f64,
    amplitude: f64,
    reset: bool,
    comm: &dyn Communicator,
) {
    if reset {
        mesh.reset_var_coords();
    }

    // Trailing point: the deforming vertex with maximum x, over all ranks.
    let mut trailing = [f64::NEG_INFINITY, 0.0];
    for marker in mesh.markers.iter().filter(|m| m.is_deforming()) {
        for vertex in &marker.vertices {
            let c = mesh.coord(vertex.point);
            if c.x > trailing[0] {
                trailing = [c.x, c.y];
            }
        }
    }
    let gathered = comm.all_gather_f64(&trailing);
    for pair in gathered.chunks_exact(2) {
        if pair[0] > trailing[0] {
            trailing = [pair[0], pair[1]];
        }
    }
    if trailing[0] == f64::NEG_INFINITY {
        return;
    }

    // Leading point: the deforming vertex farthest from the trailing point.
    let mut chord = 0.0;
    let mut leading = trailing;
    for marker in mesh.markers.iter().filter(|m| m.is_deforming()) {
        for vertex in &marker.vertices {
            let c = mesh.coord(vertex.point);
            let distance = ((c.x - trailing[0]).powi(2) + (c.y - trailing[1]).powi(2)).sqrt();
            if distance > chord {
                chord = distance;
                leading = [c.x, c.y];
            }
        }
    }
    let gathered = comm.all_gather_f64(&leading);
    for pair in gathered.chunks_exact(2) {
        let distance =
            ((pair[0] - trailing[0]).powi(2) + (pair[1] - trailing[1]).powi(2)).sqrt();
        if distance > chord {
            chord = distance;
            leading = [pair[0], pair[1]];
        }
    }

    let aoa = ((leading[1] - trailing[1]) / (trailing[0] - leading[0])).atan();
    let (sin_a, cos_a) = aoa.sin_cos();
    let exponent = 0.5_f64.log10() / location.log10();

    for marker in &mut mesh.markers {
        if !marker.is_deforming() {
            continue;
        }
        for vertex in &mut marker.vertices {
            let c = mesh.points[vertex.point as usize].coord;

            // Rotate into the zero-incidence chord frame.
            let x = (c.x * cos_a - c.y * sin_a).max(0.0);
            let normal_y = vertex.normal.y * cos_a + vertex.normal.x * sin_a;

            let bump = (std::f64::consts::PI * x.powf(exponent))
                .sin()
                .powf(BUMP_POWER);
            let mut dy = 0.0;
            if upper && normal_y > 0.0 {
                dy = amplitude * bump;
            }
            if !upper && normal_y < 0.0 {
                dy = -amplitude * bump;
            }

            // Rotate the variation back into mesh coordinates.
            vertex.var_coord.x += dy * sin_a;
            vertex.var_coord.y += dy * cos_a;
        }
    }
}

fn child_indices(collection: &FfdCollection, box_idx: usize) -> FfdResult<Vec<usize>> {
    collection.boxes[box_idx]
        .children()
        .iter()
        .map(|tag| {
            collection
                .find(tag)
                .ok_or_else(|| FfdError::UnknownTag(tag.clone()))
        })
        .collect()
}

fn parent_indices(collection: &FfdCollection, box_idx: usize) -> FfdResult<Vec<usize>> {
    collection.boxes[box_idx]
        .parents()
        .iter()
        .map(|tag| {
            collection
                .find(tag)
                .ok_or_else(|| FfdError::UnknownTag(tag.clone()))
        })
        .collect()
}

/// Disjoint mutable borrows of two boxes.
fn pair_mut(boxes: &mut [FfdBox], a: usize, b: usize) -> (&mut FfdBox, &mut FfdBox) {
    assert_ne!(a, b, "a box cannot be its own parent or child");
    if a < b {
        let (lo, hi) = boxes.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = boxes.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}
