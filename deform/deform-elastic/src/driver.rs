//! The volumetric deformation driver.
//!
//! One call runs the configured number of nonlinear increments, each of
//! which re-assembles on the already-updated geometry:
//!
//! ```text
//! zero system -> assemble -> apply BCs -> sync rows -> solve
//!     -> update coordinates -> validity check -> next increment
//! ```
//!
//! Splitting a large prescribed deformation into small increments keeps
//! each elastic solve in the small-strain regime. Numerical degeneracy
//! (negative element measures) and solver non-convergence are logged and
//! carried in the outcome; the driver always runs to completion.

use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use deform_comm::Communicator;
use deform_types::{Aabb, DeformMesh};

use crate::assemble::{assemble_stiffness, StiffnessPolicy};
use crate::boundary::apply_boundary_conditions;
use crate::error::{ElasticError, ElasticResult};
use crate::measure::{check_mesh, EPS};
use crate::solver::LinearSolver;
use crate::system::BlockSystem;

/// Configuration of one volumetric deformation pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeformConfig {
    /// Number of nonlinear increments the prescribed deformation is split
    /// into.
    pub nonlinear_increments: usize,
    /// Iteration cap of the linear solver.
    pub linear_iterations: usize,
    /// The solver tolerance is `scale * tolerance_factor`, with `scale`
    /// the minimum element measure (or minimum edge length).
    pub tolerance_factor: f64,
    /// Stiffness policy for the assembler.
    pub stiffness: StiffnessPolicy,
    /// Optional hold-fixed region: points outside it are pinned.
    pub hold_fixed: Option<Aabb>,
}

impl Default for DeformConfig {
    fn default() -> Self {
        Self {
            nonlinear_increments: 1,
            linear_iterations: 500,
            tolerance_factor: 1e-6,
            stiffness: StiffnessPolicy::InverseVolume,
            hold_fixed: None,
        }
    }
}

impl DeformConfig {
    /// Set the number of nonlinear increments.
    #[must_use]
    pub const fn with_increments(mut self, increments: usize) -> Self {
        self.nonlinear_increments = increments;
        self
    }

    /// Set the stiffness policy.
    #[must_use]
    pub const fn with_stiffness(mut self, stiffness: StiffnessPolicy) -> Self {
        self.stiffness = stiffness;
        self
    }
}

/// Per-increment solve statistics.
#[derive(Debug, Clone, Copy)]
pub struct IncrementStats {
    /// Linear iterations spent.
    pub linear_iterations: usize,
    /// Final linear residual.
    pub residual: f64,
    /// Whether the linear solve converged.
    pub converged: bool,
    /// Minimum element measure after the coordinate update.
    pub min_measure: f64,
    /// Degenerate elements after the coordinate update.
    pub invalid: u64,
}

/// Result of a full deformation pass.
#[derive(Debug, Clone)]
pub struct DeformOutcome {
    /// Final global minimum element measure (the mesh quality metric).
    pub min_measure: f64,
    /// Degenerate elements in the final mesh.
    pub invalid_elements: u64,
    /// Statistics per nonlinear increment.
    pub increments: Vec<IncrementStats>,
}

/// Deform the mesh interior to follow the prescribed boundary variations.
///
/// The caller may reject the resulting mesh based on the reported minimum
/// measure; a degenerate result is not an error here.
///
/// # Errors
///
/// Returns [`ElasticError::EmptyMesh`] when the mesh has no points or no
/// elements.
pub fn deform_volume(
    mesh: &mut DeformMesh,
    config: &DeformConfig,
    solver: &dyn LinearSolver,
    comm: &dyn Communicator,
) -> ElasticResult<DeformOutcome> {
    if mesh.num_points() == 0 || mesh.num_elements() == 0 {
        return Err(ElasticError::EmptyMesh);
    }

    let dim = mesh.dim();
    let mut system = BlockSystem::new(mesh.num_points(), dim);
    let mut increments = Vec::with_capacity(config.nonlinear_increments);
    let mut quality = check_mesh(mesh, comm);

    for increment in 0..config.nonlinear_increments.max(1) {
        system.zero();

        let scale = assemble_stiffness(mesh, &mut system.matrix, config.stiffness, comm);
        let tolerance = scale * config.tolerance_factor;

        apply_boundary_conditions(
            mesh,
            &mut system,
            config.nonlinear_increments.max(1),
            config.hold_fixed.as_ref(),
        );

        // Ranks sharing a boundary point must agree exactly on its rows
        // before the solver runs.
        comm.sync_rows(system.sol.as_mut_slice());
        comm.sync_rows(system.rhs.as_mut_slice());

        let outcome = solver.solve(
            &system.matrix,
            &system.rhs,
            &mut system.sol,
            tolerance,
            config.linear_iterations,
        );
        if !outcome.converged && comm.is_primary() {
            warn!(
                increment,
                residual = outcome.residual,
                tolerance,
                "linear solver exhausted its iteration budget"
            );
        }

        update_coordinates(mesh, &system);
        quality = check_mesh(mesh, comm);

        if comm.is_primary() {
            info!(
                increment = increment + 1,
                total = config.nonlinear_increments.max(1),
                linear_iterations = outcome.iterations,
                min_measure = quality.min_measure,
                tolerance,
                "nonlinear deformation increment"
            );
        }

        increments.push(IncrementStats {
            linear_iterations: outcome.iterations,
            residual: outcome.residual,
            converged: outcome.converged,
            min_measure: quality.min_measure,
            invalid: quality.invalid,
        });
    }

    Ok(DeformOutcome {
        min_measure: quality.min_measure,
        invalid_elements: quality.invalid,
        increments,
    })
}

/// Add the solved displacements onto the mesh coordinates.
///
/// Coordinates whose magnitude falls below the squared numeric epsilon are
/// snapped to zero.
fn update_coordinates(mesh: &mut DeformMesh, system: &BlockSystem) {
    let dim = mesh.dim();
    for (point, mesh_point) in mesh.points.iter_mut().enumerate() {
        let mut coord = mesh_point.coord;
        for d in 0..dim {
            let mut new_coord = coord[d] + system.sol[point * dim + d];
            if new_coord.abs() < EPS * EPS {
                new_coord = 0.0;
            }
            coord[d] = new_coord;
        }
        mesh_point.coord = coord;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::GmresSolver;
    use deform_comm::SerialComm;

    #[test]
    fn empty_mesh_is_an_error() {
        let mut mesh = DeformMesh::new(2).unwrap();
        let err = deform_volume(
            &mut mesh,
            &DeformConfig::default(),
            &GmresSolver::default(),
            &SerialComm,
        )
        .unwrap_err();
        assert!(matches!(err, ElasticError::EmptyMesh));
    }
}
