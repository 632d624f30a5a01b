//! Per-element elasticity stiffness and global assembly.
//!
//! Each element contributes `K_e = sum_g w_g * B^T D B * det J_g` over its
//! Gauss rule, where `B` maps nodal displacements to the independent
//! strain components (3 in plane strain, 6 in the volume) and `D` is the
//! isotropic elasticity tensor built from the Lamé-like constants of the
//! configured stiffness policy. The node-pair sub-blocks of `K_e` are
//! scattered additively into the global block matrix.
//!
//! Inverse-volume and wall-distance stiffening use `mu = E` and
//! `lambda = -E`, which relaxes the resistance to rigid element rotation
//! (Dwight, "Robust Mesh Deformation using the Linear Elasticity
//! Equations").

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use deform_comm::Communicator;
use deform_types::{DeformMesh, ElementKind};

use crate::distance::compute_wall_distances;
use crate::measure::check_mesh;
use crate::quadrature::rule;
use crate::shape::{shape_functions, ShapeDerivatives, MAX_NODES};
use crate::system::BlockMatrix;

/// Maximum scalar DOFs per element (8 nodes x 3 dimensions).
pub const MAX_DOF: usize = 24;

/// Number of independent strain components per dimension.
const STRAINS_2D: usize = 3;
const STRAINS_3D: usize = 6;

/// How the material constants of each element are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StiffnessPolicy {
    /// Stiffness inversely proportional to the element measure: small
    /// cells resist deformation the most.
    InverseVolume,
    /// Stiffness inversely proportional to the element's average distance
    /// to the nearest deforming wall.
    WallDistance,
    /// A conventional constant material.
    Constant {
        /// Elasticity modulus E.
        elasticity_modulus: f64,
        /// Poisson ratio nu.
        poisson_ratio: f64,
    },
}

impl Default for StiffnessPolicy {
    fn default() -> Self {
        Self::InverseVolume
    }
}

/// Assemble the global stiffness matrix for one increment.
///
/// The global scale factor is computed once: the minimum element measure,
/// or (for [`StiffnessPolicy::WallDistance`]) the minimum edge length
/// after filling the wall-distance cache. The scale actually used is
/// returned; the driver derives the solver tolerance from it.
pub fn assemble_stiffness(
    mesh: &mut DeformMesh,
    matrix: &mut BlockMatrix,
    policy: StiffnessPolicy,
    comm: &dyn Communicator,
) -> f64 {
    let quality = check_mesh(mesh, comm);
    let mut scale = quality.min_measure;

    if policy == StiffnessPolicy::WallDistance {
        compute_wall_distances(mesh, comm);
        let min_edge = mesh.min_edge_length().unwrap_or(f64::MAX);
        scale = comm.min_f64(min_edge);
    }

    let mut stiffness = [[0.0_f64; MAX_DOF]; MAX_DOF];
    for element in &mesh.elements {
        element_stiffness(mesh, element.kind(), element.nodes(), policy, scale, &mut stiffness);
        scatter(matrix, element.nodes(), &stiffness);
    }

    debug!(
        elements = mesh.num_elements(),
        scale, "assembled stiffness matrix"
    );
    scale
}

/// Compute one element's stiffness into `out` (only the leading
/// `n_nodes * dim` square is written).
fn element_stiffness(
    mesh: &DeformMesh,
    kind: ElementKind,
    nodes: &[u32],
    policy: StiffnessPolicy,
    scale: f64,
    out: &mut [[f64; MAX_DOF]; MAX_DOF],
) {
    let dim = mesh.dim();
    let n_nodes = kind.node_count();
    let n_dof = n_nodes * dim;
    let n_strain = if dim == 2 { STRAINS_2D } else { STRAINS_3D };

    let mut corners = [[0.0; 3]; MAX_NODES];
    for (slot, &node) in corners.iter_mut().zip(nodes) {
        let coord = mesh.coord(node);
        *slot = [coord.x, coord.y, coord.z];
    }

    for row in out.iter_mut().take(n_dof) {
        row[..n_dof].fill(0.0);
    }

    let mut shapes = ShapeDerivatives::default();
    for gauss in rule(kind) {
        let det = shape_functions(kind, gauss.xi, gauss.eta, gauss.mu, &corners, &mut shapes);

        // Strain-displacement matrix B.
        let mut b = [[0.0_f64; MAX_DOF]; STRAINS_3D];
        for node in 0..n_nodes {
            let g = shapes.grad[node];
            let col = node * dim;
            if dim == 2 {
                b[0][col] = g[0];
                b[1][col + 1] = g[1];
                b[2][col] = g[1];
                b[2][col + 1] = g[0];
            } else {
                b[0][col] = g[0];
                b[1][col + 1] = g[1];
                b[2][col + 2] = g[2];
                b[3][col] = g[1];
                b[3][col + 1] = g[0];
                b[4][col + 1] = g[2];
                b[4][col + 2] = g[1];
                b[5][col] = g[2];
                b[5][col + 2] = g[0];
            }
        }

        let (mu, lambda) = material_constants(mesh, nodes, policy, scale, gauss.weight, det);

        // Isotropic elasticity tensor D (plane strain in 2-D).
        let mut d = [[0.0_f64; STRAINS_3D]; STRAINS_3D];
        for i in 0..dim {
            for j in 0..dim {
                d[i][j] = lambda;
            }
            d[i][i] = lambda + 2.0 * mu;
        }
        for i in dim..n_strain {
            d[i][i] = mu;
        }

        // K_e += w * (B^T D) B * det.
        let mut bt_d = [[0.0_f64; STRAINS_3D]; MAX_DOF];
        for i in 0..n_dof {
            for j in 0..n_strain {
                let mut sum = 0.0;
                for k in 0..n_strain {
                    sum += b[k][i] * d[k][j];
                }
                bt_d[i][j] = sum;
            }
        }
        for i in 0..n_dof {
            for j in 0..n_dof {
                let mut sum = 0.0;
                for k in 0..n_strain {
                    sum += bt_d[i][k] * b[k][j];
                }
                out[i][j] += gauss.weight * sum * det;
            }
        }
    }
}

/// Lamé-like constants at one Gauss point under the configured policy.
fn material_constants(
    mesh: &DeformMesh,
    nodes: &[u32],
    policy: StiffnessPolicy,
    scale: f64,
    weight: f64,
    det: f64,
) -> (f64, f64) {
    match policy {
        StiffnessPolicy::InverseVolume => {
            let e = scale / (weight * det);
            (e, -e)
        }
        StiffnessPolicy::WallDistance => {
            #[allow(clippy::cast_precision_loss)]
            let avg = nodes
                .iter()
                .map(|&n| mesh.points[n as usize].wall_distance.unwrap_or(f64::MAX))
                .sum::<f64>()
                / nodes.len() as f64;
            let e = scale / (weight * avg);
            (e, -e)
        }
        StiffnessPolicy::Constant {
            elasticity_modulus: e,
            poisson_ratio: nu,
        } => {
            let mu = e / (2.0 * (1.0 + nu));
            let lambda = nu * e / ((1.0 + nu) * (1.0 - 2.0 * nu));
            (mu, lambda)
        }
    }
}

/// Scatter an element stiffness into the global block matrix.
fn scatter(matrix: &mut BlockMatrix, nodes: &[u32], stiffness: &[[f64; MAX_DOF]; MAX_DOF]) {
    let dim = matrix.dim();
    for (i, &row_point) in nodes.iter().enumerate() {
        for (j, &col_point) in nodes.iter().enumerate() {
            let mut block = [0.0_f64; 9];
            for r in 0..dim {
                for c in 0..dim {
                    block[r * dim + c] = stiffness[i * dim + r][j * dim + c];
                }
            }
            matrix.add_block(row_point, col_point, &block);
        }
    }
}
