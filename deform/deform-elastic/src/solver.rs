//! Krylov solve interface for the elastic system.
//!
//! The deformation driver delegates the linear solve through the
//! [`LinearSolver`] trait: it hands over the assembled matrix, the
//! right-hand side, an initial guess, an absolute tolerance and an
//! iteration cap, and receives the iteration count and final residual.
//! Non-convergence is reported in the outcome, never an error: the driver
//! proceeds with the last iterate.
//!
//! [`GmresSolver`] is the provided implementation: restarted GMRES with
//! Jacobi (diagonal) preconditioning. Because the boundary-condition
//! passes reduce Dirichlet rows to identity rows with matching right-hand
//! side and initial guess, those entries have zero initial residual, every
//! Krylov basis vector is zero there, and the prescribed values pass
//! through the iteration bit-for-bit.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::system::BlockMatrix;

/// Result of one linear solve.
#[derive(Debug, Clone, Copy)]
pub struct SolveOutcome {
    /// Iterations performed.
    pub iterations: usize,
    /// Final preconditioned residual norm.
    pub residual: f64,
    /// Whether the residual dropped below the tolerance.
    pub converged: bool,
}

/// A preconditioned Krylov solver for the block system.
pub trait LinearSolver {
    /// Solve `A * x = b` starting from the initial guess in `x`.
    ///
    /// `tol` is an absolute tolerance on the (preconditioned) residual
    /// norm; `max_iter` caps the total number of Krylov iterations.
    fn solve(
        &self,
        matrix: &BlockMatrix,
        rhs: &DVector<f64>,
        x: &mut DVector<f64>,
        tol: f64,
        max_iter: usize,
    ) -> SolveOutcome;
}

/// Restarted GMRES with Jacobi preconditioning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GmresSolver {
    /// Krylov subspace size per restart cycle.
    pub restart: usize,
}

impl Default for GmresSolver {
    fn default() -> Self {
        Self { restart: 50 }
    }
}

impl GmresSolver {
    /// Create a solver with the given restart length.
    #[must_use]
    pub const fn new(restart: usize) -> Self {
        Self { restart }
    }
}

impl LinearSolver for GmresSolver {
    #[allow(clippy::many_single_char_names)]
    fn solve(
        &self,
        matrix: &BlockMatrix,
        rhs: &DVector<f64>,
        x: &mut DVector<f64>,
        tol: f64,
        max_iter: usize,
    ) -> SolveOutcome {
        let n = matrix.n_dofs();
        let restart = self.restart.max(1).min(max_iter.max(1));
        let inv_diag = matrix.diagonal().map(|d| 1.0 / d);

        let precond_residual = |x: &DVector<f64>| -> DVector<f64> {
            let mut ax = DVector::zeros(n);
            matrix.matvec(x, &mut ax);
            (rhs - ax).component_mul(&inv_diag)
        };

        let mut iterations = 0;
        let mut z = precond_residual(x);
        let mut beta = z.norm();
        if beta <= tol {
            return SolveOutcome {
                iterations: 0,
                residual: beta,
                converged: true,
            };
        }

        while iterations < max_iter {
            // Arnoldi with Givens-rotated Hessenberg (one restart cycle).
            let mut basis: Vec<DVector<f64>> = Vec::with_capacity(restart + 1);
            basis.push(&z / beta);
            let mut hess = DMatrix::<f64>::zeros(restart + 1, restart);
            let mut g = DVector::<f64>::zeros(restart + 1);
            g[0] = beta;
            let mut cs = vec![0.0_f64; restart];
            let mut sn = vec![0.0_f64; restart];

            let mut k_used = 0;
            let mut breakdown = false;
            for k in 0..restart {
                let mut w = DVector::zeros(n);
                matrix.matvec(&basis[k], &mut w);
                w.component_mul_assign(&inv_diag);

                for i in 0..=k {
                    let h = w.dot(&basis[i]);
                    hess[(i, k)] = h;
                    w.axpy(-h, &basis[i], 1.0);
                }
                let h_next = w.norm();
                hess[(k + 1, k)] = h_next;

                // Apply the accumulated Givens rotations to the new column.
                for i in 0..k {
                    let temp = cs[i] * hess[(i, k)] + sn[i] * hess[(i + 1, k)];
                    hess[(i + 1, k)] = -sn[i] * hess[(i, k)] + cs[i] * hess[(i + 1, k)];
                    hess[(i, k)] = temp;
                }
                let denom = hess[(k, k)].hypot(hess[(k + 1, k)]);
                if denom > 0.0 {
                    cs[k] = hess[(k, k)] / denom;
                    sn[k] = hess[(k + 1, k)] / denom;
                } else {
                    cs[k] = 1.0;
                    sn[k] = 0.0;
                }
                hess[(k, k)] = cs[k] * hess[(k, k)] + sn[k] * hess[(k + 1, k)];
                hess[(k + 1, k)] = 0.0;
                g[k + 1] = -sn[k] * g[k];
                g[k] *= cs[k];

                iterations += 1;
                k_used = k + 1;

                if h_next <= f64::EPSILON * beta {
                    breakdown = true;
                } else {
                    basis.push(&w / h_next);
                }

                let residual = g[k + 1].abs();
                if residual <= tol || iterations >= max_iter || breakdown {
                    break;
                }
            }

            // Back substitution and solution update.
            let mut y = DVector::<f64>::zeros(k_used);
            for i in (0..k_used).rev() {
                let mut sum = g[i];
                for j in i + 1..k_used {
                    sum -= hess[(i, j)] * y[j];
                }
                y[i] = sum / hess[(i, i)];
            }
            for (i, yi) in y.iter().enumerate() {
                x.axpy(*yi, &basis[i], 1.0);
            }

            z = precond_residual(x);
            beta = z.norm();
            if beta <= tol || breakdown {
                break;
            }
        }

        let converged = beta <= tol;
        debug!(iterations, residual = beta, converged, "linear solve");
        SolveOutcome {
            iterations,
            residual: beta,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2-point, 2-D SPD system assembled by hand.
    fn spd_matrix() -> BlockMatrix {
        let mut matrix = BlockMatrix::new(2, 2);
        let mut diag = [0.0; 9];
        diag[0] = 4.0;
        diag[3] = 3.0;
        let mut off = [0.0; 9];
        off[0] = -1.0;
        off[3] = -1.0;
        matrix.add_block(0, 0, &diag);
        matrix.add_block(1, 1, &diag);
        matrix.add_block(0, 1, &off);
        matrix.add_block(1, 0, &off);
        matrix
    }

    #[test]
    fn solves_a_small_spd_system() {
        let matrix = spd_matrix();
        let rhs = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let mut x = DVector::zeros(4);

        let outcome = GmresSolver::default().solve(&matrix, &rhs, &mut x, 1e-12, 100);
        assert!(outcome.converged);

        let mut check = DVector::zeros(4);
        matrix.matvec(&x, &mut check);
        assert!((check - rhs).norm() < 1e-10);
    }

    #[test]
    fn solves_an_unsymmetric_system() {
        // Dirichlet-style row deletion leaves an unsymmetric matrix.
        let mut matrix = spd_matrix();
        matrix.clear_row(0);
        let rhs = DVector::from_vec(vec![0.5, 2.0, 3.0, 4.0]);
        let mut x = DVector::from_vec(vec![0.5, 0.0, 0.0, 0.0]);

        let outcome = GmresSolver::default().solve(&matrix, &rhs, &mut x, 1e-12, 100);
        assert!(outcome.converged);

        let mut check = DVector::zeros(4);
        matrix.matvec(&x, &mut check);
        assert!((check - rhs).norm() < 1e-10);
    }

    #[test]
    fn dirichlet_rows_pass_through_untouched() {
        let mut matrix = spd_matrix();
        matrix.clear_row(2);
        let mut rhs = DVector::from_vec(vec![1.0, 2.0, 0.0, 4.0]);
        rhs[2] = 0.125;
        let mut x = DVector::zeros(4);
        x[2] = 0.125;

        GmresSolver::default().solve(&matrix, &rhs, &mut x, 1e-12, 100);
        // Identity row with matching rhs and guess: preserved exactly.
        assert_eq!(x[2], 0.125);
    }

    #[test]
    fn reports_non_convergence() {
        let matrix = spd_matrix();
        let rhs = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let mut x = DVector::zeros(4);

        let outcome = GmresSolver::new(1).solve(&matrix, &rhs, &mut x, 1e-14, 1);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 1);
    }
}
