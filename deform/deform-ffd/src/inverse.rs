//! Newton point inversion: cartesian coordinates to lattice parameters.
//!
//! Given a target point `x` and a lattice `F`, find parameters `p`
//! minimizing `‖F(p) − x‖²`. The solver is a damped Newton iteration on the
//! analytic gradient and Hessian of that objective, wrapped in a
//! randomized-restart outer loop:
//!
//! ```text
//! for trial in 0..=max_restarts:
//!     p = guess (trial 0) or uniform random in [0,1]³
//!     for iter in 0..max_iterations:
//!         solve H(p) · Δ = −g(p)        (3×3 adjugate/determinant inverse)
//!         p ← (1−ω)·p + ω·(p + Δ)       (successive over-relaxation)
//!         converged when all |Δ| components < tolerance
//!         diverged  when ‖Δ‖ exceeds the divergence threshold → restart
//! ```
//!
//! A numerically singular Hessian skips the update for that iteration. The
//! first trial runs with ω = 1; restarts drop to the damped fallback ω.
//! Exhausting every trial is reported (the target point and the minimum
//! error observed are logged) and the best parameters found are returned —
//! a non-fatal degeneracy, not an error.

use nalgebra::{Matrix3, Point3, Vector3};
use rand::Rng;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bernstein::{bernstein, bernstein_derivative};
use crate::lattice::FfdBox;

/// Immutable configuration for the point inversion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InversionConfig {
    /// Per-component convergence tolerance on the Newton step.
    pub tolerance: f64,
    /// Newton iterations per trial.
    pub max_iterations: usize,
    /// Random-restart trials after the initial guess fails.
    pub max_restarts: usize,
    /// Step-norm threshold that triggers an early restart.
    pub divergence_threshold: f64,
    /// Over-relaxation factor for the first trial.
    pub sor_initial: f64,
    /// Over-relaxation factor for every restarted trial.
    pub sor_fallback: f64,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 500,
            max_restarts: 500,
            divergence_threshold: 1.8,
            sor_initial: 1.0,
            sor_fallback: 0.1,
        }
    }
}

impl InversionConfig {
    /// Set the convergence tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the per-trial iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the restart cap.
    #[must_use]
    pub const fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }
}

/// Result of one point inversion.
#[derive(Debug, Clone, Copy)]
pub struct InversionOutcome {
    /// The parameters found (best observed when not converged).
    pub param: Point3<f64>,
    /// Cartesian error `‖F(param) − target‖` at the returned parameters.
    pub error: f64,
    /// Total Newton iterations spent, over all trials.
    pub iterations: usize,
    /// Restart trials consumed.
    pub restarts: usize,
    /// Whether the Newton step converged below tolerance.
    pub converged: bool,
}

/// Invert the forward map of `lattice` at `target`, starting from `guess`.
///
/// The random generator feeds the restart trials only; a converged first
/// trial never draws from it.
pub fn invert<R: Rng + ?Sized>(
    lattice: &FfdBox,
    target: &Point3<f64>,
    guess: &Point3<f64>,
    config: &InversionConfig,
    rng: &mut R,
) -> InversionOutcome {
    let mut param = *guess;
    let mut best_param = param;
    let mut best_error = (lattice.eval(&param) - target).norm();
    let mut iterations = 0;

    for trial in 0..=config.max_restarts {
        let sor = if trial == 0 {
            config.sor_initial
        } else {
            config.sor_fallback
        };
        if trial > 0 {
            param = Point3::new(
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            );
        }

        for _ in 0..config.max_iterations {
            iterations += 1;

            let gradient = objective_gradient(lattice, &param, target);
            let hessian = objective_hessian(lattice, &param, target);

            // Singular Hessian: no step this iteration.
            let Some(inverse) = hessian.try_inverse() else {
                continue;
            };
            let step: Vector3<f64> = -(inverse * gradient);

            param += sor * step;

            let error = (lattice.eval(&param) - target).norm();
            if error < best_error {
                best_error = error;
                best_param = param;
            }

            if step.x.abs() < config.tolerance
                && step.y.abs() < config.tolerance
                && step.z.abs() < config.tolerance
            {
                return InversionOutcome {
                    param,
                    error,
                    iterations,
                    restarts: trial,
                    converged: true,
                };
            }

            if step.norm() > config.divergence_threshold {
                break;
            }
        }
    }

    warn!(
        point = ?target,
        min_error = best_error,
        iterations,
        "point inversion exhausted its restart budget"
    );
    InversionOutcome {
        param: best_param,
        error: best_error,
        iterations,
        restarts: config.max_restarts,
        converged: false,
    }
}

/// Partial derivative of the forward map component `dim` with respect to
/// parameter `axis`.
fn map_partial(lattice: &FfdBox, param: &Point3<f64>, dim: usize, axis: usize) -> f64 {
    let [l, m, n] = lattice.degree();
    let degrees = [l, m, n];
    let mut value = 0.0;
    for k in 0..=n {
        for j in 0..=m {
            for i in 0..=l {
                let ijk = [i, j, k];
                let mut factor = 1.0;
                for d in 0..3 {
                    factor *= if d == axis {
                        bernstein_derivative(degrees[d], ijk[d], param[d], 1)
                    } else {
                        bernstein(degrees[d], ijk[d], param[d])
                    };
                }
                value += lattice.control_point(i, j, k)[dim] * factor;
            }
        }
    }
    value
}

/// Second partial derivative of the forward map component `dim` with
/// respect to parameters `a` and `b`.
fn map_second_partial(
    lattice: &FfdBox,
    param: &Point3<f64>,
    dim: usize,
    a: usize,
    b: usize,
) -> f64 {
    let [l, m, n] = lattice.degree();
    let degrees = [l, m, n];
    let mut value = 0.0;
    for k in 0..=n {
        for j in 0..=m {
            for i in 0..=l {
                let ijk = [i, j, k];
                let mut factor = 1.0;
                for d in 0..3 {
                    let order = if a == b {
                        if d == a {
                            2
                        } else {
                            0
                        }
                    } else if d == a || d == b {
                        1
                    } else {
                        0
                    };
                    factor *= bernstein_derivative(degrees[d], ijk[d], param[d], order);
                }
                value += lattice.control_point(i, j, k)[dim] * factor;
            }
        }
    }
    value
}

/// Gradient of `‖F(p) − target‖²`.
fn objective_gradient(
    lattice: &FfdBox,
    param: &Point3<f64>,
    target: &Point3<f64>,
) -> Vector3<f64> {
    let diff = lattice.eval(param) - target;
    let mut gradient = Vector3::zeros();
    for dim in 0..3 {
        for axis in 0..3 {
            gradient[axis] += 2.0 * diff[dim] * map_partial(lattice, param, dim, axis);
        }
    }
    gradient
}

/// Symmetric 3×3 Hessian of `‖F(p) − target‖²`.
///
/// Built from products of first partials plus the residual-weighted second
/// partials; only the upper triangle is computed.
fn objective_hessian(
    lattice: &FfdBox,
    param: &Point3<f64>,
    target: &Point3<f64>,
) -> Matrix3<f64> {
    let diff = lattice.eval(param) - target;
    let mut hessian = Matrix3::zeros();
    for dim in 0..3 {
        let partials = [
            map_partial(lattice, param, dim, 0),
            map_partial(lattice, param, dim, 1),
            map_partial(lattice, param, dim, 2),
        ];
        for a in 0..3 {
            for b in a..3 {
                hessian[(a, b)] += 2.0 * partials[a] * partials[b]
                    + 2.0 * diff[dim] * map_second_partial(lattice, param, dim, a, b);
            }
        }
    }
    hessian[(1, 0)] = hessian[(0, 1)];
    hessian[(2, 0)] = hessian[(0, 2)];
    hessian[(2, 1)] = hessian[(1, 2)];
    hessian
}
