//! Bernstein basis polynomials and their derivatives.
//!
//! These are the scalar building blocks of the trivariate Bézier lattice:
//! the forward map blends control points with products of three Bernstein
//! factors, and the point-inversion Newton solver needs their first and
//! second derivatives.
//!
//! All functions are pure; the binomial table is rebuilt per call with an
//! additive Pascal-triangle sweep rather than memoized, which keeps them
//! deterministic and allocation-bounded.

/// Binomial coefficient C(n, m) via a Pascal-triangle sweep.
///
/// # Panics
///
/// Panics if `m > n`.
///
/// # Example
///
/// ```
/// use deform_ffd::binomial;
///
/// assert_eq!(binomial(0, 0), 1);
/// assert_eq!(binomial(4, 2), 6);
/// assert_eq!(binomial(6, 3), 20);
/// ```
#[must_use]
pub fn binomial(n: usize, m: usize) -> u64 {
    assert!(m <= n, "binomial({n}, {m}) is undefined");
    let mut row = vec![0_u64; n + 1];
    row[0] = 1;
    for i in 1..=n {
        row[i] = 1;
        for j in (1..i).rev() {
            row[j] += row[j - 1];
        }
    }
    row[m]
}

/// Bernstein basis value B_{n,i}(t).
///
/// The endpoints are special-cased so that `t = 0` and `t = 1` never raise
/// `0^0`; an index above the degree evaluates to zero.
#[must_use]
pub fn bernstein(n: usize, i: usize, t: f64) -> f64 {
    if i > n {
        return 0.0;
    }
    if t == 0.0 {
        return if i == 0 { 1.0 } else { 0.0 };
    }
    if t == 1.0 {
        return if i == n { 1.0 } else { 0.0 };
    }
    #[allow(clippy::cast_precision_loss)]
    let coeff = binomial(n, i) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let ti = t.powi(i as i32);
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let one_minus_t = (1.0 - t).powi((n - i) as i32);
    coeff * ti * one_minus_t
}

/// Derivative of order `order` of the Bernstein basis, d^k/dt^k B_{n,i}(t).
///
/// Order 0 returns the value itself. Higher orders use the degree-reduction
/// identity
///
/// ```text
/// B'_{n,i}(t) = n * (B_{n-1,i-1}(t) - B_{n-1,i}(t))
/// ```
///
/// applied recursively; the recursion depth is bounded by the polynomial
/// degree.
#[must_use]
pub fn bernstein_derivative(n: usize, i: usize, t: f64, order: usize) -> f64 {
    if order == 0 {
        return bernstein(n, i, t);
    }
    if n == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let degree = n as f64;
    let lower = bernstein_derivative(n - 1, i, t, order - 1);
    if i == 0 {
        -degree * lower
    } else {
        degree * (bernstein_derivative(n - 1, i - 1, t, order - 1) - lower)
    }
}
