//! Error types for the elastic deformation solver.

use thiserror::Error;

/// Errors that can occur while setting up a deformation pass.
///
/// Numerical degeneracy (negative element measures, solver
/// non-convergence) is deliberately *not* an error: it is counted,
/// reported and carried in the outcome structs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ElasticError {
    /// The mesh has no points or no elements.
    #[error("mesh has no points or elements to deform")]
    EmptyMesh,
}

/// Result type for deformation operations.
pub type ElasticResult<T> = Result<T, ElasticError>;
