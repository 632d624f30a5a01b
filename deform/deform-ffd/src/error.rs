//! Error types for free-form deformation.

use thiserror::Error;

/// Errors that can occur while building or applying FFD boxes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FfdError {
    /// The mesh description carries no FFD box definition.
    #[error("no FFD box definition found in the mesh description")]
    MissingDefinition,

    /// The FFD metadata block is malformed.
    #[error("malformed FFD metadata at line {line}: {reason}")]
    Metadata {
        /// 1-based line number inside the metadata block.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// A lattice degree of zero was requested.
    #[error("invalid lattice degrees ({0}, {1}, {2}): every degree must be at least 1")]
    InvalidDegrees(usize, usize, usize),

    /// A control-point index lies outside the lattice.
    #[error("control point ({i}, {j}, {k}) outside lattice of orders ({l}, {m}, {n})")]
    ControlPointOutOfRange {
        /// Requested i index.
        i: usize,
        /// Requested j index.
        j: usize,
        /// Requested k index.
        k: usize,
        /// Lattice order in i.
        l: usize,
        /// Lattice order in j.
        m: usize,
        /// Lattice order in k.
        n: usize,
    },

    /// A design variable or nesting record addresses an unknown box tag.
    #[error("unknown FFD box tag '{0}'")]
    UnknownTag(String),

    /// A support lattice was applied before being built.
    #[error("no support lattice was built for box '{0}'")]
    SupportNotBuilt(String),

    /// Reading or writing the metadata block failed.
    #[error("FFD metadata I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for FFD operations.
pub type FfdResult<T> = Result<T, FfdError>;
