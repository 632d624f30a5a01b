//! Error types for mesh construction.

use thiserror::Error;

use crate::ElementKind;

/// Errors that can occur while building a deformation mesh.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MeshError {
    /// The spatial dimension is not 2 or 3.
    #[error("unsupported spatial dimension {0} (expected 2 or 3)")]
    UnsupportedDimension(usize),

    /// An element was given the wrong number of nodes for its topology.
    #[error("{kind:?} element expects {expected} nodes, got {got}")]
    NodeCountMismatch {
        /// The element topology.
        kind: ElementKind,
        /// The node count required by the topology.
        expected: usize,
        /// The node count that was supplied.
        got: usize,
    },

    /// An element or marker references a point index outside the mesh.
    #[error("point index {index} out of range (mesh has {point_count} points)")]
    InvalidPointIndex {
        /// The invalid index.
        index: u32,
        /// The number of points in the mesh.
        point_count: usize,
    },

    /// A volume topology was used in a planar mesh or vice versa.
    #[error("{kind:?} element is not valid in a {dim}-D mesh")]
    DimensionMismatch {
        /// The element topology.
        kind: ElementKind,
        /// The mesh dimension.
        dim: usize,
    },
}

/// Result type for mesh construction.
pub type MeshResult<T> = Result<T, MeshError>;
