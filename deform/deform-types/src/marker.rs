//! Boundary markers and their vertices.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The role of a boundary marker in the deformation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarkerKind {
    /// A surface whose prescribed displacement drives the deformation
    /// (a moving wall in dynamic runs, a design surface in shape runs).
    Deforming,
    /// A symmetry plane: only the in-plane displacement components are free.
    SymmetryPlane,
    /// A near-field interface; always pinned to zero displacement.
    NearField,
    /// An inter-partition (halo) boundary; owned by the communication layer
    /// and skipped by the Dirichlet passes.
    InterPartition,
    /// Any other outer boundary; pinned to zero displacement.
    FarField,
}

/// A vertex of a boundary marker.
///
/// `var_coord` is the prescribed coordinate variation written by the shape
/// parametrization and consumed as a Dirichlet value by the elastic solver.
/// It lives for one deformation pass and is reset to zero at the start of
/// each parametrization call.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundaryVertex {
    /// Index of the mesh point this vertex refers to.
    pub point: u32,
    /// Outward unit normal at the vertex.
    pub normal: Vector3<f64>,
    /// Prescribed coordinate variation for the current pass.
    pub var_coord: Vector3<f64>,
}

impl BoundaryVertex {
    /// Create a boundary vertex with zero variation.
    #[inline]
    #[must_use]
    pub fn new(point: u32, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal,
            var_coord: Vector3::zeros(),
        }
    }
}

/// A named boundary region of the mesh.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Marker {
    /// Marker name (the tag used in mesh descriptions).
    pub name: String,
    /// The marker's role.
    pub kind: MarkerKind,
    /// The marker's boundary vertices.
    pub vertices: Vec<BoundaryVertex>,
}

impl Marker {
    /// Create an empty marker.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MarkerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            vertices: Vec::new(),
        }
    }

    /// Whether this marker drives the deformation.
    #[inline]
    #[must_use]
    pub fn is_deforming(&self) -> bool {
        self.kind == MarkerKind::Deforming
    }
}
