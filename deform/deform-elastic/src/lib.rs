//! Pseudo-elastic volumetric mesh deformation.
//!
//! The mesh interior is treated as a linear-elastic continuum: a global
//! stiffness system is assembled from per-element isoparametric
//! formulations, prescribed boundary displacements become Dirichlet rows,
//! an external preconditioned Krylov solver (behind [`LinearSolver`])
//! produces the interior displacements, and validity is checked by
//! detecting negative-measure elements.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero engine dependencies.
//!
//! # Quick start
//!
//! ```
//! use deform_comm::SerialComm;
//! use deform_elastic::{deform_volume, DeformConfig, GmresSolver};
//! use deform_types::{BoundaryVertex, DeformMesh, ElementKind, Marker, MarkerKind, MeshPoint, Vector3};
//!
//! // A single-quad mesh whose whole boundary is pinned.
//! let mut mesh = DeformMesh::new(2).unwrap();
//! mesh.push_point(MeshPoint::from_coords(0.0, 0.0, 0.0));
//! mesh.push_point(MeshPoint::from_coords(1.0, 0.0, 0.0));
//! mesh.push_point(MeshPoint::from_coords(1.0, 1.0, 0.0));
//! mesh.push_point(MeshPoint::from_coords(0.0, 1.0, 0.0));
//! mesh.add_element(ElementKind::Quadrilateral, &[0, 1, 2, 3]).unwrap();
//! let mut outer = Marker::new("outer", MarkerKind::FarField);
//! for p in 0..4 {
//!     outer.vertices.push(BoundaryVertex::new(p, Vector3::y()));
//! }
//! mesh.add_marker(outer).unwrap();
//!
//! let outcome = deform_volume(
//!     &mut mesh,
//!     &DeformConfig::default(),
//!     &GmresSolver::default(),
//!     &SerialComm,
//! )
//! .unwrap();
//! assert_eq!(outcome.invalid_elements, 0);
//! ```

mod assemble;
mod boundary;
mod distance;
mod driver;
mod error;
mod measure;
mod quadrature;
mod shape;
mod solver;
mod system;

pub use assemble::{assemble_stiffness, StiffnessPolicy, MAX_DOF};
pub use boundary::apply_boundary_conditions;
pub use distance::compute_wall_distances;
pub use driver::{deform_volume, DeformConfig, DeformOutcome, IncrementStats};
pub use error::{ElasticError, ElasticResult};
pub use measure::{check_mesh, signed_measure, MeshQuality, EPS};
pub use quadrature::{rule, GaussPoint};
pub use shape::{shape_functions, ShapeDerivatives, MAX_NODES};
pub use solver::{GmresSolver, LinearSolver, SolveOutcome};
pub use system::{BlockMatrix, BlockSystem};
