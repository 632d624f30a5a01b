//! Core mesh types for volumetric mesh deformation.
//!
//! This crate provides the data model shared by the deformation pipeline:
//!
//! - [`MeshPoint`] - A mesh node with coordinate and cached per-point scalars
//! - [`Element`] / [`ElementKind`] - Volume/surface elements over six topologies
//! - [`Edge`] - A mesh edge (used for the minimum-edge-length scale)
//! - [`Marker`] / [`BoundaryVertex`] - Named boundary regions with prescribed
//!   surface displacements
//! - [`DeformMesh`] - The mesh container consumed by the elastic solver and
//!   the shape parametrization
//! - [`Aabb`] - Axis-aligned box (hold-fixed regions, lattice bounds)
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero engine dependencies. It can be used in
//! CLI tools, servers and tests.

mod bounds;
mod element;
mod error;
mod marker;
mod mesh;
mod point;

pub use bounds::Aabb;
pub use element::{Edge, Element, ElementKind};
pub use error::{MeshError, MeshResult};
pub use marker::{BoundaryVertex, Marker, MarkerKind};
pub use mesh::DeformMesh;
pub use point::MeshPoint;

pub use nalgebra::{Point3, Vector3};
