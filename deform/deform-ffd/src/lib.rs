//! Free-form deformation (FFD) for shape parametrization.
//!
//! This crate owns the parametric half of the mesh-deformation pipeline:
//! trivariate Bézier control-point lattices, the Newton point inversion
//! from cartesian coordinates to lattice parameters, the FFD metadata block
//! persisted inside mesh descriptions, and the design variables that turn
//! amplitudes into boundary displacement fields.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero engine dependencies.
//!
//! # Pipeline
//!
//! ```text
//! read_metadata ──► FfdCollection
//!                      │ initialize_parametrization   (first definition)
//!                      ▼
//!              surface-point cache (marker, point, parameters)
//!                      │ apply_design_variables       (per design cycle)
//!                      ▼
//!              var_coord on the deforming markers ──► elastic solver
//! ```
//!
//! # Quick start
//!
//! ```
//! use deform_ffd::{FfdBox, InversionConfig, invert};
//! use nalgebra::Point3;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! // A cubic lattice spanning the unit cube.
//! let mut lattice = FfdBox::new("WING", 3, 3, 3).unwrap();
//! lattice.set_unit_corners();
//! lattice.init_parallelepiped();
//!
//! // Forward map, then recover the parameters by Newton inversion.
//! let target = lattice.eval(&Point3::new(0.3, 0.7, 0.2));
//! let mut rng = StdRng::seed_from_u64(0);
//! let outcome = invert(
//!     &lattice,
//!     &target,
//!     &Point3::new(0.5, 0.5, 0.5),
//!     &InversionConfig::default(),
//!     &mut rng,
//! );
//! assert!(outcome.converged);
//! ```

mod bernstein;
mod design;
mod error;
mod inverse;
mod lattice;
mod metadata;
mod surface;

pub use bernstein::{bernstein, bernstein_derivative, binomial};
pub use design::{
    apply_design_variables, apply_hicks_henne, initialize_parametrization, DesignRequest,
    DesignVariable,
};
pub use error::{FfdError, FfdResult};
pub use inverse::{invert, InversionConfig, InversionOutcome};
pub use lattice::{FfdBox, SurfacePoint, NUM_CORNERS, PARAM_TOL};
pub use metadata::{
    read_metadata, write_metadata, FfdCollection, SurfacePointRecord,
};
pub use surface::{
    apply_surface, parametrize_child, parametrize_surface, update_child, update_surface_params,
};
