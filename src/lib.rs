//! Post-processing of RegCM sigma-coordinate output
//!
//! Derives thermodynamic and kinematic diagnostics on the model's sigma
//! levels and interpolates fields onto fixed pressure levels.
//!
//! Fields are flat `f32` buffers. Horizontal cells are indexed as
//! `ix * ny + jy` and 3D fields are level-major, `k * nx * ny + cell`, with
//! level 0 at the model top. Masked or undefined values hold
//! [`constants::MISSING`].
//!
//! NOTE: the Python bindings live behind the `python` feature and are the
//! only code that uses `pyo3`.

pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod plev;
pub mod thermo;

#[cfg(feature = "python")]
mod python;

pub use diagnostics::{AtmosphereCalculator, AtmosphereFields, AtmosphereInputs, SurfaceCalculator};
pub use error::{PostError, Result, Routine};
pub use grid::GridDescriptor;
pub use pipeline::{Postprocessor, ProcessedFields, SurfaceInputs};
pub use plev::{HtsigMode, PressureLevels};
