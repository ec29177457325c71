//! Diagnostics on the model's own sigma grid.
//!
//! Each calculator owns its output buffers. A `compute` call overwrites them
//! in place and hands back borrowed views that stay valid until the next
//! call on the same calculator.

mod atmosphere;
mod surface;


pub use self::atmosphere::{AtmosphereCalculator, AtmosphereFields, AtmosphereInputs};
pub use self::surface::SurfaceCalculator;
