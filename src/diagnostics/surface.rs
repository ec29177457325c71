//! Surface (2 m) diagnostics.

use log::debug;

use crate::constants::MISSING;
use crate::error::{PostError, Result};
use crate::grid::{is_masked, GridDescriptor};
use crate::thermo::relative_humidity;

/// Computes 2 m relative humidity over a horizontal window.
///
/// The same type serves the full domain and any rectangular sub-window; only
/// the extent given at construction differs.
#[derive(Debug)]
pub struct SurfaceCalculator {
    nh: usize,
    r2: Vec<f32>,
}

impl SurfaceCalculator {
    /// Allocate the output buffer for an `nx` by `ny` window.
    pub fn new(nx: usize, ny: usize) -> Self {
        let nh = nx * ny;
        debug!("surface calculator for {nx}x{ny} cells");
        Self {
            nh,
            r2: vec![MISSING; nh],
        }
    }

    /// Calculator covering the whole grid.
    pub fn for_grid(grid: &GridDescriptor) -> Self {
        Self::new(grid.nx(), grid.ny())
    }

    /// Number of horizontal cells.
    pub fn len(&self) -> usize {
        self.nh
    }

    /// Whether the window has no cells.
    pub fn is_empty(&self) -> bool {
        self.nh == 0
    }

    /// Compute 2 m relative humidity from surface pressure `sp` (hPa), 2 m
    /// temperature `t2` (K), and 2 m specific humidity `q2` (kg/kg).
    ///
    /// Cells whose surface pressure is not positive get [`MISSING`].
    pub fn compute(&mut self, sp: &[f32], t2: &[f32], q2: &[f32]) -> Result<&[f32]> {
        if [sp.len(), t2.len(), q2.len()].iter().any(|&len| len != self.nh) {
            return Err(PostError::InconsistentInputs);
        }

        let mut masked = 0;
        for (((r2, &sp), &t2), &q2) in self.r2.iter_mut().zip(sp).zip(t2).zip(q2) {
            *r2 = if is_masked(sp) {
                masked += 1;
                MISSING
            } else {
                relative_humidity(sp, t2, q2)
            };
        }
        debug!("2 m relative humidity computed, {masked} masked cells");

        Ok(&self.r2)
    }

    /// The most recently computed 2 m relative humidity.
    pub fn relative_humidity(&self) -> &[f32] {
        &self.r2
    }
}
