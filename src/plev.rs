//! Vertical interpolation from sigma levels onto pressure levels.
//!
//! The engine is built once for a set of target pressure levels and a
//! sigma table, then reused for any number of fields and time slices. Every
//! query works column by column and writes into caller-owned buffers laid
//! out as `level * n2d + cell`, in the order of the target level list.
//!
//! Sigma-level fields are ordered from the model top down, matching the
//! sigma table. The last entry (`km`) is the layer closest to the ground.

mod height;
mod interp;


use log::debug;
use smallvec::SmallVec;

use crate::constants::MISSING;
use crate::error::{PostError, Result};
use crate::grid::{boundary_layer_top, validate_sigma, GridDescriptor};

/// Scratch space for one column of sigma-level pressures.
type Column = SmallVec<[f32; 64]>;

/// How [`PressureLevels::htsig`] treats the layers above the lowest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HtsigMode {
    /// Only recompute the lowest model layer from the topography. Heights on
    /// every other layer are left as supplied.
    #[default]
    LowestLayerOnly,
    /// Also integrate hydrostatically from the lowest layer up to the model
    /// top, replacing every layer of the height field.
    FullColumn,
}

/// Pressure-level interpolation engine.
#[derive(Debug, Clone)]
pub struct PressureLevels {
    /// Target pressure levels, in the caller's order
    levels: Vec<f32>,
    /// Top-of-model pressure
    ptop: f32,
    nx: usize,
    ny: usize,
    /// Sigma value of every field level, top first
    sigma: Vec<f32>,
    /// Index of the lowest sigma level, `nz - 1`
    km: usize,
    /// Boundary-layer-top level used for extrapolation below ground
    kbc: usize,
}

impl PressureLevels {
    /// Build the engine for `levels` (same units as `ptop`) over an `nx` by
    /// `ny` grid whose fields live on the given `sigma` values.
    ///
    /// `sigma` must hold at least two strictly increasing values in `[0, 1]`.
    pub fn new(levels: &[f32], ptop: f32, nx: usize, ny: usize, sigma: &[f32]) -> Result<Self> {
        if levels.is_empty() || nx == 0 || ny == 0 {
            return Err(PostError::InconsistentInputs);
        }
        validate_sigma(sigma)?;

        let km = sigma.len() - 1;
        let kbc = boundary_layer_top(sigma);
        debug!(
            "pressure-level engine: {} levels, {nx}x{ny} cells, {} sigma levels (boundary layer top at {kbc})",
            levels.len(),
            sigma.len()
        );

        Ok(Self {
            levels: levels.to_vec(),
            ptop,
            nx,
            ny,
            sigma: sigma.to_vec(),
            km,
            kbc,
        })
    }

    /// Engine for fields on the layer midpoints of `grid`.
    pub fn for_grid(levels: &[f32], grid: &GridDescriptor) -> Result<Self> {
        Self::new(levels, grid.ptop(), grid.nx(), grid.ny(), grid.half_levels())
    }

    /// Target pressure levels.
    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    /// Sigma values of the input field levels.
    pub fn sigma(&self) -> &[f32] {
        &self.sigma
    }

    /// Number of horizontal cells.
    pub fn n2d(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of values in a sigma-level field.
    pub fn n3d(&self) -> usize {
        self.n2d() * self.sigma.len()
    }

    /// Number of values in a pressure-level field.
    pub fn output_len(&self) -> usize {
        self.n2d() * self.levels.len()
    }

    /// Offset of the lowest sigma level in a 3D field.
    fn start_tl(&self) -> usize {
        self.n3d() - self.n2d()
    }

    /// Whether a column cannot be mapped onto sigma.
    fn is_masked(&self, pstar: f32) -> bool {
        !(pstar > self.ptop)
    }

    /// Pressure on every sigma level of a column.
    fn column_pressures(&self, pstar: f32, psig: &mut Column) {
        psig.clear();
        psig.extend(self.sigma.iter().map(|s| s * (pstar - self.ptop) + self.ptop));
    }

    /// Fill every level of a pressure-level column with the sentinel.
    fn mask_column(&self, out: &mut [f32], i: usize) {
        let n2d = self.n2d();
        for ip in 0..self.levels.len() {
            out[ip * n2d + i] = MISSING;
        }
    }

    fn check_lengths(&self, n3d: &[&[f32]], n2d: &[&[f32]]) -> Result<()> {
        let ok = n3d.iter().all(|f| f.len() == self.n3d())
            && n2d.iter().all(|f| f.len() == self.n2d());
        if ok {
            Ok(())
        } else {
            Err(PostError::InconsistentInputs)
        }
    }

    fn check_output(&self, out: &[f32]) -> Result<()> {
        if out.len() == self.output_len() {
            Ok(())
        } else {
            Err(PostError::InconsistentInputs)
        }
    }
}

/// Index of the last entry of `values` strictly below `x`, or 0.
fn last_below(values: &[f32], x: f32) -> usize {
    values.iter().rposition(|&v| v < x).unwrap_or(0)
}
