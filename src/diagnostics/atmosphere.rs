//! Three-dimensional diagnostics on sigma layers.

use log::debug;

use crate::constants::{MISSING, ROVG};
use crate::error::{PostError, Result};
use crate::grid::{is_masked, GridDescriptor};
use crate::thermo::{dewpoint, potential_temperature, relative_humidity};

/// Raw model fields for one time slice.
///
/// 3D fields have `nk * nh` values ordered from the model top down, all on
/// the layer midpoints of the grid.
#[derive(Debug, Clone, Copy)]
pub struct AtmosphereInputs<'a> {
    /// Surface pressure in hPa, `nh` values
    pub ps: &'a [f32],
    /// Temperature in K
    pub t: &'a [f32],
    /// Specific humidity in kg/kg
    pub q: &'a [f32],
    /// Wind component along the first horizontal axis (x), on dot points
    pub u: &'a [f32],
    /// Wind component along the second horizontal axis (y), on dot points
    pub v: &'a [f32],
}

/// Borrowed views of the derived fields, valid until the next
/// [`AtmosphereCalculator::compute`].
#[derive(Debug, Clone, Copy)]
pub struct AtmosphereFields<'a> {
    /// Pressure in hPa
    pub pressure: &'a [f32],
    /// Relative humidity as a fraction
    pub relative_humidity: &'a [f32],
    /// Dew-point temperature in K
    pub dewpoint: &'a [f32],
    /// Potential temperature in K
    pub potential_temperature: &'a [f32],
    /// Geopotential height in m
    pub height: &'a [f32],
    /// Relative vorticity in 1/s
    pub vorticity: &'a [f32],
    /// Horizontal divergence in 1/s
    pub divergence: &'a [f32],
}

/// Computes the sigma-layer diagnostics for a whole grid.
#[derive(Debug)]
pub struct AtmosphereCalculator {
    nx: usize,
    ny: usize,
    nk: usize,
    nh: usize,
    ptop: f32,
    /// `1 / (2 ds)`
    ds2r: f32,
    half_levels: Vec<f32>,
    topography: Vec<f32>,
    xmap: Vec<f32>,
    dmap: Vec<f32>,

    p: Vec<f32>,
    rh: Vec<f32>,
    td: Vec<f32>,
    pt: Vec<f32>,
    ht: Vec<f32>,
    vr: Vec<f32>,
    dv: Vec<f32>,
}

impl AtmosphereCalculator {
    /// Capture the grid geometry and allocate the seven output buffers.
    pub fn new(grid: &GridDescriptor) -> Self {
        let nh = grid.nh();
        let nk = grid.nk();
        let size = nh * nk;
        debug!(
            "atmosphere calculator for {}x{} cells and {nk} layers ({size} values per field)",
            grid.nx(),
            grid.ny()
        );

        Self {
            nx: grid.nx(),
            ny: grid.ny(),
            nk,
            nh,
            ptop: grid.ptop(),
            ds2r: 1. / (2. * grid.ds()),
            half_levels: grid.half_levels().to_vec(),
            topography: grid.topography().to_vec(),
            xmap: grid.xmap().to_vec(),
            dmap: grid.dmap().to_vec(),
            p: vec![MISSING; size],
            rh: vec![MISSING; size],
            td: vec![MISSING; size],
            pt: vec![MISSING; size],
            ht: vec![MISSING; size],
            vr: vec![MISSING; size],
            dv: vec![MISSING; size],
        }
    }

    /// Run every diagnostic for one time slice.
    ///
    /// The steps run in a fixed order since later ones read earlier outputs:
    /// pressure, relative humidity, dew-point, potential temperature,
    /// geopotential height, then vorticity and divergence.
    pub fn compute(&mut self, inputs: &AtmosphereInputs<'_>) -> Result<AtmosphereFields<'_>> {
        let size = self.nh * self.nk;
        if inputs.ps.len() != self.nh
            || [inputs.t.len(), inputs.q.len(), inputs.u.len(), inputs.v.len()]
                .iter()
                .any(|&len| len != size)
        {
            return Err(PostError::InconsistentInputs);
        }

        self.calc_pressure(inputs.ps);
        self.calc_relative_humidity(inputs.ps, inputs.t, inputs.q);
        self.calc_dewpoint(inputs.ps, inputs.t);
        self.calc_potential_temperature(inputs.ps, inputs.t);
        self.calc_height(inputs.ps, inputs.t);
        self.calc_vorticity_divergence(inputs.ps, inputs.u, inputs.v);

        let masked = inputs.ps.iter().filter(|&&ps| is_masked(ps)).count();
        debug!("atmosphere diagnostics computed, {masked} masked columns");

        Ok(self.fields())
    }

    /// Views of the most recently computed fields.
    pub fn fields(&self) -> AtmosphereFields<'_> {
        AtmosphereFields {
            pressure: &self.p,
            relative_humidity: &self.rh,
            dewpoint: &self.td,
            potential_temperature: &self.pt,
            height: &self.ht,
            vorticity: &self.vr,
            divergence: &self.dv,
        }
    }

    /// Number of layers.
    pub fn nk(&self) -> usize {
        self.nk
    }

    /// Number of horizontal cells.
    pub fn nh(&self) -> usize {
        self.nh
    }

    fn calc_pressure(&mut self, ps: &[f32]) {
        let nh = self.nh;
        for (p_k, &sigma) in self.p.chunks_exact_mut(nh).zip(&self.half_levels) {
            for (p, &ps) in p_k.iter_mut().zip(ps) {
                *p = if is_masked(ps) {
                    MISSING
                } else {
                    (ps - self.ptop) * sigma + self.ptop
                };
            }
        }
    }

    fn calc_relative_humidity(&mut self, ps: &[f32], t: &[f32], q: &[f32]) {
        let nh = self.nh;
        for (index, rh) in self.rh.iter_mut().enumerate() {
            *rh = if is_masked(ps[index % nh]) {
                MISSING
            } else {
                relative_humidity(self.p[index], t[index], q[index])
            };
        }
    }

    fn calc_dewpoint(&mut self, ps: &[f32], t: &[f32]) {
        let nh = self.nh;
        for (index, td) in self.td.iter_mut().enumerate() {
            *td = if is_masked(ps[index % nh]) {
                MISSING
            } else {
                dewpoint(t[index], self.rh[index])
            };
        }
    }

    fn calc_potential_temperature(&mut self, ps: &[f32], t: &[f32]) {
        let nh = self.nh;
        for (index, pt) in self.pt.iter_mut().enumerate() {
            *pt = if is_masked(ps[index % nh]) {
                MISSING
            } else {
                potential_temperature(t[index], self.p[index])
            };
        }
    }

    /// Hydrostatic integration from the surface layer (the last one) up to
    /// the model top. Each layer uses the mean temperature of itself and the
    /// layer below.
    fn calc_height(&mut self, ps: &[f32], t: &[f32]) {
        let nh = self.nh;
        let surface = (self.nk - 1) * nh;
        for i in 0..nh {
            let j = surface + i;
            self.ht[j] = if is_masked(ps[i]) {
                MISSING
            } else {
                self.topography[i] + ROVG * t[j] * f32::ln(ps[i] / self.p[j])
            };
        }

        for k in (0..self.nk - 1).rev() {
            let (this, below) = (k * nh, (k + 1) * nh);
            for i in 0..nh {
                self.ht[this + i] = if is_masked(ps[i]) {
                    MISSING
                } else {
                    let tbar = 0.5 * (t[this + i] + t[below + i]);
                    self.ht[below + i]
                        + ROVG * tbar * f32::ln(self.p[below + i] / self.p[this + i])
                };
            }
        }
    }

    /// Relative vorticity and divergence on the staggered grid.
    ///
    /// The value at cross point `(ix, jy)` uses the four surrounding dot
    /// points. The last row and column have no stencil and stay [`MISSING`].
    fn calc_vorticity_divergence(&mut self, ps: &[f32], u: &[f32], v: &[f32]) {
        let (nx, ny, nh) = (self.nx, self.ny, self.nh);
        self.vr.fill(MISSING);
        self.dv.fill(MISSING);

        for k in 0..self.nk {
            let level = k * nh;
            for jy in 0..ny.saturating_sub(1) {
                for ix in 0..nx.saturating_sub(1) {
                    let c1 = ix * ny + jy;
                    let c2 = c1 + 1;
                    let c3 = c1 + ny;
                    let c4 = c3 + 1;
                    let corners = [c1, c2, c3, c4];

                    // Any masked corner leaves the stencil undefined
                    if corners.iter().any(|&c| {
                        is_masked(ps[c]) || u[level + c] == MISSING || v[level + c] == MISSING
                    }) {
                        continue;
                    }

                    // Remove the map factor from the winds at the corners
                    let [u1, u2, u3, u4] =
                        [c1, c2, c3, c4].map(|c| u[level + c] / self.dmap[c]);
                    let [v1, v2, v3, v4] =
                        [c1, c2, c3, c4].map(|c| v[level + c] / self.dmap[c]);

                    let scale = self.xmap[c1] * self.xmap[c1] * self.ds2r;
                    self.vr[level + c1] = scale * ((v4 - v2 + v3 - v1) - (u2 - u1 + u4 - u3));
                    self.dv[level + c1] = scale * ((u3 - u1 + u4 - u2) + (v2 - v1 + v4 - v3));
                }
            }
        }
    }
}
