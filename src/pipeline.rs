//! Per-time-slice post-processing chain.
//!
//! Runs the sigma diagnostics and puts the usual set of fields on pressure
//! levels, the way a RegCM output converter consumes them.

use log::debug;

use crate::constants::MISSING;
use crate::diagnostics::{AtmosphereCalculator, AtmosphereInputs, SurfaceCalculator};
use crate::error::Result;
use crate::grid::GridDescriptor;
use crate::plev::PressureLevels;

/// Surface fields for one time slice, `nh` values each.
///
/// Surface pressure comes from [`AtmosphereInputs::ps`].
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInputs<'a> {
    /// 2 m temperature in K
    pub t2: &'a [f32],
    /// 2 m specific humidity in kg/kg
    pub q2: &'a [f32],
    /// Ground (skin) temperature in K
    pub tg: &'a [f32],
}

/// Borrowed views of the post-processed fields, valid until the next
/// [`Postprocessor::process`].
///
/// Pressure-level fields hold `num_levels * nh` values, level-major in the
/// order of the target level list.
#[derive(Debug, Clone, Copy)]
pub struct ProcessedFields<'a> {
    /// Geopotential height in m
    pub height: &'a [f32],
    /// Temperature in K
    pub temperature: &'a [f32],
    /// Specific humidity in kg/kg
    pub specific_humidity: &'a [f32],
    /// Relative humidity as a fraction
    pub relative_humidity: &'a [f32],
    /// Dew-point temperature in K
    pub dewpoint: &'a [f32],
    /// Potential temperature in K
    pub potential_temperature: &'a [f32],
    /// Relative vorticity in 1/s
    pub vorticity: &'a [f32],
    /// Horizontal divergence in 1/s
    pub divergence: &'a [f32],
    /// Wind component along x
    pub u: &'a [f32],
    /// Wind component along y
    pub v: &'a [f32],
    /// Sea-level pressure from the lapse-rate atmosphere, `nh` values
    pub slp_lapse_rate: &'a [f32],
    /// Sea-level pressure from the ground temperature, `nh` values
    pub slp_ground_temperature: &'a [f32],
    /// 2 m relative humidity, `nh` values
    pub rh2m: &'a [f32],
}

/// Owns every calculator and output buffer needed to post-process a run.
#[derive(Debug)]
pub struct Postprocessor {
    atmosphere: AtmosphereCalculator,
    surface: SurfaceCalculator,
    plev: PressureLevels,
    topography: Vec<f32>,

    hp: Vec<f32>,
    tp: Vec<f32>,
    qp: Vec<f32>,
    rhp: Vec<f32>,
    tdp: Vec<f32>,
    ptp: Vec<f32>,
    vrp: Vec<f32>,
    dvp: Vec<f32>,
    up: Vec<f32>,
    vp: Vec<f32>,
    slp1: Vec<f32>,
    slp2: Vec<f32>,
}

impl Postprocessor {
    /// Build the calculators for `grid` and the target pressure `levels`.
    ///
    /// Fields live on the layer midpoints, so every column has a gap between
    /// the pressure of the lowest midpoint and the surface pressure where no
    /// height regime applies. A target level falling in that gap makes
    /// [`Postprocessor::process`] fail with
    /// [`UnresolvableBracket`](crate::error::PostError::UnresolvableBracket).
    /// With the lowest midpoint at sigma 0.995 and 1005 hPa at the surface,
    /// 1000 hPa is such a level. Pick levels that stay clear of it for the
    /// surface pressures of the run.
    pub fn new(grid: &GridDescriptor, levels: &[f32]) -> Result<Self> {
        let plev = PressureLevels::for_grid(levels, grid)?;
        let size = plev.output_len();
        let nh = grid.nh();
        debug!("post-processor with {} pressure levels", levels.len());

        Ok(Self {
            atmosphere: AtmosphereCalculator::new(grid),
            surface: SurfaceCalculator::for_grid(grid),
            plev,
            topography: grid.topography().to_vec(),
            hp: vec![MISSING; size],
            tp: vec![MISSING; size],
            qp: vec![MISSING; size],
            rhp: vec![MISSING; size],
            tdp: vec![MISSING; size],
            ptp: vec![MISSING; size],
            vrp: vec![MISSING; size],
            dvp: vec![MISSING; size],
            up: vec![MISSING; size],
            vp: vec![MISSING; size],
            slp1: vec![MISSING; nh],
            slp2: vec![MISSING; nh],
        })
    }

    /// The pressure-level engine in use.
    pub fn pressure_levels(&self) -> &PressureLevels {
        &self.plev
    }

    /// Process one time slice.
    ///
    /// Temperature is interpolated in `ln(sigma)` with lapse-rate
    /// extrapolation below ground; the other fields are interpolated
    /// linearly in sigma.
    pub fn process(
        &mut self,
        atm: &AtmosphereInputs<'_>,
        srf: &SurfaceInputs<'_>,
    ) -> Result<ProcessedFields<'_>> {
        let fields = self.atmosphere.compute(atm)?;
        let rh2m = self.surface.compute(atm.ps, srf.t2, srf.q2)?;

        let plev = &self.plev;
        let ps = atm.ps;
        plev.height(&mut self.hp, fields.height, atm.t, ps, &self.topography)?;
        plev.intlog(&mut self.tp, atm.t, ps)?;
        plev.intlin(&mut self.qp, atm.q, ps)?;
        plev.intlin(&mut self.rhp, fields.relative_humidity, ps)?;
        plev.intlin(&mut self.tdp, fields.dewpoint, ps)?;
        plev.intlin(&mut self.ptp, fields.potential_temperature, ps)?;
        plev.intlin(&mut self.vrp, fields.vorticity, ps)?;
        plev.intlin(&mut self.dvp, fields.divergence, ps)?;
        plev.intlin(&mut self.up, atm.u, ps)?;
        plev.intlin(&mut self.vp, atm.v, ps)?;
        plev.slpres(
            fields.height,
            atm.t,
            ps,
            &self.topography,
            srf.tg,
            &mut self.slp1,
            &mut self.slp2,
        )?;

        Ok(ProcessedFields {
            height: &self.hp,
            temperature: &self.tp,
            specific_humidity: &self.qp,
            relative_humidity: &self.rhp,
            dewpoint: &self.tdp,
            potential_temperature: &self.ptp,
            vorticity: &self.vrp,
            divergence: &self.dvp,
            u: &self.up,
            v: &self.vp,
            slp_lapse_rate: &self.slp1,
            slp_ground_temperature: &self.slp2,
            rh2m,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::{PostError, Routine};

    const NX: usize = 4;
    const NY: usize = 3;
    const NH: usize = NX * NY;
    const NK: usize = 4;

    fn grid() -> GridDescriptor {
        GridDescriptor::new(
            NX,
            NY,
            10.,
            50e3,
            vec![0., 0.25, 0.5, 0.8, 1.],
            vec![1.; NH],
            vec![1.; NH],
            vec![100.; NH],
        )
        .unwrap()
    }

    struct Slice {
        ps: Vec<f32>,
        t: Vec<f32>,
        q: Vec<f32>,
        u: Vec<f32>,
        v: Vec<f32>,
        t2: Vec<f32>,
        q2: Vec<f32>,
        tg: Vec<f32>,
    }

    impl Slice {
        fn new() -> Self {
            let layers = [215., 240., 265., 285.];
            let humidity = [1e-5, 5e-4, 3e-3, 8e-3];
            Self {
                ps: vec![990.; NH],
                t: layers.iter().flat_map(|&t| [t; NH]).collect(),
                q: humidity.iter().flat_map(|&q| [q; NH]).collect(),
                u: vec![10.; NK * NH],
                v: vec![5.; NK * NH],
                t2: vec![288.; NH],
                q2: vec![0.009; NH],
                tg: vec![289.; NH],
            }
        }

        fn atmosphere(&self) -> AtmosphereInputs<'_> {
            AtmosphereInputs {
                ps: &self.ps,
                t: &self.t,
                q: &self.q,
                u: &self.u,
                v: &self.v,
            }
        }

        fn surface(&self) -> SurfaceInputs<'_> {
            SurfaceInputs {
                t2: &self.t2,
                q2: &self.q2,
                tg: &self.tg,
            }
        }
    }

    #[test]
    fn processes_a_time_slice() {
        let levels = [1050., 850., 500., 200., 50.];
        let mut post = Postprocessor::new(&grid(), &levels).unwrap();
        let slice = Slice::new();
        let out = post.process(&slice.atmosphere(), &slice.surface()).unwrap();

        let nlev = levels.len();
        for field in [
            out.height,
            out.temperature,
            out.specific_humidity,
            out.relative_humidity,
            out.dewpoint,
            out.potential_temperature,
            out.u,
            out.v,
        ] {
            assert_eq!(field.len(), nlev * NH);
            assert!(field.iter().all(|&value| value != MISSING));
        }

        // Heights increase with decreasing pressure, and 1050 hPa is below
        // the 100 m terrain
        for i in 0..NH {
            let column: Vec<f32> = (0..nlev).map(|ip| out.height[ip * NH + i]).collect();
            assert!(column.windows(2).all(|w| w[0] < w[1]));
            assert!(column[0] < 100.);
        }

        // Uniform winds come through unchanged
        assert!(out.u.iter().all(|&u| (u - 10.).abs() < 1e-4));
        assert_eq!(out.rh2m.len(), NH);
        assert!(out.slp_lapse_rate.iter().all(|&p| p > 990.));
        assert!(out.slp_ground_temperature.iter().all(|&p| p > 990.));
    }

    #[test]
    fn vorticity_edges_stay_masked() {
        let mut post = Postprocessor::new(&grid(), &[500.]).unwrap();
        let slice = Slice::new();
        let out = post.process(&slice.atmosphere(), &slice.surface()).unwrap();

        // Interior cells of a uniform flow have no vorticity, the last row
        // and column of the stencil are undefined
        assert_relative_eq!(out.vorticity[0], 0.);
        assert_eq!(out.vorticity[NH - 1], MISSING);
        assert_eq!(out.divergence[(NX - 1) * NY], MISSING);
    }

    #[test]
    fn masked_columns() {
        let mut post = Postprocessor::new(&grid(), &[850., 500.]).unwrap();
        let mut slice = Slice::new();
        slice.ps[7] = MISSING;
        let out = post.process(&slice.atmosphere(), &slice.surface()).unwrap();

        for ip in 0..2 {
            assert_eq!(out.height[ip * NH + 7], MISSING);
            assert_eq!(out.temperature[ip * NH + 7], MISSING);
            assert_ne!(out.temperature[ip * NH + 6], MISSING);
        }
        assert_eq!(out.rh2m[7], MISSING);
        assert_eq!(out.slp_lapse_rate[7], MISSING);
    }

    #[test]
    fn bad_level_aborts() {
        let mut post = Postprocessor::new(&grid(), &[500., -1.]).unwrap();
        let slice = Slice::new();
        let err = post
            .process(&slice.atmosphere(), &slice.surface())
            .unwrap_err();
        assert!(matches!(
            err,
            PostError::UnresolvableBracket {
                routine: Routine::Height,
                ..
            }
        ));
    }

    #[test]
    fn nan_surface_pressure_is_masked() {
        let mut post = Postprocessor::new(&grid(), &[1050., 850., 500.]).unwrap();
        let mut slice = Slice::new();
        slice.ps[3] = f32::NAN;
        let out = post.process(&slice.atmosphere(), &slice.surface()).unwrap();

        for ip in 0..3 {
            assert_eq!(out.height[ip * NH + 3], MISSING);
            assert_eq!(out.temperature[ip * NH + 3], MISSING);
            assert_eq!(out.u[ip * NH + 3], MISSING);
            assert_ne!(out.height[ip * NH + 4], MISSING);
        }
        assert_eq!(out.rh2m[3], MISSING);
        assert_eq!(out.slp_lapse_rate[3], MISSING);
        assert_eq!(out.slp_ground_temperature[3], MISSING);
    }

    #[test]
    fn level_between_lowest_layer_and_ground_fails() {
        // Lowest midpoint at sigma 0.9: 892 hPa over a 990 hPa surface
        let mut post = Postprocessor::new(&grid(), &[500., 950.]).unwrap();
        let slice = Slice::new();
        let err = post
            .process(&slice.atmosphere(), &slice.surface())
            .unwrap_err();
        assert_eq!(
            err,
            PostError::UnresolvableBracket {
                routine: Routine::Height,
                level: 950.,
            }
        );
    }
}
