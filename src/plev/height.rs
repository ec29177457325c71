//! Geopotential height and sea-level pressure.

use log::warn;

use super::{last_below, Column, HtsigMode, PressureLevels};
use crate::constants::{GTI, LRATE, MISSING, RGAS, RGTI, ROVG, STDT};
use crate::error::{PostError, Result, Routine};

impl PressureLevels {
    /// Recompute geopotential height on sigma levels from the topography.
    ///
    /// With [`HtsigMode::LowestLayerOnly`] only the lowest layer of `h` is
    /// replaced, hydrostatically from the ground using that layer's
    /// temperature. [`HtsigMode::FullColumn`] continues upward to the model
    /// top using the mean temperature of each pair of adjacent layers.
    ///
    /// `t` and `h` are sigma-level fields, `pstar` the surface pressure and
    /// `ht` the topography.
    pub fn htsig(
        &self,
        t: &[f32],
        h: &mut [f32],
        pstar: &[f32],
        ht: &[f32],
        mode: HtsigMode,
    ) -> Result<()> {
        self.check_lengths(&[t, &*h], &[pstar, ht])?;

        let n2d = self.n2d();
        let (ptop, km) = (self.ptop, self.km);
        let start = self.start_tl();
        let sigma_pressure = |ps: f32, k: usize| (ps - ptop) * self.sigma[k] + ptop;

        for i in 0..n2d {
            let ps = pstar[i];
            if self.is_masked(ps) {
                h[start + i] = MISSING;
                continue;
            }
            h[start + i] = ht[i] + ROVG * t[start + i] * f32::ln(ps / sigma_pressure(ps, km));
        }

        if mode == HtsigMode::LowestLayerOnly {
            return Ok(());
        }

        for k in (0..km).rev() {
            let (this, below) = (k * n2d, (k + 1) * n2d);
            for i in 0..n2d {
                let ps = pstar[i];
                h[this + i] = if self.is_masked(ps) {
                    MISSING
                } else {
                    let tbar = 0.5 * (t[this + i] + t[below + i]);
                    h[below + i]
                        + ROVG
                            * tbar
                            * f32::ln(sigma_pressure(ps, k + 1) / sigma_pressure(ps, k))
                };
            }
        }
        Ok(())
    }

    /// Geopotential height on the target pressure levels.
    ///
    /// `h` and `t` are height and temperature on sigma levels, `pstar` the
    /// surface pressure, `ht` the topography. Each target level falls in one
    /// of three regimes:
    ///
    /// - at or above the top sigma level: hydrostatic extrapolation from the
    ///   top level with its temperature;
    /// - strictly between the top and the lowest sigma level: a hydrostatic
    ///   step from the lower bracketing level using a log-pressure weighted
    ///   temperature averaged with the lower level's;
    /// - below the ground (beyond `pstar`): extrapolation from the
    ///   boundary-layer top with the standard lapse rate.
    ///
    /// A level in none of these (non-positive, or between the lowest sigma
    /// level and the ground) is [`PostError::UnresolvableBracket`].
    pub fn height(
        &self,
        hp: &mut [f32],
        h: &[f32],
        t: &[f32],
        pstar: &[f32],
        ht: &[f32],
    ) -> Result<()> {
        self.check_lengths(&[h, t], &[pstar, ht])?;
        self.check_output(hp)?;

        let n2d = self.n2d();
        let (km, kbc) = (self.km, self.kbc);
        let mut psig = Column::new();

        for i in 0..n2d {
            let ps = pstar[i];
            if self.is_masked(ps) {
                self.mask_column(hp, i);
                continue;
            }
            self.column_pressures(ps, &mut psig);

            for (ip, &plev) in self.levels.iter().enumerate() {
                hp[ip * n2d + i] = if plev > 0. && plev <= psig[0] {
                    h[i] + RGAS * t[i] * f32::ln(psig[0] / plev) * RGTI
                } else if plev > psig[0] && plev < psig[km] {
                    let kt = last_below(&psig, plev);
                    let kb = kt + 1;
                    let span = f32::ln(psig[kb] / psig[kt]);
                    let wt = f32::ln(psig[kb] / plev) / span;
                    let wb = f32::ln(plev / psig[kt]) / span;
                    let temp = wt * t[kt * n2d + i] + wb * t[kb * n2d + i];
                    let temp = 0.5 * (temp + t[kb * n2d + i]);
                    h[kb * n2d + i] + RGAS * temp * f32::ln(psig[kb] / plev) * RGTI
                } else if plev > ps {
                    let temp = t[kbc * n2d + i] - LRATE * (h[kbc * n2d + i] - ht[i]);
                    ht[i]
                        - (temp / LRATE)
                            * (1. - f32::exp(-RGAS * LRATE * f32::ln(plev / ps) * RGTI))
                } else {
                    warn!("pressure level {plev} has no bracket in column {i} (surface {ps})");
                    return Err(PostError::UnresolvableBracket {
                        routine: Routine::Height,
                        level: plev,
                    });
                };
            }
        }
        Ok(())
    }

    /// Two sea-level pressure estimates, written to `slp1` and `slp2`.
    ///
    /// `slp1` extrapolates hydrostatically through a lapse-rate atmosphere
    /// whose surface temperature comes from the boundary-layer top. `slp2`
    /// uses the mean of the ground temperature `tg` and the standard
    /// atmosphere sea-level temperature. They are alternative estimators.
    #[allow(clippy::too_many_arguments)]
    pub fn slpres(
        &self,
        h: &[f32],
        t: &[f32],
        pstar: &[f32],
        ht: &[f32],
        tg: &[f32],
        slp1: &mut [f32],
        slp2: &mut [f32],
    ) -> Result<()> {
        self.check_lengths(&[h, t], &[pstar, ht, tg, &*slp1, &*slp2])?;

        let n2d = self.n2d();
        let kbc = self.kbc;
        for i in 0..n2d {
            let ps = pstar[i];
            if self.is_masked(ps) {
                slp1[i] = MISSING;
                slp2[i] = MISSING;
                continue;
            }
            let tsfc = t[kbc * n2d + i] - LRATE * (h[kbc * n2d + i] - ht[i]);
            slp1[i] = ps * f32::exp(-GTI / (RGAS * LRATE) * f32::ln(1. - ht[i] * LRATE / tsfc));
            slp2[i] = ps * f32::exp(GTI * ht[i] / (RGAS * 0.5 * (tg[i] + STDT)));
        }
        Ok(())
    }
}
