//! Generic interpolation of sigma-level fields.

use log::warn;

use super::{last_below, PressureLevels};
use crate::constants::{LRATE, MISSING, RGAS, RGTI};
use crate::error::{PostError, Result, Routine};

impl PressureLevels {
    /// Interpolate `f` linearly in sigma onto the pressure levels.
    ///
    /// Targets above the top sigma level take the top value, targets below
    /// the lowest sigma level take the lowest value. There is no
    /// extrapolation.
    pub fn intlin(&self, fp: &mut [f32], f: &[f32], pstar: &[f32]) -> Result<()> {
        self.interpolate(fp, f, pstar, Routine::Intlin)
    }

    /// Interpolate `f` linearly in `ln(sigma)` onto the pressure levels.
    ///
    /// Targets above the top sigma level take the top value. Between the
    /// lowest sigma level and the ground the lowest value is used. Below
    /// the ground the boundary-layer-top value is extrapolated with the
    /// standard lapse rate, which suits temperature-like fields.
    pub fn intlog(&self, fp: &mut [f32], f: &[f32], pstar: &[f32]) -> Result<()> {
        self.interpolate(fp, f, pstar, Routine::Intlog)
    }

    fn interpolate(&self, fp: &mut [f32], f: &[f32], pstar: &[f32], routine: Routine) -> Result<()> {
        self.check_lengths(&[f], &[pstar])?;
        self.check_output(fp)?;

        let n2d = self.n2d();
        let sig = &self.sigma;
        let (km, kbc) = (self.km, self.kbc);

        for i in 0..n2d {
            let ps = pstar[i];
            if self.is_masked(ps) {
                self.mask_column(fp, i);
                continue;
            }

            for (ip, &plev) in self.levels.iter().enumerate() {
                let sigp = (plev - self.ptop) / (ps - self.ptop);

                fp[ip * n2d + i] = if sigp <= sig[0] {
                    f[i]
                } else if sigp < sig[km] {
                    let k1 = last_below(sig, sigp);
                    let k1p = k1 + 1;
                    let wp = match routine {
                        Routine::Intlog if sig[k1] > 0. => {
                            f32::ln(sigp / sig[k1]) / f32::ln(sig[k1p] / sig[k1])
                        }
                        _ => (sigp - sig[k1]) / (sig[k1p] - sig[k1]),
                    };
                    blend(f[k1 * n2d + i], f[k1p * n2d + i], wp)
                } else if sigp >= sig[km] && (routine == Routine::Intlin || sigp <= 1.) {
                    f[km * n2d + i]
                } else if routine == Routine::Intlog && sigp > 1. {
                    let base = f[kbc * n2d + i];
                    if base == MISSING {
                        MISSING
                    } else {
                        base * f32::exp(-RGAS * LRATE * f32::ln(sigp / sig[kbc]) * RGTI)
                    }
                } else {
                    warn!("pressure level {plev} has no sigma bracket in column {i} (surface {ps})");
                    return Err(PostError::UnresolvableBracket {
                        routine,
                        level: plev,
                    });
                };
            }
        }
        Ok(())
    }
}

/// Weighted mix of two level values, keeping the sentinel if either is
/// masked.
#[inline]
fn blend(f1: f32, f2: f32, wp: f32) -> f32 {
    if f1 == MISSING || f2 == MISSING {
        MISSING
    } else {
        (1. - wp) * f1 + wp * f2
    }
}
