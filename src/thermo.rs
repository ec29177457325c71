//! Pointwise thermodynamic formulas.
//!
//! Pressures are in hPa, temperatures in K, specific humidity in kg/kg.

use crate::constants::{EP2, P0, ROVCP, SVP1, SVP2, SVP3, SVP4, SVP5, SVP6, TZERO};

/// Saturation vapor pressure over water or ice.
///
/// Above freezing this is Bolton's form, `SVP1 exp(SVP2 (t - TZERO) / (t -
/// SVP3))`. At or below freezing a separate exponential in `1/t` is used.
pub fn saturation_vapor_pressure(t: f32) -> f32 {
    if t > TZERO {
        SVP1 * f32::exp(SVP2 * (t - TZERO) / (t - SVP3))
    } else {
        SVP4 * f32::exp(SVP5 - SVP6 / t)
    }
}

/// Relative humidity as a fraction in `[0, 1]`.
///
/// For a pressure `p`, temperature `t` and specific humidity `q`, compute
/// the ratio of `q` to the saturation specific humidity. The result is
/// clamped since the raw ratio can leave the unit interval (super-saturation,
/// negative humidity from numerical noise).
///
/// The caller must make sure `p` differs from the saturation vapor pressure.
pub fn relative_humidity(p: f32, t: f32, q: f32) -> f32 {
    let satvp = saturation_vapor_pressure(t);
    let qs = EP2 * satvp / (p - satvp);
    (q / qs).clamp(0., 1.)
}

/// Dew-point temperature in K.
///
/// The dew-point depression is an empirical polynomial in the humidity
/// deficit `1 - rh` with linear, cubic, and 14th-power terms whose
/// coefficients depend on the Celsius temperature.
pub fn dewpoint(t: f32, rh: f32) -> f32 {
    let rx = 1. - rh;
    let tx = t - TZERO;
    let dpd = (14.55 + 0.144 * tx) * rx
        + 2. * ((2.5 + 0.007 * tx) * rx).powi(3)
        + (15.9 + 0.117 * tx) * rx.powi(14);
    t - dpd
}

/// Potential temperature in K referenced to 1000 hPa.
pub fn potential_temperature(t: f32, p: f32) -> f32 {
    t * (P0 / p).powf(ROVCP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn saturation_branches_meet_at_freezing() {
        // At exactly TZERO the cold branch is selected
        let cold = SVP4 * f32::exp(SVP5 - SVP6 / TZERO);
        assert_eq!(saturation_vapor_pressure(TZERO), cold);

        // Both branches give ~6.1 hPa at the freezing point
        let warm = SVP1 * f32::exp(SVP2 * (TZERO - TZERO) / (TZERO - SVP3));
        assert_relative_eq!(warm, SVP1);
        assert_relative_eq!(cold, warm, max_relative = 0.01);

        // And the transition has no large jump
        let above = saturation_vapor_pressure(TZERO + 1e-2);
        assert_relative_eq!(above, cold, max_relative = 0.01);
    }

    #[test]
    fn saturation_at_room_temperature() {
        // Bolton gives ~23.4 hPa at 20 °C
        assert_abs_diff_eq!(saturation_vapor_pressure(293.15), 23.37, epsilon = 0.05);
    }

    #[test]
    fn relative_humidity_is_clamped() {
        let samples = [
            (1000., 300., 0.0),
            (1000., 300., 0.010),
            (1000., 300., 0.5),
            (850., 260., 0.002),
            (500., 240., -0.001),
            (200., 220., 1e-5),
        ];
        for (p, t, q) in samples {
            let rh = relative_humidity(p, t, q);
            assert!((0. ..=1.).contains(&rh), "rh={rh} for {p} {t} {q}");
        }
        assert_eq!(relative_humidity(1000., 300., 0.5), 1.);
        assert_eq!(relative_humidity(500., 240., -0.001), 0.);
    }

    #[test]
    fn relative_humidity_at_saturation() {
        let p = 900.;
        let t = 285.;
        let es = saturation_vapor_pressure(t);
        let qs = EP2 * es / (p - es);
        assert_relative_eq!(relative_humidity(p, t, 0.5 * qs), 0.5, max_relative = 1e-5);
    }

    #[test]
    fn dewpoint_of_saturated_air() {
        assert_relative_eq!(dewpoint(290., 1.), 290.);
        assert!(dewpoint(290., 0.5) < 290.);
    }

    #[test]
    fn dewpoint_polynomial() {
        // rx = 0.5, tx = 10
        let dpd = (14.55 + 1.44) * 0.5
            + 2. * f32::powi((2.5 + 0.07) * 0.5, 3)
            + (15.9 + 1.17) * 0.5f32.powi(14);
        assert_relative_eq!(dewpoint(283.15, 0.5), 283.15 - dpd, max_relative = 1e-5);
    }

    #[test]
    fn potential_temperature_at_reference() {
        assert_eq!(potential_temperature(287.3, 1000.), 287.3);
        assert!(potential_temperature(250., 500.) > 250.);
    }
}
