//! Physical and empirical constants shared by every diagnostic.
//!
//! Pressures are in hPa and temperatures in K unless noted otherwise.

/// Value marking a masked or undefined horizontal cell.
pub const MISSING: f32 = -1e34;

/// Freezing point of water in K
pub const TZERO: f32 = 273.15;

/// Specific gas constant for dry air (J/kg/K)
pub const RGAS: f32 = 287.0058;

/// Standard gravitational acceleration (m/s²)
pub const GTI: f32 = 9.80665;

/// Inverse of [`GTI`]
pub const RGTI: f32 = 1.0 / GTI;

/// Specific heat of dry air at constant pressure (J/kg/K)
pub const CPD: f32 = 1005.46;

/// Poisson exponent, `RGAS / CPD`
pub const ROVCP: f32 = RGAS / CPD;

/// Scale height factor, `RGAS / GTI` (m/K)
pub const ROVG: f32 = RGAS / GTI;

/// Sigma threshold for the top of the boundary layer
pub const BLTOP: f32 = 0.96;

/// Standard environmental lapse rate (K/m)
pub const LRATE: f32 = 0.00649;

/// Standard atmosphere sea-level temperature in K
pub const STDT: f32 = 288.15;

/// Ratio of the molecular weights of water vapor and dry air
pub const EP2: f32 = 0.62197;

/// Reference pressure for potential temperature in hPa
pub const P0: f32 = 1000.0;

// Bolton-type saturation vapor pressure coefficients, above freezing
/// Saturation vapor pressure at the freezing point (hPa)
pub const SVP1: f32 = 6.112;
/// Exponent scale above freezing
pub const SVP2: f32 = 17.67;
/// Temperature offset above freezing (K)
pub const SVP3: f32 = 29.65;

// ...and at or below freezing
/// Saturation vapor pressure scale at or below freezing (hPa)
pub const SVP4: f32 = SVP1;
/// Exponent offset at or below freezing
pub const SVP5: f32 = 22.514;
/// Exponent temperature scale at or below freezing (K)
pub const SVP6: f32 = 6150.0;
