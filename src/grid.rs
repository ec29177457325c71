//! Horizontal and vertical description of the model domain.
//!
//! Level index `0` is the model top. Horizontal cells are packed as
//! `i = ix * ny + jy`, and a 3D value lives at `k * nh + i`.

use crate::error::{PostError, Result};

/// Immutable description of the model grid for a whole run.
#[derive(Debug, Clone)]
pub struct GridDescriptor {
    nx: usize,
    ny: usize,
    /// Top-of-model pressure in hPa
    ptop: f32,
    /// Horizontal grid spacing in m
    ds: f32,
    /// Full sigma levels, `nz` values from the model top down to 1
    sigma: Vec<f32>,
    /// Layer midpoints, `nz - 1` values in the same order as `sigma`
    half_levels: Vec<f32>,
    /// Map factors on cross (mass) points
    xmap: Vec<f32>,
    /// Map factors on dot (velocity) points
    dmap: Vec<f32>,
    /// Surface height on cross points in m
    topography: Vec<f32>,
}

impl GridDescriptor {
    /// Validate and assemble the grid.
    ///
    /// `sigma` holds the full levels: strictly increasing, within `[0, 1]`,
    /// and ending at exactly 1. The layer midpoints are derived from it; use
    /// [`GridDescriptor::with_half_levels`] to supply them explicitly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nx: usize,
        ny: usize,
        ptop: f32,
        ds: f32,
        sigma: Vec<f32>,
        xmap: Vec<f32>,
        dmap: Vec<f32>,
        topography: Vec<f32>,
    ) -> Result<Self> {
        if nx == 0 || ny == 0 || !(ds > 0.) || !(ptop >= 0.) {
            return Err(PostError::InvalidGrid);
        }
        validate_sigma(&sigma)?;
        if sigma[sigma.len() - 1] != 1. {
            return Err(PostError::InvalidSigma);
        }

        let nh = nx * ny;
        if [xmap.len(), dmap.len(), topography.len()]
            .iter()
            .any(|&len| len != nh)
        {
            return Err(PostError::InconsistentInputs);
        }

        let half_levels = sigma.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

        Ok(Self {
            nx,
            ny,
            ptop,
            ds,
            sigma,
            half_levels,
            xmap,
            dmap,
            topography,
        })
    }

    /// Replace the derived layer midpoints with header-supplied values.
    pub fn with_half_levels(mut self, half_levels: Vec<f32>) -> Result<Self> {
        if half_levels.len() != self.nk() {
            return Err(PostError::InconsistentInputs);
        }
        if half_levels.iter().any(|s| !(0. ..=1.).contains(s)) {
            return Err(PostError::InvalidSigma);
        }
        self.half_levels = half_levels;
        Ok(self)
    }

    /// Number of cells along the first horizontal axis.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of cells along the second horizontal axis.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Horizontal cell count, `nx * ny`.
    pub fn nh(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of full sigma levels.
    pub fn nz(&self) -> usize {
        self.sigma.len()
    }

    /// Number of model layers, one fewer than the full levels.
    pub fn nk(&self) -> usize {
        self.sigma.len() - 1
    }

    /// Top-of-model pressure.
    pub fn ptop(&self) -> f32 {
        self.ptop
    }

    /// Horizontal grid spacing.
    pub fn ds(&self) -> f32 {
        self.ds
    }

    /// Full sigma levels.
    pub fn sigma(&self) -> &[f32] {
        &self.sigma
    }

    /// Layer midpoint sigma values.
    pub fn half_levels(&self) -> &[f32] {
        &self.half_levels
    }

    /// Map factors on cross points.
    pub fn xmap(&self) -> &[f32] {
        &self.xmap
    }

    /// Map factors on dot points.
    pub fn dmap(&self) -> &[f32] {
        &self.dmap
    }

    /// Surface height on cross points.
    pub fn topography(&self) -> &[f32] {
        &self.topography
    }
}

/// Check that a sigma table has at least two strictly increasing values in
/// `[0, 1]`.
pub(crate) fn validate_sigma(sigma: &[f32]) -> Result<()> {
    if sigma.len() < 2 {
        return Err(PostError::InvalidSigma);
    }
    let in_range = sigma.iter().all(|s| (0. ..=1.).contains(s));
    let increasing = sigma.windows(2).all(|w| w[0] < w[1]);
    if in_range && increasing {
        Ok(())
    } else {
        Err(PostError::InvalidSigma)
    }
}

/// Index of the boundary-layer-top level: the highest index whose sigma is
/// still below [`BLTOP`](crate::constants::BLTOP), or 0 if there is none.
pub(crate) fn boundary_layer_top(sigma: &[f32]) -> usize {
    sigma
        .iter()
        .rposition(|&s| s < crate::constants::BLTOP)
        .unwrap_or(0)
}

/// Whether a column should be skipped because its surface pressure is not a
/// positive number. The sentinel is negative, so it is caught here as well.
#[inline]
pub(crate) fn is_masked(surface_pressure: f32) -> bool {
    !(surface_pressure > 0.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(sigma: Vec<f32>) -> Result<GridDescriptor> {
        GridDescriptor::new(2, 3, 5., 60e3, sigma, vec![1.; 6], vec![1.; 6], vec![0.; 6])
    }

    #[test]
    fn derives_half_levels() {
        let g = grid(vec![0., 0.5, 0.9, 1.]).unwrap();
        assert_eq!(g.nh(), 6);
        assert_eq!(g.nz(), 4);
        assert_eq!(g.nk(), 3);
        for (got, want) in g.half_levels().iter().zip([0.25, 0.7, 0.95]) {
            assert_relative_eq!(*got, want);
        }
    }

    #[test]
    fn rejects_bad_sigma() {
        assert_eq!(grid(vec![0., 0.5, 0.9]).unwrap_err(), PostError::InvalidSigma);
        assert_eq!(grid(vec![0., 0.9, 0.5, 1.]).unwrap_err(), PostError::InvalidSigma);
        assert_eq!(grid(vec![1.]).unwrap_err(), PostError::InvalidSigma);
        assert_eq!(grid(vec![-0.1, 1.]).unwrap_err(), PostError::InvalidSigma);
    }

    #[test]
    fn rejects_mismatched_map_factors() {
        let err = GridDescriptor::new(
            2,
            3,
            5.,
            60e3,
            vec![0., 1.],
            vec![1.; 5],
            vec![1.; 6],
            vec![0.; 6],
        )
        .unwrap_err();
        assert_eq!(err, PostError::InconsistentInputs);
    }

    #[test]
    fn explicit_half_levels() {
        let g = grid(vec![0., 0.5, 1.]).unwrap();
        let g = g.with_half_levels(vec![0.3, 1.]).unwrap();
        assert_eq!(g.half_levels(), &[0.3, 1.]);

        let g = grid(vec![0., 0.5, 1.]).unwrap();
        assert!(g.with_half_levels(vec![0.3]).is_err());
    }

    #[test]
    fn boundary_layer_top_index() {
        assert_eq!(boundary_layer_top(&[0.1, 0.5, 0.95, 0.99]), 2);
        assert_eq!(boundary_layer_top(&[0.97, 0.99]), 0);
    }

    #[test]
    fn masking() {
        assert!(is_masked(0.));
        assert!(is_masked(crate::constants::MISSING));
        assert!(is_masked(f32::NAN));
        assert!(!is_masked(1000.));
    }
}
