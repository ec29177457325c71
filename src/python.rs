//! Python interface
//!
//! NOTE: this is the only module that uses `pyo3`. Arrays cross the boundary
//! in C order: `(level, x, y)` for sigma- and pressure-level fields and
//! `(x, y)` for surface fields, which is the flat layout used by the rest of
//! the crate.

use log::debug;
use ndarray::{Array2, Array3, Dimension};
use numpy::prelude::*;
use numpy::{
    Element, PyArray1, PyArray2, PyArray3, PyReadonlyArray, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArray3, ToPyArray,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::constants::MISSING;
use crate::diagnostics::{AtmosphereCalculator, AtmosphereInputs, SurfaceCalculator};
use crate::error::PostError;
use crate::grid::GridDescriptor;
use crate::plev::{HtsigMode, PressureLevels};

impl From<PostError> for PyErr {
    fn from(e: PostError) -> Self {
        match e {
            PostError::InconsistentInputs => PyValueError::new_err(e.to_string()),
            PostError::InvalidSigma => PyValueError::new_err(e.to_string()),
            PostError::InvalidGrid => PyValueError::new_err(e.to_string()),
            PostError::UnresolvableBracket { .. } => PyValueError::new_err(e.to_string()),
            PostError::NotContiguous => PyValueError::new_err(e.to_string()),
        }
    }
}

fn contiguous<'a, T: Element, D: Dimension>(
    array: &'a PyReadonlyArray<'_, T, D>,
) -> Result<&'a [T], PostError> {
    array.as_slice().map_err(|_| PostError::NotContiguous)
}

fn check_shape<T: Element, D: Dimension>(
    array: &PyReadonlyArray<'_, T, D>,
    expected: &[usize],
) -> Result<(), PostError> {
    if array.shape() == expected {
        Ok(())
    } else {
        Err(PostError::InconsistentInputs)
    }
}

fn level_array(values: &[f32], shape: (usize, usize, usize)) -> Result<Array3<f32>, PostError> {
    Array3::from_shape_vec(shape, values.to_vec()).map_err(|_| PostError::InconsistentInputs)
}

fn surface_array(values: Vec<f32>, shape: (usize, usize)) -> Result<Array2<f32>, PostError> {
    Array2::from_shape_vec(shape, values).map_err(|_| PostError::InconsistentInputs)
}

/// Derived fields on sigma levels.
///
/// Each array is dimensioned as (`num_levels`, `nx`, `ny`).
#[pyclass(name = "AtmosphereFields")]
struct PyAtmosphereFields {
    pressure: Array3<f32>,
    relative_humidity: Array3<f32>,
    dewpoint: Array3<f32>,
    potential_temperature: Array3<f32>,
    height: Array3<f32>,
    vorticity: Array3<f32>,
    divergence: Array3<f32>,
}

/// Implement all the "getters" for the Python properties
#[pymethods]
impl PyAtmosphereFields {
    #[getter]
    fn pressure<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.pressure.to_pyarray(py)
    }

    #[getter]
    fn relative_humidity<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.relative_humidity.to_pyarray(py)
    }

    #[getter]
    fn dewpoint<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.dewpoint.to_pyarray(py)
    }

    #[getter]
    fn potential_temperature<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.potential_temperature.to_pyarray(py)
    }

    #[getter]
    fn height<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.height.to_pyarray(py)
    }

    #[getter]
    fn vorticity<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.vorticity.to_pyarray(py)
    }

    #[getter]
    fn divergence<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f32>> {
        self.divergence.to_pyarray(py)
    }
}

/// Sigma-level diagnostics for one model grid.
///
/// `sigma` holds the `num_levels + 1` full-level sigma values, top first.
/// `xmap`, `dmap` and `topography` have shape (`nx`, `ny`), which fixes the
/// grid extents. `half_levels` optionally replaces the layer midpoints.
#[pyclass]
struct AtmosphereDiagnostics {
    calculator: AtmosphereCalculator,
    nx: usize,
    ny: usize,
}

#[pymethods]
impl AtmosphereDiagnostics {
    #[new]
    #[pyo3(signature = (ptop, ds, sigma, xmap, dmap, topography, half_levels=None))]
    fn new(
        ptop: f32,
        ds: f32,
        sigma: PyReadonlyArray1<'_, f32>,
        xmap: PyReadonlyArray2<'_, f32>,
        dmap: PyReadonlyArray2<'_, f32>,
        topography: PyReadonlyArray2<'_, f32>,
        half_levels: Option<PyReadonlyArray1<'_, f32>>,
    ) -> PyResult<Self> {
        let shape = topography.shape();
        let (nx, ny) = (shape[0], shape[1]);
        check_shape(&xmap, &[nx, ny])?;
        check_shape(&dmap, &[nx, ny])?;

        let mut grid = GridDescriptor::new(
            nx,
            ny,
            ptop,
            ds,
            contiguous(&sigma)?.to_vec(),
            contiguous(&xmap)?.to_vec(),
            contiguous(&dmap)?.to_vec(),
            contiguous(&topography)?.to_vec(),
        )?;
        if let Some(half_levels) = half_levels {
            grid = grid.with_half_levels(contiguous(&half_levels)?.to_vec())?;
        }

        Ok(Self {
            calculator: AtmosphereCalculator::new(&grid),
            nx,
            ny,
        })
    }

    /// Compute the derived fields for one time slice.
    ///
    /// `ps` has shape (`nx`, `ny`), the others (`num_levels`, `nx`, `ny`).
    #[pyo3(signature = (ps, t, q, u, v))]
    fn compute(
        &mut self,
        ps: PyReadonlyArray2<'_, f32>,
        t: PyReadonlyArray3<'_, f32>,
        q: PyReadonlyArray3<'_, f32>,
        u: PyReadonlyArray3<'_, f32>,
        v: PyReadonlyArray3<'_, f32>,
    ) -> PyResult<PyAtmosphereFields> {
        let shape = (self.calculator.nk(), self.nx, self.ny);
        check_shape(&ps, &[shape.1, shape.2])?;
        for field in [&t, &q, &u, &v] {
            check_shape(field, &[shape.0, shape.1, shape.2])?;
        }

        let inputs = AtmosphereInputs {
            ps: contiguous(&ps)?,
            t: contiguous(&t)?,
            q: contiguous(&q)?,
            u: contiguous(&u)?,
            v: contiguous(&v)?,
        };
        let fields = self.calculator.compute(&inputs)?;

        debug!("copying sigma-level diagnostics");
        Ok(PyAtmosphereFields {
            pressure: level_array(fields.pressure, shape)?,
            relative_humidity: level_array(fields.relative_humidity, shape)?,
            dewpoint: level_array(fields.dewpoint, shape)?,
            potential_temperature: level_array(fields.potential_temperature, shape)?,
            height: level_array(fields.height, shape)?,
            vorticity: level_array(fields.vorticity, shape)?,
            divergence: level_array(fields.divergence, shape)?,
        })
    }
}

/// Interpolation from sigma levels onto a fixed set of pressure levels.
///
/// `levels` are the target pressures and `sigma` the sigma value of every
/// input field level, top first. Sigma-level inputs have shape
/// (`len(sigma)`, `nx`, `ny`), surface inputs (`nx`, `ny`), and results
/// (`len(levels)`, `nx`, `ny`).
#[pyclass]
struct PressureLevelInterpolator {
    engine: PressureLevels,
    nx: usize,
    ny: usize,
}

#[pymethods]
impl PressureLevelInterpolator {
    #[new]
    #[pyo3(signature = (levels, ptop, sigma, nx, ny))]
    fn new(
        levels: PyReadonlyArray1<'_, f32>,
        ptop: f32,
        sigma: PyReadonlyArray1<'_, f32>,
        nx: usize,
        ny: usize,
    ) -> PyResult<Self> {
        let engine = PressureLevels::new(
            contiguous(&levels)?,
            ptop,
            nx,
            ny,
            contiguous(&sigma)?,
        )?;
        Ok(Self { engine, nx, ny })
    }

    #[getter]
    fn levels<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        self.engine.levels().to_pyarray(py)
    }

    /// Geopotential height on the pressure levels.
    fn height<'py>(
        &self,
        py: Python<'py>,
        h: PyReadonlyArray3<'py, f32>,
        t: PyReadonlyArray3<'py, f32>,
        pstar: PyReadonlyArray2<'py, f32>,
        ht: PyReadonlyArray2<'py, f32>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        self.check_sigma_fields(&[&h, &t])?;
        self.check_surface_fields(&[&pstar, &ht])?;

        let mut hp = vec![MISSING; self.engine.output_len()];
        self.engine.height(
            &mut hp,
            contiguous(&h)?,
            contiguous(&t)?,
            contiguous(&pstar)?,
            contiguous(&ht)?,
        )?;
        self.pressure_level_array(py, &hp)
    }

    /// Interpolate a field linearly in sigma.
    fn intlin<'py>(
        &self,
        py: Python<'py>,
        f: PyReadonlyArray3<'py, f32>,
        pstar: PyReadonlyArray2<'py, f32>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        self.check_sigma_fields(&[&f])?;
        self.check_surface_fields(&[&pstar])?;

        let mut fp = vec![MISSING; self.engine.output_len()];
        self.engine
            .intlin(&mut fp, contiguous(&f)?, contiguous(&pstar)?)?;
        self.pressure_level_array(py, &fp)
    }

    /// Interpolate a field linearly in `ln(sigma)`, extrapolating below
    /// ground with the standard lapse rate.
    fn intlog<'py>(
        &self,
        py: Python<'py>,
        f: PyReadonlyArray3<'py, f32>,
        pstar: PyReadonlyArray2<'py, f32>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        self.check_sigma_fields(&[&f])?;
        self.check_surface_fields(&[&pstar])?;

        let mut fp = vec![MISSING; self.engine.output_len()];
        self.engine
            .intlog(&mut fp, contiguous(&f)?, contiguous(&pstar)?)?;
        self.pressure_level_array(py, &fp)
    }

    /// Recompute sigma-level heights from the topography and return them as
    /// a new array. Only the lowest layer changes unless `full_column` is
    /// set.
    #[pyo3(signature = (t, h, pstar, ht, full_column=false))]
    fn htsig<'py>(
        &self,
        py: Python<'py>,
        t: PyReadonlyArray3<'py, f32>,
        h: PyReadonlyArray3<'py, f32>,
        pstar: PyReadonlyArray2<'py, f32>,
        ht: PyReadonlyArray2<'py, f32>,
        full_column: bool,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        self.check_sigma_fields(&[&t, &h])?;
        self.check_surface_fields(&[&pstar, &ht])?;

        let mode = if full_column {
            HtsigMode::FullColumn
        } else {
            HtsigMode::LowestLayerOnly
        };
        let mut out = contiguous(&h)?.to_vec();
        self.engine.htsig(
            contiguous(&t)?,
            &mut out,
            contiguous(&pstar)?,
            contiguous(&ht)?,
            mode,
        )?;

        let shape = (self.engine.sigma().len(), self.nx, self.ny);
        Ok(level_array(&out, shape)?.into_pyarray(py))
    }

    /// The two sea-level pressure estimates, each of shape (`nx`, `ny`).
    fn slpres<'py>(
        &self,
        py: Python<'py>,
        h: PyReadonlyArray3<'py, f32>,
        t: PyReadonlyArray3<'py, f32>,
        pstar: PyReadonlyArray2<'py, f32>,
        ht: PyReadonlyArray2<'py, f32>,
        tg: PyReadonlyArray2<'py, f32>,
    ) -> PyResult<(Bound<'py, PyArray2<f32>>, Bound<'py, PyArray2<f32>>)> {
        self.check_sigma_fields(&[&h, &t])?;
        self.check_surface_fields(&[&pstar, &ht, &tg])?;

        let n2d = self.engine.n2d();
        let mut slp1 = vec![MISSING; n2d];
        let mut slp2 = vec![MISSING; n2d];
        self.engine.slpres(
            contiguous(&h)?,
            contiguous(&t)?,
            contiguous(&pstar)?,
            contiguous(&ht)?,
            contiguous(&tg)?,
            &mut slp1,
            &mut slp2,
        )?;

        let shape = (self.nx, self.ny);
        Ok((
            surface_array(slp1, shape)?.into_pyarray(py),
            surface_array(slp2, shape)?.into_pyarray(py),
        ))
    }
}

impl PressureLevelInterpolator {
    fn check_sigma_fields(&self, fields: &[&PyReadonlyArray3<'_, f32>]) -> Result<(), PostError> {
        let expected = [self.engine.sigma().len(), self.nx, self.ny];
        fields.iter().try_for_each(|f| check_shape(*f, &expected))
    }

    fn check_surface_fields(&self, fields: &[&PyReadonlyArray2<'_, f32>]) -> Result<(), PostError> {
        fields.iter().try_for_each(|f| check_shape(*f, &[self.nx, self.ny]))
    }

    fn pressure_level_array<'py>(
        &self,
        py: Python<'py>,
        values: &[f32],
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let shape = (self.engine.levels().len(), self.nx, self.ny);
        Ok(level_array(values, shape)?.into_pyarray(py))
    }
}

/// Relative humidity at 2 m.
///
/// `ps`, `t2` and `q2` are surface pressure in hPa, 2 m temperature in K and
/// 2 m specific humidity in kg/kg, each of shape (`nx`, `ny`). Cells with a
/// non-positive surface pressure are set to `MISSING`.
#[pyfunction]
#[pyo3(signature = (ps, t2, q2))]
fn surface_relative_humidity<'py>(
    py: Python<'py>,
    ps: PyReadonlyArray2<'py, f32>,
    t2: PyReadonlyArray2<'py, f32>,
    q2: PyReadonlyArray2<'py, f32>,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let shape = ps.shape();
    let (nx, ny) = (shape[0], shape[1]);
    check_shape(&t2, &[nx, ny])?;
    check_shape(&q2, &[nx, ny])?;

    let mut calculator = SurfaceCalculator::new(nx, ny);
    let rh = calculator.compute(contiguous(&ps)?, contiguous(&t2)?, contiguous(&q2)?)?;
    Ok(surface_array(rh.to_vec(), (nx, ny))?.into_pyarray(py))
}

/// A Python module implemented in Rust.
#[pymodule]
fn regcm_post(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add("MISSING", MISSING)?;
    m.add_function(wrap_pyfunction!(surface_relative_humidity, m)?)?;
    m.add_class::<AtmosphereDiagnostics>()?;
    m.add_class::<PyAtmosphereFields>()?;
    m.add_class::<PressureLevelInterpolator>()?;
    Ok(())
}
