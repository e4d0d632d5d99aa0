//! Python bindings (feature `python`)

use crate::config::RegionTable;
use crate::core::band::Band;
use crate::core::product::SatelliteImage;
use crate::types::{GeoPoint, ImageryError};
use numpy::ToPyArray;
use pyo3::exceptions::{PyIndexError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: ImageryError) -> PyErr {
    match err {
        ImageryError::OutOfBounds { .. } => PyIndexError::new_err(err.to_string()),
        ImageryError::NotFound(_) => PyKeyError::new_err(err.to_string()),
        ImageryError::EmptyRegion(_) | ImageryError::InvalidFormat(_) => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Python module definition
#[pymodule]
fn estuary_imagery(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PySatelliteImage>()?;
    m.add_function(wrap_pyfunction!(region_names, m)?)?;
    Ok(())
}

/// Names of the built-in regions
#[pyfunction]
fn region_names() -> PyResult<Vec<String>> {
    let table = RegionTable::builtin().map_err(to_py_err)?;
    Ok(table.names().map(str::to_string).collect())
}

/// Python wrapper for SatelliteImage
#[pyclass(name = "SatelliteImage")]
struct PySatelliteImage {
    inner: SatelliteImage,
}

#[pymethods]
impl PySatelliteImage {
    /// Load a product written by `save`
    #[staticmethod]
    fn load(path: String) -> PyResult<Self> {
        let inner = SatelliteImage::load(&path).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Build a product from a Sentinel-2 L2A zip for a built-in region
    #[cfg(feature = "gdal")]
    #[staticmethod]
    fn from_sentinel(path: String, region: String) -> PyResult<Self> {
        let archive = crate::io::SentinelArchive::new(&path).map_err(to_py_err)?;
        let table = RegionTable::builtin().map_err(to_py_err)?;
        let region = table.get(&region).map_err(to_py_err)?;
        let inner = crate::core::build_one(&archive, region, &crate::FamilyConfig::sentinel2())
            .map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Build a product from a Polymer netCDF for a built-in region
    #[cfg(feature = "gdal")]
    #[staticmethod]
    fn from_polymer(path: String, region: String) -> PyResult<Self> {
        let product = crate::io::PolymerNetcdf::new(&path).map_err(to_py_err)?;
        let table = RegionTable::builtin().map_err(to_py_err)?;
        let region = table.get(&region).map_err(to_py_err)?;
        let inner =
            crate::core::build_one(&product, region, &crate::FamilyConfig::polymer()).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn save(&self, folder: String) -> PyResult<String> {
        let path = self.inner.save(&folder).map_err(to_py_err)?;
        Ok(path.display().to_string())
    }

    /// Band as a numpy array (2-D, or 3-D for stacked bands)
    fn band(&self, py: Python, name: &str) -> PyResult<PyObject> {
        match self.inner.band(name).map_err(to_py_err)? {
            Band::Single(data) => Ok(data.to_pyarray(py).into_py(py)),
            Band::Stacked(data) => Ok(data.to_pyarray(py).into_py(py)),
        }
    }

    fn pixel_for(&self, longitude: f64, latitude: f64) -> PyResult<(usize, usize)> {
        self.inner
            .pixel_for(GeoPoint::new(longitude, latitude))
            .map_err(to_py_err)
    }

    /// (longitude, latitude) of a cell
    fn geo_for(&self, row: usize, col: usize) -> PyResult<(f64, f64)> {
        let point = self.inner.geo_for(row, col).map_err(to_py_err)?;
        Ok((point.longitude, point.latitude))
    }

    #[getter]
    fn key(&self) -> String {
        self.inner.key()
    }

    #[getter]
    fn date(&self) -> String {
        self.inner.date().to_string()
    }

    #[getter]
    fn region(&self) -> String {
        self.inner.region().to_string()
    }

    #[getter]
    fn atmospheric_correction(&self) -> &'static str {
        self.inner.atmospheric_correction()
    }

    #[getter]
    fn shape(&self) -> (usize, usize) {
        self.inner.image_shape()
    }

    #[getter]
    fn before_transform_image_shape(&self) -> (usize, usize) {
        self.inner.before_transform_image_shape()
    }

    #[getter]
    fn band_names(&self) -> Vec<String> {
        self.inner.bands().names().map(str::to_string).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "SatelliteImage(key='{}', correction='{}', shape={:?})",
            self.inner.key(),
            self.inner.atmospheric_correction(),
            self.inner.image_shape()
        )
    }
}
