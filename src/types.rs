use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Single-channel band data (rows x cols)
pub type BandImage = Array2<f32>;

/// Stacked band data (rows x cols x channels)
pub type BandCube = Array3<f32>;

/// Boolean validity mask, same shape as the final bands
pub type Mask = Array2<bool>;

/// Geographic coordinate in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }
}

/// Projected coordinate in metres (native CRS of an affine raster)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub easting: f64,
    pub northing: f64,
}

/// Zero-based (row, col) position, fractional while inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelIndex {
    pub row: f64,
    pub col: f64,
}

impl PixelIndex {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    pub fn from_cell(row: usize, col: usize) -> Self {
        Self {
            row: row as f64,
            col: col as f64,
        }
    }

    /// Round both coordinates to the nearest integer
    pub fn rounded(self) -> Self {
        Self {
            row: self.row.round(),
            col: self.col.round(),
        }
    }

    /// Round and check against `shape`, returning the cell it falls in
    pub fn to_cell(self, shape: (usize, usize)) -> ImageryResult<(usize, usize)> {
        let rounded = self.rounded();
        let (rows, cols) = shape;
        if !rounded.row.is_finite()
            || !rounded.col.is_finite()
            || rounded.row < 0.0
            || rounded.col < 0.0
            || rounded.row >= rows as f64
            || rounded.col >= cols as f64
        {
            return Err(ImageryError::OutOfBounds {
                row: rounded.row,
                col: rounded.col,
                rows,
                cols,
            });
        }
        Ok((rounded.row as usize, rounded.col as usize))
    }
}

/// Affine georeferencing, rasterio ordering:
/// `x = a*col + b*row + c`, `y = d*col + e*row + f`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineMatrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Build from a GDAL geotransform `[c, a, b, f, d, e]`
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            a: gt[1],
            b: gt[2],
            c: gt[0],
            d: gt[4],
            e: gt[5],
            f: gt[3],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Map (col, row) to (x, y)
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    pub fn inverse(&self) -> ImageryResult<AffineMatrix> {
        let det = self.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return Err(ImageryError::InvalidFormat(format!(
                "Affine matrix is not invertible (determinant {})",
                det
            )));
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Ok(AffineMatrix {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        })
    }
}

/// UTM zone on the WGS84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmZone {
    pub zone: u8,
    pub north: bool,
}

impl UtmZone {
    pub fn epsg_code(&self) -> u32 {
        if self.north {
            32600 + self.zone as u32
        } else {
            32700 + self.zone as u32
        }
    }

    /// Central meridian in degrees
    pub fn central_meridian(&self) -> f64 {
        (self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }
}

/// The two coordinate systems a product may be delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    Wgs84,
    Utm(UtmZone),
}

impl Crs {
    pub fn from_epsg(epsg: u32) -> ImageryResult<Crs> {
        match epsg {
            4326 => Ok(Crs::Wgs84),
            32601..=32660 => Ok(Crs::Utm(UtmZone {
                zone: (epsg - 32600) as u8,
                north: true,
            })),
            32701..=32760 => Ok(Crs::Utm(UtmZone {
                zone: (epsg - 32700) as u8,
                north: false,
            })),
            _ => Err(ImageryError::Projection(format!(
                "Unsupported EPSG code: {}",
                epsg
            ))),
        }
    }

    /// Parse `EPSG:32620` style identifiers
    pub fn parse(crs: &str) -> ImageryResult<Crs> {
        let pattern = regex::Regex::new(r"(?i)^\s*epsg\s*:\s*(\d+)\s*$")
            .map_err(|e| ImageryError::Projection(format!("CRS pattern: {}", e)))?;
        let code = pattern
            .captures(crs)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| ImageryError::Projection(format!("Malformed CRS: '{}'", crs)))?;
        Crs::from_epsg(code)
    }

    pub fn epsg_code(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Utm(zone) => zone.epsg_code(),
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

/// Error types for imagery extraction
#[derive(Debug, thiserror::Error)]
pub enum ImageryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Empty region: {0}")]
    EmptyRegion(String),

    #[error("Index resolution failed: {0}")]
    ResolutionFailure(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Index ({row}, {col}) outside {rows}x{cols} extent")]
    OutOfBounds {
        row: f64,
        col: f64,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Zip archive error: {0}")]
    Zip(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

impl From<ndarray::ShapeError> for ImageryError {
    fn from(err: ndarray::ShapeError) -> Self {
        ImageryError::InvalidFormat(format!("Array shape error: {}", err))
    }
}

/// Result type for imagery operations
pub type ImageryResult<T> = Result<T, ImageryError>;
