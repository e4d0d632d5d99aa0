use crate::core::projection;
use crate::types::{
    AffineMatrix, Crs, GeoPoint, ImageryError, ImageryResult, PixelIndex, ProjectedPoint,
};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Converts between geographic coordinates and raw (pre-transformation) pixel indices
pub trait IndexResolver {
    /// Nearest raw pixel for a geographic point, rounded to whole cells
    fn resolve(&self, point: GeoPoint) -> ImageryResult<PixelIndex>;

    /// Geographic position of a raw pixel index
    fn locate(&self, index: PixelIndex) -> ImageryResult<GeoPoint>;
}

/// Resolver for affine-georeferenced rasters in WGS84 or one UTM zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineResolver {
    matrix: AffineMatrix,
    inverse: AffineMatrix,
    crs: Crs,
}

impl AffineResolver {
    pub fn new(matrix: AffineMatrix, crs: Crs) -> ImageryResult<Self> {
        let inverse = matrix.inverse()?;
        Ok(Self {
            matrix,
            inverse,
            crs,
        })
    }

    /// Build from a CRS identifier such as `EPSG:32620`
    pub fn from_crs_str(matrix: AffineMatrix, crs: &str) -> ImageryResult<Self> {
        Self::new(matrix, Crs::parse(crs)?)
    }

    pub fn matrix(&self) -> &AffineMatrix {
        &self.matrix
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Native-CRS coordinates of a fractional raw index
    pub fn index_to_native(&self, index: PixelIndex) -> ProjectedPoint {
        let (easting, northing) = self.matrix.apply(index.col, index.row);
        ProjectedPoint { easting, northing }
    }

    /// Fractional raw index of a native-CRS point
    pub fn native_to_index(&self, point: ProjectedPoint) -> PixelIndex {
        let (col, row) = self.inverse.apply(point.easting, point.northing);
        PixelIndex { row, col }
    }
}

impl IndexResolver for AffineResolver {
    fn resolve(&self, point: GeoPoint) -> ImageryResult<PixelIndex> {
        let native = projection::to_native(point, self.crs)?;
        Ok(self.native_to_index(native).rounded())
    }

    fn locate(&self, index: PixelIndex) -> ImageryResult<GeoPoint> {
        projection::from_native(self.index_to_native(index), self.crs)
    }
}

/// Brute-force nearest-cell search over per-pixel longitude/latitude arrays.
///
/// The grid is viewed in place (the `lon`/`lat` bands of a product). No
/// reprojection is applied: queries are compared in grid units. NaN cells are
/// skipped; equidistant cells resolve to the smallest (row, col).
#[derive(Debug, Clone)]
pub struct NearestGridResolver<'a> {
    lon: ArrayView2<'a, f32>,
    lat: ArrayView2<'a, f32>,
}

impl<'a> NearestGridResolver<'a> {
    pub fn new(lon: ArrayView2<'a, f32>, lat: ArrayView2<'a, f32>) -> ImageryResult<Self> {
        if lon.dim() != lat.dim() {
            return Err(ImageryError::InvalidFormat(format!(
                "longitude grid {:?} and latitude grid {:?} differ in shape",
                lon.dim(),
                lat.dim()
            )));
        }
        Ok(Self { lon, lat })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.lon.dim()
    }

    /// Cell nearest to `point`
    pub fn nearest_cell(&self, point: GeoPoint) -> ImageryResult<(usize, usize)> {
        let (rows, cols) = self.shape();
        if rows == 0 || cols == 0 {
            return Err(ImageryError::ResolutionFailure(
                "coordinate grid is empty".to_string(),
            ));
        }

        let mut best: Option<(f64, usize, usize)> = None;
        for ((row, col), &lon) in self.lon.indexed_iter() {
            let lat = self.lat[[row, col]];
            if lon.is_nan() || lat.is_nan() {
                continue;
            }
            let dlon = point.longitude - lon as f64;
            let dlat = point.latitude - lat as f64;
            let distance = dlon * dlon + dlat * dlat;

            let better = match best {
                None => true,
                Some((best_distance, best_row, best_col)) => {
                    distance < best_distance
                        || (distance == best_distance && (row, col) < (best_row, best_col))
                }
            };
            if better {
                best = Some((distance, row, col));
            }
        }

        best.map(|(_, row, col)| (row, col)).ok_or_else(|| {
            ImageryError::ResolutionFailure("coordinate grid holds no valid cells".to_string())
        })
    }
}

impl IndexResolver for NearestGridResolver<'_> {
    fn resolve(&self, point: GeoPoint) -> ImageryResult<PixelIndex> {
        let (row, col) = self.nearest_cell(point)?;
        Ok(PixelIndex::from_cell(row, col))
    }

    fn locate(&self, index: PixelIndex) -> ImageryResult<GeoPoint> {
        let (row, col) = index.to_cell(self.shape())?;
        let lon = self.lon[[row, col]];
        let lat = self.lat[[row, col]];
        if lon.is_nan() || lat.is_nan() {
            let rounded = index.rounded();
            let (rows, cols) = self.shape();
            return Err(ImageryError::OutOfBounds {
                row: rounded.row,
                col: rounded.col,
                rows,
                cols,
            });
        }
        Ok(GeoPoint::new(lon as f64, lat as f64))
    }
}
