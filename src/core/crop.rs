use crate::core::band::Band;
use crate::types::{GeoPoint, ImageryError, ImageryResult, PixelIndex};
use ndarray::s;
use serde::{Deserialize, Serialize};

/// Rectangular subset of the crop input, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonCrop {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
    input_shape: (usize, usize),
}

impl PolygonCrop {
    /// Bounding box of `vertices` once resolved into the crop input space.
    ///
    /// `resolve` maps a vertex to an index in the crop input (raw index pushed
    /// through every preceding transformation). The rounded box is clamped to
    /// `input_shape`; an empty intersection is an `EmptyRegion`.
    pub fn from_vertices<F>(
        vertices: &[GeoPoint],
        input_shape: (usize, usize),
        mut resolve: F,
    ) -> ImageryResult<Self>
    where
        F: FnMut(GeoPoint) -> ImageryResult<PixelIndex>,
    {
        if vertices.is_empty() {
            return Err(ImageryError::EmptyRegion("polygon has no vertices".to_string()));
        }

        let mut row_lo = f64::INFINITY;
        let mut row_hi = f64::NEG_INFINITY;
        let mut col_lo = f64::INFINITY;
        let mut col_hi = f64::NEG_INFINITY;

        for vertex in vertices {
            let index = resolve(*vertex)?.rounded();
            log::debug!(
                "Polygon vertex ({:.5}, {:.5}) -> ({}, {})",
                vertex.longitude,
                vertex.latitude,
                index.row,
                index.col
            );
            row_lo = row_lo.min(index.row);
            row_hi = row_hi.max(index.row);
            col_lo = col_lo.min(index.col);
            col_hi = col_hi.max(index.col);
        }

        Self::from_bounds(row_lo, row_hi, col_lo, col_hi, input_shape)
    }

    /// Clamp a fractional box to the extent of `input_shape`
    pub fn from_bounds(
        row_lo: f64,
        row_hi: f64,
        col_lo: f64,
        col_hi: f64,
        input_shape: (usize, usize),
    ) -> ImageryResult<Self> {
        let (rows, cols) = input_shape;
        if rows == 0 || cols == 0 {
            return Err(ImageryError::EmptyRegion(format!(
                "crop input has shape {:?}",
                input_shape
            )));
        }
        if ![row_lo, row_hi, col_lo, col_hi].iter().all(|v| v.is_finite()) {
            return Err(ImageryError::EmptyRegion("polygon bounds are not finite".to_string()));
        }

        let row_min = row_lo.max(0.0);
        let row_max = row_hi.min((rows - 1) as f64);
        let col_min = col_lo.max(0.0);
        let col_max = col_hi.min((cols - 1) as f64);

        if row_min > row_max || col_min > col_max {
            return Err(ImageryError::EmptyRegion(format!(
                "polygon box rows [{}, {}] cols [{}, {}] misses the {}x{} image",
                row_lo, row_hi, col_lo, col_hi, rows, cols
            )));
        }

        Ok(Self {
            row_min: row_min as usize,
            row_max: row_max as usize,
            col_min: col_min as usize,
            col_max: col_max as usize,
            input_shape,
        })
    }

    /// Crop covering the whole input, used when a region is not subset
    pub fn full_extent(input_shape: (usize, usize)) -> ImageryResult<Self> {
        let (rows, cols) = input_shape;
        Self::from_bounds(0.0, rows as f64 - 1.0, 0.0, cols as f64 - 1.0, input_shape)
    }

    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    pub fn output_shape(&self) -> (usize, usize) {
        (
            self.row_max - self.row_min + 1,
            self.col_max - self.col_min + 1,
        )
    }

    pub fn is_full_extent(&self) -> bool {
        self.row_min == 0
            && self.col_min == 0
            && self.output_shape() == self.input_shape
    }

    pub fn map_index_forward(&self, index: PixelIndex) -> PixelIndex {
        PixelIndex {
            row: index.row - self.row_min as f64,
            col: index.col - self.col_min as f64,
        }
    }

    pub fn map_index_inverse(&self, index: PixelIndex) -> PixelIndex {
        PixelIndex {
            row: index.row + self.row_min as f64,
            col: index.col + self.col_min as f64,
        }
    }

    pub fn transform_band(&self, band: Band) -> ImageryResult<Band> {
        if band.shape() != self.input_shape {
            return Err(ImageryError::InvalidFormat(format!(
                "crop expects shape {:?}, got {:?}",
                self.input_shape,
                band.shape()
            )));
        }
        if self.is_full_extent() {
            return Ok(band);
        }

        let rows = self.row_min..=self.row_max;
        let cols = self.col_min..=self.col_max;
        Ok(match band {
            Band::Single(data) => Band::Single(data.slice(s![rows, cols]).to_owned()),
            Band::Stacked(data) => Band::Stacked(data.slice(s![rows, cols, ..]).to_owned()),
        })
    }
}
