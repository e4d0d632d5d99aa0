use crate::core::band::{BandSet, Resampling};
use crate::core::crop::PolygonCrop;
use crate::core::resolver::IndexResolver;
use crate::core::transformation::Transformation;
use crate::types::{GeoPoint, ImageryError, ImageryResult, PixelIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered non-crop transformations followed by exactly one polygon crop.
///
/// Forward index mapping runs the steps in list order and the crop last;
/// inverse mapping runs the crop first and the steps in reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationPipeline {
    steps: Vec<Transformation>,
    crop: PolygonCrop,
    raw_shape: (usize, usize),
}

impl TransformationPipeline {
    /// Build the pipeline for a product of `raw_shape`.
    ///
    /// Polygon vertices are resolved to raw indices with `resolver`, pushed
    /// through `steps`, and bounded into the crop. `None` keeps the full extent.
    pub fn build(
        steps: Vec<Transformation>,
        polygon: Option<&[GeoPoint]>,
        raw_shape: (usize, usize),
        resolver: &dyn IndexResolver,
    ) -> ImageryResult<Self> {
        if steps
            .iter()
            .any(|step| matches!(step, Transformation::PolygonCrop(_)))
        {
            return Err(ImageryError::InvalidFormat(
                "polygon crops belong at the end of the pipeline".to_string(),
            ));
        }

        let steps_shape = steps
            .iter()
            .fold(raw_shape, |shape, step| step.output_shape(shape));

        let crop = match polygon {
            Some(vertices) => PolygonCrop::from_vertices(vertices, steps_shape, |point| {
                let raw = resolver.resolve(point)?;
                Ok(map_forward(&steps, raw))
            })?,
            None => PolygonCrop::full_extent(steps_shape)?,
        };

        log::info!(
            "Pipeline built: {} step(s), raw {:?} -> {:?} -> cropped {:?}",
            steps.len(),
            raw_shape,
            steps_shape,
            crop.output_shape()
        );

        Ok(Self {
            steps,
            crop,
            raw_shape,
        })
    }

    pub fn steps(&self) -> &[Transformation] {
        &self.steps
    }

    pub fn crop(&self) -> &PolygonCrop {
        &self.crop
    }

    pub fn raw_shape(&self) -> (usize, usize) {
        self.raw_shape
    }

    pub fn final_shape(&self) -> (usize, usize) {
        self.crop.output_shape()
    }

    /// Apply every step and then the crop to each band.
    ///
    /// Bands are moved through the stages so intermediate arrays are dropped as
    /// soon as the next stage has produced its output.
    pub fn apply<F>(&self, bands: BandSet, resampling: F) -> ImageryResult<BandSet>
    where
        F: Fn(&str) -> Resampling,
    {
        let shape = bands.common_shape()?;
        if shape != self.raw_shape {
            return Err(ImageryError::InvalidFormat(format!(
                "pipeline built for {:?}, bands are {:?}",
                self.raw_shape, shape
            )));
        }

        let mut transformed = BTreeMap::new();
        for (name, mut band) in bands.into_inner() {
            let kind = resampling(&name);
            for step in &self.steps {
                band = step.transform_band(band, kind)?;
            }
            band = self.crop.transform_band(band)?;
            log::debug!("Band '{}' transformed to {:?}", name, band.shape());
            transformed.insert(name, band);
        }

        Ok(BandSet::from_inner(transformed))
    }

    /// Raw index -> index in the final bands (fractional)
    pub fn map_index_forward(&self, raw: PixelIndex) -> PixelIndex {
        self.crop.map_index_forward(map_forward(&self.steps, raw))
    }

    /// Final index -> raw index (fractional)
    pub fn map_index_inverse(&self, index: PixelIndex) -> PixelIndex {
        let uncropped = self.crop.map_index_inverse(index);
        self.steps
            .iter()
            .rev()
            .fold(uncropped, |current, step| step.map_index_inverse(current))
    }

    /// Geographic point -> cell of the final bands
    pub fn geo_to_pixel(
        &self,
        resolver: &dyn IndexResolver,
        point: GeoPoint,
    ) -> ImageryResult<(usize, usize)> {
        let raw = resolver.resolve(point)?;
        self.map_index_forward(raw).to_cell(self.final_shape())
    }

    /// Cell of the final bands -> geographic point
    ///
    /// Cells outside the final bands, or that do not come from the raw image
    /// (rotated canvas corners), are `OutOfBounds`.
    pub fn pixel_to_geo(
        &self,
        resolver: &dyn IndexResolver,
        row: usize,
        col: usize,
    ) -> ImageryResult<GeoPoint> {
        let index = PixelIndex::from_cell(row, col);
        index.to_cell(self.final_shape())?;

        let raw = self.map_index_inverse(index);
        let (raw_rows, raw_cols) = self.raw_shape;
        if !(raw.row >= -0.5 && raw.row <= raw_rows as f64 - 0.5)
            || !(raw.col >= -0.5 && raw.col <= raw_cols as f64 - 0.5)
        {
            return Err(ImageryError::OutOfBounds {
                row: raw.row,
                col: raw.col,
                rows: raw_rows,
                cols: raw_cols,
            });
        }

        resolver.locate(raw)
    }
}

fn map_forward(steps: &[Transformation], raw: PixelIndex) -> PixelIndex {
    steps
        .iter()
        .fold(raw, |current, step| step.map_index_forward(current))
}
