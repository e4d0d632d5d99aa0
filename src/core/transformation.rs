use crate::core::band::{Band, Resampling};
use crate::core::crop::PolygonCrop;
use crate::core::rotation::Rotation;
use crate::types::{ImageryResult, PixelIndex};
use serde::{Deserialize, Serialize};

/// A per-band array transform paired with its pixel index maps.
///
/// `map_index_inverse` is the left inverse of `map_index_forward` on the part
/// of the input that survives the transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    Identity,
    Rotate(Rotation),
    PolygonCrop(PolygonCrop),
}

impl Transformation {
    pub fn rotate(angle_degrees: f64, original_shape: (usize, usize)) -> Self {
        Transformation::Rotate(Rotation::new(angle_degrees, original_shape))
    }

    pub fn transform_band(&self, band: Band, resampling: Resampling) -> ImageryResult<Band> {
        match self {
            Transformation::Identity => Ok(band),
            Transformation::Rotate(rotation) => rotation.transform_band(band, resampling),
            Transformation::PolygonCrop(crop) => crop.transform_band(band),
        }
    }

    pub fn map_index_forward(&self, index: PixelIndex) -> PixelIndex {
        match self {
            Transformation::Identity => index,
            Transformation::Rotate(rotation) => rotation.map_index_forward(index),
            Transformation::PolygonCrop(crop) => crop.map_index_forward(index),
        }
    }

    pub fn map_index_inverse(&self, index: PixelIndex) -> PixelIndex {
        match self {
            Transformation::Identity => index,
            Transformation::Rotate(rotation) => rotation.map_index_inverse(index),
            Transformation::PolygonCrop(crop) => crop.map_index_inverse(index),
        }
    }

    /// Shape of the band produced from an input of `input_shape`
    pub fn output_shape(&self, input_shape: (usize, usize)) -> (usize, usize) {
        match self {
            Transformation::Identity => input_shape,
            Transformation::Rotate(rotation) => rotation.output_shape(),
            Transformation::PolygonCrop(crop) => crop.output_shape(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_identity_is_noop() {
        let data = Array2::from_shape_fn((5, 7), |(r, c)| (r as f32) * 0.5 - c as f32);
        let band = Band::Single(data.clone());
        let out = Transformation::Identity
            .transform_band(band, Resampling::Continuous)
            .unwrap();
        assert_eq!(out, Band::Single(data));

        for row in 0..5 {
            for col in 0..7 {
                let index = PixelIndex::from_cell(row, col);
                assert_eq!(Transformation::Identity.map_index_forward(index), index);
                assert_eq!(Transformation::Identity.map_index_inverse(index), index);
            }
        }
        assert_eq!(Transformation::Identity.output_shape((5, 7)), (5, 7));
    }

    #[test]
    fn test_dispatch_to_rotation() {
        let transformation = Transformation::rotate(90.0, (4, 6));
        assert_eq!(transformation.output_shape((4, 6)), (6, 4));
        let index = PixelIndex::from_cell(1, 2);
        let forward = transformation.map_index_forward(index);
        assert_eq!(forward, PixelIndex::from_cell(3, 1));
        assert_eq!(transformation.map_index_inverse(forward), index);
    }

    #[test]
    fn test_serde_tagging() {
        let transformation = Transformation::rotate(-45.0, (10, 20));
        let json = serde_json::to_string(&transformation).unwrap();
        assert!(json.contains("\"kind\":\"rotate\""));
        let back: Transformation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, transformation);
    }
}
