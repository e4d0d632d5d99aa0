use crate::core::band::{Band, Resampling};
use crate::types::{BandImage, ImageryError, ImageryResult, PixelIndex};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Rotation about the array centre with a resized canvas.
///
/// Angles are in degrees, positive = counter-clockwise as displayed (row axis
/// pointing down). The output canvas is the rotated bounding box. Quarter turns
/// use exact trigonometric terms and an exact transpose/flip of the data; any
/// other angle resamples the source through the inverse index map, so array and
/// index mapping share the same matrix and the same centre offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    angle_degrees: f64,
    input_shape: (usize, usize),
    output_shape: (usize, usize),
    cos: f64,
    sin: f64,
    quarter_turns: Option<u8>,
}

impl Rotation {
    pub fn new(angle_degrees: f64, input_shape: (usize, usize)) -> Self {
        let (cos, sin, quarter_turns) = rotation_terms(angle_degrees);
        let (rows, cols) = input_shape;
        let out_rows = (rows as f64 * cos.abs() + cols as f64 * sin.abs() + 0.5).floor() as usize;
        let out_cols = (cols as f64 * cos.abs() + rows as f64 * sin.abs() + 0.5).floor() as usize;

        Self {
            angle_degrees,
            input_shape,
            output_shape: (out_rows, out_cols),
            cos,
            sin,
            quarter_turns,
        }
    }

    pub fn angle_degrees(&self) -> f64 {
        self.angle_degrees
    }

    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    pub fn output_shape(&self) -> (usize, usize) {
        self.output_shape
    }

    /// Whether the rotation is a lossless reshuffle
    pub fn is_quarter_turn(&self) -> bool {
        self.quarter_turns.is_some()
    }

    fn input_center(&self) -> (f64, f64) {
        center(self.input_shape)
    }

    fn output_center(&self) -> (f64, f64) {
        center(self.output_shape)
    }

    pub fn map_index_forward(&self, index: PixelIndex) -> PixelIndex {
        let (row_in, col_in) = self.input_center();
        let (row_out, col_out) = self.output_center();
        let dx = index.col - col_in;
        let dy = index.row - row_in;

        PixelIndex {
            row: -dx * self.sin + dy * self.cos + row_out,
            col: dx * self.cos + dy * self.sin + col_out,
        }
    }

    pub fn map_index_inverse(&self, index: PixelIndex) -> PixelIndex {
        let (row_in, col_in) = self.input_center();
        let (row_out, col_out) = self.output_center();
        let dx = index.col - col_out;
        let dy = index.row - row_out;

        PixelIndex {
            row: dx * self.sin + dy * self.cos + row_in,
            col: dx * self.cos - dy * self.sin + col_in,
        }
    }

    pub fn transform_band(&self, band: Band, resampling: Resampling) -> ImageryResult<Band> {
        if band.shape() != self.input_shape {
            return Err(ImageryError::InvalidFormat(format!(
                "rotation expects shape {:?}, got {:?}",
                self.input_shape,
                band.shape()
            )));
        }

        match band {
            Band::Single(data) => Ok(Band::Single(self.rotate_plane(data.view(), resampling))),
            Band::Stacked(data) => {
                let planes: Vec<BandImage> = data
                    .axis_iter(Axis(2))
                    .map(|plane| self.rotate_plane(plane, resampling))
                    .collect();
                let views: Vec<ArrayView2<f32>> = planes.iter().map(|p| p.view()).collect();
                Ok(Band::Stacked(ndarray::stack(Axis(2), &views)?))
            }
        }
    }

    fn rotate_plane(&self, plane: ArrayView2<f32>, resampling: Resampling) -> BandImage {
        match self.quarter_turns {
            Some(turns) => quarter_turn(plane, turns),
            None => Array2::from_shape_fn(self.output_shape, |(row, col)| {
                let source = self.map_index_inverse(PixelIndex::from_cell(row, col));
                sample(&plane, source, resampling)
            }),
        }
    }
}

fn center(shape: (usize, usize)) -> (f64, f64) {
    ((shape.0 as f64 - 1.0) / 2.0, (shape.1 as f64 - 1.0) / 2.0)
}

/// (cos, sin, quarter turns) with exact terms for multiples of 90 degrees
fn rotation_terms(angle_degrees: f64) -> (f64, f64, Option<u8>) {
    let turns = angle_degrees / 90.0;
    if (turns - turns.round()).abs() < 1e-9 {
        let quarter = (turns.round() as i64).rem_euclid(4) as u8;
        let (cos, sin) = match quarter {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        (cos, sin, Some(quarter))
    } else {
        let radians = angle_degrees.to_radians();
        (radians.cos(), radians.sin(), None)
    }
}

fn quarter_turn(plane: ArrayView2<f32>, turns: u8) -> BandImage {
    let mut view = plane;
    match turns {
        1 => {
            view = view.reversed_axes();
            view.invert_axis(Axis(0));
        }
        2 => {
            view.invert_axis(Axis(0));
            view.invert_axis(Axis(1));
        }
        3 => {
            view = view.reversed_axes();
            view.invert_axis(Axis(1));
        }
        _ => {}
    }
    view.as_standard_layout().into_owned()
}

/// Sample `plane` at a fractional position, NaN outside the source footprint
fn sample(plane: &ArrayView2<f32>, source: PixelIndex, resampling: Resampling) -> f32 {
    let (rows, cols) = plane.dim();
    if rows == 0
        || cols == 0
        || !(source.row >= -0.5 && source.row <= rows as f64 - 0.5)
        || !(source.col >= -0.5 && source.col <= cols as f64 - 0.5)
    {
        return f32::NAN;
    }

    let y = source.row.clamp(0.0, (rows - 1) as f64);
    let x = source.col.clamp(0.0, (cols - 1) as f64);

    match resampling {
        Resampling::Categorical => plane[[y.round() as usize, x.round() as usize]],
        Resampling::Continuous => {
            let y1 = y.floor() as usize;
            let x1 = x.floor() as usize;
            let y2 = (y1 + 1).min(rows - 1);
            let x2 = (x1 + 1).min(cols - 1);

            let dy = y - y1 as f64;
            let dx = x - x1 as f64;

            let v11 = plane[[y1, x1]] as f64;
            let v12 = plane[[y2, x1]] as f64;
            let v21 = plane[[y1, x2]] as f64;
            let v22 = plane[[y2, x2]] as f64;

            let interpolated = v11 * (1.0 - dx) * (1.0 - dy)
                + v21 * dx * (1.0 - dy)
                + v12 * (1.0 - dx) * dy
                + v22 * dx * dy;

            interpolated as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};

    fn ramp(rows: usize, cols: usize) -> BandImage {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f32)
    }

    #[test]
    fn test_rotate_90_matches_counter_clockwise_turn() {
        let data = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let rotation = Rotation::new(90.0, (2, 3));
        assert_eq!(rotation.output_shape(), (3, 2));

        let rotated = rotation.transform_band(Band::Single(data), Resampling::Continuous).unwrap();
        let expected = array![[3.0f32, 6.0], [2.0, 5.0], [1.0, 4.0]];
        assert_eq!(rotated, Band::Single(expected));
    }

    #[test]
    fn test_rotate_minus_90_is_clockwise() {
        let data = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let rotation = Rotation::new(-90.0, (2, 3));
        let rotated = rotation.transform_band(Band::Single(data), Resampling::Continuous).unwrap();
        let expected = array![[4.0f32, 1.0], [5.0, 2.0], [6.0, 3.0]];
        assert_eq!(rotated, Band::Single(expected));
    }

    #[test]
    fn test_rotate_180_and_back_is_exact() {
        let data = ramp(4, 6);
        let forward = Rotation::new(180.0, (4, 6));
        let rotated = forward
            .transform_band(Band::Single(data.clone()), Resampling::Continuous)
            .unwrap();
        assert_eq!(rotated.shape(), (4, 6));
        assert_eq!(rotated.as_single().unwrap()[[0, 0]], data[[3, 5]]);

        let back = Rotation::new(-180.0, rotated.shape());
        let restored = back.transform_band(rotated, Resampling::Continuous).unwrap();
        assert_eq!(restored, Band::Single(data));
    }

    #[test]
    fn test_quarter_turn_index_maps_are_exact() {
        for angle in [0.0, 90.0, 180.0, 270.0, -90.0, 450.0] {
            let rotation = Rotation::new(angle, (4, 6));
            for row in 0..4 {
                for col in 0..6 {
                    let index = PixelIndex::from_cell(row, col);
                    let forward = rotation.map_index_forward(index);
                    assert_eq!(forward.row.fract(), 0.0);
                    assert_eq!(forward.col.fract(), 0.0);
                    assert_eq!(rotation.map_index_inverse(forward), index);
                }
            }
        }
    }

    #[test]
    fn test_quarter_turn_index_map_matches_data() {
        let data = ramp(4, 6);
        for angle in [90.0, 180.0, 270.0] {
            let rotation = Rotation::new(angle, (4, 6));
            let rotated = rotation
                .transform_band(Band::Single(data.clone()), Resampling::Continuous)
                .unwrap();
            let rotated = rotated.as_single().unwrap();
            for ((row, col), value) in data.indexed_iter() {
                let target = rotation.map_index_forward(PixelIndex::from_cell(row, col));
                let cell = target.to_cell(rotation.output_shape()).unwrap();
                assert_eq!(rotated[cell], *value);
            }
        }
    }

    #[test]
    fn test_arbitrary_angle_canvas_and_round_trip() {
        let rotation = Rotation::new(-45.0, (100, 60));
        let expected = ((100.0 + 60.0) * std::f64::consts::FRAC_1_SQRT_2 + 0.5).floor() as usize;
        assert_eq!(rotation.output_shape(), (expected, expected));

        let index = PixelIndex::new(37.0, 12.0);
        let back = rotation.map_index_inverse(rotation.map_index_forward(index));
        assert_abs_diff_eq!(back.row, index.row, epsilon = 1e-9);
        assert_abs_diff_eq!(back.col, index.col, epsilon = 1e-9);
    }

    #[test]
    fn test_arbitrary_angle_data_follows_index_map() {
        let data = Array2::from_shape_fn((40, 30), |(r, c)| (2 * r + 3 * c) as f32);
        let rotation = Rotation::new(-45.0, (40, 30));
        let rotated = rotation
            .transform_band(Band::Single(data.clone()), Resampling::Continuous)
            .unwrap();
        let rotated = rotated.as_single().unwrap();

        // A linear ramp survives bilinear resampling exactly at the mapped positions.
        let target = rotation.map_index_forward(PixelIndex::new(20.0, 15.0));
        let cell = target.to_cell(rotation.output_shape()).unwrap();
        let source = rotation.map_index_inverse(PixelIndex::from_cell(cell.0, cell.1));
        let expected = 2.0 * source.row + 3.0 * source.col;
        assert_abs_diff_eq!(rotated[cell] as f64, expected, epsilon = 1e-3);

        // Corners of the enlarged canvas lie outside the source.
        assert!(rotated[[0, 0]].is_nan());
    }

    #[test]
    fn test_categorical_resampling_keeps_codes() {
        let data = Array2::from_shape_fn((20, 20), |(r, _)| if r < 10 { 6.0f32 } else { 4.0 });
        let rotation = Rotation::new(30.0, (20, 20));
        let rotated = rotation
            .transform_band(Band::Single(data), Resampling::Categorical)
            .unwrap();
        for value in rotated.as_single().unwrap().iter() {
            assert!(value.is_nan() || *value == 6.0 || *value == 4.0);
        }
    }

    #[test]
    fn test_stacked_band_rotates_each_channel() {
        let cube = Array3::from_shape_fn((2, 3, 3), |(r, c, ch)| (100 * ch + 10 * r + c) as f32);
        let rotation = Rotation::new(90.0, (2, 3));
        let rotated = rotation
            .transform_band(Band::Stacked(cube.clone()), Resampling::Continuous)
            .unwrap();
        let rotated = rotated.as_stacked().unwrap();
        assert_eq!(rotated.dim(), (3, 2, 3));
        for ch in 0..3 {
            assert_eq!(rotated[[2, 0, ch]], cube[[0, 0, ch]]);
        }
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let rotation = Rotation::new(90.0, (2, 3));
        let result = rotation.transform_band(Band::Single(ramp(3, 3)), Resampling::Continuous);
        assert!(matches!(result, Err(ImageryError::InvalidFormat(_))));
    }
}
