use crate::types::{ImageryError, ImageryResult, Mask};
use ndarray::Zip;

/// Pixels blocked by fixed structures (bridges, wharves), in final-band indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstructionPoints {
    points: Vec<(usize, usize)>,
}

impl ObstructionPoints {
    pub fn new(points: Vec<(usize, usize)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(usize, usize)] {
        &self.points
    }

    /// `false` at every obstruction point, `true` elsewhere
    pub fn valid_points_mask(&self, shape: (usize, usize)) -> ImageryResult<Mask> {
        let (rows, cols) = shape;
        let mut mask = Mask::from_elem(shape, true);
        for &(row, col) in &self.points {
            if row >= rows || col >= cols {
                return Err(ImageryError::OutOfBounds {
                    row: row as f64,
                    col: col as f64,
                    rows,
                    cols,
                });
            }
            mask[[row, col]] = false;
        }
        Ok(mask)
    }
}

/// Reference map of water pixels known to be clean
#[derive(Debug, Clone, PartialEq)]
pub struct BadWaterRegions {
    clean_water: Mask,
}

impl BadWaterRegions {
    pub fn new(clean_water: Mask) -> Self {
        Self { clean_water }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.clean_water.dim()
    }

    /// `true` at deprecated or invalid water pixels
    pub fn valid_points_mask(&self) -> Mask {
        self.clean_water.mapv(|clean| !clean)
    }
}

/// Optional mask providers attached to a product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskComposer {
    obstruction: Option<ObstructionPoints>,
    bad_water: Option<BadWaterRegions>,
}

impl MaskComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_obstruction(mut self, obstruction: ObstructionPoints) -> Self {
        self.obstruction = Some(obstruction);
        self
    }

    pub fn with_bad_water(mut self, bad_water: BadWaterRegions) -> Self {
        self.bad_water = Some(bad_water);
        self
    }

    pub fn set_obstruction(&mut self, obstruction: Option<ObstructionPoints>) {
        self.obstruction = obstruction;
    }

    pub fn set_bad_water(&mut self, bad_water: Option<BadWaterRegions>) {
        self.bad_water = bad_water;
    }

    pub fn obstruction_mask(&self, shape: (usize, usize)) -> ImageryResult<Option<Mask>> {
        self.obstruction
            .as_ref()
            .map(|points| points.valid_points_mask(shape))
            .transpose()
    }

    pub fn bad_water_mask(&self) -> Option<Mask> {
        self.bad_water.as_ref().map(BadWaterRegions::valid_points_mask)
    }

    /// `obstruction AND NOT bad_water`, only when both providers are attached
    pub fn water_validity_mask(&self, shape: (usize, usize)) -> ImageryResult<Option<Mask>> {
        let (points, bad_water) = match (&self.obstruction, &self.bad_water) {
            (Some(points), Some(bad_water)) => (points, bad_water),
            _ => return Ok(None),
        };

        if bad_water.shape() != shape {
            return Err(ImageryError::InvalidFormat(format!(
                "bad-water mask {:?} does not match image shape {:?}",
                bad_water.shape(),
                shape
            )));
        }

        let mut valid = points.valid_points_mask(shape)?;
        let bad = bad_water.valid_points_mask();
        Zip::from(&mut valid)
            .and(&bad)
            .for_each(|valid, &bad| *valid = *valid && !bad);
        Ok(Some(valid))
    }
}
