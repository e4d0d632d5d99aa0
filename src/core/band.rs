use crate::types::{BandCube, BandImage, ImageryError, ImageryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a band is resampled when a transformation needs interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resampling {
    /// Reflectance-like data, bilinear
    Continuous,
    /// Classification codes, nearest neighbour
    Categorical,
}

/// One named channel of satellite-derived data
#[derive(Debug, Clone, PartialEq)]
pub enum Band {
    Single(BandImage),
    Stacked(BandCube),
}

impl Band {
    /// Spatial shape (rows, cols), ignoring channels
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Band::Single(data) => data.dim(),
            Band::Stacked(data) => {
                let (rows, cols, _) = data.dim();
                (rows, cols)
            }
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            Band::Single(_) => 1,
            Band::Stacked(data) => data.dim().2,
        }
    }

    pub fn as_single(&self) -> Option<&BandImage> {
        match self {
            Band::Single(data) => Some(data),
            Band::Stacked(_) => None,
        }
    }

    pub fn as_stacked(&self) -> Option<&BandCube> {
        match self {
            Band::Single(_) => None,
            Band::Stacked(data) => Some(data),
        }
    }
}

impl From<BandImage> for Band {
    fn from(data: BandImage) -> Self {
        Band::Single(data)
    }
}

impl From<BandCube> for Band {
    fn from(data: BandCube) -> Self {
        Band::Stacked(data)
    }
}

/// Named bands of one product, all sharing the same spatial shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandSet {
    bands: BTreeMap<String, Band>,
}

impl BandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, band: impl Into<Band>) {
        self.bands.insert(name.into(), band.into());
    }

    pub fn get(&self, name: &str) -> ImageryResult<&Band> {
        self.bands
            .get(name)
            .ok_or_else(|| ImageryError::NotFound(format!("band '{}'", name)))
    }

    /// Fetch a single-channel band
    pub fn single(&self, name: &str) -> ImageryResult<&BandImage> {
        self.get(name)?.as_single().ok_or_else(|| {
            ImageryError::InvalidFormat(format!("band '{}' is not single-channel", name))
        })
    }

    pub fn remove(&mut self, name: &str) -> ImageryResult<Band> {
        self.bands
            .remove(name)
            .ok_or_else(|| ImageryError::NotFound(format!("band '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Shared spatial shape of all bands
    ///
    /// Fails when the set is empty or when two bands disagree.
    pub fn common_shape(&self) -> ImageryResult<(usize, usize)> {
        let mut shape = None;
        for (name, band) in &self.bands {
            let current = band.shape();
            match shape {
                None => shape = Some(current),
                Some(expected) if expected != current => {
                    return Err(ImageryError::InvalidFormat(format!(
                        "band '{}' has shape {:?}, expected {:?}",
                        name, current, expected
                    )));
                }
                Some(_) => {}
            }
        }
        shape.ok_or_else(|| ImageryError::NotFound("no bands in product".to_string()))
    }

    pub(crate) fn into_inner(self) -> BTreeMap<String, Band> {
        self.bands
    }

    pub(crate) fn from_inner(bands: BTreeMap<String, Band>) -> Self {
        Self { bands }
    }
}
