//! Versioned on-disk format for constructed products
//!
//! A product is written as gzip-compressed JSON named `{key}.json.gz`. Band
//! values are stored row-major with NaN written as `null`.

use crate::config::ProductFamily;
use crate::core::band::{Band, BandSet};
use crate::core::mask::MaskComposer;
use crate::core::pipeline::TransformationPipeline;
use crate::core::product::{Georeference, SatelliteImage};
use crate::types::{AffineMatrix, Crs, ImageryError, ImageryResult};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Current layout version; files with any other version are rejected
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedBand {
    pub shape: Vec<usize>,
    pub data: Vec<Option<f32>>,
}

impl PersistedBand {
    fn from_band(band: &Band) -> Self {
        let (shape, values): (Vec<usize>, Vec<f32>) = match band {
            Band::Single(data) => (data.shape().to_vec(), data.iter().copied().collect()),
            Band::Stacked(data) => (data.shape().to_vec(), data.iter().copied().collect()),
        };
        Self {
            shape,
            data: values
                .into_iter()
                .map(|value| if value.is_nan() { None } else { Some(value) })
                .collect(),
        }
    }

    fn into_band(self, name: &str) -> ImageryResult<Band> {
        let values: Vec<f32> = self
            .data
            .into_iter()
            .map(|value| value.unwrap_or(f32::NAN))
            .collect();
        match self.shape.as_slice() {
            &[rows, cols] => Ok(Band::Single(Array2::from_shape_vec((rows, cols), values)?)),
            &[rows, cols, channels] => Ok(Band::Stacked(Array3::from_shape_vec(
                (rows, cols, channels),
                values,
            )?)),
            other => Err(ImageryError::InvalidFormat(format!(
                "band '{}' has unsupported shape {:?}",
                name, other
            ))),
        }
    }
}

/// Serialized form of a [`SatelliteImage`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedImage {
    pub format_version: u32,
    pub key: String,
    pub region: String,
    pub family: ProductFamily,
    pub date: String,
    pub acquired: DateTime<Utc>,
    pub crs: Option<Crs>,
    pub affine: Option<AffineMatrix>,
    pub cloud_coverage: Option<f64>,
    pub raw_shape: (usize, usize),
    pub pipeline: TransformationPipeline,
    pub georeference: Georeference,
    pub bands: BTreeMap<String, PersistedBand>,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl PersistedImage {
    pub fn from_image(image: &SatelliteImage) -> Self {
        let bands = image
            .bands
            .names()
            .filter_map(|name| {
                image
                    .bands
                    .get(name)
                    .ok()
                    .map(|band| (name.to_string(), PersistedBand::from_band(band)))
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION,
            key: image.key(),
            region: image.region.clone(),
            family: image.family,
            date: image.date.clone(),
            acquired: image.acquired,
            crs: image.crs,
            affine: image.affine,
            cloud_coverage: image.cloud_coverage,
            raw_shape: image.pipeline.raw_shape(),
            pipeline: image.pipeline.clone(),
            georeference: image.georeference.clone(),
            bands,
        }
    }

    pub fn into_image(self) -> ImageryResult<SatelliteImage> {
        if self.raw_shape != self.pipeline.raw_shape() {
            return Err(ImageryError::InvalidFormat(format!(
                "raw shape {:?} disagrees with pipeline {:?}",
                self.raw_shape,
                self.pipeline.raw_shape()
            )));
        }

        let mut bands = BandSet::new();
        for (name, band) in self.bands {
            let band = band.into_band(&name)?;
            bands.insert(name, band);
        }
        let shape = bands.common_shape()?;
        if shape != self.pipeline.final_shape() {
            return Err(ImageryError::InvalidFormat(format!(
                "bands have shape {:?}, pipeline produces {:?}",
                shape,
                self.pipeline.final_shape()
            )));
        }

        Ok(SatelliteImage {
            region: self.region,
            family: self.family,
            date: self.date,
            acquired: self.acquired,
            crs: self.crs,
            affine: self.affine,
            cloud_coverage: self.cloud_coverage,
            bands,
            pipeline: self.pipeline,
            georeference: self.georeference,
            masks: MaskComposer::new(),
        })
    }
}

/// Write `image` to `{folder}/{key}.json.gz`
pub fn save(image: &SatelliteImage, folder: &Path) -> ImageryResult<PathBuf> {
    std::fs::create_dir_all(folder)?;
    let path = folder.join(format!("{}.json.gz", image.key()));

    let persisted = PersistedImage::from_image(image);
    let writer = BufWriter::new(File::create(&path)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());
    serde_json::to_writer(&mut encoder, &persisted)?;
    encoder.finish()?.flush()?;

    log::info!("Saved {} ({} bands) to {}", persisted.key, persisted.bands.len(), path.display());
    Ok(path)
}

/// Read a product written by [`save`]
pub fn load(path: &Path) -> ImageryResult<SatelliteImage> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(path)?));
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;

    let probe: VersionProbe = serde_json::from_slice(&json)?;
    if probe.format_version != FORMAT_VERSION {
        return Err(ImageryError::InvalidFormat(format!(
            "{} has format version {}, expected {}",
            path.display(),
            probe.format_version,
            FORMAT_VERSION
        )));
    }

    let persisted: PersistedImage = serde_json::from_slice(&json)?;
    log::debug!("Loaded {} from {}", persisted.key, path.display());
    persisted.into_image()
}
