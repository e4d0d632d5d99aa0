//! Product readers and on-disk formats

pub mod mask_sources;
pub mod persistence;
pub mod polymer;
#[cfg(feature = "gdal")]
mod raster;
pub mod sentinel;

use crate::config::ProductFamily;
use crate::core::band::BandSet;
use crate::types::{AffineMatrix, ImageryError, ImageryResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

pub use mask_sources::{load_bad_water_regions, load_obstruction_points};
pub use persistence::{PersistedImage, FORMAT_VERSION};
pub use polymer::PolymerNetcdf;
pub use sentinel::SentinelArchive;

/// Georeferencing carried by each family
#[derive(Debug, Clone, PartialEq)]
pub enum FamilyExtras {
    /// Affine raster in a projected or geographic CRS
    Raster {
        crs: String,
        affine: AffineMatrix,
        cloud_coverage: Option<f64>,
    },
    /// Per-pixel `lon`/`lat` bands
    Netcdf,
}

/// Bands and metadata as read from disk, before any transformation
#[derive(Debug, Clone, PartialEq)]
pub struct RawProduct {
    pub family: ProductFamily,
    pub bands: BandSet,
    /// Acquisition time as written by the producer
    pub date: String,
    pub extras: FamilyExtras,
}

/// Anything that can produce a raw product
pub trait RawLoader {
    fn load(&self) -> ImageryResult<RawProduct>;
}

impl RawLoader for RawProduct {
    fn load(&self) -> ImageryResult<RawProduct> {
        Ok(self.clone())
    }
}

/// Parse acquisition times written as RFC 3339, ISO 8601 with a `Z` suffix,
/// or naive ISO 8601 (space or `T` separated, assumed UTC)
pub fn parse_acquisition_time(time_str: &str) -> ImageryResult<DateTime<Utc>> {
    let trimmed = time_str.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(time.with_timezone(&Utc));
    }

    let normalized = trimmed.replacen(' ', "T", 1);
    let naive = normalized.strip_suffix('Z').unwrap_or(&normalized);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(Utc.from_utc_datetime(&time));
        }
    }

    Err(ImageryError::InvalidFormat(format!(
        "unrecognised acquisition time '{}'",
        time_str
    )))
}
