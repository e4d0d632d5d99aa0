//! estuary-imagery: estuary-scale extraction of Sentinel-2 L2A and Polymer imagery
//!
//! Raw products are rotated and cropped to a region of interest, and every
//! pixel of the result stays addressable by geographic coordinates in both
//! directions (longitude/latitude to cell and back).

pub mod config;
pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use config::{FamilyConfig, Polygon, ProductFamily, RegionConfig, RegionTable};
pub use core::{
    Band, BandSet, IndexResolver, SatelliteImage, Transformation, TransformationPipeline,
};
pub use io::{PolymerNetcdf, RawLoader, RawProduct, SentinelArchive};
pub use types::{AffineMatrix, Crs, GeoPoint, ImageryError, ImageryResult, PixelIndex};
