//! Region and product-family configuration
//!
//! Regions are data: a name, an optional rotation and an optional WKT polygon.
//! Product families describe which source variables feed which canonical band
//! and how each band is resampled.

use crate::core::band::Resampling;
use crate::core::transformation::Transformation;
use crate::types::{GeoPoint, ImageryError, ImageryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Ordered polygon vertices in WGS84
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Polygon {
    vertices: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new(vertices: Vec<GeoPoint>) -> ImageryResult<Self> {
        if vertices.len() < 3 {
            return Err(ImageryError::InvalidFormat(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self { vertices })
    }

    /// Parse `POLYGON ((lon lat, lon lat, ...))`
    ///
    /// Only the outer ring is read; holes are irrelevant to a bounding box.
    pub fn from_wkt(wkt: &str) -> ImageryResult<Self> {
        let pattern = regex::Regex::new(r"(?is)^\s*POLYGON\s*\(\s*\(([^()]*)\)")
            .map_err(|e| ImageryError::InvalidFormat(format!("WKT pattern: {}", e)))?;
        let ring = pattern
            .captures(wkt)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| ImageryError::InvalidFormat(format!("not a WKT polygon: '{}'", wkt)))?;

        let mut vertices = Vec::new();
        for pair in ring.as_str().split(',') {
            let coords: Vec<&str> = pair.split_whitespace().collect();
            if coords.len() != 2 {
                return Err(ImageryError::InvalidFormat(format!(
                    "malformed WKT vertex '{}'",
                    pair.trim()
                )));
            }
            let parse = |value: &str| {
                value.parse::<f64>().map_err(|e| {
                    ImageryError::InvalidFormat(format!("WKT coordinate '{}': {}", value, e))
                })
            };
            vertices.push(GeoPoint::new(parse(coords[0])?, parse(coords[1])?));
        }

        // A closed ring repeats its first vertex
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        Self::new(vertices)
    }

    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    pub fn to_wkt(&self) -> String {
        let ring: Vec<String> = self
            .vertices
            .iter()
            .chain(self.vertices.first())
            .map(|p| format!("{} {}", p.longitude, p.latitude))
            .collect();
        format!("POLYGON (({}))", ring.join(", "))
    }
}

impl TryFrom<String> for Polygon {
    type Error = ImageryError;

    fn try_from(wkt: String) -> ImageryResult<Self> {
        Polygon::from_wkt(&wkt)
    }
}

impl From<Polygon> for String {
    fn from(polygon: Polygon) -> String {
        polygon.to_wkt()
    }
}

/// Geometry of one named region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    #[serde(default)]
    pub rotation_degrees: Option<f64>,
    #[serde(default)]
    pub polygon: Option<Polygon>,
}

impl RegionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rotation_degrees: None,
            polygon: None,
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = Some(degrees);
        self
    }

    pub fn with_polygon(mut self, polygon: Polygon) -> Self {
        self.polygon = Some(polygon);
        self
    }

    /// Non-crop transformations for a product of `raw_shape`
    pub fn transformations(&self, raw_shape: (usize, usize)) -> Vec<Transformation> {
        match self.rotation_degrees {
            Some(angle) => vec![Transformation::rotate(angle, raw_shape)],
            None => Vec::new(),
        }
    }
}

/// Approximate bounding boxes around each estuary mouth, as `(name, rotation, WKT)`.
///
/// These are not surveyed outlines. Load real polygons with
/// [`RegionTable::from_json_file`] and insert them over the built-in entries.
const BUILTIN_REGIONS: &[(&str, Option<f64>, Option<&str>)] = &[
    ("general", None, None),
    (
        "bouctouche",
        Some(-45.0),
        Some("POLYGON ((-64.78 46.42, -64.62 46.42, -64.62 46.53, -64.78 46.53, -64.78 46.42))"),
    ),
    (
        "cocagne",
        None,
        Some("POLYGON ((-64.70 46.30, -64.55 46.30, -64.55 46.39, -64.70 46.39, -64.70 46.30))"),
    ),
    (
        "west",
        None,
        Some("POLYGON ((-63.42 46.14, -63.22 46.14, -63.22 46.26, -63.42 46.26, -63.42 46.14))"),
    ),
    (
        "dunk",
        None,
        Some("POLYGON ((-63.74 46.30, -63.57 46.30, -63.57 46.40, -63.74 46.40, -63.74 46.30))"),
    ),
    (
        "morell",
        Some(-90.0),
        Some("POLYGON ((-62.78 46.38, -62.62 46.38, -62.62 46.46, -62.78 46.46, -62.78 46.38))"),
    ),
];

/// Named regions, looked up by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTable {
    regions: BTreeMap<String, RegionConfig>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The estuaries processed by default, with approximate boxes (see `BUILTIN_REGIONS`)
    pub fn builtin() -> ImageryResult<Self> {
        let mut table = Self::new();
        for &(name, rotation, wkt) in BUILTIN_REGIONS {
            let mut region = RegionConfig::new(name);
            region.rotation_degrees = rotation;
            if let Some(wkt) = wkt {
                region.polygon = Some(Polygon::from_wkt(wkt)?);
            }
            table.insert(region);
        }
        Ok(table)
    }

    /// Load a JSON list of regions
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ImageryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let regions: Vec<RegionConfig> = serde_json::from_str(&content)?;

        let mut table = Self::new();
        for region in regions {
            if table.regions.contains_key(&region.name) {
                return Err(ImageryError::InvalidFormat(format!(
                    "region '{}' defined twice in {}",
                    region.name,
                    path.display()
                )));
            }
            table.insert(region);
        }
        log::info!("Loaded {} region(s) from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn insert(&mut self, region: RegionConfig) {
        self.regions.insert(region.name.clone(), region);
    }

    pub fn get(&self, name: &str) -> ImageryResult<&RegionConfig> {
        self.regions
            .get(name)
            .ok_or_else(|| ImageryError::NotFound(format!("region '{}'", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Source product family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFamily {
    /// Sentinel-2 L2A, Sen2Cor corrected, affine georeferenced
    Sentinel2,
    /// Polymer corrected netCDF with per-pixel lon/lat
    Polymer,
}

impl ProductFamily {
    pub fn atmospheric_correction(&self) -> &'static str {
        match self {
            ProductFamily::Sentinel2 => "Sen2Cor",
            ProductFamily::Polymer => "Polymer",
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductFamily::Sentinel2 => write!(f, "sentinel2"),
            ProductFamily::Polymer => write!(f, "polymer"),
        }
    }
}

/// Mapping from a canonical band name to its source variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    pub name: String,
    /// Candidate source codes, first match wins
    pub codes: Vec<String>,
    pub resampling: Resampling,
    /// Multi-channel source (read as rows x cols x channels)
    #[serde(default)]
    pub stacked: bool,
    /// Nearest-neighbour upsampling factor to the reference grid
    #[serde(default = "default_upsample")]
    pub upsample: usize,
}

fn default_upsample() -> usize {
    1
}

impl BandSpec {
    pub fn new(name: &str, codes: &[&str], resampling: Resampling) -> Self {
        Self {
            name: name.to_string(),
            codes: codes.iter().map(|code| code.to_string()).collect(),
            resampling,
            stacked: false,
            upsample: 1,
        }
    }

    fn stacked(mut self) -> Self {
        self.stacked = true;
        self
    }

    fn upsampled(mut self, factor: usize) -> Self {
        self.upsample = factor;
        self
    }
}

/// Scaling of the true-color composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrueColorParams {
    /// Sentinel digital number mapped to full brightness
    pub beta: f32,
    /// Polymer reflectance mapped to 0
    pub reflectance_min: f32,
    /// Polymer reflectance mapped to 255
    pub reflectance_max: f32,
}

impl Default for TrueColorParams {
    fn default() -> Self {
        Self {
            beta: 3000.0,
            reflectance_min: 0.0,
            reflectance_max: 0.15,
        }
    }
}

/// Gaussian smoothing of the water mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub sigma: f64,
    /// Kernel radius in standard deviations
    pub truncate: f64,
    pub threshold: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            truncate: 4.0,
            threshold: 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudParams {
    /// Cloud probability (percent) above which a pixel counts as cloudy
    pub probability_threshold: f32,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            probability_threshold: 10.0,
        }
    }
}

/// Band layout and scaling of one product family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub family: ProductFamily,
    pub bands: Vec<BandSpec>,
    #[serde(default)]
    pub true_color: TrueColorParams,
}

impl FamilyConfig {
    pub fn sentinel2() -> Self {
        Self {
            family: ProductFamily::Sentinel2,
            bands: vec![
                BandSpec::new("blue_band", &["B02"], Resampling::Continuous),
                BandSpec::new("green_band", &["B03"], Resampling::Continuous),
                BandSpec::new("red_band", &["B04"], Resampling::Continuous),
                BandSpec::new("nir_band", &["B08"], Resampling::Continuous),
                BandSpec::new("true_color_image", &["TCI"], Resampling::Continuous).stacked(),
                BandSpec::new("cloud_prob", &["MSK_CLDPRB_20m"], Resampling::Continuous)
                    .upsampled(2),
                BandSpec::new("scene_clf", &["SCL_20m"], Resampling::Categorical).upsampled(2),
            ],
            true_color: TrueColorParams::default(),
        }
    }

    pub fn polymer() -> Self {
        Self {
            family: ProductFamily::Polymer,
            bands: vec![
                BandSpec::new("blue_band", &["Rw490"], Resampling::Continuous),
                BandSpec::new("green_band", &["Rw560"], Resampling::Continuous),
                BandSpec::new("red_band", &["Rw665"], Resampling::Continuous),
                BandSpec::new("nir_band", &["Rw842"], Resampling::Continuous),
                BandSpec::new("swir_band", &["Rnir"], Resampling::Continuous),
                BandSpec::new("lon", &["longitude", "lon"], Resampling::Continuous),
                BandSpec::new("lat", &["latitude", "lat"], Resampling::Continuous),
            ],
            true_color: TrueColorParams::default(),
        }
    }

    pub fn for_family(family: ProductFamily) -> Self {
        match family {
            ProductFamily::Sentinel2 => Self::sentinel2(),
            ProductFamily::Polymer => Self::polymer(),
        }
    }

    pub fn band_spec(&self, name: &str) -> ImageryResult<&BandSpec> {
        self.bands
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| {
                ImageryError::NotFound(format!("band '{}' in {} layout", name, self.family))
            })
    }

    /// Resampling kind for `name`; bands derived after loading are continuous
    pub fn resampling_for(&self, name: &str) -> Resampling {
        self.band_spec(name)
            .map(|spec| spec.resampling)
            .unwrap_or(Resampling::Continuous)
    }
}
