use crate::config::FamilyConfig;
use crate::types::{BandImage, ImageryError, ImageryResult};
use ndarray::Array2;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Name of the L2A product metadata member
pub const METADATA_FILE: &str = "MTD_MSIL2A.xml";

/// Product-level metadata from `MTD_MSIL2A.xml`
#[derive(Debug, Clone, PartialEq)]
pub struct SentinelMetadata {
    pub product_start_time: String,
    /// Cloud coverage assessment (percent)
    pub cloud_coverage: Option<f64>,
}

/// Sentinel-2 L2A product delivered as a zipped SAFE directory
#[derive(Debug, Clone)]
pub struct SentinelArchive {
    zip_path: PathBuf,
    family: FamilyConfig,
}

impl SentinelArchive {
    pub fn new<P: AsRef<Path>>(zip_path: P) -> ImageryResult<Self> {
        let zip_path = zip_path.as_ref().to_path_buf();
        if !zip_path.exists() {
            return Err(ImageryError::NotFound(format!(
                "Sentinel archive {}",
                zip_path.display()
            )));
        }
        Ok(Self {
            zip_path,
            family: FamilyConfig::sentinel2(),
        })
    }

    /// Use a custom band layout instead of the standard Sentinel-2 one
    pub fn with_family(mut self, family: FamilyConfig) -> Self {
        self.family = family;
        self
    }

    pub fn path(&self) -> &Path {
        &self.zip_path
    }

    fn open_archive(&self) -> ImageryResult<ZipArchive<File>> {
        let file = File::open(&self.zip_path)?;
        ZipArchive::new(file).map_err(|e| {
            ImageryError::Zip(format!("failed to open {}: {}", self.zip_path.display(), e))
        })
    }

    pub fn list_files(&self) -> ImageryResult<Vec<String>> {
        let mut archive = self.open_archive()?;
        let mut files = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| ImageryError::Zip(format!("member {}: {}", i, e)))?;
            files.push(file.name().to_string());
        }
        Ok(files)
    }

    fn read_member(&self, name: &str) -> ImageryResult<String> {
        let mut archive = self.open_archive()?;
        let mut file = archive
            .by_name(name)
            .map_err(|e| ImageryError::Zip(format!("failed to read {}: {}", name, e)))?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    pub fn read_metadata(&self) -> ImageryResult<SentinelMetadata> {
        let files = self.list_files()?;
        let member = files
            .iter()
            .find(|name| name.ends_with(METADATA_FILE))
            .ok_or_else(|| {
                ImageryError::NotFound(format!(
                    "{} in {}",
                    METADATA_FILE,
                    self.zip_path.display()
                ))
            })?;
        let xml = self.read_member(member)?;
        parse_metadata(&xml)
    }

    /// Archive member holding each band of the layout
    pub fn find_band_files(&self) -> ImageryResult<BTreeMap<String, String>> {
        locate_band_files(&self.list_files()?, &self.family)
    }

    /// Read bands, metadata and georeferencing through GDAL's `/vsizip/`
    #[cfg(feature = "gdal")]
    pub fn read_product(&self) -> ImageryResult<crate::io::RawProduct> {
        use crate::core::band::BandSet;
        use crate::io::{raster, FamilyExtras, RawProduct};

        let metadata = self.read_metadata()?;
        let band_files = self.find_band_files()?;
        log::info!(
            "Reading {} bands from {}",
            band_files.len(),
            self.zip_path.display()
        );

        let mut bands = BandSet::new();
        let mut georeferencing = None;
        for spec in &self.family.bands {
            let member = band_files
                .get(&spec.name)
                .ok_or_else(|| ImageryError::NotFound(format!("file for band '{}'", spec.name)))?;
            let vsi_path = format!("/vsizip/{}/{}", self.zip_path.display(), member);
            let dataset = raster::open(&vsi_path)?;

            if spec.stacked {
                bands.insert(spec.name.as_str(), raster::read_stacked(&dataset)?);
            } else {
                let data = raster::read_band(&dataset, 1)?;
                bands.insert(spec.name.as_str(), upsample_nearest(&data, spec.upsample)?);
            }

            if spec.name == "blue_band" {
                georeferencing = Some(raster::georeferencing(&dataset)?);
            }
            log::debug!("Band '{}' read from {}", spec.name, member);
        }

        let (crs, affine) = georeferencing
            .ok_or_else(|| ImageryError::NotFound("blue band georeferencing".to_string()))?;

        Ok(RawProduct {
            family: self.family.family,
            bands,
            date: metadata.product_start_time,
            extras: FamilyExtras::Raster {
                crs,
                affine,
                cloud_coverage: metadata.cloud_coverage,
            },
        })
    }
}

#[cfg(feature = "gdal")]
impl crate::io::RawLoader for SentinelArchive {
    fn load(&self) -> ImageryResult<crate::io::RawProduct> {
        self.read_product()
    }
}

/// Pick the `.jp2` member of each band.
///
/// 10 m bands come from the `R10m` directory; bands that need upsampling
/// (20 m products) may sit anywhere under `GRANULE`. The first member whose
/// name contains one of the band's codes wins.
pub fn locate_band_files(
    files: &[String],
    family: &FamilyConfig,
) -> ImageryResult<BTreeMap<String, String>> {
    let granule: Vec<&String> = files
        .iter()
        .filter(|name| name.contains("GRANULE") && name.ends_with(".jp2"))
        .collect();
    let r10m: Vec<&String> = granule
        .iter()
        .copied()
        .filter(|name| name.contains("R10m"))
        .collect();

    let mut located = BTreeMap::new();
    for spec in &family.bands {
        let pool = if spec.upsample > 1 { &granule } else { &r10m };
        let member = spec
            .codes
            .iter()
            .find_map(|code| pool.iter().find(|name| name.contains(code.as_str())))
            .ok_or_else(|| {
                ImageryError::NotFound(format!(
                    "no archive member for band '{}' (codes {:?})",
                    spec.name, spec.codes
                ))
            })?;
        located.insert(spec.name.clone(), (*member).clone());
    }
    Ok(located)
}

/// Extract the start time and cloud coverage from `MTD_MSIL2A.xml`
pub fn parse_metadata(xml: &str) -> ImageryResult<SentinelMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut current: Option<String> = None;
    let mut start_time = None;
    let mut cloud_coverage = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                current = Some(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|e| ImageryError::XmlParsing(e.to_string()))?;
                match current.as_deref() {
                    Some("PRODUCT_START_TIME") => start_time = Some(value.trim().to_string()),
                    Some("Cloud_Coverage_Assessment") => {
                        cloud_coverage = Some(value.trim().parse::<f64>().map_err(|e| {
                            ImageryError::XmlParsing(format!(
                                "Cloud_Coverage_Assessment '{}': {}",
                                value, e
                            ))
                        })?);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ImageryError::XmlParsing(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            Ok(_) => {}
        }
    }

    let product_start_time = start_time
        .ok_or_else(|| ImageryError::NotFound("PRODUCT_START_TIME in product metadata".to_string()))?;
    if cloud_coverage.is_none() {
        log::warn!("Cloud_Coverage_Assessment missing from product metadata");
    }

    Ok(SentinelMetadata {
        product_start_time,
        cloud_coverage,
    })
}

/// Repeat every pixel `factor` times along both axes
pub fn upsample_nearest(image: &BandImage, factor: usize) -> ImageryResult<BandImage> {
    if factor == 0 {
        return Err(ImageryError::InvalidFormat(
            "upsampling factor must be at least 1".to_string(),
        ));
    }
    if factor == 1 {
        return Ok(image.clone());
    }
    let (rows, cols) = image.dim();
    Ok(Array2::from_shape_fn((rows * factor, cols * factor), |(row, col)| {
        image[[row / factor, col / factor]]
    }))
}
