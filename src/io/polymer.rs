use crate::config::FamilyConfig;
use crate::types::{ImageryError, ImageryResult};
use std::path::{Path, PathBuf};

/// Global attribute holding the acquisition time
pub const SENSING_TIME_ATTRIBUTE: &str = "sensing_time";

/// Polymer level-2 product stored as netCDF
#[derive(Debug, Clone)]
pub struct PolymerNetcdf {
    path: PathBuf,
    family: FamilyConfig,
}

impl PolymerNetcdf {
    pub fn new<P: AsRef<Path>>(path: P) -> ImageryResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ImageryError::NotFound(format!(
                "Polymer product {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            family: FamilyConfig::polymer(),
        })
    }

    pub fn with_family(mut self, family: FamilyConfig) -> Self {
        self.family = family;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every band of the layout plus the sensing time
    #[cfg(feature = "gdal")]
    pub fn read_product(&self) -> ImageryResult<crate::io::RawProduct> {
        use crate::core::band::BandSet;
        use crate::io::{raster, FamilyExtras, RawProduct};
        use gdal::Metadata;

        let container = raster::open(&self.path.display().to_string())?;
        let date = container
            .metadata_item(&format!("NC_GLOBAL#{}", SENSING_TIME_ATTRIBUTE), "")
            .ok_or_else(|| {
                ImageryError::NotFound(format!(
                    "global attribute '{}' in {}",
                    SENSING_TIME_ATTRIBUTE,
                    self.path.display()
                ))
            })?;
        let available = subdataset_variables(
            &container.metadata_domain("SUBDATASETS").unwrap_or_default(),
        );
        log::info!(
            "Reading Polymer product {} ({} variables)",
            self.path.display(),
            available.len()
        );

        let mut bands = BandSet::new();
        for spec in &self.family.bands {
            let variable = select_variable(&available, &spec.codes)?;
            let subdataset = format!("NETCDF:\"{}\":{}", self.path.display(), variable);
            let dataset = raster::open(&subdataset)?;
            bands.insert(spec.name.as_str(), raster::read_band(&dataset, 1)?);
            log::debug!("Band '{}' read from variable {}", spec.name, variable);
        }

        Ok(RawProduct {
            family: self.family.family,
            bands,
            date,
            extras: FamilyExtras::Netcdf,
        })
    }
}

#[cfg(feature = "gdal")]
impl crate::io::RawLoader for PolymerNetcdf {
    fn load(&self) -> ImageryResult<crate::io::RawProduct> {
        self.read_product()
    }
}

/// Variable names from GDAL `SUBDATASET_n_NAME=NETCDF:"file":var` entries
pub fn subdataset_variables(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .filter(|(key, _)| key.ends_with("_NAME"))
        .filter_map(|(_, value)| value.rsplit(':').next())
        .map(|variable| variable.trim_matches('"').to_string())
        .collect()
}

/// First candidate present among `available`
pub fn select_variable(available: &[String], candidates: &[String]) -> ImageryResult<String> {
    candidates
        .iter()
        .find(|candidate| available.iter().any(|name| name == *candidate))
        .cloned()
        .ok_or_else(|| {
            ImageryError::NotFound(format!("none of the variables {:?}", candidates))
        })
}
