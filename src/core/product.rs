use crate::config::{CloudParams, FamilyConfig, ProductFamily, RegionConfig, SmoothingParams};
use crate::core::band::{Band, BandSet};
use crate::core::composite;
use crate::core::filter;
use crate::core::mask::{BadWaterRegions, MaskComposer, ObstructionPoints};
use crate::core::pipeline::TransformationPipeline;
use crate::core::resolver::{AffineResolver, IndexResolver, NearestGridResolver};
use crate::io::{self, FamilyExtras, RawProduct};
use crate::types::{
    AffineMatrix, BandCube, BandImage, Crs, GeoPoint, ImageryError, ImageryResult, Mask,
    PixelIndex,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scene classification code for water
pub const SCENE_CLASS_WATER: f32 = 6.0;

/// How a constructed product maps geographic coordinates to its bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Georeference {
    /// Affine matrix on the raw grid, composed with the pipeline
    Affine(AffineResolver),
    /// Nearest search over the final `lon`/`lat` bands
    Grid,
}

/// A transformed, cropped satellite product for one region and date
#[derive(Debug, Clone)]
pub struct SatelliteImage {
    pub(crate) region: String,
    pub(crate) family: ProductFamily,
    pub(crate) date: String,
    pub(crate) acquired: DateTime<Utc>,
    pub(crate) crs: Option<Crs>,
    pub(crate) affine: Option<AffineMatrix>,
    pub(crate) cloud_coverage: Option<f64>,
    pub(crate) bands: BandSet,
    pub(crate) pipeline: TransformationPipeline,
    pub(crate) georeference: Georeference,
    pub(crate) masks: MaskComposer,
}

impl SatelliteImage {
    /// Run the region's pipeline over a raw product.
    ///
    /// The pipeline is built against the raw grid (affine matrix or raw
    /// `lon`/`lat` bands); every band is then rotated and cropped.
    pub fn from_raw(
        raw: RawProduct,
        region: &RegionConfig,
        family: &FamilyConfig,
    ) -> ImageryResult<Self> {
        if raw.family != family.family {
            return Err(ImageryError::InvalidFormat(format!(
                "{} product given a {} band layout",
                raw.family, family.family
            )));
        }

        let RawProduct {
            family: product_family,
            bands,
            date,
            extras,
        } = raw;

        let date = date.trim().replace(' ', "T");
        let acquired = io::parse_acquisition_time(&date)?;
        for spec in &family.bands {
            bands.get(&spec.name)?;
        }
        bands.common_shape()?;
        let raw_shape = bands.single("blue_band")?.dim();
        let steps = region.transformations(raw_shape);
        let polygon = region.polygon.as_ref().map(|polygon| polygon.vertices());

        log::info!(
            "Building {} product for region '{}' ({}), raw shape {:?}",
            product_family,
            region.name,
            date,
            raw_shape
        );

        let (pipeline, georeference, crs, affine, cloud_coverage) = match extras {
            FamilyExtras::Raster {
                crs,
                affine,
                cloud_coverage,
            } => {
                let resolver = AffineResolver::from_crs_str(affine, &crs)?;
                let pipeline = TransformationPipeline::build(steps, polygon, raw_shape, &resolver)?;
                let crs = resolver.crs();
                (
                    pipeline,
                    Georeference::Affine(resolver),
                    Some(crs),
                    Some(affine),
                    cloud_coverage,
                )
            }
            FamilyExtras::Netcdf => {
                let lon = bands.single("lon")?;
                let lat = bands.single("lat")?;
                let resolver = NearestGridResolver::new(lon.view(), lat.view())?;
                let pipeline = TransformationPipeline::build(steps, polygon, raw_shape, &resolver)?;
                (pipeline, Georeference::Grid, None, None, None)
            }
        };

        let mut bands = pipeline.apply(bands, |name| family.resampling_for(name))?;

        if product_family == ProductFamily::Polymer {
            let true_color = composite::true_color_reflectance(
                bands.single("red_band")?,
                bands.single("green_band")?,
                bands.single("blue_band")?,
                &family.true_color,
            )?;
            bands.insert("true_color_image", true_color);
        }

        log::info!(
            "Product {}_{} ready: {} band(s), shape {:?}",
            region.name,
            acquired.format("%Y-%m-%d"),
            bands.len(),
            pipeline.final_shape()
        );

        Ok(Self {
            region: region.name.clone(),
            family: product_family,
            date,
            acquired,
            crs,
            affine,
            cloud_coverage,
            bands,
            pipeline,
            georeference,
            masks: MaskComposer::new(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn family(&self) -> ProductFamily {
        self.family
    }

    pub fn atmospheric_correction(&self) -> &'static str {
        self.family.atmospheric_correction()
    }

    /// Acquisition time, ISO 8601 with a `T` separator
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn acquired(&self) -> DateTime<Utc> {
        self.acquired
    }

    /// `{region}_{YYYY-MM-DD}`
    pub fn key(&self) -> String {
        format!("{}_{}", self.region, self.acquired.format("%Y-%m-%d"))
    }

    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    pub fn affine_matrix(&self) -> Option<&AffineMatrix> {
        self.affine.as_ref()
    }

    /// Cloud coverage reported by the producer (percent)
    pub fn cloud_coverage(&self) -> Option<f64> {
        self.cloud_coverage
    }

    pub fn bands(&self) -> &BandSet {
        &self.bands
    }

    pub fn band(&self, name: &str) -> ImageryResult<&Band> {
        self.bands.get(name)
    }

    pub fn single_band(&self, name: &str) -> ImageryResult<&BandImage> {
        self.bands.single(name)
    }

    pub fn pipeline(&self) -> &TransformationPipeline {
        &self.pipeline
    }

    pub fn georeference(&self) -> &Georeference {
        &self.georeference
    }

    pub fn image_shape(&self) -> (usize, usize) {
        self.pipeline.final_shape()
    }

    pub fn before_transform_image_shape(&self) -> (usize, usize) {
        self.pipeline.raw_shape()
    }

    fn final_grid(&self) -> ImageryResult<NearestGridResolver<'_>> {
        NearestGridResolver::new(
            self.bands.single("lon")?.view(),
            self.bands.single("lat")?.view(),
        )
    }

    /// Cell of the final bands nearest to a geographic point
    pub fn pixel_for(&self, point: GeoPoint) -> ImageryResult<(usize, usize)> {
        match &self.georeference {
            Georeference::Affine(resolver) => self.pipeline.geo_to_pixel(resolver, point),
            Georeference::Grid => self
                .final_grid()?
                .resolve(point)?
                .to_cell(self.image_shape()),
        }
    }

    /// Geographic position of a cell of the final bands
    pub fn geo_for(&self, row: usize, col: usize) -> ImageryResult<GeoPoint> {
        match &self.georeference {
            Georeference::Affine(resolver) => self.pipeline.pixel_to_geo(resolver, row, col),
            Georeference::Grid => self.final_grid()?.locate(PixelIndex::from_cell(row, col)),
        }
    }

    /// Sentinel scene classification equal to water
    pub fn water_mask(&self) -> ImageryResult<Mask> {
        Ok(self
            .bands
            .single("scene_clf")?
            .mapv(|code| code == SCENE_CLASS_WATER))
    }

    pub fn smoothed_water_mask(&self, params: &SmoothingParams) -> ImageryResult<Mask> {
        filter::smooth_mask(&self.water_mask()?, params)
    }

    /// Fraction of pixels whose cloud probability exceeds the threshold
    pub fn calculated_cloud_coverage(&self, params: &CloudParams) -> ImageryResult<f64> {
        let cloud_prob = self.bands.single("cloud_prob")?;
        if cloud_prob.is_empty() {
            return Ok(0.0);
        }
        let cloudy = cloud_prob
            .iter()
            .filter(|&&probability| probability > params.probability_threshold)
            .count();
        Ok(cloudy as f64 / cloud_prob.len() as f64)
    }

    /// Red, green and blue scaled by `beta` into [0, 1]
    pub fn true_color_float(&self, beta: f32) -> ImageryResult<BandCube> {
        composite::true_color_float(
            self.bands.single("red_band")?,
            self.bands.single("green_band")?,
            self.bands.single("blue_band")?,
            beta,
        )
    }

    pub fn attach_obstruction(&mut self, points: ObstructionPoints) {
        self.masks.set_obstruction(Some(points));
    }

    pub fn attach_bad_water(&mut self, regions: BadWaterRegions) {
        self.masks.set_bad_water(Some(regions));
    }

    pub fn obstruction_mask(&self) -> ImageryResult<Option<Mask>> {
        self.masks.obstruction_mask(self.image_shape())
    }

    pub fn bad_water_mask(&self) -> Option<Mask> {
        self.masks.bad_water_mask()
    }

    /// Pixels that are unobstructed and not deprecated water, when both
    /// providers are attached
    pub fn water_validity_mask(&self) -> ImageryResult<Option<Mask>> {
        self.masks.water_validity_mask(self.image_shape())
    }

    /// Write `{key}.json.gz` into `folder`
    pub fn save<P: AsRef<Path>>(&self, folder: P) -> ImageryResult<PathBuf> {
        io::persistence::save(self, folder.as_ref())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> ImageryResult<Self> {
        io::persistence::load(path.as_ref())
    }
}
