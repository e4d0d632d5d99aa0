use crate::config::{FamilyConfig, RegionConfig};
use crate::core::product::SatelliteImage;
use crate::io::RawLoader;
use crate::types::ImageryResult;

/// Load and construct one product
pub fn build_one<L: RawLoader + ?Sized>(
    loader: &L,
    region: &RegionConfig,
    family: &FamilyConfig,
) -> ImageryResult<SatelliteImage> {
    let raw = loader.load()?;
    SatelliteImage::from_raw(raw, region, family)
}

/// Build a time series of products for one region.
///
/// Results keep the order of `loaders`; one failing product does not stop
/// the others.
pub fn build_all<L: RawLoader + Sync>(
    loaders: &[L],
    region: &RegionConfig,
    family: &FamilyConfig,
) -> Vec<ImageryResult<SatelliteImage>> {
    log::info!(
        "Building {} {} product(s) for region '{}'",
        loaders.len(),
        family.family,
        region.name
    );

    let results = build_products(loaders, region, family);

    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        log::warn!("{} of {} product(s) failed", failed, results.len());
    }
    results
}

#[cfg(feature = "parallel")]
fn build_products<L: RawLoader + Sync>(
    loaders: &[L],
    region: &RegionConfig,
    family: &FamilyConfig,
) -> Vec<ImageryResult<SatelliteImage>> {
    use rayon::prelude::*;

    loaders
        .par_iter()
        .map(|loader| build_one(loader, region, family))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn build_products<L: RawLoader + Sync>(
    loaders: &[L],
    region: &RegionConfig,
    family: &FamilyConfig,
) -> Vec<ImageryResult<SatelliteImage>> {
    loaders
        .iter()
        .map(|loader| build_one(loader, region, family))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProductFamily;
    use crate::core::band::BandSet;
    use crate::io::{FamilyExtras, RawProduct};
    use crate::types::{AffineMatrix, ImageryError};
    use ndarray::{Array2, Array3};

    fn raw(date: &str) -> RawProduct {
        let mut bands = BandSet::new();
        for name in ["blue_band", "green_band", "red_band", "nir_band", "cloud_prob"] {
            bands.insert(name, Array2::from_elem((6, 6), 0.02f32));
        }
        bands.insert("scene_clf", Array2::from_elem((6, 6), 6.0f32));
        bands.insert("true_color_image", Array3::<f32>::zeros((6, 6, 3)));
        RawProduct {
            family: ProductFamily::Sentinel2,
            bands,
            date: date.to_string(),
            extras: FamilyExtras::Raster {
                crs: "EPSG:32620".to_string(),
                affine: AffineMatrix::new(10.0, 0.0, 300_000.0, 0.0, -10.0, 5_200_020.0),
                cloud_coverage: None,
            },
        }
    }

    #[test]
    fn test_results_keep_input_order() {
        let loaders = vec![
            raw("2021-06-01T15:00:00Z"),
            raw("not a date"),
            raw("2021-06-21T15:00:00Z"),
        ];
        let region = RegionConfig::new("general");
        let results = build_all(&loaders, &region, &FamilyConfig::sentinel2());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().key(), "general_2021-06-01");
        assert!(matches!(results[1], Err(ImageryError::InvalidFormat(_))));
        assert_eq!(results[2].as_ref().unwrap().key(), "general_2021-06-21");
    }
}
