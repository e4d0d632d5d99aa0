//! GDAL raster access shared by the product readers

use crate::types::{AffineMatrix, BandCube, BandImage, ImageryError, ImageryResult};
use gdal::Dataset;
use ndarray::{stack, Array2, Axis};
use std::path::Path;

pub(crate) fn open(path: &str) -> ImageryResult<Dataset> {
    log::debug!("Opening raster {}", path);
    Ok(Dataset::open(Path::new(path))?)
}

/// One raster band as `f32`, nodata replaced with NaN
pub(crate) fn read_band(dataset: &Dataset, index: isize) -> ImageryResult<BandImage> {
    let (width, height) = dataset.raster_size();
    let rasterband = dataset.rasterband(index)?;
    let nodata = rasterband.no_data_value();
    let buffer = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

    let mut data = Array2::from_shape_vec((height, width), buffer.data)?;
    if let Some(nodata) = nodata {
        let nodata = nodata as f32;
        data.mapv_inplace(|value| if value == nodata { f32::NAN } else { value });
    }
    Ok(data)
}

/// All bands of a dataset stacked as rows x cols x bands
pub(crate) fn read_stacked(dataset: &Dataset) -> ImageryResult<BandCube> {
    let count = dataset.raster_count();
    if count < 1 {
        return Err(ImageryError::InvalidFormat("raster has no bands".to_string()));
    }
    let channels = (1..=count)
        .map(|index| read_band(dataset, index))
        .collect::<ImageryResult<Vec<_>>>()?;
    let views: Vec<_> = channels.iter().map(|channel| channel.view()).collect();
    Ok(stack(Axis(2), &views)?)
}

/// CRS identifier (`EPSG:n`) and affine matrix of a dataset
pub(crate) fn georeferencing(dataset: &Dataset) -> ImageryResult<(String, AffineMatrix)> {
    let geo_transform = dataset.geo_transform()?;
    let code = dataset.spatial_ref()?.auth_code()?;
    log::debug!("Geotransform {:?}, EPSG:{}", geo_transform, code);
    Ok((format!("EPSG:{}", code), AffineMatrix::from_gdal(geo_transform)))
}
