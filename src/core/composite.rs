//! RGB composites built from the red, green and blue bands

use crate::config::TrueColorParams;
use crate::types::{BandCube, BandImage, ImageryError, ImageryResult};
use ndarray::{stack, Axis};

/// Sentinel digital numbers scaled by `beta` and clipped to [0, 1], stacked R, G, B
pub fn true_color_float(
    red: &BandImage,
    green: &BandImage,
    blue: &BandImage,
    beta: f32,
) -> ImageryResult<BandCube> {
    if !(beta > 0.0) {
        return Err(ImageryError::InvalidFormat(format!(
            "true color beta must be positive, got {}",
            beta
        )));
    }
    stack_rgb(red, green, blue, |value| (value / beta).clamp(0.0, 1.0))
}

/// Reflectance mapped linearly from `[reflectance_min, reflectance_max]` onto
/// 0..=255 and rounded, stacked R, G, B. NaN stays NaN.
pub fn true_color_reflectance(
    red: &BandImage,
    green: &BandImage,
    blue: &BandImage,
    params: &TrueColorParams,
) -> ImageryResult<BandCube> {
    let low = params.reflectance_min;
    let high = params.reflectance_max;
    if !(high > low) {
        return Err(ImageryError::InvalidFormat(format!(
            "reflectance range [{}, {}] is empty",
            low, high
        )));
    }
    stack_rgb(red, green, blue, |value| {
        let unit = ((value - low) / (high - low)).clamp(0.0, 1.0);
        (unit * 255.0).round()
    })
}

fn stack_rgb<F>(red: &BandImage, green: &BandImage, blue: &BandImage, scale: F) -> ImageryResult<BandCube>
where
    F: Fn(f32) -> f32,
{
    if red.dim() != green.dim() || red.dim() != blue.dim() {
        return Err(ImageryError::InvalidFormat(format!(
            "RGB bands differ in shape: {:?} {:?} {:?}",
            red.dim(),
            green.dim(),
            blue.dim()
        )));
    }

    let channels = [red.mapv(&scale), green.mapv(&scale), blue.mapv(&scale)];
    let views: Vec<_> = channels.iter().map(|channel| channel.view()).collect();
    Ok(stack(Axis(2), &views)?)
}
