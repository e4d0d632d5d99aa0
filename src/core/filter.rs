use crate::config::SmoothingParams;
use crate::types::{BandImage, ImageryError, ImageryResult, Mask};
use ndarray::{Array2, Axis};

/// Separable Gaussian filter with mirror-reflected borders
/// (`d c b a | a b c d | d c b a`).
///
/// The kernel radius is `truncate * sigma` rounded to the nearest integer.
pub fn gaussian_filter(image: &BandImage, sigma: f64, truncate: f64) -> ImageryResult<BandImage> {
    if !(sigma > 0.0) || !sigma.is_finite() || !(truncate > 0.0) {
        return Err(ImageryError::InvalidFormat(format!(
            "Gaussian sigma {} / truncate {} must be positive",
            sigma, truncate
        )));
    }

    let kernel = gaussian_kernel(sigma, truncate);
    log::debug!(
        "Gaussian filter sigma {} radius {} on {:?}",
        sigma,
        kernel.len() / 2,
        image.dim()
    );

    let rows_filtered = convolve_axis(image, &kernel, Axis(0));
    Ok(convolve_axis(&rows_filtered, &kernel, Axis(1)))
}

/// Smooth a binary mask and keep cells whose smoothed value exceeds the threshold
pub fn smooth_mask(mask: &Mask, params: &SmoothingParams) -> ImageryResult<Mask> {
    let as_float = mask.mapv(|value| if value { 1.0f32 } else { 0.0 });
    let smoothed = gaussian_filter(&as_float, params.sigma, params.truncate)?;
    Ok(smoothed.mapv(|value| value > params.threshold))
}

fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f32> {
    let radius = (truncate * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Index into `0..len` after mirror reflection about the array edges
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let folded = index.rem_euclid(period);
    if folded < len {
        folded as usize
    } else {
        (period - 1 - folded) as usize
    }
}

fn convolve_axis(image: &BandImage, kernel: &[f32], axis: Axis) -> BandImage {
    let (rows, cols) = image.dim();
    let radius = (kernel.len() / 2) as isize;
    let len = image.len_of(axis);
    if len == 0 {
        return image.clone();
    }

    Array2::from_shape_fn((rows, cols), |(row, col)| {
        let center = (if axis == Axis(0) { row } else { col }) as isize;
        kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let source = reflect(center + k as isize - radius, len);
                let value = if axis == Axis(0) {
                    image[[source, col]]
                } else {
                    image[[row, source]]
                };
                weight * value
            })
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kernel_is_normalised() {
        let kernel = gaussian_kernel(2.0, 4.0);
        assert_eq!(kernel.len(), 17);
        assert_abs_diff_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kernel[0], kernel[16]);
        assert!(kernel[8] > kernel[7]);
    }

    #[test]
    fn test_reflect_indices() {
        let mapped: Vec<usize> = (-4..8).map(|i| reflect(i, 4)).collect();
        assert_eq!(mapped, vec![3, 2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0]);
        // Radius wider than the image
        assert_eq!(reflect(-9, 2), 0);
        assert_eq!(reflect(5, 1), 0);
    }

    #[test]
    fn test_constant_image_is_unchanged() {
        let image = Array2::from_elem((5, 9), 3.5f32);
        let filtered = gaussian_filter(&image, 2.0, 4.0).unwrap();
        for value in filtered.iter() {
            assert_abs_diff_eq!(*value, 3.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_impulse_spreads_symmetrically() {
        let mut image = Array2::<f32>::zeros((21, 21));
        image[[10, 10]] = 1.0;
        let filtered = gaussian_filter(&image, 1.0, 4.0).unwrap();
        assert_abs_diff_eq!(filtered.sum(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(filtered[[10, 9]], filtered[[10, 11]], epsilon = 1e-7);
        assert_abs_diff_eq!(filtered[[9, 10]], filtered[[10, 9]], epsilon = 1e-7);
        assert!(filtered[[10, 10]] > filtered[[10, 11]]);
    }

    #[test]
    fn test_smooth_mask_erodes_specks() {
        let mut mask = Mask::from_elem((30, 30), false);
        for row in 5..25 {
            for col in 5..25 {
                mask[[row, col]] = true;
            }
        }
        // Isolated water pixel
        mask[[1, 28]] = true;

        let smoothed = smooth_mask(&mask, &SmoothingParams::default()).unwrap();
        assert!(smoothed[[15, 15]]);
        assert!(!smoothed[[1, 28]]);
        assert!(!smoothed[[5, 5]]);
    }

    #[test]
    fn test_invalid_sigma() {
        let image = Array2::<f32>::zeros((3, 3));
        assert!(gaussian_filter(&image, 0.0, 4.0).is_err());
        assert!(gaussian_filter(&image, f64::NAN, 4.0).is_err());
    }
}
