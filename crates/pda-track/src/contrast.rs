//! Automatic brightness/contrast stretch applied before detection.

use pda_core::{Image, ImageView};
use serde::{Deserialize, Serialize};

/// Linear intensity map `v -> |alpha * v + beta|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaBeta {
    pub alpha: f64,
    pub beta: f64,
}

impl AlphaBeta {
    pub const IDENTITY: Self = Self {
        alpha: 1.0,
        beta: 0.0,
    };

    pub fn apply(&self, v: u8) -> u8 {
        (self.alpha * f64::from(v) + self.beta)
            .abs()
            .round()
            .min(255.0) as u8
    }
}

/// Gain and offset stretching the clipped histogram range to `0..=255`.
///
/// `clip_percent` of the pixels are ignored, half at each end. The upper
/// bound never drops to 10 or below. A flat histogram yields the identity.
pub fn calculate_alpha_beta(gray: &ImageView<'_, u8>, clip_percent: f64) -> AlphaBeta {
    let mut cumulative = [0u64; 256];
    for row in gray.rows() {
        for &v in row {
            cumulative[usize::from(v)] += 1;
        }
    }
    for i in 1..256 {
        cumulative[i] += cumulative[i - 1];
    }

    let total = cumulative[255] as f64;
    let clip = clip_percent * (total / 100.0) / 2.0;

    let mut lo = 0usize;
    while lo < 255 && (cumulative[lo] as f64) < clip {
        lo += 1;
    }
    let mut hi = 255usize;
    while hi > 10 && cumulative[hi] as f64 >= total - clip {
        hi -= 1;
    }

    if hi <= lo {
        return AlphaBeta::IDENTITY;
    }
    let alpha = 255.0 / (hi - lo) as f64;
    AlphaBeta {
        alpha,
        beta: -(lo as f64) * alpha,
    }
}

pub fn convert_scale_abs(gray: &ImageView<'_, u8>, ab: AlphaBeta) -> Image<u8> {
    gray.map(|&v| ab.apply(v))
}

/// [`calculate_alpha_beta`] followed by [`convert_scale_abs`].
pub fn auto_contrast(gray: &ImageView<'_, u8>, clip_percent: f64) -> Image<u8> {
    let ab = calculate_alpha_beta(gray, clip_percent);
    tracing::debug!(alpha = ab.alpha, beta = ab.beta, "contrast stretch");
    convert_scale_abs(gray, ab)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use pda_core::Image;

    use super::{AlphaBeta, auto_contrast, calculate_alpha_beta};

    #[test]
    fn flat_image_keeps_identity() {
        let img = Image::new_fill(8, 8, 77u8);
        assert_eq!(calculate_alpha_beta(&img.as_view(), 1.0), AlphaBeta::IDENTITY);
    }

    #[test]
    fn two_level_image_stretches_to_full_range() {
        let img = Image::from_fn(10, 10, |x, _| if x < 5 { 100u8 } else { 150 });
        let ab = calculate_alpha_beta(&img.as_view(), 1.0);

        // Upper bound walks down to the last level below 150.
        assert_relative_eq!(ab.alpha, 255.0 / 49.0, epsilon = 1e-9);
        assert_relative_eq!(ab.beta, -100.0 * 255.0 / 49.0, epsilon = 1e-9);

        let out = auto_contrast(&img.as_view(), 1.0);
        assert_eq!(out.get(0, 0), Some(&0));
        assert_eq!(out.get(9, 0), Some(&255));
    }

    #[test]
    fn negative_results_fold_to_magnitude() {
        let ab = AlphaBeta {
            alpha: 2.0,
            beta: -100.0,
        };
        assert_eq!(ab.apply(10), 80);
        assert_eq!(ab.apply(200), 255);
    }
}
