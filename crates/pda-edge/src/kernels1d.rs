/// Sampled, normalized 1D Gaussian.
///
/// Conventions:
/// - `len = ksize` (odd), `radius = ksize / 2`.
/// - A non-positive sigma is derived from the size as
///   `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
/// - `sum(g) == 1` up to rounding.
#[derive(Debug, Clone)]
pub struct GaussianKernel1D {
    pub sigma: f32,
    pub radius: usize,
    pub g: Vec<f32>,
}

impl GaussianKernel1D {
    pub fn new(ksize: usize, sigma: f32) -> Self {
        assert!(ksize % 2 == 1, "kernel size must be odd");

        let sigma = if sigma > 0.0 && sigma.is_finite() {
            sigma
        } else {
            Self::sigma_for_size(ksize)
        };
        let radius = ksize / 2;

        let denom = 2.0 * sigma * sigma;
        let mut g: Vec<f32> = (0..ksize)
            .map(|i| {
                let x = i as f32 - radius as f32;
                (-(x * x) / denom).exp()
            })
            .collect();

        let sum: f32 = g.iter().sum();
        if sum > 0.0 {
            for v in &mut g {
                *v /= sum;
            }
        }

        Self { sigma, radius, g }
    }

    pub fn sigma_for_size(ksize: usize) -> f32 {
        0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}
