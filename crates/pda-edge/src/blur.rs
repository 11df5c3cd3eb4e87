//! Separable Gaussian smoothing of 8-bit frames.

use pda_core::{BorderMode, Image, ImageView};

use crate::conv1d::convolve_f32;
use crate::kernels1d::GaussianKernel1D;

/// Blurs with a `ksize` x `ksize` Gaussian (reflect-101 borders).
///
/// `sigma <= 0` derives sigma from the kernel size. Output is rounded and
/// saturated back to `u8`.
pub fn gaussian_blur_u8(src: &ImageView<'_, u8>, ksize: usize, sigma: f32) -> Image<u8> {
    let (w, h) = (src.width(), src.height());
    if w == 0 || h == 0 {
        return Image::new_fill(w, h, 0);
    }

    let kernel = GaussianKernel1D::new(ksize, sigma);
    let border = BorderMode::Reflect101;

    let mut horiz = vec![0.0f32; w * h];
    let mut line_in = vec![0.0f32; w.max(h)];
    let mut line_out = vec![0.0f32; w.max(h)];

    for (y, row) in src.rows().enumerate() {
        for (dst, &px) in line_in.iter_mut().zip(row) {
            *dst = f32::from(px);
        }
        convolve_f32(
            &line_in[..w],
            &kernel.g,
            kernel.radius,
            border,
            &mut line_out[..w],
        );
        horiz[y * w..(y + 1) * w].copy_from_slice(&line_out[..w]);
    }

    let mut out = Image::new_fill(w, h, 0u8);
    let dst = out.data_mut();
    for x in 0..w {
        for y in 0..h {
            line_in[y] = horiz[y * w + x];
        }
        convolve_f32(
            &line_in[..h],
            &kernel.g,
            kernel.radius,
            border,
            &mut line_out[..h],
        );
        for y in 0..h {
            dst[y * w + x] = line_out[y].round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}
