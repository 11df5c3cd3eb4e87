//! Smoothing and edge extraction for microscopy frames.
//!
//! Coordinates follow the pixel-center convention: integer `(x, y)` is the
//! center of pixel `(x, y)`.
//!
//! Everything here mirrors the behavior of the usual OpenCV building blocks
//! (`GaussianBlur` with a kernel-size-derived sigma, `Canny` with a 3x3 Sobel
//! aperture and L1 magnitude) so thresholds tuned against recorded footage
//! carry over unchanged.

pub mod blur;
pub mod canny;
pub mod conv1d;
pub mod kernels1d;

pub use blur::gaussian_blur_u8;
pub use canny::{CannyDetector, Gradients, canny_u8};
pub use kernels1d::GaussianKernel1D;
