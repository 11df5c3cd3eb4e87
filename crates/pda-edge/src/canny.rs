//! Canny edge extraction with a 3x3 Sobel aperture.
//!
//! Gradient magnitude is the L1 norm `|gx| + |gy|`. A pixel is an edge
//! candidate when its non-maximum-suppressed magnitude is `> low`, and a seed
//! when it is `> high`; candidates 8-connected to a seed are kept.
//!
//! [`Gradients`] is split out so callers that rerun the hysteresis with
//! several threshold pairs (the circle search does) pay for the Sobel pass
//! once.

use pda_core::{BorderMode, Image, ImageView, map_index};

/// Sobel derivatives and L1 magnitude of one frame.
#[derive(Debug, Clone)]
pub struct Gradients {
    gx: Image<f32>,
    gy: Image<f32>,
    mag: Image<f32>,
}

impl Gradients {
    /// Sobel 3x3 with replicated borders.
    pub fn sobel(src: &ImageView<'_, u8>) -> Self {
        let (w, h) = (src.width(), src.height());
        let mut gx = Image::new_fill(w, h, 0.0f32);
        let mut gy = Image::new_fill(w, h, 0.0f32);
        let mut mag = Image::new_fill(w, h, 0.0f32);
        if w == 0 || h == 0 {
            return Self { gx, gy, mag };
        }

        let px = |x: usize, y: usize| -> f32 { src.get(x, y).map_or(0.0, |&v| f32::from(v)) };
        let near = |i: usize, len: usize| {
            let at = |d: isize| map_index(i as isize + d, len, BorderMode::Replicate).unwrap_or(i);
            (at(-1), at(1))
        };

        {
            let (gxd, gyd, md) = (gx.data_mut(), gy.data_mut(), mag.data_mut());
            for y in 0..h {
                let (ym1, yp1) = near(y, h);
                for x in 0..w {
                    let (xm1, xp1) = near(x, w);

                    let p00 = px(xm1, ym1);
                    let p01 = px(x, ym1);
                    let p02 = px(xp1, ym1);
                    let p10 = px(xm1, y);
                    let p12 = px(xp1, y);
                    let p20 = px(xm1, yp1);
                    let p21 = px(x, yp1);
                    let p22 = px(xp1, yp1);

                    let dx = (p02 + 2.0 * p12 + p22) - (p00 + 2.0 * p10 + p20);
                    let dy = (p20 + 2.0 * p21 + p22) - (p00 + 2.0 * p01 + p02);

                    let idx = y * w + x;
                    gxd[idx] = dx;
                    gyd[idx] = dy;
                    md[idx] = dx.abs() + dy.abs();
                }
            }
        }

        Self { gx, gy, mag }
    }

    pub fn width(&self) -> usize {
        self.mag.width()
    }

    pub fn height(&self) -> usize {
        self.mag.height()
    }

    pub fn gx(&self) -> &Image<f32> {
        &self.gx
    }

    pub fn gy(&self) -> &Image<f32> {
        &self.gy
    }

    pub fn magnitude(&self) -> &Image<f32> {
        &self.mag
    }
}

/// Reusable scratch buffers for non-maximum suppression and hysteresis.
#[derive(Debug, Clone, Default)]
pub struct CannyDetector {
    nms: Vec<f32>,
    state: Vec<u8>,
    stack: Vec<usize>,
}

const WEAK: u8 = 1;
const KEPT: u8 = 2;

impl CannyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binary edge map (`0` / `255`) from precomputed gradients.
    pub fn detect(&mut self, grad: &Gradients, low: f32, high: f32) -> Image<u8> {
        let (w, h) = (grad.width(), grad.height());
        let mut out = Image::new_fill(w, h, 0u8);
        if w < 3 || h < 3 {
            return out;
        }

        let (low, high) = if high < low { (high, low) } else { (low, high) };

        self.non_max_suppression(grad);
        self.hysteresis(w, h, low, high);

        for (dst, &s) in out.data_mut().iter_mut().zip(&self.state) {
            if s == KEPT {
                *dst = 255;
            }
        }
        out
    }

    fn non_max_suppression(&mut self, grad: &Gradients) {
        let (w, h) = (grad.width(), grad.height());
        let gx = grad.gx.data();
        let gy = grad.gy.data();
        let mag = grad.mag.data();

        self.nms.clear();
        self.nms.resize(w * h, 0.0);

        const TAN22_5: f32 = 0.414_213_57;
        const TAN67_5: f32 = 2.414_213_7;

        for y in 1..(h - 1) {
            for x in 1..(w - 1) {
                let idx = y * w + x;
                let m = mag[idx];
                if m <= 0.0 {
                    continue;
                }

                let (dx, dy) = (gx[idx], gy[idx]);
                let (ax, ay) = (dx.abs(), dy.abs());

                // The "previous" neighbour must be strictly smaller so that a
                // two-pixel plateau yields a single edge pixel.
                let keep = if ay <= ax * TAN22_5 {
                    m > mag[idx - 1] && m >= mag[idx + 1]
                } else if ay >= ax * TAN67_5 {
                    m > mag[idx - w] && m >= mag[idx + w]
                } else if dx * dy > 0.0 {
                    m > mag[idx - w - 1] && m > mag[idx + w + 1]
                } else {
                    m > mag[idx - w + 1] && m > mag[idx + w - 1]
                };

                if keep {
                    self.nms[idx] = m;
                }
            }
        }
    }

    fn hysteresis(&mut self, w: usize, h: usize, low: f32, high: f32) {
        self.state.clear();
        self.state.resize(w * h, 0);
        self.stack.clear();

        for (idx, &v) in self.nms.iter().enumerate() {
            if v > high {
                self.state[idx] = KEPT;
                self.stack.push(idx);
            } else if v > low {
                self.state[idx] = WEAK;
            }
        }

        while let Some(idx) = self.stack.pop() {
            let x = idx % w;
            let y = idx / w;

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let nidx = ny * w + nx;
                    if self.state[nidx] == WEAK {
                        self.state[nidx] = KEPT;
                        self.stack.push(nidx);
                    }
                }
            }
        }
    }
}

/// One-shot Canny on an 8-bit view.
pub fn canny_u8(src: &ImageView<'_, u8>, low: f32, high: f32) -> Image<u8> {
    let grad = Gradients::sobel(src);
    CannyDetector::new().detect(&grad, low, high)
}
