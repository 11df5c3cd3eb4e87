//! Gradient Hough transform for circles.
//!
//! Edge pixels (Canny, high threshold `edge_threshold`, low threshold half of
//! it) vote along both directions of their Sobel gradient for every radius in
//! `[min_radius, max_radius]`. Accumulator peaks above `vote_threshold` become
//! center candidates, strongest first. Each candidate gets the radius whose
//! 1-px distance bin holds the most edge pixels relative to its
//! circumference, and is accepted when that bin holds more than
//! `vote_threshold` pixels and no stronger accepted center lies closer than
//! `min_dist`.

use pda_core::{Circle, ImageView};
use pda_edge::{CannyDetector, Gradients};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleHoughParams {
    pub edge_threshold: f32,
    pub vote_threshold: u32,
    pub min_radius: u32,
    pub max_radius: u32,
    pub min_dist: f32,
}

/// Circle search over one frame, reusable across threshold settings.
///
/// Sobel gradients are computed once in [`CircleHough::new`]; every
/// [`CircleHough::detect`] call only reruns hysteresis and voting.
#[derive(Debug, Clone)]
pub struct CircleHough {
    grad: Gradients,
    canny: CannyDetector,
    accum: Vec<u32>,
    rows: Vec<Vec<u32>>,
    hist: Vec<u32>,
}

impl CircleHough {
    pub fn new(img: &ImageView<'_, u8>) -> Self {
        Self {
            grad: Gradients::sobel(img),
            canny: CannyDetector::new(),
            accum: Vec::new(),
            rows: Vec::new(),
            hist: Vec::new(),
        }
    }

    pub fn detect(&mut self, p: &CircleHoughParams) -> Vec<Circle> {
        let (w, h) = (self.grad.width(), self.grad.height());
        if w < 3 || h < 3 || p.min_radius > p.max_radius || p.max_radius == 0 {
            return Vec::new();
        }

        let high = p.edge_threshold.max(1.0);
        let low = (high / 2.0).floor().max(1.0);
        let edges = self.canny.detect(&self.grad, low, high);

        self.rows.clear();
        self.rows.resize(h, Vec::new());
        self.accum.clear();
        self.accum.resize(w * h, 0);

        let gx = self.grad.gx().data();
        let gy = self.grad.gy().data();
        let (wf, hf) = (w as f32, h as f32);

        for (idx, _) in edges.data().iter().enumerate().filter(|&(_, &e)| e != 0) {
            let (x, y) = (idx % w, idx / w);
            let (vx, vy) = (gx[idx], gy[idx]);
            let mag = (vx * vx + vy * vy).sqrt();
            if mag <= 0.0 {
                continue;
            }
            self.rows[y].push(x as u32);

            let (sx, sy) = (vx / mag, vy / mag);
            for sign in [1.0f32, -1.0] {
                for r in p.min_radius..=p.max_radius {
                    let cx = (x as f32 + sign * sx * r as f32 + 0.5).floor();
                    let cy = (y as f32 + sign * sy * r as f32 + 0.5).floor();
                    if cx < 0.0 || cy < 0.0 || cx >= wf || cy >= hf {
                        break;
                    }
                    self.accum[cy as usize * w + cx as usize] += 1;
                }
            }
        }

        let centers = self.peaks(w, h, p.vote_threshold);
        let min_dist2 = p.min_dist * p.min_dist;
        let mut circles: Vec<Circle> = Vec::new();

        for (cx, cy) in centers {
            let too_close = circles.iter().any(|c| {
                let dx = c.x as f32 - cx as f32;
                let dy = c.y as f32 - cy as f32;
                dx * dx + dy * dy < min_dist2
            });
            if too_close {
                continue;
            }

            if let Some((radius, support)) = self.best_radius(cx, cy, p) {
                if support > p.vote_threshold {
                    circles.push(Circle::new(cx as i32, cy as i32, radius as i32));
                }
            }
        }

        tracing::debug!(
            edge_threshold = p.edge_threshold,
            vote_threshold = p.vote_threshold,
            found = circles.len(),
            "hough circles"
        );
        circles
    }

    /// Local maxima above `threshold`, strongest first.
    ///
    /// Ties with the right or lower neighbour resolve to the upper-left cell
    /// so a flat two-cell peak still yields one center.
    fn peaks(&self, w: usize, h: usize, threshold: u32) -> Vec<(usize, usize)> {
        let a = &self.accum;
        let mut found = Vec::new();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let idx = y * w + x;
                let v = a[idx];
                if v > threshold
                    && v > a[idx - 1]
                    && v >= a[idx + 1]
                    && v > a[idx - w]
                    && v >= a[idx + w]
                {
                    found.push((v, x, y));
                }
            }
        }
        found.sort_by(|l, r| r.0.cmp(&l.0));
        found.into_iter().map(|(_, x, y)| (x, y)).collect()
    }

    /// Radius maximizing `support / radius`, smallest radius on ties.
    fn best_radius(&mut self, cx: usize, cy: usize, p: &CircleHoughParams) -> Option<(u32, u32)> {
        let max_r = p.max_radius as usize;
        self.hist.clear();
        self.hist.resize(max_r + 1, 0);

        let y0 = cy.saturating_sub(max_r);
        let y1 = (cy + max_r).min(self.rows.len().saturating_sub(1));
        let (min_r2, max_r2) = ((p.min_radius as f32).powi(2), (max_r as f32).powi(2));

        for y in y0..=y1 {
            let dy = y as f32 - cy as f32;
            for &x in &self.rows[y] {
                let dx = x as f32 - cx as f32;
                let d2 = dx * dx + dy * dy;
                if d2 < min_r2 || d2 > max_r2 {
                    continue;
                }
                let bin = (d2.sqrt() + 0.5).floor() as usize;
                if let Some(count) = self.hist.get_mut(bin) {
                    *count += 1;
                }
            }
        }

        let mut best: Option<(u32, u32)> = None;
        for r in p.min_radius.max(1)..=p.max_radius {
            let count = self.hist[r as usize];
            if count == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((br, bc)) => u64::from(count) * u64::from(br) > u64::from(bc) * u64::from(r),
            };
            if better {
                best = Some((r, count));
            }
        }
        best
    }
}

/// One-shot circle search.
pub fn hough_circles(img: &ImageView<'_, u8>, params: &CircleHoughParams) -> Vec<Circle> {
    CircleHough::new(img).detect(params)
}
