//! Progressive probabilistic Hough transform for line segments.
//!
//! Each edge pixel votes into a (theta, rho) accumulator. As soon as the bin
//! it voted for most reaches the threshold, the corridor along that line is
//! walked in both directions (tolerating gaps up to `max_line_gap`), the
//! pixels on it are removed, and their votes withdrawn. Segments spanning at
//! least `min_line_length` along x or y are reported.

use std::f32::consts::PI;

use pda_core::{ImageView, Segment};
use serde::{Deserialize, Serialize};

const SHIFT: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineHoughConfig {
    /// Distance resolution in pixels.
    pub rho: f32,
    /// Angle resolution in radians.
    pub theta: f32,
    /// Accumulator votes needed before a corridor is walked.
    pub threshold: i32,
    pub min_line_length: usize,
    pub max_line_gap: usize,
}

impl Default for LineHoughConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: PI / 180.0,
            threshold: 115,
            min_line_length: 0,
            max_line_gap: 3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Px {
    Empty,
    Pending,
    Voted,
}

struct Accumulator {
    numrho: usize,
    trig: Vec<(f32, f32)>,
    bins: Vec<i32>,
}

impl Accumulator {
    fn new(w: usize, h: usize, cfg: &LineHoughConfig) -> Self {
        let numangle = ((PI / cfg.theta).round() as usize).max(1);
        let numrho = ((((w + h) * 2 + 1) as f32 / cfg.rho).round() as usize).max(1);
        let irho = 1.0 / cfg.rho;
        let trig = (0..numangle)
            .map(|n| {
                let a = n as f32 * cfg.theta;
                (a.cos() * irho, a.sin() * irho)
            })
            .collect();

        Self {
            numrho,
            trig,
            bins: vec![0; numangle * numrho],
        }
    }

    fn bin(&self, n: usize, x: usize, y: usize) -> usize {
        let (c, s) = self.trig[n];
        let r = (x as f32 * c + y as f32 * s).round() as isize + (self.numrho as isize - 1) / 2;
        n * self.numrho + r.clamp(0, self.numrho as isize - 1) as usize
    }

    /// Adds one vote per angle and returns the strongest `(angle, votes)`.
    fn vote(&mut self, x: usize, y: usize) -> (usize, i32) {
        let mut best = (0, i32::MIN);
        for n in 0..self.trig.len() {
            let b = self.bin(n, x, y);
            self.bins[b] += 1;
            if self.bins[b] > best.1 {
                best = (n, self.bins[b]);
            }
        }
        best
    }

    fn unvote(&mut self, x: usize, y: usize) {
        for n in 0..self.trig.len() {
            let b = self.bin(n, x, y);
            self.bins[b] -= 1;
        }
    }
}

/// Fixed-point walker along a line direction.
#[derive(Clone, Copy)]
struct Walker {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    x_major: bool,
}

impl Walker {
    fn new(px: usize, py: usize, (c, s): (f32, f32)) -> Self {
        let (a, b) = (-s, c);
        let one = (1i64 << SHIFT) as f32;
        let half = 1i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                x: px as i64,
                y: ((py as i64) << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x: ((px as i64) << SHIFT) + half,
                y: py as i64,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    fn reversed(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            ..self
        }
    }

    fn pixel(&self) -> (i64, i64) {
        if self.x_major {
            (self.x, self.y >> SHIFT)
        } else {
            (self.x >> SHIFT, self.y)
        }
    }

    fn advance(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
    }
}

/// Detects line segments in a binary edge map (`> 0` is an edge).
pub fn hough_lines_p(edges: &ImageView<'_, u8>, cfg: &LineHoughConfig) -> Vec<Segment> {
    let (w, h) = (edges.width(), edges.height());
    if w == 0 || h == 0 || cfg.rho <= 0.0 || cfg.theta <= 0.0 {
        return Vec::new();
    }

    let mut acc = Accumulator::new(w, h, cfg);
    let mut mask = vec![Px::Empty; w * h];
    let mut points = Vec::new();
    for (y, row) in edges.rows().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if v != 0 {
                mask[y * w + x] = Px::Pending;
                points.push((x, y));
            }
        }
    }

    let in_bounds = |(x, y): (i64, i64)| x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h;
    let mut segments = Vec::new();

    for (x, y) in points {
        if mask[y * w + x] == Px::Empty {
            continue;
        }

        let (best_n, votes) = acc.vote(x, y);
        mask[y * w + x] = Px::Voted;
        if votes < cfg.threshold {
            continue;
        }

        let start = Walker::new(x, y, acc.trig[best_n]);
        let mut ends = [(x as i64, y as i64); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut walker = if k == 0 { start } else { start.reversed() };
            let mut gap = 0;
            loop {
                let p = walker.pixel();
                if !in_bounds(p) {
                    break;
                }
                if mask[p.1 as usize * w + p.0 as usize] != Px::Empty {
                    gap = 0;
                    *end = p;
                } else {
                    gap += 1;
                    if gap > cfg.max_line_gap {
                        break;
                    }
                }
                walker.advance();
            }
        }

        let min_len = cfg.min_line_length as i64;
        let good = (ends[1].0 - ends[0].0).abs() >= min_len || (ends[1].1 - ends[0].1).abs() >= min_len;

        // Clear the corridor whether or not the segment is kept.
        for (k, end) in ends.iter().enumerate() {
            let mut walker = if k == 0 { start } else { start.reversed() };
            loop {
                let p = walker.pixel();
                if !in_bounds(p) {
                    break;
                }
                let idx = p.1 as usize * w + p.0 as usize;
                if mask[idx] == Px::Voted && good {
                    acc.unvote(p.0 as usize, p.1 as usize);
                }
                mask[idx] = Px::Empty;
                if p == *end {
                    break;
                }
                walker.advance();
            }
        }

        if good {
            segments.push(Segment::new(
                ends[0].0 as i32,
                ends[0].1 as i32,
                ends[1].0 as i32,
                ends[1].1 as i32,
            ));
        }
    }

    tracing::debug!(segments = segments.len(), "probabilistic hough");
    segments
}

#[cfg(test)]
mod tests {
    use pda_core::Image;

    use super::{LineHoughConfig, hough_lines_p};

    fn cfg(threshold: i32, min_len: usize) -> LineHoughConfig {
        LineHoughConfig {
            threshold,
            min_line_length: min_len,
            ..LineHoughConfig::default()
        }
    }

    #[test]
    fn single_vertical_line_is_one_segment() {
        let img = Image::from_fn(60, 80, |x, y| if x == 30 && (10..70).contains(&y) { 255u8 } else { 0 });
        let segs = hough_lines_p(&img.as_view(), &cfg(40, 30));

        assert_eq!(segs.len(), 1);
        let s = segs[0];
        assert_eq!((s.x1, s.x2), (30, 30));
        assert_eq!((s.y1.min(s.y2), s.y1.max(s.y2)), (10, 69));
    }

    #[test]
    fn horizontal_line_endpoints() {
        let img = Image::from_fn(100, 40, |x, y| if y == 20 && (5..95).contains(&x) { 255u8 } else { 0 });
        let segs = hough_lines_p(&img.as_view(), &cfg(50, 50));

        assert_eq!(segs.len(), 1);
        let s = segs[0];
        assert_eq!((s.y1, s.y2), (20, 20));
        assert_eq!((s.x1.min(s.x2), s.x1.max(s.x2)), (5, 94));
    }

    #[test]
    fn gaps_up_to_limit_are_bridged() {
        let img = Image::from_fn(40, 100, |x, y| {
            let on = x == 20 && (5..95).contains(&y) && !(48..51).contains(&y);
            if on { 255u8 } else { 0 }
        });
        let bridged = hough_lines_p(&img.as_view(), &cfg(40, 60));
        assert_eq!(bridged.len(), 1);
        assert!(bridged[0].length() > 85.0);

        let strict = LineHoughConfig {
            max_line_gap: 2,
            ..cfg(40, 60)
        };
        assert!(hough_lines_p(&img.as_view(), &strict).is_empty());
    }

    #[test]
    fn short_or_weak_lines_are_ignored() {
        let img = Image::from_fn(50, 50, |x, y| if x == 25 && (10..30).contains(&y) { 255u8 } else { 0 });

        assert!(hough_lines_p(&img.as_view(), &cfg(30, 5)).is_empty());
        assert!(hough_lines_p(&img.as_view(), &cfg(10, 25)).is_empty());
    }

    #[test]
    fn diagonal_line_is_found() {
        let img = Image::from_fn(80, 80, |x, y| if x == y && (10..70).contains(&x) { 255u8 } else { 0 });
        let segs = hough_lines_p(&img.as_view(), &cfg(40, 40));

        assert_eq!(segs.len(), 1);
        let s = segs[0];
        assert!((s.x2 - s.x1).abs() >= 55);
        assert_eq!(s.x1 - s.x2, s.y1 - s.y2);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let img = Image::from_fn(90, 90, |x, y| {
            let a = x == 20 && y > 5;
            let b = x + y == 120;
            if a || b { 255u8 } else { 0 }
        });
        let c = cfg(30, 20);
        assert_eq!(hough_lines_p(&img.as_view(), &c), hough_lines_p(&img.as_view(), &c));
    }
}
