//! Deformation front tracking inside a fixed window above the particle.
//!
//! Each frame's window is min-max normalized and inverted so the dark,
//! aspirated particle becomes the brightest part. Rows are scored with a
//! center-weighted sum and the first best row is the front. The per-frame
//! rows are then rate limited and optionally forced to never move down.

use pda_core::{Circle, FrameSource, ImageView, Region};
use serde::{Deserialize, Serialize};

use crate::TrackError;
use crate::config::DistortionConfig;

/// Front row per frame, 1-based from the top of `window`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistortionTrace {
    pub window: Region,
    pub positions: Vec<i32>,
}

impl DistortionTrace {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Largest valid row.
    pub fn window_height(&self) -> i32 {
        self.window.height()
    }

    /// Displacement of the front relative to the first frame.
    pub fn dl(&self, index: usize) -> Option<i32> {
        let first = *self.positions.first()?;
        Some((self.positions.get(index)? - first).abs())
    }

    /// Image row of the front in frame `index`.
    pub fn tip_y(&self, index: usize) -> Option<i32> {
        Some(self.window.y1 + self.positions.get(index)? - 1)
    }

    pub fn is_non_increasing(&self) -> bool {
        self.positions.windows(2).all(|w| w[1] <= w[0])
    }
}

/// Window above the particle that the front travels through.
///
/// Spans `top_offset` to `bottom_offset` radii above the center, centered on
/// the particle column, clipped to the frame.
pub fn tracking_window(
    particle: &Circle,
    frame_width: usize,
    frame_height: usize,
    cfg: &DistortionConfig,
) -> Result<Region, TrackError> {
    let r = f64::from(particle.radius);
    let width = ((cfg.width_fraction * r).round() as i32).max(cfg.min_width);
    let x1 = particle.x - width / 2;
    let cy = f64::from(particle.y);
    let wanted = Region::new(
        x1,
        (cy - cfg.top_offset * r).round() as i32,
        x1 + width,
        (cy - cfg.bottom_offset * r).round() as i32,
    );

    let window = wanted.clamp_to(frame_width, frame_height);
    if window.is_empty() {
        return Err(TrackError::EmptyWindow(wanted));
    }
    Ok(window)
}

fn column_weights(width: usize) -> Vec<f64> {
    match width {
        0 => Vec::new(),
        1 => vec![0.5],
        _ => {
            let step = 2.0 / (width - 1) as f64;
            (0..width)
                .map(|i| {
                    let x = -1.0 + step * i as f64;
                    -0.5 * x * x + 1.0
                })
                .collect()
        }
    }
}

/// 1-based row with the strongest center-weighted darkness.
///
/// Ties resolve to the topmost row. `None` for an empty view.
pub fn y_maximum(window: &ImageView<'_, u8>) -> Option<i32> {
    if window.width() == 0 || window.height() == 0 {
        return None;
    }

    let (lo, hi) = window
        .rows()
        .flatten()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let scale = if hi > lo { 255.0 / f64::from(hi - lo) } else { 0.0 };
    let weights = column_weights(window.width());

    let mut best: Option<(usize, f64)> = None;
    for (y, row) in window.rows().enumerate() {
        let score: f64 = row
            .iter()
            .zip(&weights)
            .map(|(&v, &w)| {
                let norm = (f64::from(v - lo) * scale).round();
                (255.0 - norm) * w
            })
            .sum();
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((y, score));
        }
    }
    best.map(|(y, _)| y as i32 + 1)
}

/// Limits each step to one row toward the raw value.
///
/// The first output is `start` when given, else the first raw value.
pub fn smooth_positions(raw: &[i32], start: Option<i32>) -> Vec<i32> {
    let Some((&first, rest)) = raw.split_first() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(raw.len());
    let mut prev = start.unwrap_or(first);
    out.push(prev);
    for &v in rest {
        prev += v.cmp(&prev) as i32;
        out.push(prev);
    }
    out
}

/// Clamps every value to at most its predecessor.
pub fn enforce_non_increasing(values: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = i32::MAX;
    for &v in values {
        prev = v.min(prev);
        out.push(prev);
    }
    out
}

/// Raw front rows of every frame in `frames`.
pub fn raw_positions<S: FrameSource + ?Sized>(
    frames: &S,
    window: &Region,
) -> Result<Vec<i32>, TrackError> {
    let mut rows = Vec::with_capacity(frames.len());
    for index in 0..frames.len() {
        let block = frames.frame(index)?.gray_crop(window)?;
        let row = y_maximum(&block.as_view()).ok_or(TrackError::EmptyWindow(*window))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Front trace over all frames for the given particle.
///
/// `start`, when given, replaces the first frame's row and must lie in
/// `1..=window height`.
pub fn track_distortion<S: FrameSource + ?Sized>(
    frames: &S,
    particle: &Circle,
    cfg: &DistortionConfig,
    start: Option<i32>,
) -> Result<DistortionTrace, TrackError> {
    let (width, height) = frames.dimensions().ok_or(TrackError::NoFrames)?;
    let window = tracking_window(particle, width, height, cfg)?;
    tracing::debug!(?window, frames = frames.len(), "tracking window");
    if let Some(row) = start.filter(|r| !(1..=window.height()).contains(r)) {
        return Err(TrackError::StartRowOutOfRange {
            row,
            height: window.height(),
        });
    }

    let mut positions = raw_positions(frames, &window)?;
    if cfg.smooth {
        positions = smooth_positions(&positions, start);
    } else if let (Some(s), Some(first)) = (start, positions.first_mut()) {
        *first = s;
    }
    if cfg.non_increasing {
        positions = enforce_non_increasing(&positions);
    }

    let trace = DistortionTrace { window, positions };
    tracing::info!(
        frames = trace.len(),
        first = ?trace.positions.first(),
        last = ?trace.positions.last(),
        "distortion tracked"
    );
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use pda_core::{Circle, Frame, Image, Region};

    use super::{
        DistortionTrace, enforce_non_increasing, smooth_positions, track_distortion,
        tracking_window, y_maximum,
    };
    use crate::TrackError;
    use crate::config::DistortionConfig;

    #[test]
    fn smoothing_moves_one_row_per_frame() {
        assert_eq!(smooth_positions(&[10, 12, 11, 15], None), vec![10, 11, 11, 12]);
        assert_eq!(smooth_positions(&[10, 3, 3], Some(8)), vec![8, 7, 6]);
        assert!(smooth_positions(&[], Some(4)).is_empty());
        assert_eq!(smooth_positions(&[3, 3], Some(i32::MIN)), vec![i32::MIN, i32::MIN + 1]);
    }

    #[test]
    fn start_row_must_lie_inside_the_window() {
        let frames: Vec<Frame> = (0..3).map(|_| Frame::Gray(Image::new_fill(200, 200, 90u8))).collect();
        let particle = Circle::new(100, 100, 20);
        let cfg = DistortionConfig::default();

        for row in [0, 19, 500, i32::MIN] {
            let err = track_distortion(&frames, &particle, &cfg, Some(row)).expect_err("outside window");
            assert!(
                matches!(err, TrackError::StartRowOutOfRange { row: r, height: 18 } if r == row),
                "row {row}: {err:?}"
            );
        }

        let trace = track_distortion(&frames, &particle, &cfg, Some(18)).expect("bottom row");
        assert_eq!(trace.positions, vec![18, 17, 16]);
        assert_eq!(trace.tip_y(0), Some(86));
    }

    #[test]
    fn smoothing_then_monotonic_holds_the_start() {
        let smoothed = smooth_positions(&[10, 12, 11, 15], None);
        assert_eq!(enforce_non_increasing(&smoothed), vec![10, 10, 10, 10]);
    }

    #[test]
    fn monotonic_clamp_never_raises() {
        assert_eq!(enforce_non_increasing(&[9, 7, 8, 4, 6]), vec![9, 7, 7, 4, 4]);
    }

    #[test]
    fn window_spans_above_particle_top() {
        let cfg = DistortionConfig::default();
        let w = tracking_window(&Circle::new(100, 100, 20), 200, 200, &cfg).expect("inside");
        assert_eq!(w, Region::new(97, 69, 103, 87));
    }

    #[test]
    fn window_is_clipped_and_may_vanish() {
        let cfg = DistortionConfig::default();
        let w = tracking_window(&Circle::new(100, 20, 20), 200, 200, &cfg).expect("partly inside");
        assert_eq!((w.y1, w.y2), (0, 7));

        let err = tracking_window(&Circle::new(100, -40, 20), 200, 200, &cfg).expect_err("outside");
        assert!(matches!(err, TrackError::EmptyWindow(_)));
    }

    #[test]
    fn darkest_row_wins_and_ties_go_up() {
        let img = Image::from_fn(5, 8, |_, y| if y >= 3 { 20u8 } else { 200 });
        assert_eq!(y_maximum(&img.as_view()), Some(4));

        let flat = Image::new_fill(5, 8, 90u8);
        assert_eq!(y_maximum(&flat.as_view()), Some(1));
    }

    #[test]
    fn center_columns_outweigh_edges() {
        // Row 2 is dark at the left border, row 5 dark in the middle.
        let img = Image::from_fn(5, 8, |x, y| match (x, y) {
            (0, 1) => 0u8,
            (2, 4) => 0,
            _ => 255,
        });
        assert_eq!(y_maximum(&img.as_view()), Some(5));
    }

    #[test]
    fn trace_reports_dl_and_image_rows() {
        let t = DistortionTrace {
            window: Region::new(0, 40, 6, 70),
            positions: vec![50, 50, 48, 45],
        };
        let dl: Vec<_> = (0..4).filter_map(|i| t.dl(i)).collect();
        assert_eq!(dl, vec![0, 0, 2, 5]);
        assert_eq!(t.tip_y(2), Some(87));
        assert_eq!(t.tip_y(4), None);
        assert!(t.is_non_increasing());
    }
}
