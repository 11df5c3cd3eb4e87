//! Pipette wall detection from straight-line features.
//!
//! Pipeline: blur, Canny, dilation, external contour redraw, probabilistic
//! Hough lines. Long segments are turned into [`LineFeature`]s, clustered on
//! their x-intercept, and the outermost clusters become the two walls.

use pda_contour::thicken_external_contours;
use pda_core::{Image, ImageView, Segment};
use pda_edge::{GaussianKernel1D, canny_u8, gaussian_blur_u8};
use pda_hough::{LineHoughConfig, hough_lines_p};
use pda_morph::dilate_binary_u8;
use serde::{Deserialize, Serialize};

use crate::TrackError;
use crate::config::PipetteConfig;

/// A wall candidate in image coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFeature {
    /// `dx / dy` along the segment.
    pub gradient: f64,
    /// Column where the extended line crosses row 0.
    pub x0: f64,
    pub bottom_x: f64,
    pub bottom_y: f64,
    pub length: f64,
}

impl LineFeature {
    /// `None` for horizontal segments, whose `dx / dy` is undefined.
    pub fn from_segment(s: &Segment) -> Option<Self> {
        if s.y1 == s.y2 {
            return None;
        }
        let gradient = f64::from(s.x2 - s.x1) / f64::from(s.y2 - s.y1);
        let (bx, by) = if s.y1 > s.y2 { (s.x1, s.y1) } else { (s.x2, s.y2) };
        Some(Self {
            gradient,
            x0: f64::from(s.x1) - gradient * f64::from(s.y1),
            bottom_x: f64::from(bx),
            bottom_y: f64::from(by),
            length: s.length(),
        })
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            gradient: (self.gradient + other.gradient) / 2.0,
            x0: (self.x0 + other.x0) / 2.0,
            bottom_x: (self.bottom_x + other.bottom_x) / 2.0,
            bottom_y: self.bottom_y.max(other.bottom_y),
            length: self.length.max(other.length),
        }
    }
}

/// Tilt and mouth of the pipette. All zeros when no wall was found.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipetteSides {
    /// Mean `dx / dy` of the two walls.
    pub tilt: f64,
    pub left_x: i32,
    pub right_x: i32,
    pub bottom_y: i32,
}

impl PipetteSides {
    pub fn is_degenerate(&self) -> bool {
        *self == Self::default()
    }

    pub fn mouth_width(&self) -> i32 {
        self.right_x - self.left_x
    }
}

/// Binary wall mask fed to the line transform.
pub fn pipette_edge_mask(gray: &ImageView<'_, u8>, cfg: &PipetteConfig) -> Image<u8> {
    // Gaussian kernels need an odd size.
    let ksize = cfg.blur_ksize | 1;
    let sigma = GaussianKernel1D::sigma_for_size(ksize);
    let blurred = gaussian_blur_u8(gray, ksize, sigma);
    let edges = canny_u8(&blurred.as_view(), cfg.canny_low, cfg.canny_high);
    let dilated = dilate_binary_u8(&edges.as_view(), cfg.dilate_iterations);
    thicken_external_contours(&dilated.as_view(), cfg.contour_thickness)
}

/// Features of all segments longer than `min_length`.
pub fn line_features(segments: &[Segment], min_length: f64) -> Vec<LineFeature> {
    segments
        .iter()
        .filter(|s| s.length() > min_length)
        .filter_map(LineFeature::from_segment)
        .collect()
}

/// One pass over x0-sorted features, merging neighbours within `tolerance`.
///
/// Every adjacent pair within tolerance emits its own merge, so a chain
/// `a ~ b ~ c` yields both `a + b` and `b + c`; later passes fold those. A
/// merge that follows a distinct pair replaces the copy of its first feature
/// pushed by that pair.
fn merge_pass(features: &[LineFeature], tolerance: f64) -> (Vec<LineFeature>, bool) {
    if features.len() < 2 {
        return (features.to_vec(), false);
    }

    let mut out = Vec::with_capacity(features.len());
    let mut merged = false;
    let mut last_pair_distinct = false;
    for (i, pair) in features.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        if (b.x0 - a.x0).abs() <= tolerance {
            if last_pair_distinct {
                out.pop();
            }
            out.push(a.merge(b));
            merged = true;
            last_pair_distinct = false;
        } else {
            if i == 0 {
                out.push(*a);
            }
            out.push(*b);
            last_pair_distinct = true;
        }
    }
    (out, merged)
}

/// Sorts by x-intercept and merges until a pass changes nothing.
pub fn cluster_lines(features: &[LineFeature], tolerance: f64) -> Vec<LineFeature> {
    let mut clusters = features.to_vec();
    clusters.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    loop {
        let (next, merged) = merge_pass(&clusters, tolerance);
        clusters = next;
        if !merged {
            return clusters;
        }
    }
}

/// Walls from the outermost clusters. Needs at least two clusters.
pub fn sides_from_clusters(clusters: &[LineFeature]) -> Result<PipetteSides, TrackError> {
    let (Some(left), Some(right)) = (clusters.first(), clusters.last()) else {
        return Err(TrackError::InsufficientFeatures { clusters: 0 });
    };
    if clusters.len() < 2 {
        return Err(TrackError::InsufficientFeatures {
            clusters: clusters.len(),
        });
    }

    Ok(PipetteSides {
        tilt: (left.gradient + right.gradient) / 2.0,
        left_x: left.bottom_x.min(right.bottom_x) as i32,
        right_x: left.bottom_x.max(right.bottom_x) as i32,
        bottom_y: ((left.bottom_y + right.bottom_y) / 2.0) as i32,
    })
}

/// Pipette tilt and mouth position in one grayscale frame.
///
/// Returns the all-zero [`PipetteSides`] when no segment is long enough, and
/// [`TrackError::InsufficientFeatures`] when the segments collapse into a
/// single wall.
pub fn detect_sides(gray: &ImageView<'_, u8>, cfg: &PipetteConfig) -> Result<PipetteSides, TrackError> {
    let mask = pipette_edge_mask(gray, cfg);

    let min_length = gray.height() as f64 * cfg.min_length_fraction;
    let hough = LineHoughConfig {
        threshold: cfg.hough_threshold,
        min_line_length: min_length as usize,
        max_line_gap: cfg.max_line_gap,
        ..LineHoughConfig::default()
    };
    let segments = hough_lines_p(&mask.as_view(), &hough);
    let features = line_features(&segments, min_length);
    tracing::debug!(
        segments = segments.len(),
        features = features.len(),
        "pipette line features"
    );

    if features.is_empty() {
        tracing::warn!("no pipette wall longer than {min_length:.1} px");
        return Ok(PipetteSides::default());
    }

    let clusters = cluster_lines(&features, cfg.merge_tolerance);
    let sides = sides_from_clusters(&clusters)?;
    tracing::info!(
        tilt = sides.tilt,
        left_x = sides.left_x,
        right_x = sides.right_x,
        bottom_y = sides.bottom_y,
        "pipette sides"
    );
    Ok(sides)
}
