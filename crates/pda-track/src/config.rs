//! Tunables for detection, tracking and manual correction.
//!
//! Every section deserializes with `#[serde(default)]`, so a JSON file only
//! needs the keys it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::TrackError;

/// Edge threshold of the first circle search attempt.
pub const INITIAL_EDGE_THRESHOLD: u32 = 150;
/// Accumulator threshold of the first circle search attempt.
pub const INITIAL_VOTE_THRESHOLD: u32 = 75;
/// Factor applied to both circle thresholds after a failed attempt.
pub const THRESHOLD_DECAY: f64 = 0.85;
/// Upper bound on circle search attempts before falling back.
pub const MAX_ATTEMPTS: usize = 28;
/// Downward offset of the tip line from the particle's upper rim.
pub const TIP_LINE_BIAS_PX: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub contrast: ContrastConfig,
    pub pipette: PipetteConfig,
    pub circle: CircleSearchConfig,
    pub distortion: DistortionConfig,
    pub correction: CorrectionConfig,
}

impl TrackerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, TrackError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    pub enabled: bool,
    /// Share of the histogram (percent) clipped, split evenly between ends.
    pub clip_percent: f64,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clip_percent: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipetteConfig {
    pub blur_ksize: usize,
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilate_iterations: usize,
    pub contour_thickness: usize,
    pub hough_threshold: i32,
    /// Minimum wall segment length as a fraction of the frame height.
    pub min_length_fraction: f64,
    pub max_line_gap: usize,
    /// Segments whose x-intercepts differ by at most this many pixels merge.
    pub merge_tolerance: f64,
}

impl Default for PipetteConfig {
    fn default() -> Self {
        Self {
            blur_ksize: 17,
            canny_low: 40.0,
            canny_high: 60.0,
            dilate_iterations: 2,
            contour_thickness: 2,
            hough_threshold: 115,
            min_length_fraction: 0.2,
            max_line_gap: 3,
            merge_tolerance: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleSearchConfig {
    pub initial_edge_threshold: u32,
    pub initial_vote_threshold: u32,
    pub decay: f64,
    pub max_attempts: usize,
    pub min_dist: f32,
    /// Expected radius is the pipette mouth width divided by this.
    pub radius_divisor: i32,
    pub min_radius_factor: f64,
    pub max_radius_factor: f64,
}

impl Default for CircleSearchConfig {
    fn default() -> Self {
        Self {
            initial_edge_threshold: INITIAL_EDGE_THRESHOLD,
            initial_vote_threshold: INITIAL_VOTE_THRESHOLD,
            decay: THRESHOLD_DECAY,
            max_attempts: MAX_ATTEMPTS,
            min_dist: 1.0,
            radius_divisor: 3,
            min_radius_factor: 2.0 / 3.0,
            max_radius_factor: 1.33333,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionConfig {
    /// Window width as a fraction of the particle radius.
    pub width_fraction: f64,
    pub min_width: i32,
    /// Window top, in radii above the particle center.
    pub top_offset: f64,
    /// Window bottom, in radii above the particle center.
    pub bottom_offset: f64,
    pub smooth: bool,
    pub non_increasing: bool,
}

impl Default for DistortionConfig {
    fn default() -> Self {
        Self {
            width_fraction: 0.3,
            min_width: 2,
            top_offset: 1.55,
            bottom_offset: 0.65,
            smooth: true,
            non_increasing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Minimum distance of particle center and pipette walls from any edge.
    pub edge_margin: i32,
    /// Radius must stay strictly above this.
    pub min_radius: i32,
    /// Radius must stay strictly below this fraction of the frame width.
    pub max_radius_fraction: f64,
    /// Tilt must stay strictly inside `(-max_tilt, max_tilt)`.
    pub max_tilt: f64,
    pub tilt_step: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            edge_margin: 10,
            min_radius: 5,
            max_radius_fraction: 0.25,
            max_tilt: 0.2,
            tilt_step: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_ATTEMPTS, THRESHOLD_DECAY, TrackerConfig};

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = TrackerConfig::from_json_str(r#"{"pipette": {"hough_threshold": 90}}"#)
            .expect("valid config");

        assert_eq!(cfg.pipette.hough_threshold, 90);
        assert_eq!(cfg.pipette.blur_ksize, 17);
        assert_eq!(cfg.circle.max_attempts, MAX_ATTEMPTS);
        assert_eq!(cfg.circle.decay, THRESHOLD_DECAY);
    }

    #[test]
    fn default_round_trips_through_json() {
        let cfg = TrackerConfig::default();
        let text = serde_json::to_string(&cfg).expect("serializable");
        assert_eq!(TrackerConfig::from_json_str(&text).expect("parsable"), cfg);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(TrackerConfig::from_json_str("{ not json").is_err());
    }
}
