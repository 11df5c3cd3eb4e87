//! Particle localisation by repeated Hough circle searches.
//!
//! Thresholds start strict and decay until a circle fits inside the search
//! region. When nothing is found the expected circle is returned and marked
//! as a fallback so callers can tell measured geometry from a guess.

use pda_core::{Circle, ImageView, Region};
use pda_hough::{CircleHough, CircleHoughParams};
use serde::{Deserialize, Serialize};

use crate::config::CircleSearchConfig;
use crate::pipette::PipetteSides;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CircleSource {
    /// Found on the given 1-based search attempt.
    Detected { attempt: usize },
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleFit {
    pub circle: Circle,
    pub source: CircleSource,
}

impl CircleFit {
    pub fn is_fallback(&self) -> bool {
        self.source == CircleSource::Fallback
    }
}

/// Where and how large a particle is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleSearch {
    pub region: Region,
    pub min_radius: i32,
    pub max_radius: i32,
    pub expected_radius: i32,
    /// Defaults to the region center column.
    pub expected_x: Option<i32>,
}

impl CircleSearch {
    /// Search below the pipette mouth, sized from the mouth width.
    pub fn below_pipette(sides: &PipetteSides, cfg: &CircleSearchConfig) -> Self {
        let divisor = cfg.radius_divisor.max(1);
        let expected_radius = sides.mouth_width() / divisor;
        let cx = (sides.left_x + sides.right_x) / 2;
        let cy = sides.bottom_y + expected_radius / 2;
        let max_radius = (f64::from(expected_radius) * cfg.max_radius_factor) as i32;
        Self {
            region: Region::around(cx, cy, max_radius),
            min_radius: (f64::from(expected_radius) * cfg.min_radius_factor) as i32,
            max_radius,
            expected_radius,
            expected_x: None,
        }
    }

    fn radii_valid(&self) -> bool {
        self.min_radius > 0 && self.max_radius > 0 && self.min_radius < self.max_radius
    }

    fn fallback(&self) -> CircleFit {
        let (x, y) = self.region.center();
        CircleFit {
            circle: Circle::new(x, y, self.expected_radius),
            source: CircleSource::Fallback,
        }
    }
}

/// Circles whose whole disc lies strictly inside `region`.
pub fn filter_circles_in_region(circles: &[Circle], region: &Region) -> Vec<Circle> {
    circles
        .iter()
        .filter(|c| region.strictly_contains(c))
        .copied()
        .collect()
}

/// Circle minimising `|r - expected_radius| + |x - expected_x|`.
///
/// Ties go to the smallest `(x, y, r)`.
pub fn best_circle(circles: &[Circle], expected_radius: i32, expected_x: i32) -> Option<Circle> {
    circles
        .iter()
        .min_by_key(|c| {
            let cost = (c.radius - expected_radius).abs() + (c.x - expected_x).abs();
            (cost, **c)
        })
        .copied()
}

/// `(edge, vote)` thresholds of each search attempt, in order.
///
/// Both decay by `cfg.decay` per attempt, truncated and floored at 1.
pub fn threshold_schedule(cfg: &CircleSearchConfig) -> impl Iterator<Item = (u32, u32)> + use<> {
    let decay = cfg.decay;
    let first = (cfg.initial_edge_threshold.max(1), cfg.initial_vote_threshold.max(1));
    let shrink = move |t: u32| ((f64::from(t) * decay) as u32).max(1);
    std::iter::successors(Some(first), move |&(edge, vote)| Some((shrink(edge), shrink(vote))))
        .take(cfg.max_attempts)
}

/// Iterative circle search inside `search.region`.
///
/// Never fails: invalid radius bounds or an exhausted search yield the
/// fallback circle at the region center with the expected radius.
pub fn bounded_hough_circle(
    gray: &ImageView<'_, u8>,
    search: &CircleSearch,
    cfg: &CircleSearchConfig,
) -> CircleFit {
    if !search.radii_valid() {
        tracing::warn!(
            min_radius = search.min_radius,
            max_radius = search.max_radius,
            "invalid radius bounds, using fallback circle"
        );
        return search.fallback();
    }

    let expected_x = search.expected_x.unwrap_or(search.region.center().0);
    let mut hough = CircleHough::new(gray);

    for (index, (edge_threshold, vote_threshold)) in threshold_schedule(cfg).enumerate() {
        let attempt = index + 1;
        let params = CircleHoughParams {
            edge_threshold: edge_threshold as f32,
            vote_threshold,
            min_radius: search.min_radius as u32,
            max_radius: search.max_radius as u32,
            min_dist: cfg.min_dist,
        };
        let found = hough.detect(&params);
        let inside = filter_circles_in_region(&found, &search.region);
        tracing::debug!(
            attempt,
            edge_threshold,
            vote_threshold,
            found = found.len(),
            inside = inside.len(),
            "circle search attempt"
        );

        if let Some(circle) = best_circle(&inside, search.expected_radius, expected_x) {
            return CircleFit {
                circle,
                source: CircleSource::Detected { attempt },
            };
        }
    }

    let fit = search.fallback();
    tracing::warn!(
        attempts = cfg.max_attempts,
        x = fit.circle.x,
        y = fit.circle.y,
        radius = fit.circle.radius,
        "no circle found, using fallback"
    );
    fit
}

/// Particle hanging under the detected pipette mouth.
pub fn detect_particle(
    gray: &ImageView<'_, u8>,
    sides: &PipetteSides,
    cfg: &CircleSearchConfig,
) -> CircleFit {
    let search = CircleSearch::below_pipette(sides, cfg);
    tracing::debug!(?search, "particle search");
    bounded_hough_circle(gray, &search, cfg)
}

#[cfg(test)]
mod tests {
    use pda_core::{Circle, Image, Region};

    use super::{
        CircleSearch, CircleSource, best_circle, bounded_hough_circle, filter_circles_in_region,
        threshold_schedule,
    };
    use crate::config::{CircleSearchConfig, MAX_ATTEMPTS};
    use crate::pipette::PipetteSides;

    #[test]
    fn best_circle_prefers_expected_size_and_column() {
        let c = [Circle::new(12, 12, 8), Circle::new(10, 10, 5)];
        assert_eq!(best_circle(&c, 5, 10), Some(Circle::new(10, 10, 5)));
    }

    #[test]
    fn best_circle_breaks_ties_on_smallest_tuple() {
        let c = [Circle::new(11, 20, 5), Circle::new(9, 30, 5)];
        assert_eq!(best_circle(&c, 5, 10), Some(Circle::new(9, 30, 5)));
        assert_eq!(best_circle(&[], 5, 10), None);
    }

    #[test]
    fn region_filter_is_strict() {
        let region = Region::new(0, 0, 40, 40);
        let c = [Circle::new(20, 20, 10), Circle::new(10, 20, 10), Circle::new(30, 30, 9)];
        assert_eq!(filter_circles_in_region(&c, &region), vec![Circle::new(20, 20, 10), Circle::new(30, 30, 9)]);
    }

    #[test]
    fn search_geometry_follows_mouth_width() {
        let sides = PipetteSides {
            tilt: 0.0,
            left_x: 70,
            right_x: 130,
            bottom_y: 173,
        };
        let s = CircleSearch::below_pipette(&sides, &CircleSearchConfig::default());
        assert_eq!(s.expected_radius, 20);
        assert_eq!((s.min_radius, s.max_radius), (13, 26));
        assert_eq!(s.region, Region::new(74, 157, 126, 209));
    }

    #[test]
    fn blank_frame_falls_back_after_all_attempts() {
        let img = Image::new_fill(64, 64, 128u8);
        let search = CircleSearch {
            region: Region::new(10, 10, 50, 50),
            min_radius: 5,
            max_radius: 12,
            expected_radius: 8,
            expected_x: None,
        };
        let fit = bounded_hough_circle(&img.as_view(), &search, &CircleSearchConfig::default());
        assert!(fit.is_fallback());
        assert_eq!(fit.circle, Circle::new(30, 30, 8));
    }

    #[test]
    fn invalid_radii_fall_back_without_searching() {
        let img = Image::new_fill(16, 16, 0u8);
        let search = CircleSearch {
            region: Region::new(0, 0, 16, 16),
            min_radius: 6,
            max_radius: 6,
            expected_radius: 6,
            expected_x: Some(3),
        };
        let fit = bounded_hough_circle(&img.as_view(), &search, &CircleSearchConfig::default());
        assert_eq!(fit.source, CircleSource::Fallback);
        assert_eq!(fit.circle, Circle::new(8, 8, 6));
    }

    fn faint_disc(cx: i32, cy: i32, r: f64) -> Image<u8> {
        Image::from_fn(64, 64, |x, y| {
            let d = f64::from((x as i32 - cx).pow(2) + (y as i32 - cy).pow(2)).sqrt();
            let t = ((r + 1.0 - d) / 2.0).clamp(0.0, 1.0);
            (120.0 - 20.0 * t + 0.5).floor() as u8
        })
    }

    fn faint_search() -> CircleSearch {
        CircleSearch {
            region: Region::new(4, 4, 60, 60),
            min_radius: 10,
            max_radius: 18,
            expected_radius: 14,
            expected_x: None,
        }
    }

    #[test]
    fn thresholds_decay_and_floor_at_one() {
        let cfg = CircleSearchConfig::default();
        let steps: Vec<_> = threshold_schedule(&cfg).collect();
        assert_eq!(steps.len(), MAX_ATTEMPTS);
        assert_eq!(&steps[..4], &[(150, 75), (127, 63), (107, 53), (90, 45)]);
        assert_eq!(steps.last(), Some(&(1, 1)));
    }

    #[test]
    fn faint_disc_is_found_after_relaxing() {
        let img = faint_disc(32, 32, 14.0);
        let fit = bounded_hough_circle(&img.as_view(), &faint_search(), &CircleSearchConfig::default());
        assert_eq!(fit.circle, Circle::new(32, 32, 14));
        assert_eq!(fit.source, CircleSource::Detected { attempt: 4 });

        let strict = CircleSearchConfig {
            max_attempts: 3,
            ..CircleSearchConfig::default()
        };
        assert!(bounded_hough_circle(&img.as_view(), &faint_search(), &strict).is_fallback());
    }

    #[test]
    fn repeated_search_gives_the_same_fit() {
        let img = faint_disc(30, 34, 14.0);
        let cfg = CircleSearchConfig::default();
        let first = bounded_hough_circle(&img.as_view(), &faint_search(), &cfg);
        let second = bounded_hough_circle(&img.as_view(), &faint_search(), &cfg);
        assert_eq!(first, second);
        assert!(!first.is_fallback());
    }
}
