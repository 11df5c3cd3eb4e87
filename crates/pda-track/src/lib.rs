//! Particle aspiration analysis for micropipette microscopy.
//!
//! Pipeline over one event's frames:
//! - [`detect_sides`] finds the pipette walls from long Hough lines.
//! - [`bounded_hough_circle`] finds the particle below the pipette mouth,
//!   relaxing thresholds until a circle fits, else returning a flagged guess.
//! - [`compose_start`] chains both into a [`StartGeometry`] with its tip line.
//! - [`track_distortion`] follows the deformation front frame by frame.
//! - [`correction`] holds the bounded nudges an operator applies, and
//!   [`Event`] keeps them reversible.
//! - [`export`] renders the per-frame table and summary.

pub mod config;
pub mod contrast;
pub mod correction;
pub mod distortion;
mod error;
pub mod event;
pub mod export;
pub mod particle;
pub mod pipette;
pub mod start;

pub use config::TrackerConfig;
pub use correction::{Correction, FrontMove, Nudge, Side};
pub use distortion::{DistortionTrace, track_distortion};
pub use error::TrackError;
pub use event::Event;
pub use export::{CSV_HEADER, ExportRow, TrackingSummary, write_csv};
pub use particle::{CircleFit, CircleSearch, CircleSource, bounded_hough_circle};
pub use pipette::{LineFeature, PipetteSides, detect_sides};
pub use start::{StartGeometry, TipLine, compose_start, detect_start};
