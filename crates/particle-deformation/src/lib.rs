//! Umbrella crate for the `particle-deformation` workspace.
//!
//! Re-exports the frame model, the shape transforms and the aspiration
//! tracking pipeline.

pub use pda_core::*;
pub use pda_hough::{CircleHough, CircleHoughParams, LineHoughConfig, hough_circles, hough_lines_p};
pub use pda_track::*;
