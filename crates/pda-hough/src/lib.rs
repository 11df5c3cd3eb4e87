//! Hough transforms for pipette walls and particle outlines.
//!
//! Both transforms are deterministic: edge points are visited in raster
//! order and no random sampling is involved, so the same frame always gives
//! the same segments and circles.

pub mod circles;
pub mod lines;

pub use circles::{CircleHough, CircleHoughParams, hough_circles};
pub use lines::{LineHoughConfig, hough_lines_p};
