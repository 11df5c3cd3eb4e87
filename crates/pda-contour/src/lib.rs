//! Contours of binary masks.
//!
//! Foreground is every pixel `> 0`, 8-connected; background is 4-connected.
//! Only outer borders of components that are not nested inside another
//! component's hole are reported, and every border pixel is listed (no
//! polygon simplification).

mod trace;

pub use trace::{Contour, draw_contours, find_external_contours, thicken_external_contours};
