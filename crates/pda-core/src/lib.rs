//! Foundational primitives for particle deformation analysis.
//!
//! ## Image Views and Stride
//! Images use element stride (not byte stride). `stride` is the distance, in
//! elements, between adjacent row starts and may be greater than `width`.
//! Tracking windows are cut out of a frame as borrowed subviews, so every
//! consumer has to honor the stride.
//!
//! ## Border Modes
//! Smoothing mirrors around edge pixels without repeating them (reflect-101).
//! Gradients replicate the edge pixel.
//!
//! ## Frames
//! A [`Frame`] is either grayscale or RGB. A [`FrameSource`] gives random
//! access to the frames of one event by event-relative index. Access past
//! the end is an error, never a clamp.

mod border;
mod error;
mod frame;
mod geom;
mod image;

pub use border::{BorderMode, map_index};
pub use error::Error;
pub use frame::{Frame, FrameSource, FrameWindow, rgb_to_gray};
pub use geom::{Circle, Region, Segment};
pub use image::{Image, ImageView};
