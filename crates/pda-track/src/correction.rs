//! Bounded manual nudges of detected geometry and of the front trace.
//!
//! Every reducer is pure: it returns a new value and leaves the input alone.
//! A nudge that would leave its bounds returns an unchanged copy.

use pda_core::Circle;
use serde::{Deserialize, Serialize};

use crate::TrackError;
use crate::config::CorrectionConfig;
use crate::distortion::DistortionTrace;
use crate::pipette::PipetteSides;
use crate::start::StartGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nudge {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontMove {
    /// One row toward the top of the window.
    Up,
    Down,
}

/// One operator edit of an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Correction {
    MoveParticle { direction: Nudge },
    SetParticleCenter { x: i32, y: i32 },
    GrowParticle,
    ShrinkParticle,
    /// Leans the pipette bottom toward `side` by one tilt step.
    TiltPipette { side: Side },
    ShiftPipette { side: Side },
    MoveFront { frame: usize, direction: FrontMove, propagate: bool },
}

impl Correction {
    pub fn touches_geometry(&self) -> bool {
        !matches!(self, Self::MoveFront { .. })
    }
}

fn dims(g: &StartGeometry) -> (i32, i32) {
    (
        i32::try_from(g.frame_width).unwrap_or(i32::MAX),
        i32::try_from(g.frame_height).unwrap_or(i32::MAX),
    )
}

fn center_allowed(g: &StartGeometry, x: i32, y: i32, b: &CorrectionConfig) -> bool {
    let (w, h) = dims(g);
    (b.edge_margin..=w - b.edge_margin).contains(&x) && (b.edge_margin..=h - b.edge_margin).contains(&y)
}

fn radius_allowed(g: &StartGeometry, r: i32, b: &CorrectionConfig) -> bool {
    let max = g.frame_width as f64 * b.max_radius_fraction;
    r > b.min_radius && f64::from(r) < max
}

fn with_center(g: &StartGeometry, x: i32, y: i32, b: &CorrectionConfig) -> StartGeometry {
    if !center_allowed(g, x, y, b) {
        tracing::warn!(x, y, "particle center outside the allowed area");
        return *g;
    }
    g.with_particle(Circle::new(x, y, g.particle.radius))
}

pub fn move_particle(g: &StartGeometry, direction: Nudge, b: &CorrectionConfig) -> StartGeometry {
    let Circle { x, y, .. } = g.particle;
    let (x, y) = match direction {
        Nudge::Up => (x, y - 1),
        Nudge::Down => (x, y + 1),
        Nudge::Left => (x - 1, y),
        Nudge::Right => (x + 1, y),
    };
    with_center(g, x, y, b)
}

/// Places the particle center at a clicked position.
pub fn set_particle_center(g: &StartGeometry, x: i32, y: i32, b: &CorrectionConfig) -> StartGeometry {
    with_center(g, x, y, b)
}

/// Grows (`delta > 0`) or shrinks the particle radius.
pub fn resize_particle(g: &StartGeometry, delta: i32, b: &CorrectionConfig) -> StartGeometry {
    let radius = g.particle.radius + delta;
    if !radius_allowed(g, radius, b) {
        tracing::warn!(radius, "particle radius out of range");
        return *g;
    }
    g.with_particle(Circle::new(g.particle.x, g.particle.y, radius))
}

pub fn tilt_pipette(g: &StartGeometry, side: Side, b: &CorrectionConfig) -> StartGeometry {
    let step = match side {
        Side::Left => -b.tilt_step,
        Side::Right => b.tilt_step,
    };
    let tilt = g.pipette.tilt + step;
    if tilt.abs() >= b.max_tilt {
        tracing::warn!(tilt, "pipette tilt out of range");
        return *g;
    }
    g.with_pipette(PipetteSides { tilt, ..g.pipette })
}

/// Moves both pipette walls one pixel sideways.
pub fn shift_pipette(g: &StartGeometry, side: Side, b: &CorrectionConfig) -> StartGeometry {
    let dx = match side {
        Side::Left => -1,
        Side::Right => 1,
    };
    let (w, _) = dims(g);
    let (left_x, right_x) = (g.pipette.left_x + dx, g.pipette.right_x + dx);
    if left_x < b.edge_margin || right_x > w - b.edge_margin {
        tracing::warn!(left_x, right_x, "pipette walls too close to the frame edge");
        return *g;
    }
    g.with_pipette(PipetteSides {
        left_x,
        right_x,
        ..g.pipette
    })
}

/// Moves the front of one frame by a row.
///
/// With `propagate`, moving up pulls later frames that would sit below the
/// new row up to it, and moving down pushes earlier frames that would sit
/// above it down to it. Propagation stops at the first frame already in
/// order.
pub fn move_front(
    trace: &DistortionTrace,
    frame: usize,
    direction: FrontMove,
    propagate: bool,
) -> Result<DistortionTrace, TrackError> {
    let Some(&current) = trace.positions.get(frame) else {
        return Err(pda_core::Error::FrameOutOfRange {
            index: frame,
            len: trace.len(),
        }
        .into());
    };

    let row = match direction {
        FrontMove::Up => current - 1,
        FrontMove::Down => current + 1,
    };
    if row < 1 || row > trace.window_height() {
        tracing::warn!(frame, row, "front row outside the tracking window");
        return Ok(trace.clone());
    }

    let mut out = trace.clone();
    out.positions[frame] = row;
    if propagate {
        match direction {
            FrontMove::Up => {
                for p in out.positions[frame + 1..].iter_mut() {
                    if *p <= row {
                        break;
                    }
                    *p = row;
                }
            }
            FrontMove::Down => {
                for p in out.positions[..frame].iter_mut().rev() {
                    if *p >= row {
                        break;
                    }
                    *p = row;
                }
            }
        }
    }
    Ok(out)
}

/// Applies a geometry correction. Front moves leave the geometry untouched.
pub fn apply_to_geometry(g: &StartGeometry, c: &Correction, b: &CorrectionConfig) -> StartGeometry {
    match *c {
        Correction::MoveParticle { direction } => move_particle(g, direction, b),
        Correction::SetParticleCenter { x, y } => set_particle_center(g, x, y, b),
        Correction::GrowParticle => resize_particle(g, 1, b),
        Correction::ShrinkParticle => resize_particle(g, -1, b),
        Correction::TiltPipette { side } => tilt_pipette(g, side, b),
        Correction::ShiftPipette { side } => shift_pipette(g, side, b),
        Correction::MoveFront { .. } => *g,
    }
}
