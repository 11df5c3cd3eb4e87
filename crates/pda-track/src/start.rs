//! Start-of-event geometry: pipette walls, particle circle and tip line.

use pda_core::{Circle, Frame};
use serde::{Deserialize, Serialize};

use crate::TrackError;
use crate::config::{TIP_LINE_BIAS_PX, TrackerConfig};
use crate::contrast::auto_contrast;
use crate::particle::{CircleFit, CircleSource, detect_particle};
use crate::pipette::{PipetteSides, detect_sides};

/// Line across the pipette mouth touching the particle's upper rim.
///
/// It is perpendicular to the pipette axis `(tilt, 1)` and anchored at the
/// horizontal center of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TipLine {
    pub slope: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl TipLine {
    pub fn derive(particle: &Circle, tilt: f64, frame_width: usize) -> Self {
        let theta = tilt.atan();
        let r = f64::from(particle.radius);
        let px = f64::from(particle.x) - r * theta.sin();
        let py = f64::from(particle.y) - r * theta.cos();

        let slope = -tilt;
        let center_x = frame_width as f64 / 2.0;
        Self {
            slope,
            center_x,
            center_y: py + slope * (center_x - px) + TIP_LINE_BIAS_PX,
        }
    }

    pub fn y_at(&self, x: f64) -> f64 {
        self.center_y + self.slope * (x - self.center_x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartGeometry {
    pub particle: Circle,
    pub particle_source: CircleSource,
    pub pipette: PipetteSides,
    pub frame_width: usize,
    pub frame_height: usize,
    pub tip: TipLine,
}

impl StartGeometry {
    pub fn compose(particle: CircleFit, pipette: PipetteSides, frame_width: usize, frame_height: usize) -> Self {
        Self {
            particle: particle.circle,
            particle_source: particle.source,
            pipette,
            frame_width,
            frame_height,
            tip: TipLine::derive(&particle.circle, pipette.tilt, frame_width),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.particle_source == CircleSource::Fallback
    }

    /// Same geometry with another particle circle; the tip line follows.
    pub fn with_particle(&self, particle: Circle) -> Self {
        Self {
            particle,
            tip: TipLine::derive(&particle, self.pipette.tilt, self.frame_width),
            ..*self
        }
    }

    /// Same geometry with other pipette sides; the tip line follows.
    pub fn with_pipette(&self, pipette: PipetteSides) -> Self {
        Self {
            pipette,
            tip: TipLine::derive(&self.particle, pipette.tilt, self.frame_width),
            ..*self
        }
    }
}

/// Pipette sides followed by the particle search they define.
///
/// A pipette without walls is reported as [`TrackError::InsufficientFeatures`].
pub fn compose_start(frame: &Frame, cfg: &TrackerConfig) -> Result<StartGeometry, TrackError> {
    let gray = frame.to_gray();
    let gray = if cfg.contrast.enabled {
        auto_contrast(&gray.as_view(), cfg.contrast.clip_percent)
    } else {
        gray.into_owned()
    };

    let sides = detect_sides(&gray.as_view(), &cfg.pipette)?;
    if sides.is_degenerate() {
        return Err(TrackError::InsufficientFeatures { clusters: 0 });
    }

    let fit = detect_particle(&gray.as_view(), &sides, &cfg.circle);
    let geometry = StartGeometry::compose(fit, sides, frame.width(), frame.height());
    tracing::info!(
        x = geometry.particle.x,
        y = geometry.particle.y,
        radius = geometry.particle.radius,
        fallback = geometry.is_fallback(),
        tip_y = geometry.tip.center_y,
        "start geometry"
    );
    Ok(geometry)
}

/// Start geometry of the first frame of an event.
pub fn detect_start<S: pda_core::FrameSource + ?Sized>(
    frames: &S,
    cfg: &TrackerConfig,
) -> Result<StartGeometry, TrackError> {
    let frame = frames.frame(0).map_err(|e| match e {
        pda_core::Error::FrameOutOfRange { len: 0, .. } => TrackError::NoFrames,
        other => other.into(),
    })?;
    compose_start(frame, cfg)
}
