//! Per-frame result table and JSON summary.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::TrackError;
use crate::distortion::DistortionTrace;
use crate::start::StartGeometry;

pub const CSV_HEADER: [&str; 8] = [
    "experiment_frame",
    "event_frame",
    "dL_pixels",
    "particle_tip_x",
    "particle_tip_y",
    "particle_centre_x",
    "particle_centre_y",
    "particle_radius",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub experiment_frame: usize,
    /// 1-based position within the event.
    pub event_frame: usize,
    #[serde(rename = "dL_pixels")]
    pub dl_pixels: i32,
    pub particle_tip_x: i32,
    pub particle_tip_y: i32,
    pub particle_centre_x: i32,
    pub particle_centre_y: i32,
    pub particle_radius: i32,
}

impl ExportRow {
    fn fields(&self) -> [String; 8] {
        [
            self.experiment_frame.to_string(),
            self.event_frame.to_string(),
            self.dl_pixels.to_string(),
            self.particle_tip_x.to_string(),
            self.particle_tip_y.to_string(),
            self.particle_centre_x.to_string(),
            self.particle_centre_y.to_string(),
            self.particle_radius.to_string(),
        ]
    }
}

/// Values appended to an experiment's JSON record after tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    #[serde(rename = "dL_pixels")]
    pub dl_pixels: Vec<i32>,
    pub particle_tip_x: i32,
    pub particle_tip_y: Vec<i32>,
    pub particle_centre_x: i32,
    pub particle_centre_y: i32,
    pub particle_radius: i32,
    pub particle_fallback: bool,
}

/// One row per traced frame.
pub fn export_rows(first_frame: usize, geometry: &StartGeometry, trace: &DistortionTrace) -> Vec<ExportRow> {
    let p = geometry.particle;
    (0..trace.len())
        .map(|i| ExportRow {
            experiment_frame: first_frame + i,
            event_frame: i + 1,
            dl_pixels: trace.dl(i).unwrap_or_default(),
            particle_tip_x: p.x,
            particle_tip_y: trace.tip_y(i).unwrap_or_default(),
            particle_centre_x: p.x,
            particle_centre_y: p.y,
            particle_radius: p.radius,
        })
        .collect()
}

/// Comma separated table with a [`CSV_HEADER`] line.
pub fn write_csv<W: Write>(rows: &[ExportRow], mut out: W) -> Result<(), TrackError> {
    writeln!(out, "{}", CSV_HEADER.join(","))?;
    for row in rows {
        writeln!(out, "{}", row.fields().join(","))?;
    }
    out.flush()?;
    Ok(())
}

pub fn tracking_summary(geometry: &StartGeometry, trace: &DistortionTrace) -> TrackingSummary {
    let p = geometry.particle;
    TrackingSummary {
        dl_pixels: (0..trace.len()).filter_map(|i| trace.dl(i)).collect(),
        particle_tip_x: p.x,
        particle_tip_y: (0..trace.len()).filter_map(|i| trace.tip_y(i)).collect(),
        particle_centre_x: p.x,
        particle_centre_y: p.y,
        particle_radius: p.radius,
        particle_fallback: geometry.is_fallback(),
    }
}
