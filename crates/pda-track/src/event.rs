//! One aspiration event: its frames, detected geometry, front trace and
//! edit history.

use pda_core::{Frame, FrameSource, FrameWindow};

use crate::TrackError;
use crate::config::TrackerConfig;
use crate::correction::{Correction, apply_to_geometry, move_front};
use crate::distortion::{DistortionTrace, track_distortion};
use crate::export::{ExportRow, TrackingSummary, export_rows, tracking_summary};
use crate::start::{StartGeometry, compose_start};

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    geometry: Option<StartGeometry>,
    trace: Option<DistortionTrace>,
}

#[derive(Debug, Clone)]
pub struct Event {
    frames: FrameWindow,
    first_frame: usize,
    config: TrackerConfig,
    geometry: Option<StartGeometry>,
    trace: Option<DistortionTrace>,
    cursor: usize,
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl Event {
    /// `first_frame` is the experiment frame number of `frames[0]`.
    pub fn new(frames: FrameWindow, first_frame: usize, config: TrackerConfig) -> Result<Self, TrackError> {
        if frames.is_empty() {
            return Err(TrackError::NoFrames);
        }
        Ok(Self {
            frames,
            first_frame,
            config,
            geometry: None,
            trace: None,
            cursor: 0,
            undo: Vec::new(),
            redo: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_frame(&self) -> usize {
        self.first_frame
    }

    pub fn frames(&self) -> &FrameWindow {
        &self.frames
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn geometry(&self) -> Option<&StartGeometry> {
        self.geometry.as_ref()
    }

    pub fn trace(&self) -> Option<&DistortionTrace> {
        self.trace.as_ref()
    }

    pub fn frame(&self, index: usize) -> Result<&Frame, TrackError> {
        Ok(self.frames.frame(index)?)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_frame(&self) -> Result<&Frame, TrackError> {
        self.frame(self.cursor)
    }

    /// Moves the cursor to `index`; out-of-range indices are an error.
    pub fn seek(&mut self, index: usize) -> Result<&Frame, TrackError> {
        self.frames.frame(index)?;
        self.cursor = index;
        self.current_frame()
    }

    /// Steps forward, staying on the last frame.
    pub fn next_frame(&mut self) -> usize {
        self.cursor = (self.cursor + 1).min(self.len() - 1);
        self.cursor
    }

    /// Steps back, staying on the first frame.
    pub fn previous_frame(&mut self) -> usize {
        self.cursor = self.cursor.saturating_sub(1);
        self.cursor
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            geometry: self.geometry,
            trace: self.trace.clone(),
        }
    }

    fn record(&mut self) {
        self.undo.push(self.snapshot());
        self.redo.clear();
    }

    fn restore(&mut self, s: Snapshot) {
        self.geometry = s.geometry;
        self.trace = s.trace;
    }

    /// Detects the start geometry on the first frame.
    ///
    /// A previous trace belongs to the old geometry and is dropped.
    pub fn predict_start(&mut self) -> Result<&StartGeometry, TrackError> {
        let geometry = compose_start(self.frame(0)?, &self.config)?;
        self.set_geometry(geometry);
        self.geometry.as_ref().ok_or(TrackError::MissingGeometry)
    }

    pub fn set_geometry(&mut self, geometry: StartGeometry) {
        self.record();
        self.geometry = Some(geometry);
        self.trace = None;
    }

    /// Tracks the front over all frames using the current particle.
    pub fn track(&mut self, start: Option<i32>) -> Result<&DistortionTrace, TrackError> {
        let geometry = self.geometry.ok_or(TrackError::MissingGeometry)?;
        let trace = track_distortion(&self.frames, &geometry.particle, &self.config.distortion, start)?;
        self.record();
        self.trace = Some(trace);
        self.trace.as_ref().ok_or(TrackError::MissingTrace)
    }

    /// Applies one operator edit. Returns whether anything changed.
    ///
    /// Moving or resizing the particle moves the tracking window, so the
    /// trace is dropped and has to be tracked again.
    pub fn apply(&mut self, correction: Correction) -> Result<bool, TrackError> {
        let before = self.snapshot();
        let mut after = before.clone();

        if let Correction::MoveFront {
            frame,
            direction,
            propagate,
        } = correction
        {
            let trace = self.trace.as_ref().ok_or(TrackError::MissingTrace)?;
            after.trace = Some(move_front(trace, frame, direction, propagate)?);
        } else {
            let geometry = self.geometry.as_ref().ok_or(TrackError::MissingGeometry)?;
            let next = apply_to_geometry(geometry, &correction, &self.config.correction);
            if next.particle != geometry.particle {
                after.trace = None;
            }
            after.geometry = Some(next);
        }

        if after == before {
            return Ok(false);
        }
        tracing::debug!(?correction, "correction applied");
        self.undo.push(before);
        self.redo.clear();
        self.restore(after);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo.pop() else {
            return false;
        };
        self.redo.push(self.snapshot());
        self.restore(prev);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(self.snapshot());
        self.restore(next);
        true
    }

    pub fn export_rows(&self) -> Result<Vec<ExportRow>, TrackError> {
        let geometry = self.geometry.as_ref().ok_or(TrackError::MissingGeometry)?;
        let trace = self.trace.as_ref().ok_or(TrackError::MissingTrace)?;
        Ok(export_rows(self.first_frame, geometry, trace))
    }

    pub fn summary(&self) -> Result<TrackingSummary, TrackError> {
        let geometry = self.geometry.as_ref().ok_or(TrackError::MissingGeometry)?;
        let trace = self.trace.as_ref().ok_or(TrackError::MissingTrace)?;
        Ok(tracking_summary(geometry, trace))
    }
}

#[cfg(test)]
mod tests {
    use pda_core::{Circle, Frame, FrameWindow, Image, Region};

    use super::Event;
    use crate::TrackError;
    use crate::config::TrackerConfig;
    use crate::correction::{Correction, FrontMove, Nudge, Side};
    use crate::particle::{CircleFit, CircleSource};
    use crate::pipette::PipetteSides;
    use crate::start::StartGeometry;

    fn event(n: usize) -> Event {
        let frames = (0..n).map(|_| Frame::Gray(Image::new_fill(200, 200, 200u8))).collect();
        let window = FrameWindow::new(frames).expect("same sizes");
        Event::new(window, 100, TrackerConfig::default()).expect("has frames")
    }

    fn geometry() -> StartGeometry {
        let fit = CircleFit {
            circle: Circle::new(100, 100, 20),
            source: CircleSource::Detected { attempt: 1 },
        };
        let sides = PipetteSides {
            tilt: 0.0,
            left_x: 70,
            right_x: 130,
            bottom_y: 90,
        };
        StartGeometry::compose(fit, sides, 200, 200)
    }

    #[test]
    fn cursor_navigation_clamps_but_seek_does_not() {
        let mut e = event(3);
        assert_eq!(e.previous_frame(), 0);
        assert_eq!(e.next_frame(), 1);
        assert_eq!(e.next_frame(), 2);
        assert_eq!(e.next_frame(), 2);

        assert!(e.seek(1).is_ok());
        assert_eq!(e.cursor(), 1);
        let err = e.seek(3).expect_err("past the end");
        assert!(matches!(
            err,
            TrackError::Core(pda_core::Error::FrameOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(e.cursor(), 1);
    }

    #[test]
    fn tracking_needs_geometry_and_export_needs_trace() {
        let mut e = event(2);
        assert!(matches!(e.track(None), Err(TrackError::MissingGeometry)));
        e.set_geometry(geometry());
        assert!(matches!(e.export_rows(), Err(TrackError::MissingTrace)));
        assert!(matches!(
            e.apply(Correction::MoveFront {
                frame: 0,
                direction: FrontMove::Up,
                propagate: false
            }),
            Err(TrackError::MissingTrace)
        ));
    }

    #[test]
    fn corrections_undo_and_redo() {
        let mut e = event(2);
        e.set_geometry(geometry());

        let changed = e
            .apply(Correction::MoveParticle {
                direction: Nudge::Down,
            })
            .expect("has geometry");
        assert!(changed);
        assert_eq!(e.geometry().map(|g| g.particle.y), Some(101));

        assert!(e.undo());
        assert_eq!(e.geometry().map(|g| g.particle.y), Some(100));
        assert!(e.can_redo());
        assert!(e.redo());
        assert_eq!(e.geometry().map(|g| g.particle.y), Some(101));
    }

    #[test]
    fn rejected_correction_records_nothing() {
        let mut e = event(1);
        e.set_geometry(geometry());
        let depth = e.undo.len();
        let changed = e
            .apply(Correction::SetParticleCenter { x: 2, y: 2 })
            .expect("has geometry");
        assert!(!changed);
        assert_eq!(e.undo.len(), depth);
    }

    #[test]
    fn uniform_frames_track_a_flat_front() {
        let mut e = event(4);
        e.set_geometry(geometry());
        let trace = e.track(None).expect("window inside frame");
        assert_eq!(trace.positions, vec![1, 1, 1, 1]);

        let rows = e.export_rows().expect("tracked");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].experiment_frame, 103);
        assert_eq!(rows[3].event_frame, 4);
    }

    #[test]
    fn particle_edits_drop_the_trace() {
        let mut e = event(2);
        e.set_geometry(geometry());
        let tracked = e.track(None).expect("window inside frame").clone();

        let tilted = e
            .apply(Correction::TiltPipette { side: Side::Left })
            .expect("has geometry");
        assert!(tilted);
        assert_eq!(e.trace(), Some(&tracked));

        let moved = e
            .apply(Correction::SetParticleCenter { x: 40, y: 60 })
            .expect("has geometry");
        assert!(moved);
        assert!(e.trace().is_none());
        assert!(matches!(e.export_rows(), Err(TrackError::MissingTrace)));

        let retracked = e.track(None).expect("window inside frame");
        assert_eq!(retracked.window, Region::new(37, 29, 43, 47));

        assert!(e.undo());
        assert!(e.undo());
        assert_eq!(e.trace(), Some(&tracked));
        assert_eq!(e.geometry().map(|g| g.particle), Some(Circle::new(100, 100, 20)));
    }
}
