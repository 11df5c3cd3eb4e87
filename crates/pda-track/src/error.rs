use pda_core::Region;

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error(transparent)]
    Core(#[from] pda_core::Error),
    #[error("found {clusters} pipette wall cluster(s), need at least 2")]
    InsufficientFeatures { clusters: usize },
    #[error("tracking window {0:?} does not overlap the frame")]
    EmptyWindow(Region),
    #[error("start row {row} outside the tracking window rows 1..={height}")]
    StartRowOutOfRange { row: i32, height: i32 },
    #[error("event has no start geometry")]
    MissingGeometry,
    #[error("event has no distortion trace")]
    MissingTrace,
    #[error("event has no frames")]
    NoFrames,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
