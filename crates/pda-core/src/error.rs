#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("out of bounds")]
    OutOfBounds,
    #[error("invalid stride")]
    InvalidStride,
    #[error("frame index {index} out of range (source holds {len} frames)")]
    FrameOutOfRange { index: usize, len: usize },
    #[error("frame is {actual_width}x{actual_height}, expected {width}x{height}")]
    FrameSizeMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
}
