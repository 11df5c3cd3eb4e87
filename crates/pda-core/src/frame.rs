use std::borrow::Cow;
use std::sync::Arc;

use crate::{Error, Image, Region};

/// One decoded video frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Gray(Image<u8>),
    Rgb(Image<[u8; 3]>),
}

impl Frame {
    pub fn width(&self) -> usize {
        match self {
            Self::Gray(img) => img.width(),
            Self::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::Gray(img) => img.height(),
            Self::Rgb(img) => img.height(),
        }
    }

    /// Grayscale rendition; borrows when the frame already is gray.
    pub fn to_gray(&self) -> Cow<'_, Image<u8>> {
        match self {
            Self::Gray(img) => Cow::Borrowed(img),
            Self::Rgb(img) => Cow::Owned(img.as_view().map(rgb_to_gray)),
        }
    }

    /// Grayscale copy of the pixels inside `region`.
    ///
    /// Only the crop is converted, so cutting windows out of colour frames
    /// stays cheap.
    pub fn gray_crop(&self, region: &Region) -> Result<Image<u8>, Error> {
        match self {
            Self::Gray(img) => Ok(img.as_view().crop(region)?.to_image()),
            Self::Rgb(img) => Ok(img.as_view().crop(region)?.map(rgb_to_gray)),
        }
    }
}

/// ITU-R BT.601 luma, rounded to nearest.
pub fn rgb_to_gray(px: &[u8; 3]) -> u8 {
    let [r, g, b] = [px[0], px[1], px[2]].map(f32::from);
    (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8
}

/// Random access to the frames of one event, addressed `0..len()`.
pub trait FrameSource {
    fn len(&self) -> usize;

    /// Returns [`Error::FrameOutOfRange`] for `index >= len()`.
    fn frame(&self, index: usize) -> Result<&Frame, Error>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(width, height)` shared by every frame, `None` when empty.
    fn dimensions(&self) -> Option<(usize, usize)> {
        self.frame(0).ok().map(|f| (f.width(), f.height()))
    }
}

impl FrameSource for Vec<Frame> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn frame(&self, index: usize) -> Result<&Frame, Error> {
        self.get(index).ok_or(Error::FrameOutOfRange {
            index,
            len: self.as_slice().len(),
        })
    }
}

/// Shared, immutable frame buffer with a `[start, start + len)` window.
///
/// Cloning and slicing never copy pixels.
#[derive(Debug, Clone)]
pub struct FrameWindow {
    frames: Arc<[Frame]>,
    start: usize,
    len: usize,
}

impl FrameWindow {
    /// Wraps a whole recording. All frames must share the first frame's size.
    pub fn new(frames: Vec<Frame>) -> Result<Self, Error> {
        if let Some(first) = frames.first() {
            let (width, height) = (first.width(), first.height());
            if let Some(bad) = frames
                .iter()
                .find(|f| f.width() != width || f.height() != height)
            {
                return Err(Error::FrameSizeMismatch {
                    width,
                    height,
                    actual_width: bad.width(),
                    actual_height: bad.height(),
                });
            }
        }

        let len = frames.len();
        Ok(Self {
            frames: frames.into(),
            start: 0,
            len,
        })
    }

    /// Sub-window relative to this window.
    pub fn slice(&self, start: usize, len: usize) -> Result<Self, Error> {
        let end = start.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > self.len {
            return Err(Error::FrameOutOfRange {
                index: end.saturating_sub(1),
                len: self.len,
            });
        }

        Ok(Self {
            frames: Arc::clone(&self.frames),
            start: self.start + start,
            len,
        })
    }

    /// Offset of this window's first frame in the underlying recording.
    pub fn offset(&self) -> usize {
        self.start
    }
}

impl FrameSource for FrameWindow {
    fn len(&self) -> usize {
        self.len
    }

    fn frame(&self, index: usize) -> Result<&Frame, Error> {
        if index >= self.len {
            return Err(Error::FrameOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(&self.frames[self.start + index])
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, FrameSource, FrameWindow, rgb_to_gray};
    use crate::{Error, Image, Region};

    fn gray(v: u8) -> Frame {
        Frame::Gray(Image::new_fill(4, 3, v))
    }

    #[test]
    fn luma_weights_match_bt601() {
        assert_eq!(rgb_to_gray(&[255, 255, 255]), 255);
        assert_eq!(rgb_to_gray(&[255, 0, 0]), 76);
        assert_eq!(rgb_to_gray(&[0, 255, 0]), 150);
        assert_eq!(rgb_to_gray(&[0, 0, 255]), 29);
    }

    #[test]
    fn out_of_range_is_an_error_not_a_clamp() {
        let window = FrameWindow::new(vec![gray(1), gray(2), gray(3)]).expect("uniform frames");

        assert_eq!(
            window.frame(3).expect_err("past the end"),
            Error::FrameOutOfRange { index: 3, len: 3 }
        );

        let event = window.slice(1, 2).expect("inside recording");
        assert_eq!(event.offset(), 1);
        assert_eq!(event.frame(0).expect("first"), &gray(2));
        assert!(event.frame(2).is_err());
        assert!(window.slice(2, 2).is_err());
    }

    #[test]
    fn mixed_frame_sizes_are_rejected() {
        let odd = Frame::Gray(Image::new_fill(5, 3, 0));
        let err = FrameWindow::new(vec![gray(0), odd]).expect_err("size mismatch");
        assert!(matches!(err, Error::FrameSizeMismatch { actual_width: 5, .. }));
    }

    #[test]
    fn gray_crop_converts_only_the_region() {
        let img = Image::from_fn(4, 4, |x, _| [x as u8 * 10, x as u8 * 10, x as u8 * 10]);
        let block = Frame::Rgb(img).gray_crop(&Region::new(1, 2, 3, 4)).expect("inside frame");

        assert_eq!(block.width(), 2);
        assert_eq!(block.data(), &[10, 20, 10, 20]);
    }
}
