use crate::{Error, Region};

/// Owned raster, row-major, tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

fn pixel_count(width: usize, height: usize) -> Option<usize> {
    width.checked_mul(height)
}

impl<T> Image<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, Error> {
        match pixel_count(width, height) {
            Some(n) if n == data.len() => Ok(Self { width, height, data }),
            n => Err(Error::SizeMismatch {
                expected: n.unwrap_or(usize::MAX),
                actual: data.len(),
            }),
        }
    }

    /// Builds an image by evaluating `f(x, y)` in raster order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.offset(x, y).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.offset(x, y).map(|i| &mut self.data[i])
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &self.data,
        }
    }
}

impl<T: Clone> Image<T> {
    pub fn new_fill(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}

/// Borrowed window into an [`Image`].
///
/// Crops keep the parent's row stride, so rows are not adjacent in memory.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a [T],
}

impl<'a, T> ImageView<'a, T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Elements between the starts of adjacent rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        let (width, stride, data) = (self.width, self.stride, self.data);
        (0..self.height).map(move |y| &data[y * stride..y * stride + width])
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// The `width` x `height` block whose top-left pixel is `(x, y)`.
    pub fn subview(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageView<'a, T>, Error> {
        let fits = |at: usize, len: usize, limit: usize| at.checked_add(len).is_some_and(|end| end <= limit);
        if !fits(x, width, self.width) || !fits(y, height, self.height) {
            return Err(Error::OutOfBounds);
        }
        if width == 0 || height == 0 {
            return Ok(ImageView {
                width,
                height,
                stride: 0,
                data: &[],
            });
        }

        let start = y * self.stride + x;
        let end = start + (height - 1) * self.stride + width;
        Ok(ImageView {
            width,
            height,
            stride: self.stride,
            data: self.data.get(start..end).ok_or(Error::OutOfBounds)?,
        })
    }

    /// Block covered by `region`, which must lie inside the view.
    pub fn crop(&self, region: &Region) -> Result<ImageView<'a, T>, Error> {
        let x = usize::try_from(region.x1).map_err(|_| Error::OutOfBounds)?;
        let y = usize::try_from(region.y1).map_err(|_| Error::OutOfBounds)?;
        self.subview(x, y, region.width() as usize, region.height() as usize)
    }

    /// Applies `f` per pixel into a new, packed image.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Image<U> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend(row.iter().map(&mut f));
        }
        Image {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

impl<T: Clone> ImageView<'_, T> {
    pub fn to_image(&self) -> Image<T> {
        self.map(T::clone)
    }
}
