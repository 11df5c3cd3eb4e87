use serde::{Deserialize, Serialize};

/// Integer circle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Circle {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Circle {
    pub const fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }
}

/// Axis-aligned box `(x1, y1)..(x2, y2)` in pixel coordinates.
///
/// Corners may lie outside the image; use [`Region::clamp_to`] before
/// cutting pixels out of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Square region of half-size `half` around `(cx, cy)`.
    pub const fn around(cx: i32, cy: i32, half: i32) -> Self {
        Self::new(cx - half, cy - half, cx + half, cy + half)
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Integer center, truncated toward zero like the corner arithmetic.
    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// True when the full disc lies strictly inside the region.
    pub fn strictly_contains(&self, c: &Circle) -> bool {
        self.x1 < c.x - c.radius
            && c.x + c.radius < self.x2
            && self.y1 < c.y - c.radius
            && c.y + c.radius < self.y2
    }

    /// Intersection with `0..width` x `0..height`.
    pub fn clamp_to(&self, width: usize, height: usize) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let x1 = self.x1.clamp(0, w);
        let y1 = self.y1.clamp(0, h);
        Self {
            x1,
            y1,
            x2: self.x2.clamp(x1, w),
            y2: self.y2.clamp(y1, h),
        }
    }
}

/// Line segment between two integer endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Segment {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn length(&self) -> f64 {
        f64::from(self.x2 - self.x1).hypot(f64::from(self.y2 - self.y1))
    }
}
