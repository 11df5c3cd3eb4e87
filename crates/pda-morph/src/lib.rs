//! Binary morphology helpers.
//!
//! Pixels are treated as binary with threshold `> 0`.
//! Outputs are `0` or `255` in `u8`. Pixels outside the image never count as
//! set, so dilation does not grow from the border.

use pda_core::{Image, ImageView};

/// One dilation with a 3x3 square element.
pub fn dilate3x3_binary_u8(src: &ImageView<'_, u8>) -> Image<u8> {
    let (w, h) = (src.width(), src.height());
    if w == 0 || h == 0 {
        return Image::new_fill(w, h, 0u8);
    }

    // The square element is separable: row-wise max, then column-wise max.
    let mut rows = vec![false; w * h];
    for (y, row) in src.rows().enumerate() {
        for x in 0..w {
            let lo = x.saturating_sub(1);
            let hi = (x + 1).min(w - 1);
            rows[y * w + x] = row[lo..=hi].iter().any(|&v| v != 0);
        }
    }

    Image::from_fn(w, h, |x, y| {
        let lo = y.saturating_sub(1);
        let hi = (y + 1).min(h - 1);
        if (lo..=hi).any(|yy| rows[yy * w + x]) {
            255
        } else {
            0
        }
    })
}

/// Repeated 3x3 dilation; `iterations == 0` only binarizes.
pub fn dilate_binary_u8(src: &ImageView<'_, u8>, iterations: usize) -> Image<u8> {
    let mut out = src.map(|&v| if v != 0 { 255u8 } else { 0 });
    for _ in 0..iterations {
        out = dilate3x3_binary_u8(&out.as_view());
    }
    out
}
