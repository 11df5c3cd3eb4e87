use pda_core::{Frame, Image};

/// 3 px wide vertical bars centered on each column in `xs`, covering `rows`.
pub fn vertical_bars(
    width: usize,
    height: usize,
    xs: &[i32],
    rows: std::ops::Range<i32>,
    bar: u8,
    background: u8,
) -> Image<u8> {
    Image::from_fn(width, height, |x, y| {
        let (x, y) = (x as i32, y as i32);
        if rows.contains(&y) && xs.iter().any(|&c| (x - c).abs() <= 1) {
            bar
        } else {
            background
        }
    })
}

/// Disc with a 2 px linear rim, like a slightly defocused particle.
pub fn soft_disc_value(x: i32, y: i32, c: (i32, i32, i32), inside: u8, outside: u8) -> u8 {
    let d = f64::from(x - c.0).hypot(f64::from(y - c.1));
    let t = ((f64::from(c.2) + 1.0 - d) / 2.0).clamp(0.0, 1.0);
    (f64::from(outside) + (f64::from(inside) - f64::from(outside)) * t + 0.5).floor() as u8
}

pub const SCENE_WIDTH: usize = 200;
pub const SCENE_HEIGHT: usize = 260;
pub const PARTICLE: (i32, i32, i32) = (100, 182, 20);

/// Pipette walls at x = 70 and 130 with a dark particle under the mouth.
///
/// `front` adds an aspirated tongue from that row down into the particle.
pub fn aspiration_scene(front: Option<i32>) -> Image<u8> {
    Image::from_fn(SCENE_WIDTH, SCENE_HEIGHT, |x, y| {
        let (x, y) = (x as i32, y as i32);
        if (20..170).contains(&y) && ((x - 70).abs() <= 1 || (x - 130).abs() <= 1) {
            return 230;
        }
        if front.is_some_and(|f| (95..=105).contains(&x) && (f..=182).contains(&y)) {
            return 40;
        }
        soft_disc_value(x, y, PARTICLE, 40, 120)
    })
}

pub fn gray_frames(images: Vec<Image<u8>>) -> Vec<Frame> {
    images.into_iter().map(Frame::Gray).collect()
}

pub fn rgb_frame(img: &Image<u8>) -> Frame {
    Frame::Rgb(img.as_view().map(|&v| [v, v, v]))
}
