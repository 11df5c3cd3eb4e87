use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pda_core::{Circle, Frame, FrameWindow, Image};
use pda_track::config::DistortionConfig;
use pda_track::{TrackerConfig, compose_start, track_distortion};

const PARTICLE: (i32, i32, i32) = (320, 275, 40);

fn scene(width: usize, height: usize, front: i32) -> Image<u8> {
    let (cx, cy, r) = PARTICLE;
    Image::from_fn(width, height, |x, y| {
        let (x, y) = (x as i32, y as i32);
        if (20..250).contains(&y) && ((x - 260).abs() <= 1 || (x - 380).abs() <= 1) {
            return 230;
        }
        if (x - cx).abs() <= 10 && (front..=cy).contains(&y) {
            return 40;
        }
        let d = f64::from(x - cx).hypot(f64::from(y - cy));
        let t = ((f64::from(r) + 1.0 - d) / 2.0).clamp(0.0, 1.0);
        (120.0 - 80.0 * t) as u8
    })
}

fn bench_compose(c: &mut Criterion) {
    let frame = Frame::Gray(scene(640, 480, i32::MAX));
    let cfg = TrackerConfig::default();

    c.bench_function("compose_start_640x480", |b| {
        b.iter(|| black_box(compose_start(black_box(&frame), &cfg).is_ok()));
    });
}

fn bench_track(c: &mut Criterion) {
    let frames: Vec<_> = (0..200)
        .map(|i| Frame::Gray(scene(640, 480, 250 - i / 10)))
        .collect();
    let Ok(window) = FrameWindow::new(frames) else {
        return;
    };
    let particle = Circle::new(PARTICLE.0, PARTICLE.1, PARTICLE.2);
    let cfg = DistortionConfig::default();

    c.bench_function("track_distortion_200_frames", |b| {
        b.iter(|| black_box(track_distortion(black_box(&window), &particle, &cfg, None).is_ok()));
    });
}

criterion_group!(benches, bench_compose, bench_track);
criterion_main!(benches);
