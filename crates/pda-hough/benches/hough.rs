use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pda_core::Image;
use pda_hough::{CircleHough, CircleHoughParams, LineHoughConfig, hough_lines_p};

fn build_walls(width: usize, height: usize) -> Image<u8> {
    Image::from_fn(width, height, |x, y| {
        let wall = (x % 160) < 6 && y < height * 3 / 4;
        if wall { 255 } else { 0 }
    })
}

fn build_particle(width: usize, height: usize) -> Image<u8> {
    let (cx, cy, r) = (width as f32 * 0.5, height as f32 * 0.55, 40.0f32);
    Image::from_fn(width, height, |x, y| {
        let d = (x as f32 - cx).hypot(y as f32 - cy);
        let t = ((r + 1.0 - d) / 2.0).clamp(0.0, 1.0);
        (200.0 - 160.0 * t) as u8
    })
}

fn bench_lines(c: &mut Criterion) {
    let img = build_walls(640, 480);
    let view = img.as_view();
    let cfg = LineHoughConfig {
        min_line_length: 96,
        ..LineHoughConfig::default()
    };

    c.bench_function("hough_lines_p_640x480", |b| {
        b.iter(|| black_box(hough_lines_p(black_box(&view), &cfg).len()));
    });
}

fn bench_circles(c: &mut Criterion) {
    let img = build_particle(640, 480);
    let mut search = CircleHough::new(&img.as_view());
    let params = CircleHoughParams {
        edge_threshold: 150.0,
        vote_threshold: 75,
        min_radius: 26,
        max_radius: 53,
        min_dist: 1.0,
    };

    c.bench_function("hough_circles_640x480", |b| {
        b.iter(|| black_box(search.detect(black_box(&params)).len()));
    });
}

criterion_group!(benches, bench_lines, bench_circles);
criterion_main!(benches);
