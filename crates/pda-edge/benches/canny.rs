use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pda_core::Image;
use pda_edge::{CannyDetector, Gradients, gaussian_blur_u8};

fn build_pipette_u8(width: usize, height: usize) -> Image<u8> {
    let (left, right) = (width / 2 - width / 10, width / 2 + width / 10);
    Image::from_fn(width, height, |x, y| {
        let on_wall = x.abs_diff(left) <= 2 || x.abs_diff(right) <= 2;
        if on_wall && y < height / 2 { 230 } else { 90 }
    })
}

fn bench_blur_canny(c: &mut Criterion) {
    let img = build_pipette_u8(640, 480);
    let view = img.as_view();
    let mut det = CannyDetector::new();

    c.bench_function("gaussian17_canny_640x480", |b| {
        b.iter(|| {
            let blurred = gaussian_blur_u8(black_box(&view), 17, 0.0);
            let grad = Gradients::sobel(&blurred.as_view());
            let edges = det.detect(&grad, 40.0, 60.0);
            black_box(edges.data().len());
        });
    });
}

criterion_group!(benches, bench_blur_canny);
criterion_main!(benches);
