use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use varflow_image::Image;
use varflow_optflow::{FlowEstimator, FlowParams};

fn texture(x: f32, y: f32) -> f32 {
    0.5 + 0.25 * (x / 5.0).sin() * (y / 7.0).cos() + 0.1 * ((x + 2.0 * y) / 11.0).sin()
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("FlowEstimate");
    group.sample_size(10);

    for (width, height) in [(128, 96), (256, 192), (512, 384)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);

        let size = [*width, *height].into();
        let image1 = Image::<f32, 1>::from_fn(size, |x, y, _| texture(x as f32, y as f32)).unwrap();
        let image2 =
            Image::<f32, 1>::from_fn(size, |x, y, _| texture(x as f32 - 2.0, y as f32 + 1.0))
                .unwrap();

        let estimator = FlowEstimator::new(FlowParams::default()).unwrap();

        group.bench_with_input(
            BenchmarkId::new("estimate_default", &parameter_string),
            &(&image1, &image2),
            |b, i| {
                let (img1, img2) = *i;
                b.iter(|| black_box(estimator.estimate(img1, img2)).unwrap())
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_estimate);
criterion_main!(benches);
