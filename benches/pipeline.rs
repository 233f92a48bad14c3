//! Benchmarks for the stitching stages on a synthetic scene.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgb, RgbImage};
use image_stitcher::data::to_grayscale;
use image_stitcher::features::{DescriptorExtractor, HarrisDetector, Keypoint};
use image_stitcher::{StitchConfig, Stitcher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn create_scene(width: u32, height: u32) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(1);
    let mut scene = RgbImage::from_pixel(width, height, Rgb([140, 120, 150]));
    for _ in 0..(width * height / 600) {
        let w = rng.gen_range(10..40);
        let h = rng.gen_range(10..30);
        let x0 = rng.gen_range(0..width - w);
        let y0 = rng.gen_range(0..height - h);
        let v: u8 = rng.gen_range(30..240);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                scene.put_pixel(x, y, Rgb([v, v.saturating_sub(20).max(1), v.saturating_add(10)]));
            }
        }
    }
    scene
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");
    for &(width, height) in &[(320u32, 240u32), (640, 480)] {
        let gray = to_grayscale(&create_scene(width, height));
        let label = format!("{width}x{height}");
        let detector = HarrisDetector::new(2.0, 300.0, 3);

        group.bench_function(BenchmarkId::new("harris", &label), |b| {
            b.iter(|| black_box(detector.detect(black_box(&gray.view()))))
        });

        let keypoints: Vec<Keypoint> = detector
            .detect(&gray.view())
            .into_iter()
            .map(Keypoint::from)
            .collect();
        let extractor = DescriptorExtractor::default();
        group.bench_function(BenchmarkId::new("descriptors", &label), |b| {
            b.iter(|| black_box(extractor.extract(black_box(&gray.view()), &keypoints)))
        });
    }
    group.finish();
}

fn bench_stitch(c: &mut Criterion) {
    let scene = create_scene(480, 240);
    let first = image::imageops::crop_imm(&scene, 0, 0, 320, 240).to_image();
    let second = image::imageops::crop_imm(&scene, 160, 0, 320, 240).to_image();
    let stitcher = match Stitcher::new(StitchConfig {
        harris_threshold: 300.0,
        ransac_seed: Some(7),
        ..StitchConfig::default()
    }) {
        Ok(stitcher) => stitcher,
        Err(e) => panic!("bench config rejected: {e}"),
    };

    let mut group = c.benchmark_group("stitch");
    group.sample_size(10);
    group.bench_function("320x240_pair", |b| {
        b.iter(|| black_box(stitcher.stitch(first.clone(), second.clone())))
    });
    group.finish();
}

criterion_group!(benches, bench_features, bench_stitch);
criterion_main!(benches);
