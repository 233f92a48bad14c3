use image::{ImageFormat, Rgb, RgbImage};
use image_stitcher::logging::{clear_correlation_id, set_correlation_id};
use image_stitcher::{StitchConfig, StitchError, Stitcher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;
use uuid::Uuid;

const PALETTE: [u8; 5] = [40, 90, 140, 190, 240];
const SCENE_WIDTH: u32 = 280;
const SCENE_HEIGHT: u32 = 120;
const SHIFT: u32 = 80;

fn shade(v: u8) -> Rgb<u8> {
    Rgb([v, v - 20, v + 10])
}

/// Random flat rectangles over a mid-gray background; every channel stays nonzero.
fn create_scene(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = RgbImage::from_pixel(SCENE_WIDTH, SCENE_HEIGHT, shade(PALETTE[2]));
    for _ in 0..60 {
        let w = rng.gen_range(10..40);
        let h = rng.gen_range(10..30);
        let x0 = rng.gen_range(0..SCENE_WIDTH - w);
        let y0 = rng.gen_range(0..SCENE_HEIGHT - h);
        let color = shade(PALETTE[rng.gen_range(0..PALETTE.len())]);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                scene.put_pixel(x, y, color);
            }
        }
    }
    scene
}

/// Left and right views of the scene, overlapping by 120 columns.
fn create_pair(seed: u64) -> (RgbImage, RgbImage, RgbImage) {
    let scene = create_scene(seed);
    let first = image::imageops::crop_imm(&scene, 0, 0, 200, SCENE_HEIGHT).to_image();
    let second = image::imageops::crop_imm(&scene, SHIFT, 0, 200, SCENE_HEIGHT).to_image();
    (scene, first, second)
}

fn create_test_config() -> StitchConfig {
    StitchConfig {
        harris_threshold: 300.0,
        ransac_seed: Some(7),
        ..StitchConfig::default()
    }
}

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

#[test]
fn test_stitch_recovers_translation() {
    let (_, first, second) = create_pair(17);
    let stitcher = Stitcher::new(create_test_config()).unwrap();
    let panorama = stitcher.stitch(first, second).unwrap();

    let h = panorama.homography.rows();
    assert!((h[0][2] + SHIFT as f64).abs() < 0.1, "{h:?}");
    assert!(h[1][2].abs() < 0.1, "{h:?}");
    for (r, c, expected) in [(0, 0, 1.0), (0, 1, 0.0), (1, 0, 0.0), (1, 1, 1.0), (2, 0, 0.0), (2, 1, 0.0)] {
        assert!((h[r][c] - expected).abs() < 1e-3, "{h:?}");
    }

    let report = &panorama.report;
    assert!(report.inliers >= 8, "only {} inliers", report.inliers);
    assert!(report.matches >= report.inliers);
    assert!(report.matches <= 100);
    assert_eq!(report.homography, h);
}

#[test]
fn test_panorama_reproduces_scene() {
    let (scene, first, second) = create_pair(17);
    let stitcher = Stitcher::new(create_test_config()).unwrap();
    let panorama = stitcher.stitch(first, second).unwrap();

    assert_eq!(panorama.image.dimensions(), (SCENE_WIDTH + 2, SCENE_HEIGHT + 2));

    let mut total = 0usize;
    let mut off = 0usize;
    for y in 0..SCENE_HEIGHT {
        for x in 0..SCENE_WIDTH {
            let expected = scene.get_pixel(x, y).0;
            let actual = panorama.image.get_pixel(x + 1, y + 1).0;
            for c in 0..3 {
                total += 1;
                if (expected[c] as i32 - actual[c] as i32).abs() > 2 {
                    off += 1;
                }
            }
        }
    }
    assert!(off * 100 <= total, "{off} of {total} samples differ");
}

#[test]
fn test_report_lists_every_stage() {
    let (_, first, second) = create_pair(23);
    let stitcher = Stitcher::new(create_test_config()).unwrap();
    let panorama = stitcher.stitch(first, second).unwrap();
    let report = &panorama.report;

    let stages: Vec<&str> = report.stage_timings.iter().map(|t| t.stage.as_str()).collect();
    assert_eq!(stages, ["prepare", "harris", "descriptors", "matching", "ransac", "blend"]);
    assert!(report.stage_ms("ransac").is_some());
    assert_eq!(report.first_size, (200, SCENE_HEIGHT));
    assert_eq!(report.second_size, (200, SCENE_HEIGHT));
    assert_eq!(
        (report.canvas_width as u32, report.canvas_height as u32),
        panorama.image.dimensions()
    );

    let json = serde_json::to_value(report).unwrap();
    assert_eq!(json["inliers"], report.inliers);
    assert_eq!(json["stage_timings"].as_array().map(Vec::len), Some(6));
}

#[test]
fn test_seeded_runs_agree() {
    let (_, first, second) = create_pair(31);
    let stitcher = Stitcher::new(create_test_config()).unwrap();
    let a = stitcher.stitch(first.clone(), second.clone()).unwrap();
    let b = stitcher.stitch(first, second).unwrap();
    assert_eq!(a.homography, b.homography);
    assert_eq!(a.image, b.image);
}

#[test]
fn test_stitch_bytes_decodes_uploads() {
    let (_, first, second) = create_pair(17);
    let stitcher = Stitcher::new(create_test_config()).unwrap();
    let panorama = stitcher
        .stitch_bytes(&encode_png(&first), &encode_png(&second))
        .unwrap();
    assert_eq!(panorama.image.dimensions(), (SCENE_WIDTH + 2, SCENE_HEIGHT + 2));
}

#[test]
fn test_report_carries_correlation_id() {
    let (_, first, second) = create_pair(17);
    let id = Uuid::new_v4();
    set_correlation_id(id);
    let result = Stitcher::new(create_test_config()).unwrap().stitch(first, second);
    clear_correlation_id();
    assert_eq!(result.unwrap().report.correlation_id, Some(id));
}

#[test]
fn test_black_images_are_rejected() {
    let black = RgbImage::new(100, 80);
    let err = Stitcher::new(create_test_config())
        .unwrap()
        .stitch(black.clone(), black)
        .unwrap_err();
    assert!(matches!(err, StitchError::InsufficientFeatures { .. }));
    assert!(err.is_input_error());
}

#[test]
fn test_corner_flood_is_rejected_before_matching() {
    let black = RgbImage::new(100, 80);
    let config = StitchConfig {
        harris_threshold: -1.0,
        harris_window_radius: 0,
        ..create_test_config()
    };
    let err = Stitcher::new(config).unwrap().stitch(black.clone(), black).unwrap_err();
    assert!(matches!(err, StitchError::TooManyFeatures { first: 8000, second: 8000, .. }));
    assert_eq!(err.kind(), "TooManyFeatures");
    assert!(err.is_input_error());
}

#[test]
fn test_oversized_parameters_are_invalid_config() {
    let oversized = [
        StitchConfig { sigma: 1e18, ..create_test_config() },
        StitchConfig { harris_window_radius: usize::MAX, ..create_test_config() },
        StitchConfig { ransac_iters: usize::MAX, ..create_test_config() },
        StitchConfig { max_size: u32::MAX, ..create_test_config() },
        StitchConfig { max_corners: usize::MAX, ..create_test_config() },
    ];
    for config in oversized {
        assert!(
            matches!(Stitcher::new(config.clone()), Err(StitchError::InvalidConfig(_))),
            "{config:?} was accepted"
        );
    }
}

#[test]
fn test_garbage_bytes_fail_to_decode() {
    let stitcher = Stitcher::new(create_test_config()).unwrap();
    let err = stitcher.stitch_bytes(b"not an image", b"also not").unwrap_err();
    assert!(matches!(err, StitchError::Decode(_)));
    assert_eq!(err.kind(), "DecodeFailed");

    let err = stitcher.stitch_bytes(&[], &[]).unwrap_err();
    assert!(matches!(err, StitchError::InvalidImage(_)));
}
