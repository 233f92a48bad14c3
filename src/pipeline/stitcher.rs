use super::types::{Panorama, StageTiming, StitchReport};
use crate::blending::FeatherBlender;
use crate::config::StitchConfig;
use crate::data::{array_to_rgb, decode_image, downscale_to_max, rgb_to_array, to_grayscale, validate_image_size};
use crate::features::{Corner, Keypoint};
use crate::geometry::run_ransac;
use crate::logging::{self, StageSpan};
use crate::{Result, StitchError};
use image::RgbImage;
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use uuid::Uuid;

/// Minimum corners per image before descriptors are worth computing.
pub const MIN_CORNERS: usize = 4;

/// One image after downscaling, in the two forms the stages consume.
struct PreparedImage {
    gray: Array2<f64>,
    color: Array3<u8>,
    size: (u32, u32),
}

impl PreparedImage {
    fn new(img: RgbImage, max_size: u32) -> Result<Self> {
        validate_image_size(&img, 1)?;
        let img = downscale_to_max(img, max_size);
        Ok(Self {
            gray: to_grayscale(&img),
            color: rgb_to_array(&img)?,
            size: img.dimensions(),
        })
    }
}

/// Runs the five stitching stages on a pair of overlapping images.
///
/// The first image is warped into the second image's frame; the second is the
/// unwarped base of the canvas.
#[derive(Debug, Clone)]
pub struct Stitcher {
    config: StitchConfig,
}

impl Stitcher {
    pub fn new(config: StitchConfig) -> Result<Self> {
        config.validate().map_err(StitchError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Stitch with the configured seed, or an entropy-seeded RNG when unset.
    pub fn stitch(&self, first: RgbImage, second: RgbImage) -> Result<Panorama> {
        let mut rng = match self.config.ransac_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.stitch_with_rng(first, second, &mut rng)
    }

    /// Decode two encoded images and stitch them.
    pub fn stitch_bytes(&self, first: &[u8], second: &[u8]) -> Result<Panorama> {
        let first = decode_image(first)?;
        let second = decode_image(second)?;
        self.stitch(first, second)
    }

    pub fn stitch_with_rng<R: Rng + ?Sized>(
        &self,
        first: RgbImage,
        second: RgbImage,
        rng: &mut R,
    ) -> Result<Panorama> {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let correlation_id = logging::get_correlation_id();
        let mut timings = Vec::new();
        let config = &self.config;

        let (first, second) = run_stage("prepare", correlation_id, &mut timings, |span| {
            let first = PreparedImage::new(first, config.max_size)?;
            let second = PreparedImage::new(second, config.max_size)?;
            span.record_input(first.size.0 as usize, first.size.1 as usize);
            Ok((first, second))
        })?;

        let (corners1, corners2) = run_stage("harris", correlation_id, &mut timings, |span| {
            let detector = config.harris_detector();
            let corners1 = detector.detect(&first.gray.view());
            let corners2 = detector.detect(&second.gray.view());
            span.record_output(corners1.len() + corners2.len());
            if corners1.len() < MIN_CORNERS || corners2.len() < MIN_CORNERS {
                return Err(StitchError::InsufficientFeatures {
                    first: corners1.len(),
                    second: corners2.len(),
                });
            }
            if corners1.len() > config.max_corners || corners2.len() > config.max_corners {
                return Err(StitchError::TooManyFeatures {
                    first: corners1.len(),
                    second: corners2.len(),
                    limit: config.max_corners,
                });
            }
            Ok((corners1, corners2))
        })?;

        let keypoints1 = to_keypoints(&corners1);
        let keypoints2 = to_keypoints(&corners2);

        let (descriptors1, descriptors2) = run_stage("descriptors", correlation_id, &mut timings, |span| {
            let extractor = config.descriptor_extractor();
            let d1 = extractor.extract(&first.gray.view(), &keypoints1);
            let d2 = extractor.extract(&second.gray.view(), &keypoints2);
            span.record_output(d1.nrows() + d2.nrows());
            Ok((d1, d2))
        })?;

        let matches = run_stage("matching", correlation_id, &mut timings, |span| {
            let matches = config
                .matcher()
                .match_descriptors(&descriptors1.view(), &descriptors2.view());
            span.record_output(matches.len());
            Ok(matches)
        })?;

        let estimate = run_stage("ransac", correlation_id, &mut timings, |span| {
            let estimate = run_ransac(&matches, &keypoints1, &keypoints2, &config.ransac_config(), rng)?;
            span.record_output(estimate.inlier_count());
            Ok(estimate)
        })?;

        let blended = run_stage("blend", correlation_id, &mut timings, |span| {
            span.record_input(second.size.0 as usize, second.size.1 as usize);
            let output = FeatherBlender::default().blend(
                &second.color.view(),
                &first.color.view(),
                &estimate.homography,
            )?;
            span.record_output(output.overlap_samples);
            Ok(output)
        })?;

        let image = array_to_rgb(&blended.panorama.view())?;
        let report = StitchReport {
            correlation_id,
            started_at,
            first_size: first.size,
            second_size: second.size,
            corners_first: corners1.len(),
            corners_second: corners2.len(),
            matches: matches.len(),
            inliers: estimate.inlier_count(),
            refined: estimate.refined,
            homography: estimate.homography.rows(),
            canvas_width: blended.layout.width,
            canvas_height: blended.layout.height,
            stage_timings: timings,
            total_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        tracing::info!(
            matches = report.matches,
            inliers = report.inliers,
            canvas_width = report.canvas_width,
            canvas_height = report.canvas_height,
            total_ms = report.total_ms,
            "Stitch completed"
        );

        Ok(Panorama {
            image,
            homography: estimate.homography,
            report,
        })
    }
}

fn to_keypoints(corners: &[Corner]) -> Vec<Keypoint> {
    corners.iter().copied().map(Keypoint::from).collect()
}

/// Run `stage` inside a [`StageSpan`] and append its timing.
fn run_stage<T>(
    name: &'static str,
    correlation_id: Option<Uuid>,
    timings: &mut Vec<StageTiming>,
    stage: impl FnOnce(&StageSpan) -> Result<T>,
) -> Result<T> {
    let span = StageSpan::new(name, correlation_id);
    let result = {
        let _enter = span.enter();
        stage(&span)
    };
    if let Err(ref e) = result {
        tracing::warn!(parent: span.span(), stage = name, error = %e, "Stage returned an error");
    }
    let duration = span.finish(result.is_ok());
    timings.push(StageTiming::new(name, duration));
    result
}
