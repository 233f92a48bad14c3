use crate::geometry::Homography;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Wall-clock time spent in one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: f64,
}

impl StageTiming {
    pub fn new(stage: &str, duration: Duration) -> Self {
        Self {
            stage: stage.to_string(),
            duration_ms: duration.as_secs_f64() * 1000.0,
        }
    }
}

/// Summary of a stitch run, suitable for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchReport {
    pub correlation_id: Option<Uuid>,
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// `(width, height)` after downscaling
    pub first_size: (u32, u32),
    pub second_size: (u32, u32),

    pub corners_first: usize,
    pub corners_second: usize,
    pub matches: usize,
    pub inliers: usize,
    /// Whether the homography was refit on all inliers
    pub refined: bool,

    /// Maps first-image pixels into the second image's frame
    pub homography: [[f64; 3]; 3],
    pub canvas_width: usize,
    pub canvas_height: usize,

    pub stage_timings: Vec<StageTiming>,
    pub total_ms: f64,
}

impl StitchReport {
    pub fn stage_ms(&self, stage: &str) -> Option<f64> {
        self.stage_timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.duration_ms)
    }
}

/// Stitched output
#[derive(Debug, Clone)]
pub struct Panorama {
    pub image: RgbImage,
    pub homography: Homography,
    pub report: StitchReport,
}
