use super::convolve::{convolve_same, gaussian_derivative_kernels};
use super::Keypoint;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut1, Axis, Zip};
use std::f64::consts::PI;

/// Orientation bins per spatial cell.
pub const NUM_ANGLES: usize = 8;
/// Spatial cells along each axis of the descriptor grid.
pub const NUM_BINS: usize = 4;
pub const NUM_CELLS: usize = NUM_BINS * NUM_BINS;
pub const DESCRIPTOR_LEN: usize = NUM_ANGLES * NUM_CELLS;
/// Exponent sharpening the cosine weight of each orientation bin.
pub const ANGLE_EXPONENT: i32 = 9;
/// Scale of the derivative-of-Gaussian used for descriptor gradients.
pub const GRADIENT_SIGMA: f64 = 1.0;
/// Per-component cap applied to unit-normalized descriptors.
pub const DESCRIPTOR_CLIP: f64 = 0.2;

/// Per-pixel image gradients.
#[derive(Debug, Clone)]
pub struct GradientField {
    pub grad_x: Array2<f64>,
    pub grad_y: Array2<f64>,
    pub magnitude: Array2<f64>,
    pub orientation: Array2<f64>,
}

impl GradientField {
    pub fn compute(image: &ArrayView2<f64>, sigma: f64) -> Self {
        let (dx, dy) = gaussian_derivative_kernels(sigma);
        let grad_x = convolve_same(image, &dx);
        let grad_y = convolve_same(image, &dy);

        let mut magnitude = Array2::zeros(image.dim());
        let mut orientation = Array2::zeros(image.dim());
        Zip::from(&mut magnitude)
            .and(&mut orientation)
            .and(&grad_x)
            .and(&grad_y)
            .for_each(|m, o, &gx, &gy| {
                *m = (gx * gx + gy * gy).sqrt();
                *o = gy.atan2(gx);
            });

        Self {
            grad_x,
            grad_y,
            magnitude,
            orientation,
        }
    }
}

/// SIFT-like descriptor extractor evaluated at fixed keypoints.
///
/// Each descriptor holds `NUM_ANGLES x NUM_CELLS` components laid out
/// angle-major: component `a * NUM_CELLS + cell`.
#[derive(Debug, Clone)]
pub struct DescriptorExtractor {
    pub enlarge_factor: f64,
}

impl Default for DescriptorExtractor {
    fn default() -> Self {
        Self { enlarge_factor: 1.5 }
    }
}

impl DescriptorExtractor {
    pub fn new(enlarge_factor: f64) -> Self {
        Self { enlarge_factor }
    }

    /// One descriptor row per keypoint, in keypoint order.
    pub fn extract(&self, image: &ArrayView2<f64>, keypoints: &[Keypoint]) -> Array2<f64> {
        let descriptors = self.extract_raw(image, keypoints);
        normalize_descriptors(descriptors)
    }

    /// Accumulated histograms before normalization.
    pub fn extract_raw(&self, image: &ArrayView2<f64>, keypoints: &[Keypoint]) -> Array2<f64> {
        let gradients = GradientField::compute(image, GRADIENT_SIGMA);
        let volume = angle_volume(&gradients);
        let cells = cell_offsets();

        let mut descriptors = Array2::zeros((keypoints.len(), DESCRIPTOR_LEN));
        for (kp, row) in keypoints.iter().zip(descriptors.axis_iter_mut(Axis(0))) {
            accumulate_keypoint(&volume.view(), kp, kp.radius * self.enlarge_factor, &cells, row);
        }
        descriptors
    }
}

/// Orientation-weighted magnitudes, shape `(height, width, NUM_ANGLES)`.
///
/// Channel `b` holds `max(0, cos(theta - b * 2pi / NUM_ANGLES))^ANGLE_EXPONENT * magnitude`.
pub fn angle_volume(gradients: &GradientField) -> Array3<f64> {
    let (height, width) = gradients.magnitude.dim();
    let mut volume = Array3::zeros((height, width, NUM_ANGLES));
    for bin in 0..NUM_ANGLES {
        let bin_angle = bin as f64 * 2.0 * PI / NUM_ANGLES as f64;
        let mut channel = volume.index_axis_mut(Axis(2), bin);
        Zip::from(&mut channel)
            .and(&gradients.orientation)
            .and(&gradients.magnitude)
            .for_each(|v, &theta, &mag| {
                let weight = (theta - bin_angle).cos().max(0.0).powi(ANGLE_EXPONENT);
                *v = weight * mag;
            });
    }
    volume
}

/// Cell centers on the unit grid, `(x, y)` per cell in row-major cell order.
fn cell_offsets() -> [(f64, f64); NUM_CELLS] {
    let step = 2.0 / NUM_BINS as f64;
    let start = -1.0 + 1.0 / NUM_BINS as f64;
    let mut offsets = [(0.0, 0.0); NUM_CELLS];
    for (cell, offset) in offsets.iter_mut().enumerate() {
        let (cy, cx) = (cell / NUM_BINS, cell % NUM_BINS);
        *offset = (start + cx as f64 * step, start + cy as f64 * step);
    }
    offsets
}

fn bilinear_weight(distance: f64, grid_step: f64) -> f64 {
    if grid_step == 0.0 {
        return 0.0;
    }
    let t = distance / grid_step;
    if t <= 1.0 {
        1.0 - t
    } else {
        0.0
    }
}

fn accumulate_keypoint(
    volume: &ArrayView3<f64>,
    kp: &Keypoint,
    radius: f64,
    cells: &[(f64, f64); NUM_CELLS],
    mut out: ArrayViewMut1<f64>,
) {
    let (height, width, _) = volume.dim();
    let (cx, cy) = kp.position();
    let grid_step = 2.0 / NUM_BINS as f64 * radius;
    let reach = radius + grid_step / 2.0;

    let x_min = (cx - reach).max(0.0).floor() as usize;
    let x_max = (cx + reach).min(width as f64).ceil().max(0.0) as usize;
    let y_min = (cy - reach).max(0.0).floor() as usize;
    let y_max = (cy + reach).min(height as f64).ceil().max(0.0) as usize;

    let centers: Vec<(f64, f64)> = cells
        .iter()
        .map(|&(gx, gy)| (gx * radius + cx, gy * radius + cy))
        .collect();

    for py in y_min..y_max.min(height) {
        for px in x_min..x_max.min(width) {
            let bins = volume.slice(ndarray::s![py, px, ..]);
            for (cell, &(gcx, gcy)) in centers.iter().enumerate() {
                let weight = bilinear_weight((px as f64 - gcx).abs(), grid_step)
                    * bilinear_weight((py as f64 - gcy).abs(), grid_step);
                if weight == 0.0 {
                    continue;
                }
                for (angle, &value) in bins.iter().enumerate() {
                    out[angle * NUM_CELLS + cell] += value * weight;
                }
            }
        }
    }
}

/// Rows whose L2 norm exceeds 1 are scaled to unit norm, capped at
/// `DESCRIPTOR_CLIP`, and scaled to unit norm again. Other rows are untouched.
pub fn normalize_descriptors(mut descriptors: Array2<f64>) -> Array2<f64> {
    for mut row in descriptors.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm <= 1.0 {
            continue;
        }
        row.mapv_inplace(|v| v / norm);
        clip_components(&mut row);
        let clipped_norm = row.dot(&row).sqrt();
        if clipped_norm > 0.0 {
            row.mapv_inplace(|v| v / clipped_norm);
        }
    }
    descriptors
}

/// Cap components at `DESCRIPTOR_CLIP`, floored at the row's own minimum.
pub fn clip_components(row: &mut ArrayViewMut1<f64>) {
    let floor = row.iter().copied().fold(f64::INFINITY, f64::min);
    row.mapv_inplace(|v| v.min(DESCRIPTOR_CLIP).max(floor));
}
