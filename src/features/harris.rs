use super::convolve::{centered_difference_kernels, convolve_same, harris_smoothing_kernel};
use super::Corner;
use ndarray::{Array2, ArrayView2, Zip};

/// Harris-style corner detector.
///
/// The response is the determinant of the smoothed second-moment matrix over
/// its trace, `(Sxx*Syy - Sxy^2) / (Sxx + Syy)`, and 0 where the trace is 0.
/// Thresholds are expressed in that unit.
#[derive(Debug, Clone)]
pub struct HarrisDetector {
    pub sigma: f64,
    pub threshold: f64,
    pub window_radius: usize,
}

impl Default for HarrisDetector {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            threshold: 3000.0,
            window_radius: 3,
        }
    }
}

impl HarrisDetector {
    pub fn new(sigma: f64, threshold: f64, window_radius: usize) -> Self {
        Self {
            sigma,
            threshold,
            window_radius,
        }
    }

    /// Corner response surface for a grayscale image.
    pub fn response(&self, image: &ArrayView2<f64>) -> Array2<f64> {
        harris_response(image, self.sigma)
    }

    /// Corners in row-major order: local maxima of the response within the
    /// suppression window that also exceed the threshold.
    pub fn detect(&self, image: &ArrayView2<f64>) -> Vec<Corner> {
        let response = self.response(image);
        suppress_non_maxima(&response.view(), self.threshold, self.window_radius)
    }
}

pub fn harris_response(image: &ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    let (dx, dy) = centered_difference_kernels();
    let grad_x = convolve_same(image, &dx);
    let grad_y = convolve_same(image, &dy);

    let smoothing = harris_smoothing_kernel(sigma);
    let sxx = convolve_same(&(&grad_x * &grad_x).view(), &smoothing);
    let syy = convolve_same(&(&grad_y * &grad_y).view(), &smoothing);
    let sxy = convolve_same(&(&grad_x * &grad_y).view(), &smoothing);

    let mut response = Array2::zeros(image.dim());
    Zip::from(&mut response)
        .and(&sxx)
        .and(&syy)
        .and(&sxy)
        .for_each(|r, &xx, &yy, &xy| {
            let trace = xx + yy;
            *r = if trace != 0.0 {
                (xx * yy - xy * xy) / trace
            } else {
                0.0
            };
        });
    response
}

/// Keep pixels equal to the maximum of their `(2r+1) x (2r+1)` window and
/// strictly above `threshold`.
pub fn suppress_non_maxima(
    response: &ArrayView2<f64>,
    threshold: f64,
    window_radius: usize,
) -> Vec<Corner> {
    let window_max = max_filter(response, window_radius);
    let mut corners = Vec::new();
    for ((row, col), &value) in response.indexed_iter() {
        if value == window_max[[row, col]] && value > threshold {
            corners.push(Corner { row, col });
        }
    }
    corners
}

/// Sliding-window maximum, run separably along columns then rows.
/// The window is clipped at the image border.
fn max_filter(values: &ArrayView2<f64>, radius: usize) -> Array2<f64> {
    let (height, width) = values.dim();
    let horizontal = Array2::from_shape_fn((height, width), |(r, c)| {
        let lo = c.saturating_sub(radius);
        let hi = c.saturating_add(radius).min(width - 1);
        (lo..=hi)
            .map(|x| values[[r, x]])
            .fold(f64::NEG_INFINITY, f64::max)
    });
    Array2::from_shape_fn((height, width), |(r, c)| {
        let lo = r.saturating_sub(radius);
        let hi = r.saturating_add(radius).min(height - 1);
        (lo..=hi)
            .map(|y| horizontal[[y, c]])
            .fold(f64::NEG_INFINITY, f64::max)
    })
}
