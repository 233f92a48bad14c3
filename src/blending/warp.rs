use crate::geometry::Homography;
use crate::{Result, StitchError};
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array3, ArrayView3};

/// Warp `src` onto a `height x width` canvas so that source pixel `p` lands
/// at `transform * p`.
///
/// Every destination pixel is pulled back through the inverse transform and
/// sampled bilinearly; samples outside the source read as 0. All channels
/// share one sampling position per pixel.
pub fn warp_perspective(
    src: &ArrayView3<u8>,
    transform: &Homography,
    width: usize,
    height: usize,
) -> Result<Array3<u8>> {
    let inverse = transform
        .inverse()
        .ok_or(StitchError::DegenerateHomography)?;
    let channels = src.dim().2;
    let mut dst = Array3::zeros((height, width, channels));
    let mut values = vec![0.0f64; channels];

    for y in 0..height {
        for x in 0..width {
            let Some((sx, sy)) = pull_back(&inverse, x as f64, y as f64) else {
                continue;
            };
            if !sample_bilinear(src, sx, sy, &mut values) {
                continue;
            }
            for (c, v) in values.iter().enumerate() {
                dst[[y, x, c]] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(dst)
}

fn pull_back(inverse: &Matrix3<f64>, x: f64, y: f64) -> Option<(f64, f64)> {
    let p = inverse * Vector3::new(x, y, 1.0);
    if p.z == 0.0 {
        return None;
    }
    let (sx, sy) = (p.x / p.z, p.y / p.z);
    (sx.is_finite() && sy.is_finite()).then_some((sx, sy))
}

/// Bilinear sample of every channel at `(x, y)` with a constant-zero border.
///
/// Returns `false` when no neighbouring pixel lies inside the image.
fn sample_bilinear(src: &ArrayView3<u8>, x: f64, y: f64, out: &mut [f64]) -> bool {
    let (height, width, _) = src.dim();
    if x <= -1.0 || y <= -1.0 || x >= width as f64 || y >= height as f64 {
        return false;
    }

    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    out.iter_mut().for_each(|v| *v = 0.0);
    for (tx, ty, weight) in taps {
        if tx < 0 || ty < 0 || tx as usize >= width || ty as usize >= height || weight == 0.0 {
            continue;
        }
        for (c, v) in out.iter_mut().enumerate() {
            *v += weight * src[[ty as usize, tx as usize, c]] as f64;
        }
    }
    true
}
