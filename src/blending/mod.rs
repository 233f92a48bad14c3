//! Panorama compositing: canvas bounds, perspective warp and
//! distance-transform feathering.

pub mod canvas;
pub mod distance;
pub mod warp;

pub use canvas::*;
pub use distance::*;
pub use warp::*;

use crate::geometry::Homography;
use crate::{Result, StitchError};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

/// Added to the weight sum before normalizing feather weights.
pub const FEATHER_EPSILON: f64 = 1e-6;

/// Result of compositing two images onto a shared canvas.
#[derive(Debug, Clone)]
pub struct BlendOutput {
    pub panorama: Array3<u8>,
    pub layout: CanvasLayout,
    /// Pixel-channel samples covered by both images.
    pub overlap_samples: usize,
}

/// Feathered compositor.
///
/// `image1` is placed unwarped at the canvas offset, `image2` is warped into
/// it. Coverage is decided per channel from nonzero values, so a genuinely
/// black pixel counts as uncovered.
#[derive(Debug, Clone)]
pub struct FeatherBlender {
    pub epsilon: f64,
}

impl Default for FeatherBlender {
    fn default() -> Self {
        Self {
            epsilon: FEATHER_EPSILON,
        }
    }
}

impl FeatherBlender {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Composite `image2` (mapped by `homography` into `image1`'s frame) with
    /// `image1`.
    pub fn blend(
        &self,
        image1: &ArrayView3<u8>,
        image2: &ArrayView3<u8>,
        homography: &Homography,
    ) -> Result<BlendOutput> {
        let (h1, w1, c1) = image1.dim();
        let (h2, w2, c2) = image2.dim();
        if c1 != c2 {
            return Err(StitchError::InvalidImage(format!(
                "channel count mismatch: {c1} vs {c2}"
            )));
        }
        if h1 == 0 || w1 == 0 || h2 == 0 || w2 == 0 {
            return Err(StitchError::InvalidImage("empty image".to_string()));
        }

        let layout = CanvasLayout::compute((h1, w1), (h2, w2), homography)?;
        let transform = layout.canvas_transform(homography);
        let warped2 = warp_perspective(image2, &transform, layout.width, layout.height)?;
        let canvas1 = layout.place(image1);

        let mut panorama = Array3::zeros(canvas1.dim());
        let mut overlap_samples = 0;
        for channel in 0..c1 {
            let a = canvas1.index_axis(Axis(2), channel);
            let b = warped2.index_axis(Axis(2), channel);
            let (blended, overlap) = self.blend_channel(&a, &b);
            panorama.index_axis_mut(Axis(2), channel).assign(&blended);
            overlap_samples += overlap;
        }

        tracing::debug!(
            width = layout.width,
            height = layout.height,
            offset_x = layout.offset_x,
            offset_y = layout.offset_y,
            overlap_samples,
            "Feathered blend completed"
        );

        Ok(BlendOutput {
            panorama,
            layout,
            overlap_samples,
        })
    }

    /// Blend one channel; returns the result and the number of overlap pixels.
    pub fn blend_channel(&self, canvas1: &ArrayView2<u8>, warped2: &ArrayView2<u8>) -> (Array2<u8>, usize) {
        let mask1 = canvas1.mapv(|v| v > 0);
        let mask2 = warped2.mapv(|v| v > 0);
        let overlap = Zip::from(&mask1).and(&mask2).fold(0, |n, &a, &b| n + (a && b) as usize);

        if overlap == 0 {
            let mut out = canvas1.to_owned();
            Zip::from(&mut out)
                .and(warped2)
                .and(&mask1)
                .for_each(|o, &v2, &m1| {
                    if !m1 && v2 > 0 {
                        *o = v2;
                    }
                });
            return (out, 0);
        }

        let dist1 = euclidean_distance_transform(&mask1.view());
        let dist2 = euclidean_distance_transform(&mask2.view());
        let eps = self.epsilon;

        let mut out = Array2::zeros(canvas1.dim());
        Zip::from(&mut out)
            .and(canvas1)
            .and(warped2)
            .and(&dist1)
            .and(&dist2)
            .for_each(|o, &v1, &v2, &d1, &d2| {
                *o = match (v1 > 0, v2 > 0) {
                    (true, true) => {
                        let sum = d1 + d2 + eps;
                        let value = (d1 / sum) * v1 as f64 + (d2 / sum) * v2 as f64;
                        // Rounded to nearest; a plain `as u8` cast would truncate.
                        value.round().clamp(0.0, 255.0) as u8
                    }
                    (true, false) => v1,
                    (false, true) => v2,
                    (false, false) => 0,
                };
            });
        (out, overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_disjoint_coverage_copies_both() {
        let a = array![[10u8, 0, 0], [10, 0, 0]];
        let b = array![[0u8, 0, 30], [0, 0, 30]];
        let (out, overlap) = FeatherBlender::default().blend_channel(&a.view(), &b.view());
        assert_eq!(overlap, 0);
        assert_eq!(out, array![[10u8, 0, 30], [10, 0, 30]]);
    }

    #[test]
    fn test_overlap_weights_favor_deeper_pixels() {
        // Image 1 covers columns 0..4, image 2 covers columns 2..6.
        let a = Array2::from_shape_fn((1, 6), |(_, c)| if c < 4 { 100u8 } else { 0 });
        let b = Array2::from_shape_fn((1, 6), |(_, c)| if c >= 2 { 200u8 } else { 0 });
        let (out, overlap) = FeatherBlender::default().blend_channel(&a.view(), &b.view());
        assert_eq!(overlap, 2);
        assert_eq!(out[[0, 0]], 100);
        assert_eq!(out[[0, 5]], 200);
        // Column 2: d1 = 2 (to column 4), d2 = 1 (to column 1).
        assert_eq!(out[[0, 2]], 133);
        // Column 3: d1 = 1, d2 = 2.
        assert_eq!(out[[0, 3]], 167);
    }

    #[test]
    fn test_identical_images_reproduce_input() {
        let image = Array3::from_shape_fn((8, 10, 3), |(y, x, c)| (20 + 11 * x + 5 * y + 40 * c) as u8);
        let out = FeatherBlender::default()
            .blend(&image.view(), &image.view(), &Homography::identity())
            .unwrap();
        assert_eq!(out.layout.offset_x, 1);
        assert_eq!(out.layout.offset_y, 1);
        for y in 0..8 {
            for x in 0..10 {
                for c in 0..3 {
                    assert_eq!(out.panorama[[y + 1, x + 1, c]], image[[y, x, c]]);
                }
            }
        }
        assert_eq!(out.panorama[[0, 0, 0]], 0);
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let rgb = Array3::<u8>::zeros((4, 4, 3));
        let gray = Array3::<u8>::zeros((4, 4, 1));
        assert!(matches!(
            FeatherBlender::default().blend(&rgb.view(), &gray.view(), &Homography::identity()),
            Err(StitchError::InvalidImage(_))
        ));
    }
}
