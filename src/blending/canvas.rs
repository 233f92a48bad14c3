use crate::geometry::Homography;
use crate::{Result, StitchError};
use ndarray::{s, Array3, ArrayView3};
use serde::{Deserialize, Serialize};

/// Largest canvas side accepted before the warp allocates anything.
pub const MAX_CANVAS_SIDE: usize = 16384;

/// Output canvas size plus where image 1's origin lands inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasLayout {
    pub width: usize,
    pub height: usize,
    pub offset_x: usize,
    pub offset_y: usize,
}

impl CanvasLayout {
    /// Bounding box of image 1's corners and image 2's corners mapped through
    /// `homography`, widened by half a pixel before rounding outward.
    ///
    /// Sizes are `(height, width)`.
    pub fn compute(
        size1: (usize, usize),
        size2: (usize, usize),
        homography: &Homography,
    ) -> Result<Self> {
        let (h1, w1) = (size1.0 as f64, size1.1 as f64);
        let (h2, w2) = (size2.0 as f64, size2.1 as f64);

        let mut xs = vec![0.0, w1, w1, 0.0];
        let mut ys = vec![0.0, 0.0, h1, h1];
        for (x, y) in [(0.0, 0.0), (w2, 0.0), (w2, h2), (0.0, h2)] {
            let (px, py) = homography.project(x, y);
            if !px.is_finite() || !py.is_finite() {
                return Err(StitchError::DegenerateHomography);
            }
            xs.push(px);
            ys.push(py);
        }

        let min_x = (xs.iter().copied().fold(f64::INFINITY, f64::min) - 0.5).floor();
        let max_x = (xs.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 0.5).ceil();
        let min_y = (ys.iter().copied().fold(f64::INFINITY, f64::min) - 0.5).floor();
        let max_y = (ys.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 0.5).ceil();

        let width = max_x - min_x;
        let height = max_y - min_y;
        if width > MAX_CANVAS_SIDE as f64 || height > MAX_CANVAS_SIDE as f64 {
            return Err(StitchError::CanvasTooLarge {
                width: width as u64,
                height: height as u64,
            });
        }

        // Image 1's corners are part of the box, so the minimum is never positive.
        Ok(Self {
            width: width as usize,
            height: height as usize,
            offset_x: (-min_x) as usize,
            offset_y: (-min_y) as usize,
        })
    }

    /// `translation(offset) * homography`: maps image 2 pixels onto the canvas.
    pub fn canvas_transform(&self, homography: &Homography) -> Homography {
        homography.then_translate(self.offset_x as f64, self.offset_y as f64)
    }

    /// Zero canvas with `image` copied unmodified at the offset.
    pub fn place(&self, image: &ArrayView3<u8>) -> Array3<u8> {
        let (h, w, channels) = image.dim();
        let mut canvas = Array3::zeros((self.height, self.width, channels));
        let rows = h.min(self.height.saturating_sub(self.offset_y));
        let cols = w.min(self.width.saturating_sub(self.offset_x));
        canvas
            .slice_mut(s![
                self.offset_y..self.offset_y + rows,
                self.offset_x..self.offset_x + cols,
                ..
            ])
            .assign(&image.slice(s![..rows, ..cols, ..]));
        canvas
    }
}
