//! Corner detection and local descriptor extraction on grayscale images.
//!
//! Images here are `Array2<f64>` indexed `[row, col]`. Keypoints use `x` for
//! the column and `y` for the row.

pub mod convolve;
pub mod descriptor;
pub mod harris;

pub use convolve::*;
pub use descriptor::*;
pub use harris::*;

use serde::{Deserialize, Serialize};

/// Support radius assigned to every detected corner.
pub const KEYPOINT_RADIUS: f64 = 8.0;

/// A corner location returned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corner {
    pub row: usize,
    pub col: usize,
}

/// A pixel location plus the radius of the descriptor's spatial support.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: usize,
    pub y: usize,
    pub radius: f64,
}

impl Keypoint {
    pub fn new(x: usize, y: usize, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn from_corner(corner: Corner) -> Self {
        Self {
            x: corner.col,
            y: corner.row,
            radius: KEYPOINT_RADIUS,
        }
    }

    /// Pixel coordinates as floating point `(x, y)`.
    pub fn position(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl From<Corner> for Keypoint {
    fn from(corner: Corner) -> Self {
        Keypoint::from_corner(corner)
    }
}
