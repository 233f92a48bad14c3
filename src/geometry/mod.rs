//! Projective geometry: homographies and their robust estimation.

pub mod homography;
pub mod ransac;

pub use homography::*;
pub use ransac::*;
