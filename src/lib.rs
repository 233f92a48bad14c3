//! Two-image panorama stitching.
//!
//! Harris corners are described by 128-dimensional gradient histograms,
//! matched greedily, related by a RANSAC-fitted homography and composited
//! with distance-transform feathering.

pub mod blending;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod geometry;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod server;

pub use config::{Config, StitchConfig};
pub use error::StitchError;
pub use geometry::Homography;
pub use pipeline::{Panorama, StitchReport, Stitcher};

pub type Result<T> = std::result::Result<T, StitchError>;
