use thiserror::Error;

/// Failure kinds surfaced by the stitching core and its image services.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("not enough Harris corners detected (first image: {first}, second image: {second}, need at least 4)")]
    InsufficientFeatures { first: usize, second: usize },

    #[error("too many Harris corners detected (first image: {first}, second image: {second}, limit {limit})")]
    TooManyFeatures { first: usize, second: usize, limit: usize },

    #[error("not enough correspondences to fit a homography ({found} given, need at least 4)")]
    InsufficientCorrespondences { found: usize },

    #[error("match ({first}, {second}) refers to a keypoint that does not exist")]
    MatchOutOfRange { first: usize, second: usize },

    #[error("homography estimation failed")]
    HomographyEstimationFailed,

    #[error("degenerate homography")]
    DegenerateHomography,

    #[error("panorama canvas of {width}x{height} exceeds the size limit")]
    CanvasTooLarge { width: u64, height: u64 },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("could not encode panorama: {0}")]
    EncodingFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StitchError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StitchError::InsufficientFeatures { .. } => "InsufficientFeatures",
            StitchError::TooManyFeatures { .. } => "TooManyFeatures",
            StitchError::InsufficientCorrespondences { .. } => "InsufficientCorrespondences",
            StitchError::MatchOutOfRange { .. } => "MatchOutOfRange",
            StitchError::HomographyEstimationFailed => "HomographyEstimationFailed",
            StitchError::DegenerateHomography => "DegenerateHomography",
            StitchError::CanvasTooLarge { .. } => "CanvasTooLarge",
            StitchError::InvalidImage(_) => "InvalidImage",
            StitchError::InvalidConfig(_) => "InvalidConfig",
            StitchError::Decode(_) => "DecodeFailed",
            StitchError::EncodingFailed(_) => "EncodingFailed",
            StitchError::Io(_) => "Io",
        }
    }

    /// Whether the failure is caused by the caller's input rather than by the estimator.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StitchError::InsufficientFeatures { .. }
                | StitchError::TooManyFeatures { .. }
                | StitchError::InsufficientCorrespondences { .. }
                | StitchError::CanvasTooLarge { .. }
                | StitchError::InvalidImage(_)
                | StitchError::InvalidConfig(_)
                | StitchError::Decode(_)
        )
    }
}
