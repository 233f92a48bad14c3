use crate::features::{DescriptorExtractor, HarrisDetector};
use crate::geometry::RansacConfig;
use crate::logging::LoggingConfig;
use crate::matching::DescriptorMatcher;
use crate::{Result, StitchError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stitch: StitchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Largest accepted Harris smoothing scale.
pub const MAX_SIGMA: f64 = 64.0;
/// Largest accepted non-maximum suppression radius.
pub const MAX_WINDOW_RADIUS: usize = 64;
pub const MAX_SIFT_ENLARGE: f64 = 16.0;
/// Ceiling for `max_size`; larger inputs are always downscaled to at most this.
pub const MAX_IMAGE_SIDE: u32 = 8192;
pub const MAX_RANSAC_ITERS: usize = 1_000_000;
/// Ceiling for `max_corners`; bounds the `corners1 x corners2` distance matrix.
pub const MAX_CORNERS_LIMIT: usize = 10_000;

/// Tunables of the stitching pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Gaussian smoothing of the Harris structure tensor.
    pub sigma: f64,
    pub harris_threshold: f64,
    pub harris_window_radius: usize,
    /// Descriptor support radius multiplier.
    pub sift_enlarge: f64,
    /// Longer image side after downscaling.
    pub max_size: u32,
    /// Most corners either image may yield before the request is rejected.
    pub max_corners: usize,
    /// Cap on descriptor matches; written as `"unbounded"` when absent.
    #[serde(with = "match_limit")]
    pub max_descriptor_matches: Option<usize>,
    pub ransac_iters: usize,
    pub ransac_threshold: f64,
    /// Fixed seed for the RANSAC sampler; entropy-seeded when unset.
    pub ransac_seed: Option<u64>,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            harris_threshold: 3000.0,
            harris_window_radius: 3,
            sift_enlarge: 1.5,
            max_size: 1600,
            max_corners: 3000,
            max_descriptor_matches: Some(100),
            ransac_iters: 1000,
            ransac_threshold: 1.0,
            ransac_seed: None,
        }
    }
}

impl StitchConfig {
    pub fn harris_detector(&self) -> HarrisDetector {
        HarrisDetector::new(self.sigma, self.harris_threshold, self.harris_window_radius)
    }

    pub fn descriptor_extractor(&self) -> DescriptorExtractor {
        DescriptorExtractor::new(self.sift_enlarge)
    }

    pub fn matcher(&self) -> DescriptorMatcher {
        DescriptorMatcher::new(self.max_descriptor_matches)
    }

    pub fn ransac_config(&self) -> RansacConfig {
        RansacConfig {
            iterations: self.ransac_iters,
            inlier_threshold: self.ransac_threshold,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.sigma.is_finite() && self.sigma > 0.0 && self.sigma <= MAX_SIGMA) {
            errors.push(format!("sigma must be in (0, {MAX_SIGMA}]"));
        }

        if !self.harris_threshold.is_finite() {
            errors.push("harris_threshold must be finite".to_string());
        }

        if self.harris_window_radius > MAX_WINDOW_RADIUS {
            errors.push(format!("harris_window_radius must be at most {MAX_WINDOW_RADIUS}"));
        }

        if !(self.sift_enlarge.is_finite() && self.sift_enlarge > 0.0 && self.sift_enlarge <= MAX_SIFT_ENLARGE) {
            errors.push(format!("sift_enlarge must be in (0, {MAX_SIFT_ENLARGE}]"));
        }

        if self.max_size == 0 || self.max_size > MAX_IMAGE_SIDE {
            errors.push(format!("max_size must be between 1 and {MAX_IMAGE_SIDE}"));
        }

        if self.max_corners == 0 || self.max_corners > MAX_CORNERS_LIMIT {
            errors.push(format!("max_corners must be between 1 and {MAX_CORNERS_LIMIT}"));
        }

        if self.ransac_iters == 0 || self.ransac_iters > MAX_RANSAC_ITERS {
            errors.push(format!("ransac_iters must be between 1 and {MAX_RANSAC_ITERS}"));
        }

        if !(self.ransac_threshold.is_finite() && self.ransac_threshold > 0.0) {
            errors.push("ransac_threshold must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
    pub max_upload_size_mb: usize,
    pub request_timeout_ms: u64,
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size_mb: 25,
            request_timeout_ms: 120_000,
            jpeg_quality: 92,
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            serde_json::from_str(&content).map_err(|e| StitchError::InvalidConfig(vec![e.to_string()]))
        } else {
            toml::from_str(&content).map_err(|e| StitchError::InvalidConfig(vec![e.to_string()]))
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| StitchError::InvalidConfig(vec![e.to_string()]))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| StitchError::InvalidConfig(vec![e.to_string()]))?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = match self.stitch.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.server.port == 0 {
            errors.push("Server port must be valid".to_string());
        }

        if self.server.max_upload_size_mb == 0 {
            errors.push("max_upload_size_mb must be positive".to_string());
        }

        if self.server.request_timeout_ms == 0 {
            errors.push("request_timeout_ms must be positive".to_string());
        }

        if !(1..=100).contains(&self.server.jpeg_quality) {
            errors.push("jpeg_quality must be between 1 and 100".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// Load `config_path`, or defaults when no path is given.
///
/// A file that cannot be read, parsed or validated also yields the defaults,
/// together with the error so the caller can report it once logging is up.
pub fn load_config_or_default(config_path: Option<&Path>) -> (Config, Option<StitchError>) {
    let Some(path) = config_path else {
        return (Config::default(), None);
    };
    let loaded = Config::load_from_file(path)
        .and_then(|config| config.validate().map(|()| config).map_err(StitchError::InvalidConfig));
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

/// Parse a match cap: a non-negative integer, or `unbounded`/`none` for no cap.
pub fn parse_match_limit(value: &str) -> std::result::Result<Option<usize>, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("unbounded") || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| format!("invalid match limit: {value}"))
}

mod match_limit {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Count(u64),
        Keyword(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => serializer.serialize_u64(*n as u64),
            None => serializer.serialize_str("unbounded"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Count(n)) => Ok(Some(n as usize)),
            Some(Repr::Keyword(k)) => super::parse_match_limit(&k).map_err(D::Error::custom),
        }
    }
}
