//! Logging configuration
//!
//! Per-component log levels, output destinations and file rotation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// How often the JSON log file rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for everything in this crate without a more specific setting
    pub global_level: String,

    /// Level for the stitching pipeline and its stages
    pub pipeline_level: String,

    /// Level for the HTTP server and request tracing
    pub server_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// File name prefix inside `log_directory`
    pub log_file_prefix: String,

    pub rotation: LogRotation,

    /// Include file location in console logs
    pub include_file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "warn".to_string(),
            pipeline_level: "warn".to_string(),
            server_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            log_file_prefix: "stitcher.log".to_string(),
            rotation: LogRotation::Daily,
            include_file_location: false,
        }
    }
}

impl LoggingConfig {
    /// Override every component level, e.g. from a CLI verbosity flag
    pub fn with_level(mut self, level: &str) -> Self {
        self.global_level = level.to_string();
        self.pipeline_level = level.to_string();
        self.server_level = level.to_string();
        self
    }

    /// Apply a CLI `-v` count: 0 keeps the configured levels, then info,
    /// debug and trace.
    pub fn with_verbosity(self, verbose: u8) -> Self {
        match verbose {
            0 => self,
            1 => self.with_level("info"),
            2 => self.with_level("debug"),
            _ => self.with_level("trace"),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("pipeline_level", &self.pipeline_level),
            ("server_level", &self.server_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if self.log_file_prefix.is_empty() {
            return Err("log_file_prefix must not be empty".to_string());
        }

        Ok(())
    }

    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={global},{krate}::pipeline={pipeline},{krate}::server={server},tower_http={server}",
            global = self.global_level,
            pipeline = self.pipeline_level,
            server = self.server_level,
        )
    }
}
