//! Shared configuration loading.
//!
//! Every CTP binary embeds a `[shared]` block carrying its service identity
//! and log level, and loads its TOML file through [`ConfigLoader`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use ctp_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct SupervisorConfig {
//!     shared: SharedConfig,
//!     cycle_secs: f64,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SupervisorConfig::load(Path::new("ctp.toml"))?;
//!     println!("service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the given path.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Logging verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string for a `tracing_subscriber` env filter.
    pub const fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common fields shared by every CTP application.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "ctp-supervisor-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier; becomes the telemetry site tag.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        SharedConfig {
            log_level: LogLevel::Info,
            service_name: "ctp".into(),
        }
    }
}

impl SharedConfig {
    /// Validate the shared block.
    ///
    /// # Errors
    /// `ConfigError::Validation` when `service_name` is empty or contains
    /// whitespace (it is used as a telemetry tag value).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::Validation("service_name is empty".into()));
        }
        if self.service_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "service_name {:?} contains whitespace",
                self.service_name
            )));
        }
        Ok(())
    }
}

/// Blanket loader for TOML-backed configuration structs.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        shared: SharedConfig,
        answer: u32,
    }

    #[test]
    fn load_round_trip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "answer = 42\n[shared]\nlog_level = \"warn\"\nservice_name = \"ctp-test\""
        )
        .unwrap();

        let cfg = TestConfig::load(f.path()).unwrap();
        assert_eq!(cfg.answer, 42);
        assert_eq!(cfg.shared.log_level, LogLevel::Warn);
        assert_eq!(cfg.shared.service_name, "ctp-test");
        cfg.shared.validate().unwrap();
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = TestConfig::load(Path::new("/nonexistent/ctp.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "answer = ").unwrap();
        let err = TestConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn service_name_validation() {
        let mut shared = SharedConfig::default();
        shared.validate().unwrap();

        shared.service_name = String::new();
        assert!(shared.validate().is_err());

        shared.service_name = "has space".into();
        assert!(shared.validate().is_err());
    }

    #[test]
    fn log_level_filter_strings() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::default().as_filter(), "info");
    }
}
