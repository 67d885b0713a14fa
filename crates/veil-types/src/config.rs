//! Configuration types and structures.

use crate::errors::{Result, VeilError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default key prefix marking fields for encryption.
pub const DEFAULT_PRIVATE_PREFIX: &str = "private_";

/// Default maximum nesting depth accepted by the walker.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What save does when a policy-matching leaf cannot be sealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SealFailure {
    /// Leave the leaf unchanged, log a warning, keep going
    #[default]
    Skip,
    /// Abort the whole save with an error
    Abort,
}

impl FromStr for SealFailure {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(SealFailure::Skip),
            "abort" | "strict" => Ok(SealFailure::Abort),
            _ => Err(VeilError::Config(format!("Invalid seal failure policy: {}", s))),
        }
    }
}

impl fmt::Display for SealFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SealFailure::Skip => write!(f, "skip"),
            SealFailure::Abort => write!(f, "abort"),
        }
    }
}

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    #[default]
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl LogLevel {
    /// The directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(VeilError::Config(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_directive())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Log configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level emitted
    #[serde(default)]
    pub level: LogLevel,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Resolved user settings, merged from defaults, config file, and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Key prefix that marks a field for encryption
    #[serde(default = "default_private_prefix")]
    pub private_prefix: String,

    /// Behaviour when a matching leaf cannot be sealed
    #[serde(default)]
    pub seal_failure: SealFailure,

    /// Maximum document depth accepted by the walker
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Identity files tried when no identity is given explicitly
    #[serde(default)]
    pub identity_files: Vec<PathBuf>,

    /// Recipient files used when no recipient is given explicitly
    #[serde(default)]
    pub recipient_files: Vec<PathBuf>,

    /// Inline recipient public keys
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

fn default_private_prefix() -> String {
    DEFAULT_PRIVATE_PREFIX.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            private_prefix: default_private_prefix(),
            seal_failure: SealFailure::default(),
            max_depth: default_max_depth(),
            identity_files: Vec::new(),
            recipient_files: Vec::new(),
            recipients: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_document() {
        let settings: Settings = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.private_prefix, "private_");
        assert_eq!(settings.seal_failure, SealFailure::Skip);
        assert_eq!(settings.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_settings_from_yaml() {
        let yaml = r#"
private_prefix: secret_
seal_failure: abort
log:
  level: debug
  format: json
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.private_prefix, "secret_");
        assert_eq!(settings.seal_failure, SealFailure::Abort);
        assert_eq!(settings.log.level, LogLevel::Debug);
        assert_eq!(settings.log.format, LogFormat::Json);
    }

    #[test]
    fn test_seal_failure_parsing() {
        assert_eq!("skip".parse::<SealFailure>().unwrap(), SealFailure::Skip);
        assert_eq!("ABORT".parse::<SealFailure>().unwrap(), SealFailure::Abort);
        assert_eq!("strict".parse::<SealFailure>().unwrap(), SealFailure::Abort);
        assert!("sometimes".parse::<SealFailure>().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("none".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
