//! Layered configuration for veil.
//!
//! Values are resolved in this priority order:
//! 1. Environment variables (`VEIL_*`)
//! 2. Values set programmatically (command-line flags)
//! 3. Values loaded from the config file
//! 4. Default values
//!
//! ## Example
//!
//! ```no_run
//! use veil_core::config::Config;
//!
//! let mut config = Config::load_default()?.with_env()?;
//! config.set("seal_failure", "abort")?;
//!
//! let settings = config.settings()?;
//! assert_eq!(settings.seal_failure.to_string(), "abort");
//! # Ok::<(), veil_types::VeilError>(())
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use veil_types::{bail, LogLevel, Result, SealFailure, Settings, VeilError};

/// Environment variable overriding `private_prefix`.
pub const ENV_PRIVATE_PREFIX: &str = "VEIL_PRIVATE_PREFIX";
/// Environment variable overriding `seal_failure`.
pub const ENV_SEAL_FAILURE: &str = "VEIL_SEAL_FAILURE";
/// Environment variable overriding `max_depth`.
pub const ENV_MAX_DEPTH: &str = "VEIL_MAX_DEPTH";
/// Environment variable overriding `log.level`.
pub const ENV_LOG_LEVEL: &str = "VEIL_LOG_LEVEL";

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
    /// Values from environment variables
    Environment = 3,
}

impl ConfigLayer {
    const LOWEST_FIRST: [ConfigLayer; 4] = [
        ConfigLayer::Default,
        ConfigLayer::Loaded,
        ConfigLayer::Set,
        ConfigLayer::Environment,
    ];
}

/// Multi-layer configuration.
#[derive(Clone, Debug)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut layers = HashMap::new();
        // Settings always serializes; an empty layer is the fallback.
        let defaults = serde_json::to_value(Settings::default()).unwrap_or(Value::Object(Default::default()));
        layers.insert(ConfigLayer::Default, defaults);
        Self { layers, file_path: None }
    }
}

impl Config {
    /// Configuration holding only the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file.
    ///
    /// A missing file is not an error; the loaded layer is simply empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();
        config.file_path = Some(path.to_path_buf());

        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                VeilError::Config(format!("Failed to read config file {}: {}", path.display(), e))
            })?;

            let value: Value = if content.trim().is_empty() {
                Value::Null
            } else {
                serde_yaml::from_str(&content).map_err(|e| {
                    VeilError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
                })?
            };

            match value {
                Value::Null => {}
                Value::Object(_) => {
                    config.layers.insert(ConfigLayer::Loaded, value);
                }
                _ => {
                    bail!(Config, "Config file {} must contain a mapping", path.display())
                }
            }
            debug!(path = %path.display(), "Loaded config file");
        }

        Ok(config)
    }

    /// Load from [`Config::default_path`], or defaults if there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// `<config dir>/veil/config.yml`, e.g. `~/.config/veil/config.yml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("veil").join("config.yml"))
    }

    /// The file this configuration was loaded from, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Apply `VEIL_*` overrides from the process environment.
    pub fn with_env(mut self) -> Result<Self> {
        self.apply_env(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    /// Apply `VEIL_*` overrides using `lookup` to read variables.
    ///
    /// Values are validated here so a bad override names its variable.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = serde_json::Map::new();

        if let Some(prefix) = lookup(ENV_PRIVATE_PREFIX) {
            env.insert("private_prefix".to_string(), Value::String(prefix));
        }

        if let Some(raw) = lookup(ENV_SEAL_FAILURE) {
            let policy: SealFailure = raw
                .parse()
                .map_err(|e| VeilError::Config(format!("{}: {}", ENV_SEAL_FAILURE, e)))?;
            env.insert("seal_failure".to_string(), serde_json::to_value(policy)?);
        }

        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            let depth: usize = raw.trim().parse().map_err(|_| {
                VeilError::Config(format!("{}: expected a positive integer, got '{}'", ENV_MAX_DEPTH, raw))
            })?;
            env.insert("max_depth".to_string(), Value::from(depth));
        }

        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            let level: LogLevel = raw
                .parse()
                .map_err(|e| VeilError::Config(format!("{}: {}", ENV_LOG_LEVEL, e)))?;
            env.insert("log".to_string(), serde_json::json!({ "level": level }));
        }

        if !env.is_empty() {
            self.layers.insert(ConfigLayer::Environment, Value::Object(env));
        }
        Ok(())
    }

    /// Get a configuration value by dotted key, respecting layer priority.
    ///
    /// Returns None if the key doesn't exist in any layer.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        ConfigLayer::LOWEST_FIRST
            .iter()
            .rev()
            .filter_map(|layer| self.layers.get(layer))
            .filter_map(|data| value_at_path(data, key))
            .find_map(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| VeilError::Config(format!("Failed to serialize value for '{}': {}", key, e)))?;

        let set_layer = self
            .layers
            .entry(ConfigLayer::Set)
            .or_insert_with(|| Value::Object(Default::default()));

        set_value_at_path(set_layer, key, value)
    }

    /// All layers merged, highest priority winning.
    pub fn merged(&self) -> Value {
        ConfigLayer::LOWEST_FIRST
            .iter()
            .filter_map(|layer| self.layers.get(layer))
            .fold(Value::Object(Default::default()), |merged, layer| {
                deep_merge(merged, layer.clone())
            })
    }

    /// Resolve the merged layers into typed [`Settings`].
    pub fn settings(&self) -> Result<Settings> {
        serde_json::from_value(self.merged())
            .map_err(|e| VeilError::Config(format!("Invalid configuration: {}", e)))
    }
}

/// Deep merge two values. Maps merge recursively; anything else is replaced.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay_val) => overlay_val,
    }
}

fn value_at_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, part| current.get(part))
}

fn set_value_at_path(data: &mut Value, path: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        bail!(Config, "Empty config key");
    };
    if parts.iter().any(|part| part.is_empty()) {
        bail!(Config, "Malformed config key '{}'", path);
    }

    // Intermediate non-maps are replaced by maps.
    let mut current = data;
    for part in parents {
        current = as_map(current)?
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    as_map(current)?.insert(last.to_string(), value);
    Ok(())
}

fn as_map(value: &mut Value) -> Result<&mut serde_json::Map<String, Value>> {
    if !value.is_object() {
        *value = Value::Object(Default::default());
    }
    value
        .as_object_mut()
        .ok_or_else(|| VeilError::Config("Config layer is not a mapping".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use veil_types::{LogFormat, DEFAULT_MAX_DEPTH};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_layers() {
        let mut config = Config::new();
        config.layers.insert(
            ConfigLayer::Loaded,
            serde_json::json!({"private_prefix": "loaded_"}),
        );

        let value: String = config.get("private_prefix").unwrap();
        assert_eq!(value, "loaded_");

        config.set("private_prefix", "set_").unwrap();
        assert_eq!(config.get::<String>("private_prefix").unwrap(), "set_");

        config
            .apply_env(|name| (name == ENV_PRIVATE_PREFIX).then(|| "env_".to_string()))
            .unwrap();
        assert_eq!(config.settings().unwrap().private_prefix, "env_");
    }

    #[test]
    fn test_defaults() {
        let settings = Config::new().settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(Config::new().get::<usize>("max_depth"), Some(DEFAULT_MAX_DEPTH));
        assert_eq!(Config::new().get::<String>("log.level").as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "private_prefix: secret_\nlog:\n  format: json\nrecipients:\n  - age1example").unwrap();

        let config = Config::load(file.path()).unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.private_prefix, "secret_");
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.log.level, LogLevel::Warn);
        assert_eq!(settings.recipients, vec!["age1example"]);
        assert_eq!(config.file_path(), Some(file.path()));
    }

    #[test]
    fn test_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::load(dir.path().join("absent.yml")).unwrap();
        assert_eq!(missing.settings().unwrap(), Settings::default());

        let empty = NamedTempFile::new().unwrap();
        assert_eq!(Config::load(empty.path()).unwrap().settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_bad_files() {
        let mut scalar = NamedTempFile::new().unwrap();
        writeln!(scalar, "just a string").unwrap();
        assert!(matches!(Config::load(scalar.path()), Err(VeilError::Config(_))));

        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "key: [unclosed").unwrap();
        assert!(matches!(Config::load(broken.path()), Err(VeilError::Config(_))));

        let mut wrong_type = NamedTempFile::new().unwrap();
        writeln!(wrong_type, "max_depth: deep").unwrap();
        let config = Config::load(wrong_type.path()).unwrap();
        assert!(matches!(config.settings(), Err(VeilError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::new();
        config
            .apply_env(|name| match name {
                ENV_SEAL_FAILURE => Some("strict".to_string()),
                ENV_MAX_DEPTH => Some("12".to_string()),
                ENV_LOG_LEVEL => Some("debug".to_string()),
                _ => None,
            })
            .unwrap();

        let settings = config.settings().unwrap();
        assert_eq!(settings.seal_failure, SealFailure::Abort);
        assert_eq!(settings.max_depth, 12);
        assert_eq!(settings.log.level, LogLevel::Debug);
        assert_eq!(settings.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = Config::new()
            .apply_env(|name| (name == ENV_MAX_DEPTH).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_DEPTH));

        assert!(Config::new()
            .apply_env(|name| (name == ENV_SEAL_FAILURE).then(|| "maybe".to_string()))
            .is_err());
    }

    #[test]
    fn test_no_env_leaves_layers_alone() {
        let mut config = Config::new();
        config.apply_env(no_env).unwrap();
        assert!(!config.layers.contains_key(&ConfigLayer::Environment));
    }

    #[test]
    fn test_deep_merge() {
        let base = serde_json::json!({"log": {"level": "warn", "format": "pretty"}, "a": 1});
        let overlay = serde_json::json!({"log": {"level": "debug"}, "b": 2});
        assert_eq!(
            deep_merge(base, overlay),
            serde_json::json!({"log": {"level": "debug", "format": "pretty"}, "a": 1, "b": 2})
        );
    }

    #[test]
    fn test_set_nested() {
        let mut config = Config::new();
        config.set("log.level", "trace").unwrap();
        assert_eq!(config.settings().unwrap().log.level, LogLevel::Trace);
        assert!(config.set("log..level", "x").is_err());
    }
}
