//! Document formats: parsing text into a [`Tree`] and back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use veil_types::{bail, FieldPath, Result, Tree, TreeMap, VeilError};

/// Supported document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// TOML
    #[default]
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl Format {
    /// Detect the format from a file extension, falling back to TOML.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default()
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Toml => "toml",
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }
}

impl FromStr for Format {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(VeilError::Document(format!("Unknown document format: {}", s))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Parse document text.
pub fn parse(text: &str, format: Format) -> Result<Tree> {
    match format {
        Format::Toml => {
            let table: toml::Table = text
                .parse()
                .map_err(|e| VeilError::Document(format!("Failed to parse TOML: {}", e)))?;
            from_toml(toml::Value::Table(table))
        }
        Format::Yaml => serde_yaml::from_str(text)
            .map_err(|e| VeilError::Document(format!("Failed to parse YAML: {}", e))),
        Format::Json => serde_json::from_str(text)
            .map_err(|e| VeilError::Document(format!("Failed to parse JSON: {}", e))),
    }
}

/// Serialize a tree as document text.
///
/// # Errors
///
/// TOML cannot hold a null or a non-map root; both are reported with the
/// offending path.
pub fn serialize(tree: &Tree, format: Format) -> Result<String> {
    match format {
        Format::Toml => {
            let toml::Value::Table(table) = to_toml(tree, &mut FieldPath::root())? else {
                bail!(Document, "TOML documents must have a table at the root");
            };
            toml::to_string_pretty(&table)
                .map_err(|e| VeilError::Document(format!("Failed to serialize TOML: {}", e)))
        }
        Format::Yaml => serde_yaml::to_string(tree)
            .map_err(|e| VeilError::Document(format!("Failed to serialize YAML: {}", e))),
        Format::Json => {
            let mut text = serde_json::to_string_pretty(tree)
                .map_err(|e| VeilError::Document(format!("Failed to serialize JSON: {}", e)))?;
            text.push('\n');
            Ok(text)
        }
    }
}

fn from_toml(value: toml::Value) -> Result<Tree> {
    Ok(match value {
        toml::Value::String(s) => Tree::String(s),
        toml::Value::Integer(i) => Tree::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Tree::Number)
            .ok_or_else(|| VeilError::Document(format!("Unsupported TOML float: {}", f)))?,
        toml::Value::Boolean(b) => Tree::Bool(b),
        toml::Value::Datetime(dt) => Tree::String(dt.to_string()),
        toml::Value::Array(items) => Tree::Array(items.into_iter().map(from_toml).collect::<Result<_>>()?),
        toml::Value::Table(table) => Tree::Object(
            table
                .into_iter()
                .map(|(k, v)| Ok((k, from_toml(v)?)))
                .collect::<Result<TreeMap>>()?,
        ),
    })
}

fn to_toml(value: &Tree, path: &mut FieldPath) -> Result<toml::Value> {
    Ok(match value {
        Tree::Null => {
            bail!(Document, "TOML has no null value (at '{}')", path)
        }
        Tree::Bool(b) => toml::Value::Boolean(*b),
        Tree::Number(n) => {
            if let Some(i) = n.as_i64() {
                toml::Value::Integer(i)
            } else if n.is_u64() {
                bail!(Document, "Integer {} at '{}' does not fit in TOML", n, path);
            } else {
                toml::Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Tree::String(s) => toml::Value::String(s.clone()),
        Tree::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(index);
                out.push(to_toml(item, path)?);
                path.pop();
            }
            toml::Value::Array(out)
        }
        Tree::Object(map) => {
            let mut table = toml::Table::new();
            for (key, item) in map {
                path.push(key.as_str());
                table.insert(key.clone(), to_toml(item, path)?);
                path.pop();
            }
            toml::Value::Table(table)
        }
    })
}
