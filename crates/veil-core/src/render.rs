//! Output rendering for decrypted trees.

use crate::document::{self, Format};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use veil_types::{FieldPath, FieldRecord, Result, Segment, Tree, TreeMap, VeilError};

/// Formats the `read` command can print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// TOML document
    #[default]
    Toml,
    /// Pretty JSON
    Json,
    /// YAML document
    Yaml,
    /// `SECTION_KEY=value` lines
    Env,
    /// `section.key=value` lines
    Flat,
}

impl FromStr for OutputFormat {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(OutputFormat::Toml),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "env" => Ok(OutputFormat::Env),
            "flat" => Ok(OutputFormat::Flat),
            _ => Err(VeilError::Other(format!(
                "Unknown output format '{}' (expected toml, json, yaml, env, or flat)",
                s
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Toml => "toml",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Env => "env",
            OutputFormat::Flat => "flat",
        };
        write!(f, "{}", name)
    }
}

/// Render a tree in the requested format.
pub fn render(tree: &Tree, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Toml => document::serialize(tree, Format::Toml),
        OutputFormat::Yaml => document::serialize(tree, Format::Yaml),
        OutputFormat::Json => document::serialize(tree, Format::Json),
        OutputFormat::Env => Ok(lines(tree, env_name)),
        OutputFormat::Flat => Ok(lines(tree, |path| path.to_string())),
    }
}

fn lines(tree: &Tree, name: impl Fn(&FieldPath) -> String) -> String {
    let mut out = String::new();
    let mut path = FieldPath::root();
    collect_leaves(tree, &mut path, &mut |path, value| {
        out.push_str(&name(path));
        out.push('=');
        out.push_str(&scalar_text(value));
        out.push('\n');
    });
    out
}

fn collect_leaves(node: &Tree, path: &mut FieldPath, emit: &mut dyn FnMut(&FieldPath, &Tree)) {
    match node {
        Tree::Object(map) => {
            for (key, child) in map {
                path.push(key.as_str());
                collect_leaves(child, path, emit);
                path.pop();
            }
        }
        Tree::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index);
                collect_leaves(child, path, emit);
                path.pop();
            }
        }
        leaf => emit(path, leaf),
    }
}

fn env_name(path: &FieldPath) -> String {
    path.segments()
        .iter()
        .map(|segment| match segment {
            Segment::Key(key) => key.to_uppercase(),
            Segment::Index(index) => index.to_string(),
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Text of a scalar as printed in `env` and `flat` output.
pub fn scalar_text(value: &Tree) -> String {
    match value {
        Tree::String(s) => s.clone(),
        Tree::Null => String::new(),
        other => other.to_string(),
    }
}

/// Keep only the fields that were encrypted, plus the containers leading to them.
///
/// Sequences are compacted, so indices in the result may differ.
pub fn private_only(tree: &Tree, fields: &[FieldRecord]) -> Tree {
    let encrypted = encrypted_paths(fields);
    let mut path = FieldPath::root();
    keep_private(tree, &mut path, &encrypted).unwrap_or_else(|| Tree::Object(TreeMap::new()))
}

/// Drop every field that was encrypted.
pub fn public_only(tree: &Tree, fields: &[FieldRecord]) -> Tree {
    let encrypted = encrypted_paths(fields);
    let mut path = FieldPath::root();
    drop_private(tree, &mut path, &encrypted)
}

fn encrypted_paths(fields: &[FieldRecord]) -> HashSet<FieldPath> {
    fields
        .iter()
        .filter(|f| f.was_encrypted)
        .map(|f| f.path.clone())
        .collect()
}

fn keep_private(node: &Tree, path: &mut FieldPath, encrypted: &HashSet<FieldPath>) -> Option<Tree> {
    if !path.is_empty() && encrypted.contains(&*path) {
        return Some(node.clone());
    }
    match node {
        Tree::Object(map) => {
            let mut kept = TreeMap::new();
            for (key, child) in map {
                path.push(key.as_str());
                if let Some(child) = keep_private(child, path, encrypted) {
                    kept.insert(key.clone(), child);
                }
                path.pop();
            }
            (!kept.is_empty()).then_some(Tree::Object(kept))
        }
        Tree::Array(items) => {
            let mut kept = Vec::new();
            for (index, child) in items.iter().enumerate() {
                path.push(index);
                kept.extend(keep_private(child, path, encrypted));
                path.pop();
            }
            (!kept.is_empty()).then_some(Tree::Array(kept))
        }
        _ => None,
    }
}

fn drop_private(node: &Tree, path: &mut FieldPath, encrypted: &HashSet<FieldPath>) -> Tree {
    match node {
        Tree::Object(map) => {
            let mut kept = TreeMap::new();
            for (key, child) in map {
                path.push(key.as_str());
                if !encrypted.contains(&*path) {
                    kept.insert(key.clone(), drop_private(child, path, encrypted));
                }
                path.pop();
            }
            Tree::Object(kept)
        }
        Tree::Array(items) => {
            let mut kept = Vec::new();
            for (index, child) in items.iter().enumerate() {
                path.push(index);
                if !encrypted.contains(&*path) {
                    kept.push(drop_private(child, path, encrypted));
                }
                path.pop();
            }
            Tree::Array(kept)
        }
        leaf => leaf.clone(),
    }
}
