//! # Veil Types
//!
//! Core types shared across all veil crates.
//!
//! This crate provides the vocabulary the rest of the workspace speaks:
//!
//! - The document [`Tree`] (a dynamically typed map/sequence/scalar value)
//! - Path addressing with [`Segment`] and [`FieldPath`]
//! - [`FieldRecord`], the per-leaf metadata produced by load and save passes
//! - Configuration data types
//! - Error types and result aliases
//!
//! ## Example
//!
//! ```
//! use veil_types::{FieldPath, Segment};
//!
//! let path = FieldPath::parse("servers[0].private_token").unwrap();
//! assert_eq!(path.len(), 3);
//! assert_eq!(path.last(), Some(&Segment::Key("private_token".to_string())));
//! assert_eq!(path.to_string(), "servers[0].private_token");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod path;
pub mod record;

pub use config::{
    LogConfig, LogFormat, LogLevel, SealFailure, Settings, DEFAULT_MAX_DEPTH,
    DEFAULT_PRIVATE_PREFIX,
};
pub use errors::{Result, VeilError};
pub use path::{FieldPath, Segment};
pub use record::FieldRecord;

/// The document tree: maps, sequences, and scalar leaves.
///
/// Maps are ordered by key, numbers keep their integer/float distinction.
pub type Tree = serde_json::Value;

/// The ordered map type used for map nodes.
pub type TreeMap = serde_json::Map<String, Tree>;

/// Check whether a value is a scalar (string, number, boolean, or null).
pub fn is_scalar(value: &Tree) -> bool {
    !matches!(value, Tree::Object(_) | Tree::Array(_))
}
