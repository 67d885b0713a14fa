//! # Veil Core
//!
//! Selective encryption of structured configuration documents.
//!
//! This crate provides:
//!
//! - **Walker**: depth-first traversal with value substitution ([`walk`])
//! - **Accessors**: point lookups and edits by path ([`access`])
//! - **Policies**: which fields get encrypted ([`policy`])
//! - **Engine**: the load/save/transform passes ([`Engine`])
//! - **Documents**: TOML, YAML, and JSON codecs ([`document`])
//! - **Rendering**: env/flat output and private/public filtering ([`render`])
//! - **Configuration**: layered settings ([`config`])
//! - **Logging**: subscriber setup ([`log`])
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use veil_core::Engine;
//! use veil_crypto::generate_identity;
//!
//! let identity = generate_identity();
//! let engine = Engine::default();
//!
//! let tree = json!({"username": "alice", "private_password": "secret123"});
//! let saved = engine.save(&tree, &[identity.to_recipient()]).unwrap();
//! assert_eq!(saved.tree["username"], "alice");
//! assert_eq!(saved.fields.len(), 1);
//!
//! let loaded = engine.load(&saved.tree, &[identity]).unwrap();
//! assert_eq!(loaded.tree, tree);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod codec;
pub mod config;
pub mod document;
pub mod engine;
pub mod log;
pub mod policy;
pub mod render;
pub mod walk;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use access::{get, get_mut, set};
pub use config::Config;
pub use document::Format;
pub use engine::{Engine, EngineOptions, Loaded, Saved};
pub use policy::{FieldPolicy, PatternPolicy, PrefixPolicy};
pub use render::OutputFormat;
pub use veil_types::{FieldPath, FieldRecord, Result, Segment, Tree, VeilError};
pub use walk::{find_fields, walk, FieldInfo, Flow, Visit, Visitor, Walker};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "veil";
