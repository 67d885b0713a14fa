//! Error types for veil operations.

use thiserror::Error;

/// The main error type for veil operations.
///
/// Variants map onto the hard failures that abort a whole operation.
/// Per-leaf decrypt and seal failures are not errors by default; they are
/// reported through [`crate::FieldRecord`]s instead.
#[derive(Error, Debug)]
pub enum VeilError {
    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document could not be parsed or serialized
    #[error("Document error: {0}")]
    Document(String),

    /// Malformed or unreadable key material
    #[error("Key error: {0}")]
    Key(String),

    /// Save was asked to seal to nobody
    #[error("No recipients available for encryption")]
    NoRecipients,

    /// Decryption was attempted without any identity
    #[error("No identities provided for decryption")]
    NoIdentities,

    /// Encryption backend or sealing failure
    #[error("Encryption error: {0}")]
    Encrypt(String),

    /// Decryption backend failure
    #[error("Decryption error: {0}")]
    Decrypt(String),

    /// Leaf value could not be encoded for sealing
    #[error("Codec error: {0}")]
    Codec(String),

    /// A path was malformed or did not address a node
    #[error("Path error: {0}")]
    Path(String),

    /// The document nests deeper than the walker allows
    #[error("Document exceeds maximum depth of {limit}")]
    DepthExceeded {
        /// The configured depth limit
        limit: usize,
    },

    /// A caller-supplied transformation failed
    #[error("Transformation failed: {0}")]
    Transform(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for veil operations.
pub type Result<T> = std::result::Result<T, VeilError>;

/// Helper macro to bail out with a VeilError
///
/// # Example
///
/// ```ignore
/// if recipients.is_empty() {
///     bail!(Key, "recipients file {} is empty", path.display());
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::VeilError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::VeilError::$variant(format!($fmt, $($arg)*)))
    };
    ($msg:expr) => {
        return Err($crate::VeilError::Other($msg.to_string()))
    };
}
