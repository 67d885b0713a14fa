//! Field policies: which leaves save encrypts.

use regex::Regex;
use veil_types::{FieldPath, Result, Segment, Tree, VeilError, DEFAULT_PRIVATE_PREFIX};

/// Decides whether a node is an encryption target on save.
///
/// Called with the parent path, the node's own key, and its value. The
/// root is never offered to a policy.
pub trait FieldPolicy: Send + Sync {
    /// True if the node should be sealed.
    fn should_encrypt(&self, parent: &FieldPath, key: &Segment, value: &Tree) -> bool;
}

impl<F> FieldPolicy for F
where
    F: Fn(&FieldPath, &Segment, &Tree) -> bool + Send + Sync,
{
    fn should_encrypt(&self, parent: &FieldPath, key: &Segment, value: &Tree) -> bool {
        self(parent, key, value)
    }
}

/// Matches map keys starting with a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixPolicy {
    prefix: String,
}

impl PrefixPolicy {
    /// Policy matching keys that start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVATE_PREFIX)
    }
}

impl FieldPolicy for PrefixPolicy {
    fn should_encrypt(&self, _parent: &FieldPath, key: &Segment, _value: &Tree) -> bool {
        key.as_key().map_or(false, |k| k.starts_with(&self.prefix))
    }
}

/// Matches map keys against a regular expression.
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    pattern: Regex,
}

impl PatternPolicy {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// [`VeilError::Config`] if the expression is invalid.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| VeilError::Config(format!("Invalid key pattern '{}': {}", pattern, e)))?;
        Ok(Self { pattern })
    }

    /// The source expression.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl FieldPolicy for PatternPolicy {
    fn should_encrypt(&self, _parent: &FieldPath, key: &Segment, _value: &Tree) -> bool {
        key.as_key().map_or(false, |k| self.pattern.is_match(k))
    }
}
