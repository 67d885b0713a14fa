//! Recipient and identity handles, and loading them from key sources.

use age::x25519;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use veil_types::{bail, Result, VeilError};

/// Label used in place of a key when a passphrase recipient was used.
pub const PASSPHRASE_LABEL: &str = "passphrase";

/// An encryption target.
pub enum Recipient {
    /// An age X25519 public key (`age1...`)
    PublicKey(x25519::Recipient),
    /// A passphrase, sealed with age's scrypt recipient
    Passphrase(SecretString),
}

impl Recipient {
    /// Parse an `age1...` public key.
    pub fn parse(key: &str) -> Result<Self> {
        x25519::Recipient::from_str(key.trim())
            .map(Recipient::PublicKey)
            .map_err(|e| VeilError::Key(format!("Failed to parse recipient '{}': {}", key.trim(), e)))
    }

    /// A passphrase recipient.
    pub fn passphrase(passphrase: SecretString) -> Self {
        Recipient::Passphrase(passphrase)
    }

    /// Human-readable label: the public key, or `"passphrase"`.
    pub fn label(&self) -> String {
        match self {
            Recipient::PublicKey(key) => key.to_string(),
            Recipient::Passphrase(_) => PASSPHRASE_LABEL.to_string(),
        }
    }

    /// True for passphrase recipients.
    pub fn is_passphrase(&self) -> bool {
        matches!(self, Recipient::Passphrase(_))
    }
}

impl FromStr for Recipient {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Clone for Recipient {
    fn clone(&self) -> Self {
        match self {
            Recipient::PublicKey(key) => Recipient::PublicKey(key.clone()),
            Recipient::Passphrase(passphrase) => Recipient::Passphrase(duplicate(passphrase)),
        }
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::PublicKey(key) => write!(f, "Recipient::PublicKey({})", key),
            Recipient::Passphrase(_) => write!(f, "Recipient::Passphrase(..)"),
        }
    }
}

/// A decryption capability.
pub enum Identity {
    /// An age X25519 secret key (`AGE-SECRET-KEY-1...`)
    Key(x25519::Identity),
    /// A passphrase for scrypt-sealed ciphertext
    Passphrase(SecretString),
}

impl Identity {
    /// Parse an `AGE-SECRET-KEY-1...` secret key.
    pub fn parse(key: &str) -> Result<Self> {
        x25519::Identity::from_str(key.trim())
            .map(Identity::Key)
            // never echo secret key material into the error
            .map_err(|e| VeilError::Key(format!("Failed to parse identity: {}", e)))
    }

    /// A passphrase identity.
    pub fn passphrase(passphrase: SecretString) -> Self {
        Identity::Passphrase(passphrase)
    }

    /// The matching recipient for this identity.
    pub fn to_recipient(&self) -> Recipient {
        match self {
            Identity::Key(key) => Recipient::PublicKey(key.to_public()),
            Identity::Passphrase(passphrase) => Recipient::Passphrase(duplicate(passphrase)),
        }
    }

    pub(crate) fn to_age(&self) -> Box<dyn age::Identity> {
        match self {
            Identity::Key(key) => Box::new(key.clone()),
            Identity::Passphrase(passphrase) => {
                Box::new(age::scrypt::Identity::new(duplicate(passphrase)))
            }
        }
    }
}

impl FromStr for Identity {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        match self {
            Identity::Key(key) => Identity::Key(key.clone()),
            Identity::Passphrase(passphrase) => Identity::Passphrase(duplicate(passphrase)),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Key(key) => write!(f, "Identity::Key({})", key.to_public()),
            Identity::Passphrase(_) => write!(f, "Identity::Passphrase(..)"),
        }
    }
}

/// Generate a fresh X25519 identity.
pub fn generate_identity() -> Identity {
    Identity::Key(x25519::Identity::generate())
}

/// Labels of the given recipients, in order.
pub fn recipient_labels(recipients: &[Recipient]) -> Vec<String> {
    recipients.iter().map(Recipient::label).collect()
}

/// True if any recipient is a passphrase recipient.
pub fn has_passphrase(recipients: &[Recipient]) -> bool {
    recipients.iter().any(Recipient::is_passphrase)
}

/// Where a passphrase comes from.
pub enum PassphraseSource {
    /// An already-obtained passphrase (e.g. from an interactive prompt)
    Value(SecretString),
    /// First line of a file
    File(PathBuf),
    /// An environment variable
    Env(String),
}

impl PassphraseSource {
    /// Obtain the passphrase.
    pub fn resolve(&self) -> Result<SecretString> {
        match self {
            PassphraseSource::Value(passphrase) => Ok(duplicate(passphrase)),
            PassphraseSource::File(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    VeilError::Key(format!("Failed to read passphrase file {}: {}", path.display(), e))
                })?;
                let first = content.lines().next().map(str::trim).unwrap_or_default();
                if first.is_empty() {
                    bail!(Key, "Passphrase file {} is empty", path.display());
                }
                Ok(SecretString::from(first.to_string()))
            }
            PassphraseSource::Env(var) => match std::env::var(var) {
                Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
                _ => Err(VeilError::Key(format!(
                    "Passphrase environment variable {} is empty or unset",
                    var
                ))),
            },
        }
    }
}

impl Clone for PassphraseSource {
    fn clone(&self) -> Self {
        match self {
            PassphraseSource::Value(passphrase) => PassphraseSource::Value(duplicate(passphrase)),
            PassphraseSource::File(path) => PassphraseSource::File(path.clone()),
            PassphraseSource::Env(var) => PassphraseSource::Env(var.clone()),
        }
    }
}

impl fmt::Debug for PassphraseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassphraseSource::Value(_) => write!(f, "PassphraseSource::Value(..)"),
            PassphraseSource::File(path) => write!(f, "PassphraseSource::File({})", path.display()),
            PassphraseSource::Env(var) => write!(f, "PassphraseSource::Env({})", var),
        }
    }
}

/// Sources of identities and recipients.
#[derive(Debug, Clone, Default)]
pub struct KeySources {
    /// Files holding `AGE-SECRET-KEY-1...` lines
    pub identity_files: Vec<PathBuf>,
    /// Inline identities; each entry may hold several lines
    pub identities: Vec<String>,
    /// Files holding `age1...` lines
    pub recipient_files: Vec<PathBuf>,
    /// Inline recipient public keys
    pub recipients: Vec<String>,
    /// Passphrase used both as identity and as recipient
    pub passphrase: Option<PassphraseSource>,
}

impl KeySources {
    /// Create empty key sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity file.
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_files.push(path.into());
        self
    }

    /// Add an inline identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identities.push(identity.into());
        self
    }

    /// Add a recipients file.
    pub fn with_recipient_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.recipient_files.push(path.into());
        self
    }

    /// Add an inline recipient.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    /// Set the passphrase source.
    pub fn with_passphrase(mut self, source: PassphraseSource) -> Self {
        self.passphrase = Some(source);
        self
    }

    /// Load all identities. An empty result is not an error.
    pub fn load_identities(&self) -> Result<Vec<Identity>> {
        let mut identities = Vec::new();

        for path in &self.identity_files {
            let content = read_key_file(path, "identity")?;
            for line in key_lines(&content) {
                let identity = Identity::parse(line).map_err(|e| {
                    VeilError::Key(format!("Failed to load identities from {}: {}", path.display(), e))
                })?;
                identities.push(identity);
            }
        }

        for data in &self.identities {
            for line in key_lines(data) {
                identities.push(Identity::parse(line)?);
            }
        }

        if let Some(source) = &self.passphrase {
            identities.push(Identity::Passphrase(source.resolve()?));
        }

        debug!(count = identities.len(), "loaded identities");
        Ok(identities)
    }

    /// Load all recipients. An empty result is not an error here; save rejects it.
    ///
    /// A passphrase cannot be combined with public-key recipients.
    pub fn load_recipients(&self) -> Result<Vec<Recipient>> {
        let mut recipients = Vec::new();

        for path in &self.recipient_files {
            let content = read_key_file(path, "recipients")?;
            for line in key_lines(&content) {
                let recipient = Recipient::parse(line).map_err(|e| {
                    VeilError::Key(format!("Failed to load recipients from {}: {}", path.display(), e))
                })?;
                recipients.push(recipient);
            }
        }

        for key in &self.recipients {
            recipients.push(Recipient::parse(key)?);
        }

        if let Some(source) = &self.passphrase {
            if !recipients.is_empty() {
                bail!(Key, "A passphrase cannot be combined with public-key recipients");
            }
            recipients.push(Recipient::Passphrase(source.resolve()?));
        }

        debug!(count = recipients.len(), "loaded recipients");
        Ok(recipients)
    }
}

fn read_key_file(path: &Path, kind: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        VeilError::Key(format!("Failed to read {} file {}: {}", kind, path.display(), e))
    })
}

/// Non-empty, non-comment lines of a key file.
fn key_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

pub(crate) fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
