//! Selective transform engine.
//!
//! [`Engine::load`] opens every armored leaf it can and leaves the rest as
//! they are. [`Engine::save`] seals every leaf the field policy selects,
//! skipping leaves that are already armored so that saving twice never
//! double-encrypts. [`Engine::transform`] composes the two around a caller
//! supplied edit.
//!
//! Both passes return a fresh tree plus one [`FieldRecord`] per touched leaf.

use crate::codec;
use crate::document::{self, Format};
use crate::policy::{FieldPolicy, PrefixPolicy};
use crate::walk::{FieldInfo, Visit, Visitor, Walker};
use tracing::{debug, warn};
use veil_crypto::{
    has_passphrase, is_armored, recipient_labels, AgeBackend, CryptoBackend, Identity, KeySources,
    Recipient,
};
use veil_types::{
    bail, FieldPath, FieldRecord, Result, SealFailure, Segment, Settings, Tree, VeilError,
    DEFAULT_MAX_DEPTH,
};

/// Tunables for an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// What save does when a selected leaf cannot be sealed
    pub seal_failure: SealFailure,
    /// Deepest nesting accepted by the walker
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            seal_failure: SealFailure::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of a load pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// The tree with every openable leaf decrypted
    pub tree: Tree,
    /// One record per armored leaf found, opened or not
    pub fields: Vec<FieldRecord>,
}

impl Loaded {
    /// Records for leaves that could not be opened.
    pub fn still_encrypted(&self) -> impl Iterator<Item = &FieldRecord> {
        self.fields.iter().filter(|f| f.still_encrypted())
    }
}

/// Result of a save pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved {
    /// The tree with every selected leaf sealed
    pub tree: Tree,
    /// One record per selected leaf that is sealed in `tree`
    pub fields: Vec<FieldRecord>,
}

/// Drives the walker with a crypto backend and a field policy.
pub struct Engine {
    backend: Box<dyn CryptoBackend>,
    policy: Box<dyn FieldPolicy>,
    options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(AgeBackend, PrefixPolicy::default(), EngineOptions::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("options", &self.options).finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine from its parts.
    pub fn new(
        backend: impl CryptoBackend + 'static,
        policy: impl FieldPolicy + 'static,
        options: EngineOptions,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            policy: Box::new(policy),
            options,
        }
    }

    /// Age backend, prefix policy, and options taken from resolved settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            AgeBackend,
            PrefixPolicy::new(settings.private_prefix.clone()),
            EngineOptions {
                seal_failure: settings.seal_failure,
                max_depth: settings.max_depth,
            },
        )
    }

    /// Replace the field policy.
    pub fn with_policy(mut self, policy: impl FieldPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the crypto backend.
    pub fn with_backend(mut self, backend: impl CryptoBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// The active options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Decrypt every armored leaf that one of `identities` can open.
    ///
    /// Leaves that cannot be opened stay armored and are still recorded,
    /// with `decrypted` false. An empty identity list is allowed; every
    /// armored leaf is then reported as still encrypted.
    ///
    /// # Errors
    ///
    /// Only structural failures, such as exceeding the depth limit.
    pub fn load(&self, tree: &Tree, identities: &[Identity]) -> Result<Loaded> {
        let mut pass = LoadPass {
            backend: self.backend.as_ref(),
            identities,
            fields: Vec::new(),
        };
        let tree = self.walker().walk(tree, &mut pass)?;
        debug!(fields = pass.fields.len(), "Load pass complete");
        Ok(Loaded { tree, fields: pass.fields })
    }

    /// Seal every leaf the policy selects to `recipients`.
    ///
    /// # Errors
    ///
    /// [`VeilError::NoRecipients`] for an empty recipient list, and
    /// [`VeilError::Key`] for a passphrase mixed with other recipients.
    /// With [`SealFailure::Abort`], the first leaf that fails to seal.
    pub fn save(&self, tree: &Tree, recipients: &[Recipient]) -> Result<Saved> {
        if recipients.is_empty() {
            return Err(VeilError::NoRecipients);
        }
        if has_passphrase(recipients) && recipients.len() > 1 {
            bail!(Key, "A passphrase cannot be combined with other recipients");
        }

        let mut pass = SavePass {
            backend: self.backend.as_ref(),
            policy: self.policy.as_ref(),
            recipients,
            labels: recipient_labels(recipients),
            used_passphrase: has_passphrase(recipients),
            seal_failure: self.options.seal_failure,
            fields: Vec::new(),
        };
        let tree = self.walker().walk(tree, &mut pass)?;
        debug!(fields = pass.fields.len(), "Save pass complete");
        Ok(Saved { tree, fields: pass.fields })
    }

    /// Fields a save pass would select, in walk order, without sealing anything.
    ///
    /// Selected containers are reported once and not descended into.
    pub fn targets(&self, tree: &Tree) -> Result<Vec<FieldInfo>> {
        let mut found = Vec::new();
        let policy = self.policy.as_ref();
        self.walker().walk(
            tree,
            &mut |parent: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
                match key {
                    Some(key) if policy.should_encrypt(parent, key, &value) => {
                        found.push(FieldInfo {
                            path: parent.child(key.clone()),
                            key: key.clone(),
                            value: value.clone(),
                        });
                        Ok(Visit::stop(value))
                    }
                    _ => Ok(Visit::descend(value)),
                }
            },
        )?;
        Ok(found)
    }

    /// Parse `text` and load it with identities from `sources`.
    pub fn load_document(&self, text: &str, format: Format, sources: &KeySources) -> Result<Loaded> {
        let identities = sources.load_identities()?;
        let tree = document::parse(text, format)?;
        self.load(&tree, &identities)
    }

    /// Save `tree` with recipients from `sources` and serialize the result.
    pub fn save_document(
        &self,
        tree: &Tree,
        format: Format,
        sources: &KeySources,
    ) -> Result<(String, Vec<FieldRecord>)> {
        let recipients = sources.load_recipients()?;
        let saved = self.save(tree, &recipients)?;
        Ok((document::serialize(&saved.tree, format)?, saved.fields))
    }

    /// Load, edit, and save a document in one step.
    ///
    /// `mutate` sees the decrypted tree. The returned records are those of
    /// the save pass. Nothing is returned unless every step succeeds.
    pub fn transform<F>(
        &self,
        text: &str,
        format: Format,
        identities: &[Identity],
        recipients: &[Recipient],
        mutate: F,
    ) -> Result<(String, Vec<FieldRecord>)>
    where
        F: FnOnce(&mut Tree) -> Result<()>,
    {
        let tree = document::parse(text, format)?;
        let mut loaded = self.load(&tree, identities)?;
        mutate(&mut loaded.tree)?;
        let saved = self.save(&loaded.tree, recipients)?;
        Ok((document::serialize(&saved.tree, format)?, saved.fields))
    }

    fn walker(&self) -> Walker {
        Walker::new(self.options.max_depth)
    }
}

struct LoadPass<'a> {
    backend: &'a dyn CryptoBackend,
    identities: &'a [Identity],
    fields: Vec<FieldRecord>,
}

impl LoadPass<'_> {
    fn open(&self, path: &FieldPath, armored: &str) -> Option<Tree> {
        if self.identities.is_empty() {
            return None;
        }
        match self.backend.open(armored, self.identities) {
            Ok(plaintext) => {
                let decoded = codec::decode(&plaintext);
                if decoded.is_none() {
                    warn!(path = %path, "Decrypted field is neither JSON nor UTF-8 text");
                }
                decoded
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Could not decrypt field");
                None
            }
        }
    }
}

impl Visitor for LoadPass<'_> {
    fn visit(&mut self, parent: &FieldPath, key: Option<&Segment>, value: Tree) -> Result<Visit> {
        let (Some(key), Tree::String(text)) = (key, &value) else {
            return Ok(Visit::descend(value));
        };
        if !is_armored(text) {
            return Ok(Visit::descend(value));
        }

        let path = parent.child(key.clone());
        match self.open(&path, text) {
            Some(plain) => {
                debug!(path = %path, "Decrypted field");
                self.fields.push(FieldRecord::loaded(path, text.clone(), true));
                Ok(Visit::stop(plain))
            }
            None => {
                self.fields.push(FieldRecord::loaded(path, text.clone(), false));
                Ok(Visit::stop(value))
            }
        }
    }
}

struct SavePass<'a> {
    backend: &'a dyn CryptoBackend,
    policy: &'a dyn FieldPolicy,
    recipients: &'a [Recipient],
    labels: Vec<String>,
    used_passphrase: bool,
    seal_failure: SealFailure,
    fields: Vec<FieldRecord>,
}

impl SavePass<'_> {
    fn record(&mut self, path: FieldPath, ciphertext: String) {
        self.fields.push(FieldRecord::sealed(
            path,
            ciphertext,
            self.labels.clone(),
            self.used_passphrase,
        ));
    }
}

impl Visitor for SavePass<'_> {
    fn visit(&mut self, parent: &FieldPath, key: Option<&Segment>, value: Tree) -> Result<Visit> {
        let Some(key) = key else {
            return Ok(Visit::descend(value));
        };
        if !self.policy.should_encrypt(parent, key, &value) {
            return Ok(Visit::descend(value));
        }

        let path = parent.child(key.clone());
        if let Tree::String(text) = &value {
            if is_armored(text) {
                debug!(path = %path, "Field already encrypted");
                self.record(path, text.clone());
                return Ok(Visit::stop(value));
            }
        }

        let sealed = codec::encode(&value).and_then(|bytes| self.backend.seal(&bytes, self.recipients));
        match sealed {
            Ok(armored) => {
                debug!(path = %path, "Encrypted field");
                self.record(path, armored.clone());
                Ok(Visit::stop(Tree::String(armored)))
            }
            Err(e) => match self.seal_failure {
                SealFailure::Skip => {
                    warn!(path = %path, error = %e, "Could not encrypt field, leaving it unchanged");
                    Ok(Visit::stop(value))
                }
                SealFailure::Abort => Err(VeilError::Encrypt(format!(
                    "Failed to encrypt '{}': {}",
                    path, e
                ))),
            },
        }
    }
}
