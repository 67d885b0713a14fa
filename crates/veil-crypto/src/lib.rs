//! # Veil Crypto
//!
//! Encryption backend for veil, built on [age](https://age-encryption.org).
//!
//! Provides:
//! - The [`CryptoBackend`] seam and its age implementation, [`AgeBackend`]
//! - [`Recipient`] and [`Identity`] handles (X25519 keys or a passphrase)
//! - [`KeySources`] for materialising keys from files, strings, and passphrases
//! - ASCII armor detection and header inspection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod armor;
pub mod backend;
pub mod keys;

pub use armor::{is_armored, stanza_kinds, ARMOR_BEGIN, ARMOR_END};
pub use backend::{AgeBackend, CryptoBackend};
pub use keys::{
    generate_identity, has_passphrase, recipient_labels, Identity, KeySources, PassphraseSource,
    Recipient,
};

use veil_types::Result;

/// Seal plaintext to recipients with the default age backend.
///
/// Returns ASCII-armored ciphertext any of the recipients can open.
pub fn seal(plaintext: &[u8], recipients: &[Recipient]) -> Result<String> {
    AgeBackend.seal(plaintext, recipients)
}

/// Open armored ciphertext with the default age backend.
pub fn open(armored: &str, identities: &[Identity]) -> Result<Vec<u8>> {
    AgeBackend.open(armored, identities)
}
