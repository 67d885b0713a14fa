//! Encryption backend seam and its age implementation.

use crate::keys::{Identity, Recipient};
use age::armor::{ArmoredReader, ArmoredWriter, Format};
use std::io::{Read, Write};
use veil_types::{Result, VeilError};

/// Seal and open leaf payloads.
///
/// The engine only talks to this trait, so tests can substitute a backend
/// that fails on demand.
pub trait CryptoBackend: Send + Sync {
    /// Encrypt `plaintext` to every recipient, returning ASCII-armored text.
    ///
    /// # Errors
    ///
    /// `NoRecipients` for an empty recipient list, `Encrypt` on backend failure.
    fn seal(&self, plaintext: &[u8], recipients: &[Recipient]) -> Result<String>;

    /// Decrypt armored text with the first identity that matches.
    ///
    /// # Errors
    ///
    /// `NoIdentities` for an empty identity list, `Decrypt` when no identity
    /// matches or the armor is malformed.
    fn open(&self, armored: &str, identities: &[Identity]) -> Result<Vec<u8>>;
}

/// The age backend: X25519 and scrypt recipients, ASCII armor output.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgeBackend;

impl AgeBackend {
    fn encryptor(recipients: &[Recipient]) -> Result<age::Encryptor> {
        let passphrases: Vec<_> = recipients
            .iter()
            .filter_map(|r| match r {
                Recipient::Passphrase(passphrase) => Some(passphrase),
                Recipient::PublicKey(_) => None,
            })
            .collect();

        match passphrases.as_slice() {
            [] => {
                let keys: Vec<&dyn age::Recipient> = recipients
                    .iter()
                    .filter_map(|r| match r {
                        Recipient::PublicKey(key) => Some(key as &dyn age::Recipient),
                        Recipient::Passphrase(_) => None,
                    })
                    .collect();
                age::Encryptor::with_recipients(keys.into_iter())
                    .map_err(|e| VeilError::Encrypt(format!("Failed to create age encryptor: {}", e)))
            }
            [passphrase] if recipients.len() == 1 => Ok(age::Encryptor::with_user_passphrase(
                crate::keys::duplicate(passphrase),
            )),
            _ => Err(VeilError::Encrypt(
                "A passphrase must be the only recipient".to_string(),
            )),
        }
    }
}

impl CryptoBackend for AgeBackend {
    fn seal(&self, plaintext: &[u8], recipients: &[Recipient]) -> Result<String> {
        if recipients.is_empty() {
            return Err(VeilError::NoRecipients);
        }

        let encryptor = Self::encryptor(recipients)?;
        let io_err = |stage: &str, e: std::io::Error| VeilError::Encrypt(format!("{}: {}", stage, e));

        let armor = ArmoredWriter::wrap_output(Vec::new(), Format::AsciiArmor)
            .map_err(|e| io_err("Failed to create armor writer", e))?;
        let mut writer = encryptor
            .wrap_output(armor)
            .map_err(|e| io_err("Failed to create age writer", e))?;
        writer
            .write_all(plaintext)
            .map_err(|e| io_err("Failed to write data", e))?;
        let output = writer
            .finish()
            .and_then(|armor| armor.finish())
            .map_err(|e| io_err("Failed to finish ciphertext", e))?;

        String::from_utf8(output)
            .map_err(|e| VeilError::Encrypt(format!("Armored output is not UTF-8: {}", e)))
    }

    fn open(&self, armored: &str, identities: &[Identity]) -> Result<Vec<u8>> {
        if identities.is_empty() {
            return Err(VeilError::NoIdentities);
        }

        let decryptor = age::Decryptor::new(ArmoredReader::new(armored.as_bytes()))
            .map_err(|e| VeilError::Decrypt(format!("Failed to read ciphertext: {}", e)))?;

        let boxed: Vec<Box<dyn age::Identity>> = identities.iter().map(Identity::to_age).collect();
        let mut reader = decryptor
            .decrypt(boxed.iter().map(|identity| identity.as_ref()))
            .map_err(|e| VeilError::Decrypt(format!("Failed to decrypt: {}", e)))?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| VeilError::Decrypt(format!("Failed to read plaintext: {}", e)))?;
        Ok(plaintext)
    }
}
