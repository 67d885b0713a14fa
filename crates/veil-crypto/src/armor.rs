//! ASCII armor detection and header inspection.

use age::armor::ArmoredReader;
use std::io::Read;
use veil_types::{bail, Result, VeilError};

/// First line of an armored age payload.
pub const ARMOR_BEGIN: &str = "-----BEGIN AGE ENCRYPTED FILE-----";

/// Last line of an armored age payload.
pub const ARMOR_END: &str = "-----END AGE ENCRYPTED FILE-----";

const HEADER_VERSION: &str = "age-encryption.org/v1";

/// Whether `text` looks like armored ciphertext.
///
/// Both markers must be present with the begin marker first. The payload
/// between them is not validated.
pub fn is_armored(text: &str) -> bool {
    match (text.find(ARMOR_BEGIN), text.rfind(ARMOR_END)) {
        (Some(begin), Some(end)) => begin + ARMOR_BEGIN.len() <= end,
        _ => false,
    }
}

/// List the recipient stanza types in an armored payload's header.
///
/// Returns e.g. `["X25519", "X25519"]` for a file sealed to two keys or
/// `["scrypt"]` for a passphrase. No key material is needed.
pub fn stanza_kinds(armored: &str) -> Result<Vec<String>> {
    if !is_armored(armored) {
        bail!(Decrypt, "Value is not armored ciphertext");
    }

    let mut binary = Vec::new();
    ArmoredReader::new(armored.as_bytes())
        .read_to_end(&mut binary)
        .map_err(|e| VeilError::Decrypt(format!("Malformed armor: {}", e)))?;

    let header_end = binary
        .windows(4)
        .position(|w| w == b"\n---")
        .ok_or_else(|| VeilError::Decrypt("Missing age header terminator".to_string()))?;
    let header = std::str::from_utf8(&binary[..header_end])
        .map_err(|_| VeilError::Decrypt("age header is not valid text".to_string()))?;

    let mut lines = header.lines();
    if lines.next() != Some(HEADER_VERSION) {
        bail!(Decrypt, "Unsupported age header version");
    }

    Ok(lines
        .filter_map(|line| line.strip_prefix("-> "))
        .filter_map(|stanza| stanza.split_whitespace().next())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_identity, Recipient};
    use crate::{AgeBackend, CryptoBackend};
    use secrecy::SecretString;

    #[test]
    fn test_is_armored() {
        let armored = format!("{}\nYWdl\n{}\n", ARMOR_BEGIN, ARMOR_END);
        assert!(is_armored(&armored));
        assert!(is_armored(&format!("prefix {} body {} suffix", ARMOR_BEGIN, ARMOR_END)));

        assert!(!is_armored("plain text"));
        assert!(!is_armored(ARMOR_BEGIN));
        assert!(!is_armored(ARMOR_END));
        assert!(!is_armored(&format!("{}\n{}", ARMOR_END, ARMOR_BEGIN)));
        assert!(!is_armored(""));
    }

    #[test]
    fn test_stanza_kinds_for_keys() {
        let alice = generate_identity();
        let bob = generate_identity();
        let armored = AgeBackend
            .seal(b"x", &[alice.to_recipient(), bob.to_recipient()])
            .unwrap();

        assert_eq!(stanza_kinds(&armored).unwrap(), vec!["X25519", "X25519"]);
    }

    #[test]
    fn test_stanza_kinds_for_passphrase() {
        let recipient = Recipient::passphrase(SecretString::from("pw".to_string()));
        let armored = AgeBackend.seal(b"x", &[recipient]).unwrap();

        assert_eq!(stanza_kinds(&armored).unwrap(), vec!["scrypt"]);
    }

    #[test]
    fn test_stanza_kinds_rejects_garbage() {
        assert!(stanza_kinds("not armored").is_err());

        let fake = format!("{}\n!!!!\n{}\n", ARMOR_BEGIN, ARMOR_END);
        assert!(stanza_kinds(&fake).is_err());
    }
}
