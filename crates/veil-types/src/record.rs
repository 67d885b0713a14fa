//! Per-leaf metadata produced by load and save passes.

use crate::path::FieldPath;
use serde::{Deserialize, Serialize};

/// Metadata describing how one leaf was handled during a load or save pass.
///
/// Records are created once per touched leaf and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Full path of the leaf, including its own key
    pub path: FieldPath,

    /// Whether the leaf is (or was, before load) encrypted
    pub was_encrypted: bool,

    /// The armored ciphertext, present iff `was_encrypted`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,

    /// Labels of the recipients used by the save pass
    #[serde(default)]
    pub used_recipients: Vec<String>,

    /// Whether a passphrase recipient was used by the save pass
    #[serde(default)]
    pub used_passphrase: bool,

    /// Whether the load pass opened the ciphertext; always false on save
    #[serde(default)]
    pub decrypted: bool,
}

impl FieldRecord {
    /// Record for a leaf seen by a load pass.
    pub fn loaded(path: FieldPath, ciphertext: String, decrypted: bool) -> Self {
        Self {
            path,
            was_encrypted: true,
            ciphertext: Some(ciphertext),
            used_recipients: Vec::new(),
            used_passphrase: false,
            decrypted,
        }
    }

    /// Record for a leaf sealed (or found already sealed) by a save pass.
    pub fn sealed(
        path: FieldPath,
        ciphertext: String,
        used_recipients: Vec<String>,
        used_passphrase: bool,
    ) -> Self {
        Self {
            path,
            was_encrypted: true,
            ciphertext: Some(ciphertext),
            used_recipients,
            used_passphrase,
            decrypted: false,
        }
    }

    /// For load records: true if the leaf could not be opened.
    pub fn still_encrypted(&self) -> bool {
        self.was_encrypted && !self.decrypted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Segment;

    #[test]
    fn test_record_serde_keeps_unusual_paths() {
        let paths = [
            FieldPath::new(vec![Segment::from("")]),
            FieldPath::new(vec![Segment::from("a.b")]),
            FieldPath::new(vec![Segment::from("x"), Segment::from("")]),
            FieldPath::new(vec![Segment::from("m[0]"), Segment::Index(2), Segment::from("private_key")]),
        ];
        for path in paths {
            let record = FieldRecord::sealed(path, "ct".to_string(), vec!["age1x".to_string()], false);
            let json = serde_json::to_string(&record).unwrap();
            let back: FieldRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(back, record);
        }
    }

    #[test]
    fn test_still_encrypted() {
        let path = FieldPath::new(vec![Segment::from("private_token")]);
        assert!(FieldRecord::loaded(path.clone(), "ct".to_string(), false).still_encrypted());
        assert!(!FieldRecord::loaded(path, "ct".to_string(), true).still_encrypted());
    }
}
