//! Leaf value encoding for sealing, and the inverse after opening.
//!
//! Strings are sealed as raw UTF-8. Everything else (numbers, booleans,
//! null, and whole sub-maps or sequences) goes through JSON. On the way
//! back, JSON is tried first and raw text second.
//!
//! A string whose raw text would itself parse as JSON (`"42"`, `"true"`,
//! `"[1]"`) is JSON-quoted before sealing so it decodes back to a string
//! rather than changing type.

use veil_types::{Result, Tree, VeilError};

/// Turn a leaf value into the bytes handed to the encryption backend.
pub fn encode(value: &Tree) -> Result<Vec<u8>> {
    match value {
        Tree::String(text) if !looks_like_json(text) => Ok(text.as_bytes().to_vec()),
        other => serde_json::to_vec(other)
            .map_err(|e| VeilError::Codec(format!("Failed to encode value: {}", e))),
    }
}

/// Turn opened plaintext back into a leaf value.
///
/// Returns `None` when the bytes are neither JSON nor UTF-8 text.
pub fn decode(plaintext: &[u8]) -> Option<Tree> {
    serde_json::from_slice(plaintext)
        .ok()
        .or_else(|| String::from_utf8(plaintext.to_vec()).ok().map(Tree::String))
}

fn looks_like_json(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(value: Tree) -> Tree {
        decode(&encode(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_strings_are_raw() {
        assert_eq!(encode(&json!("secret123")).unwrap(), b"secret123");
        assert_eq!(encode(&json!("postgresql://u:p@h/db")).unwrap(), b"postgresql://u:p@h/db");
        assert_eq!(encode(&json!("")).unwrap(), b"");
    }

    #[test]
    fn test_json_looking_strings_are_quoted() {
        assert_eq!(encode(&json!("42")).unwrap(), b"\"42\"");
        assert_eq!(encode(&json!("true")).unwrap(), b"\"true\"");
        assert_eq!(encode(&json!("null")).unwrap(), b"\"null\"");

        for text in ["42", "true", "null", "[1,2]", "{\"a\":1}", "\"quoted\"", " 7 "] {
            assert_eq!(round_trip(json!(text)), json!(text));
        }
    }

    #[test]
    fn test_non_strings_use_json() {
        assert_eq!(encode(&json!(42)).unwrap(), b"42");
        assert_eq!(encode(&json!(false)).unwrap(), b"false");
        assert_eq!(encode(&json!({"b": [1, 2]})).unwrap(), br#"{"b":[1,2]}"#);
    }

    #[test]
    fn test_round_trip_types() {
        assert_eq!(round_trip(json!(42)), json!(42));
        assert_eq!(round_trip(json!(-1.5)), json!(-1.5));
        assert_eq!(round_trip(json!(true)), json!(true));
        assert_eq!(round_trip(Tree::Null), Tree::Null);
        assert_eq!(round_trip(json!({"user": "x", "ports": [1, 2]})), json!({"user": "x", "ports": [1, 2]}));
        assert_eq!(round_trip(json!("plain text")), json!("plain text"));
    }

    #[test]
    fn test_decode_raw_text_from_other_writers() {
        assert_eq!(decode(b"hello world"), Some(json!("hello world")));
        assert_eq!(decode(b"123"), Some(json!(123)));
    }

    #[test]
    fn test_decode_binary_is_rejected() {
        assert_eq!(decode(&[0xff, 0xfe, 0x00]), None);
    }
}
