//! Path addressing into a document tree.
//!
//! A [`FieldPath`] is an ordered list of [`Segment`]s. Map keys and sequence
//! indices are distinct variants, so no map key (not even `"[0]"`) can be
//! mistaken for an index.

use crate::errors::{Result, VeilError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

/// One step of a path: a map key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A key in a map node
    Key(String),
    /// A position in a sequence node
    Index(usize),
}

impl Segment {
    /// Get the map key, if this is a key segment.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(key) => Some(key),
            Segment::Index(_) => None,
        }
    }

    /// Get the sequence index, if this is an index segment.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Key(_) => None,
            Segment::Index(index) => Some(*index),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) if is_plain_key(key) => write!(f, "{}", key),
            Segment::Key(key) => write_quoted_key(f, key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// An ordered sequence of segments addressing one node in a tree.
///
/// The empty path addresses the root.
///
/// # Example
///
/// ```
/// use veil_types::{FieldPath, Segment};
///
/// let path = FieldPath::root().child("database").child("private_password");
/// assert_eq!(path.to_string(), "database.private_password");
///
/// let parsed: FieldPath = "hosts[1].name".parse().unwrap();
/// assert_eq!(parsed.segments()[1], Segment::Index(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The empty path, addressing the whole tree.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Return a new path with one more segment appended.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    /// Remove and return the last segment.
    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Split into the parent path and the final segment.
    pub fn split_last(&self) -> Option<(FieldPath, &Segment)> {
        self.0
            .split_last()
            .map(|(last, parent)| (FieldPath(parent.to_vec()), last))
    }

    /// Parse the display form, e.g. `servers[0].private_token`.
    ///
    /// Keys that are empty or contain `.`, `[` or `]` are written as a
    /// JSON string in brackets, e.g. `hosts["db.internal"].port` or `[""]`.
    /// The empty string parses to the root path.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = |reason: &str| VeilError::Path(format!("Malformed path '{}': {}", input, reason));

        let mut segments = Vec::new();
        let mut key = String::new();
        let mut after_index = false;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() {
                        if !after_index {
                            return Err(malformed("empty key"));
                        }
                    } else {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    if chars.peek().is_none() {
                        return Err(malformed("trailing '.'"));
                    }
                    after_index = false;
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    if chars.peek() == Some(&'"') {
                        let quoted = take_quoted(&mut chars)
                            .ok_or_else(|| malformed("unterminated or invalid quoted key"))?;
                        if chars.next() != Some(']') {
                            return Err(malformed("quoted key must be closed by ']'"));
                        }
                        segments.push(Segment::Key(quoted));
                    } else {
                        let mut digits = String::new();
                        loop {
                            match chars.next() {
                                Some(']') => break,
                                Some(d) if d.is_ascii_digit() => digits.push(d),
                                _ => return Err(malformed("index must be digits closed by ']'")),
                            }
                        }
                        let index = digits
                            .parse::<usize>()
                            .map_err(|_| malformed("empty or oversized index"))?;
                        segments.push(Segment::Index(index));
                    }
                    match chars.peek() {
                        None | Some('.') | Some('[') => {}
                        Some(_) => return Err(malformed("expected '.' or '[' after ']'")),
                    }
                    after_index = true;
                }
                ']' => return Err(malformed("unexpected ']'")),
                other => {
                    key.push(other);
                    after_index = false;
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        }

        Ok(Self(segments))
    }
}

/// Keys that can be written bare in the dotted form.
fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['.', '[', ']'])
}

fn write_quoted_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
    write!(f, "[{}]", quoted)
}

/// Consume a JSON string literal, starting at its opening quote.
fn take_quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut raw = String::new();
    raw.push(chars.next()?);
    let mut escaped = false;
    loop {
        let c = chars.next()?;
        raw.push(c);
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => break,
            _ => escaped = false,
        }
    }
    serde_json::from_str(&raw).ok()
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if is_plain_key(key) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Segment::Key(key) => write_quoted_key(f, key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Vec<Segment>> for FieldPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl<'a> IntoIterator for &'a FieldPath {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display() {
        let path = FieldPath::new(vec![
            Segment::from("servers"),
            Segment::Index(0),
            Segment::from("private_token"),
        ]);
        assert_eq!(path.to_string(), "servers[0].private_token");
        assert_eq!(FieldPath::root().to_string(), "");
        assert_eq!(FieldPath::new(vec![Segment::Index(2), Segment::from("a")]).to_string(), "[2].a");
    }

    #[test]
    fn test_parse() {
        let path = FieldPath::parse("database.private_password").unwrap();
        assert_eq!(
            path.segments(),
            &[Segment::from("database"), Segment::from("private_password")]
        );

        let path = FieldPath::parse("matrix[1][2].cell").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::from("matrix"),
                Segment::Index(1),
                Segment::Index(2),
                Segment::from("cell"),
            ]
        );

        let path = FieldPath::parse("[0]").unwrap();
        assert_eq!(path.segments(), &[Segment::Index(0)]);

        assert!(FieldPath::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [".a", "a..b", "a.", "a[", "a[x]", "a[]", "a[0]b", "a]b", "a[\"x", "a[\"x\"", "a[\"x\"y]"] {
            assert!(
                matches!(FieldPath::parse(bad), Err(VeilError::Path(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_display_agree() {
        for text in ["a", "a.b.c", "list[3]", "list[3].name", "[0][1]", "x.y[10].z"] {
            assert_eq!(FieldPath::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_unusual_keys_are_quoted() {
        let cases = [
            (vec![Segment::from("")], "[\"\"]"),
            (vec![Segment::from("a.b")], "[\"a.b\"]"),
            (vec![Segment::from("x"), Segment::from("")], "x[\"\"]"),
            (vec![Segment::from("hosts"), Segment::from("db.internal"), Segment::from("port")], "hosts[\"db.internal\"].port"),
            (vec![Segment::from("m[0]"), Segment::Index(0)], "[\"m[0]\"][0]"),
            (vec![Segment::from("say \"hi\"")], "say \"hi\""),
        ];
        for (segments, text) in cases {
            let path = FieldPath::new(segments);
            assert_eq!(path.to_string(), text);
            assert_eq!(FieldPath::parse(text).unwrap(), path);
        }
        assert_eq!(FieldPath::parse("[\"a\\\"]b\"]").unwrap().segments(), &[Segment::from("a\"]b")]);
    }

    #[test]
    fn test_child_and_split() {
        let parent = FieldPath::root().child("a");
        let path = parent.child(1usize);
        assert_eq!(parent.len(), 1);
        assert_eq!(path.len(), 2);

        let (head, last) = path.split_last().unwrap();
        assert_eq!(head, parent);
        assert_eq!(last, &Segment::Index(1));
        assert!(FieldPath::root().split_last().is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let path = FieldPath::parse("db.hosts[1]").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"db.hosts[1]\"");

        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    fn arb_segment() -> impl Strategy<Value = Segment> {
        prop_oneof![
            "[a-z_][a-z0-9_-]{0,8}".prop_map(Segment::Key),
            "[a-z.\\[\\]\"\\\\ ]{0,6}".prop_map(Segment::Key),
            any::<String>().prop_map(Segment::Key),
            (0usize..1000).prop_map(Segment::Index),
        ]
    }

    proptest! {
        #[test]
        fn test_parse_inverts_display(segments in proptest::collection::vec(arb_segment(), 0..6)) {
            let path = FieldPath::new(segments);
            prop_assert_eq!(FieldPath::parse(&path.to_string()).unwrap(), path.clone());
            let json = serde_json::to_string(&path).unwrap();
            prop_assert_eq!(serde_json::from_str::<FieldPath>(&json).unwrap(), path);
        }
    }
}
