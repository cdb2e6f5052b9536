use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{KvoError, Result};

/// Immutable, non-empty dotted attribute path such as `account.address.city`
///
/// Every segment is an identifier: an ASCII letter or `_`, followed by
/// ASCII letters, digits or `_`. Cloning is cheap (segments are shared).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Arc<[String]>,
}

impl KeyPath {
    /// Parse a dotted key path
    ///
    /// # Errors
    ///
    /// `EmptyPath` for an empty or blank string, `InvalidSegment` for any
    /// empty or non-identifier segment.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(KvoError::EmptyPath);
        }
        Self::from_segments(raw.split('.'))
    }

    /// Build a key path from already split segments
    ///
    /// # Errors
    ///
    /// Same as [`KeyPath::parse`].
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(KvoError::EmptyPath);
        }
        if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
            return Err(KvoError::InvalidSegment {
                key_path: segments.join("."),
                segment: bad.clone(),
            });
        }
        Ok(Self {
            segments: segments.into(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (always at least 1)
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The attribute whose value is observed
    pub fn terminal(&self) -> &str {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPath({})", self)
    }
}

impl FromStr for KeyPath {
    type Err = KvoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = KvoError;

    fn try_from(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for KeyPath {
    type Error = KvoError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl TryFrom<&String> for KeyPath {
    type Error = KvoError;

    fn try_from(raw: &String) -> Result<Self> {
        Self::parse(raw)
    }
}

impl TryFrom<Vec<String>> for KeyPath {
    type Error = KvoError;

    fn try_from(segments: Vec<String>) -> Result<Self> {
        Self::from_segments(segments)
    }
}

impl TryFrom<&[&str]> for KeyPath {
    type Error = KvoError;

    fn try_from(segments: &[&str]) -> Result<Self> {
        Self::from_segments(segments.iter().copied())
    }
}

impl<const N: usize> TryFrom<[&str; N]> for KeyPath {
    type Error = KvoError;

    fn try_from(segments: [&str; N]) -> Result<Self> {
        Self::from_segments(segments)
    }
}

impl From<&KeyPath> for KeyPath {
    fn from(path: &KeyPath) -> Self {
        path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_path() {
        let path = KeyPath::parse("account.address.city").unwrap();
        assert_eq!(path.segments(), ["account", "address", "city"]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.terminal(), "city");
        assert_eq!(path.to_string(), "account.address.city");
    }

    #[test]
    fn test_empty_path_rejected() {
        assert_eq!(KeyPath::parse(""), Err(KvoError::EmptyPath));
        assert_eq!(KeyPath::parse("   "), Err(KvoError::EmptyPath));
        assert_eq!(
            KeyPath::from_segments(Vec::<String>::new()),
            Err(KvoError::EmptyPath)
        );
    }

    #[test]
    fn test_malformed_segments_rejected() {
        for raw in ["a..b", ".a", "a.", "a.1b", "a.b-c", "a. b"] {
            assert!(
                matches!(KeyPath::parse(raw), Err(KvoError::InvalidSegment { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_array_and_slice() {
        let from_array = KeyPath::try_from(["manager", "name"]).unwrap();
        let from_slice = KeyPath::try_from(&["manager", "name"][..]).unwrap();
        assert_eq!(from_array, from_slice);
        assert_eq!(from_array, "manager.name".parse().unwrap());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("_private"));
        assert!(is_identifier("camelCase2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("ünïcode"));
    }
}
