//! Content slot keys

use crate::error::ContentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum key length
pub const MAX_KEY_LEN: usize = 128;

/// Validated content slot key, e.g. `hero-title`
///
/// Keys are ASCII alphanumerics plus `-`, `_` and `.`, so they can be used
/// verbatim in cache keys and backend filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentKey(String);

impl ContentKey {
    /// Validate and create key
    ///
    /// # Errors
    /// - `ContentError::InvalidKey` if the key is empty, too long, or has
    ///   characters outside `[A-Za-z0-9._-]`
    pub fn new(key: impl Into<String>) -> Result<Self, ContentError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ContentError::invalid_key(key, "key is empty"));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(ContentError::invalid_key(key, "key is too long"));
        }
        if !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            return Err(ContentError::invalid_key(
                key,
                "key may only contain ASCII letters, digits, '-', '_' and '.'",
            ));
        }
        Ok(Self(key))
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentKey {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentKey {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentKey> for String {
    fn from(key: ContentKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ContentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_keys() {
        for key in ["hero-title", "footer_blurb", "about.mission", "k1"] {
            assert_eq!(ContentKey::new(key).unwrap().as_str(), key);
        }
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(ContentKey::new("").is_err());
        assert!(ContentKey::new("a".repeat(MAX_KEY_LEN + 1)).is_err());
        assert!(ContentKey::new("a".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn rejects_filter_metacharacters() {
        for key in ["hero title", "a,b", "k=eq.x&y", "émoji"] {
            assert!(matches!(
                ContentKey::new(key),
                Err(ContentError::InvalidKey { .. })
            ));
        }
    }

    #[test]
    fn serde_validates() {
        let key: ContentKey = serde_json::from_str("\"hero-title\"").unwrap();
        assert_eq!(key.to_string(), "hero-title");
        assert!(serde_json::from_str::<ContentKey>("\"bad key\"").is_err());
    }
}
