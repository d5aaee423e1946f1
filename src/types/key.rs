// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Block identifier used as both the store key and the lock key.

use std::fmt;
use std::sync::Arc;

use crate::errors::KeyError;

/// Largest key LMDB accepts with its default compile-time settings.
pub const MAX_KEY_LEN: usize = 511;

/// Validated block identifier.
///
/// Opaque to the cache: it is only compared, hashed, stored and sent
/// upstream as a URL path segment. Construction restricts it to
/// `[A-Za-z0-9_-]` and at most [`MAX_KEY_LEN`] bytes, which keeps it valid in
/// both places. Cloning is cheap.
///
/// # Examples
///
/// ```
/// use blocktx::{BlockKey, KeyError};
///
/// let key = BlockKey::new("4f2a9c01").unwrap();
/// assert_eq!(key.as_str(), "4f2a9c01");
///
/// assert_eq!(BlockKey::new(""), Err(KeyError::Empty));
/// assert!(BlockKey::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(Arc<str>);

impl BlockKey {
    /// Validates `id` and wraps it.
    pub fn new(id: impl AsRef<str>) -> Result<Self, KeyError> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(KeyError::Empty);
        }
        if id.len() > MAX_KEY_LEN {
            return Err(KeyError::TooLong {
                len: id.len(),
                max: MAX_KEY_LEN,
            });
        }
        if let Some((position, found)) = id
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(KeyError::InvalidCharacter { found, position });
        }
        Ok(Self(Arc::from(id)))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier's bytes, as written to the store.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for BlockKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_hex_hashes() {
        let hash = "a".repeat(64);
        let key = BlockKey::new(&hash).unwrap();
        assert_eq!(key.as_str(), hash);
        assert_eq!(key.to_string(), hash);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(BlockKey::new(""), Err(KeyError::Empty));
    }

    #[test]
    fn rejects_oversized() {
        let id = "f".repeat(MAX_KEY_LEN + 1);
        assert_eq!(
            BlockKey::new(id),
            Err(KeyError::TooLong {
                len: MAX_KEY_LEN + 1,
                max: MAX_KEY_LEN
            })
        );
        assert!(BlockKey::new("f".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn reports_first_invalid_character() {
        assert_eq!(
            BlockKey::new("ab/cd"),
            Err(KeyError::InvalidCharacter {
                found: '/',
                position: 2
            })
        );
        assert!(BlockKey::new("ab cd").is_err());
        assert!(BlockKey::new("ab..").is_err());
        assert!(BlockKey::new("é").is_err());
    }

    #[test]
    fn clones_compare_equal() {
        let key = BlockKey::new("block_1-a").unwrap();
        assert_eq!(key.clone(), key);
        assert_eq!("block_1-a".parse::<BlockKey>().unwrap(), key);
    }

    proptest! {
        #[test]
        fn valid_alphabet_always_accepted(id in "[A-Za-z0-9_-]{1,511}") {
            let key = BlockKey::new(&id).unwrap();
            prop_assert_eq!(key.as_bytes(), id.as_bytes());
        }

        #[test]
        fn any_other_character_rejected(
            prefix in "[a-z0-9]{0,16}",
            bad in "[^A-Za-z0-9_-]",
            suffix in "[a-z0-9]{0,16}",
        ) {
            let id = format!("{prefix}{bad}{suffix}");
            let is_invalid_char = matches!(
                BlockKey::new(&id),
                Err(KeyError::InvalidCharacter { .. })
            );
            prop_assert!(is_invalid_char);
        }
    }
}
