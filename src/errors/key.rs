// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

/// Errors from [`BlockKey::new`](crate::BlockKey::new).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The identifier is empty.
    #[error("Block identifier is empty")]
    Empty,

    /// The identifier exceeds the store's key size limit.
    #[error("Block identifier is {len} bytes, limit is {max}")]
    TooLong {
        /// Actual length in bytes
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// The identifier contains a character outside `[A-Za-z0-9_-]`.
    #[error("Block identifier contains invalid character {found:?} at byte {position}")]
    InvalidCharacter {
        /// The offending character
        found: char,
        /// Byte offset of the character
        position: usize,
    },
}
