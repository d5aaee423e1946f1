// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Opaque cached payload.

use std::fmt;
use std::sync::Arc;

/// Serialized fetch result, stored and served verbatim.
///
/// The cache never looks inside. Cloning shares the buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheEntry(Arc<[u8]>);

impl CacheEntry {
    /// Wraps an owned buffer.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies the payload into an owned buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<Vec<u8>> for CacheEntry {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&[u8]> for CacheEntry {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl AsRef<[u8]> for CacheEntry {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Payloads can be large; log the size, not the bytes.
impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry").field("len", &self.len()).finish()
    }
}
