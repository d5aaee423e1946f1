// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the LMDB-backed persistent store.

use std::path::Path;

/// Errors that can occur while reading or writing the persistent store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The configured capacity is exhausted.
    ///
    /// Only surfaced after one close-and-reopen recovery has already been
    /// attempted and the retried write failed again.
    #[error("Store at {path} is full (capacity {max_bytes} bytes)")]
    Full {
        /// Store directory
        path: String,
        /// Configured capacity in bytes
        max_bytes: usize,
    },

    /// The store directory could not be created or opened.
    ///
    /// Fatal at startup.
    #[error("Store at {path} is unavailable: {details}")]
    Unavailable {
        /// Store directory
        path: String,
        /// What went wrong
        details: String,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other LMDB failure during a read or write.
    #[error("Store {operation} failed")]
    Backend {
        /// The operation being performed (e.g. "read", "write")
        operation: &'static str,
        /// The underlying LMDB error
        #[source]
        source: heed::Error,
    },

    /// The store was closed by shutdown.
    #[error("Store is closed")]
    Closed,
}

impl StoreError {
    /// Create a `Full` error for the store at `path`.
    pub fn full(path: &Path, max_bytes: usize) -> Self {
        StoreError::Full {
            path: path.display().to_string(),
            max_bytes,
        }
    }

    /// Create an `Unavailable` error from any error type.
    pub fn unavailable(
        path: &Path,
        details: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Unavailable {
            path: path.display().to_string(),
            details: details.into(),
            source: Box::new(source),
        }
    }

    /// Create a `Backend` error for the given operation.
    pub fn backend(operation: &'static str, source: heed::Error) -> Self {
        StoreError::Backend { operation, source }
    }
}
