// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for upstream fetches.

use std::time::Duration;

/// Errors that can occur while fetching a block's transactions upstream.
///
/// Every variant is delivered as a value to the caller of
/// [`FetchOffloader::submit`](crate::FetchOffloader::submit); none of them
/// leave anything in the store.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The upstream call failed (transport error or non-success status).
    #[error("Upstream request for block {block} failed")]
    Upstream {
        /// The requested block
        block: String,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The upstream does not know the block.
    #[error("Block {block} not found upstream")]
    NotFound {
        /// The requested block
        block: String,
    },

    /// The fetch did not finish within the configured timeout.
    #[error("Fetch for block {block} timed out after {after:?}")]
    Timeout {
        /// The requested block
        block: String,
        /// The configured timeout
        after: Duration,
    },

    /// The upstream payload could not be interpreted.
    #[error("Malformed upstream response for block {block}: {details}")]
    MalformedResponse {
        /// The requested block
        block: String,
        /// What could not be decoded
        details: String,
    },

    /// Too many fetches are already running or queued.
    #[error("Fetch pool overloaded ({capacity} fetches admitted)")]
    Overloaded {
        /// Maximum number of admitted fetches
        capacity: usize,
    },

    /// The pool has been shut down.
    #[error("Fetch pool is closed")]
    PoolClosed,

    /// The worker running the fetch panicked or was aborted.
    #[error("Fetch worker for block {block} failed: {details}")]
    WorkerFailed {
        /// The requested block
        block: String,
        /// Description of the failure
        details: String,
    },
}

impl FetchError {
    /// Create an `Upstream` error from any error type.
    pub fn upstream(
        block: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        FetchError::Upstream {
            block: block.into(),
            source: Box::new(source),
        }
    }

    /// Create a `NotFound` error.
    pub fn not_found(block: impl Into<String>) -> Self {
        FetchError::NotFound {
            block: block.into(),
        }
    }

    /// Create a `MalformedResponse` error.
    pub fn malformed(block: impl Into<String>, details: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            block: block.into(),
            details: details.into(),
        }
    }
}
