// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for loading the service configuration.

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required configuration variable {var}")]
    Missing {
        /// Variable name
        var: &'static str,
    },

    /// A variable is set but could not be parsed.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// The raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create an `Invalid` error.
    pub fn invalid(var: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
