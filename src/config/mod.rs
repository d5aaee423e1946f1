// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the blocktx service.
//!
//! Settings come from the environment (a `.env` file is honored through
//! `dotenvy`). Every variable except `UPSTREAM_HOST` has a default, see
//! [`constants`].
//!
//! # Example: From the environment
//!
//! ```rust,no_run
//! use blocktx::ServiceConfig;
//!
//! let config = ServiceConfig::from_env()?;
//! println!("listening on {}", config.listen_addr());
//! # Ok::<(), blocktx::ConfigError>(())
//! ```
//!
//! # Example: Built in code
//!
//! ```rust
//! use std::time::Duration;
//! use blocktx::ServiceConfigBuilder;
//!
//! let config = ServiceConfigBuilder::new("node.example")
//!     .worker_pool_size(4)
//!     .fetch_timeout(Some(Duration::from_secs(10)))
//!     .build();
//!
//! assert_eq!(config.fetch_queue_capacity, 16);
//! ```

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

pub mod constants;

use constants::env;

/// Runtime configuration of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Directory of the LMDB environment
    pub store_path: PathBuf,

    /// Store capacity in MiB
    pub store_max_size_mb: usize,

    /// Host of the upstream node
    pub upstream_host: String,

    /// HTTP port of the upstream node
    pub upstream_port: u16,

    /// Maximum number of upstream calls in flight
    pub worker_pool_size: usize,

    /// Timeout of a single fetch; `None` waits forever
    pub fetch_timeout: Option<Duration>,

    /// Fetches allowed to wait for a worker before requests are rejected
    pub fetch_queue_capacity: usize,

    pub listen_host: String,

    pub listen_port: u16,

    /// Log file, appended to; `None` logs to stdout
    pub log_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Loads the configuration from the process environment and `.env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `UPSTREAM_HOST` is not set and
    /// [`ConfigError::Invalid`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| dotenvy::var(var).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// Unset and blank variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let upstream_host = lookup(env::UPSTREAM_HOST).ok_or(ConfigError::Missing {
            var: env::UPSTREAM_HOST,
        })?;
        let mut builder = ServiceConfigBuilder::new(upstream_host);

        if let Some(path) = lookup(env::STORE_PATH) {
            builder = builder.store_path(path);
        }
        if let Some(mb) = parse_positive(&lookup, env::STORE_MAX_SIZE_MB)? {
            builder = builder.store_max_size_mb(mb);
        }
        if let Some(port) = parse(&lookup, env::UPSTREAM_PORT)? {
            builder = builder.upstream_port(port);
        }
        if let Some(size) = parse_positive(&lookup, env::WORKER_POOL_SIZE)? {
            builder = builder.worker_pool_size(size);
        }
        if let Some(secs) = parse::<u64>(&lookup, env::FETCH_TIMEOUT_SECS)? {
            builder = builder.fetch_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(capacity) = parse(&lookup, env::FETCH_QUEUE_CAPACITY)? {
            builder = builder.fetch_queue_capacity(capacity);
        }
        if let Some(host) = lookup(env::LISTEN_HOST) {
            builder = builder.listen_host(host);
        }
        if let Some(port) = parse(&lookup, env::LISTEN_PORT)? {
            builder = builder.listen_port(port);
        }
        if let Some(path) = lookup(env::LOG_PATH) {
            builder = builder.log_path(path);
        }

        Ok(builder.build())
    }

    /// Store capacity in bytes.
    pub fn store_max_bytes(&self) -> usize {
        self.store_max_size_mb.saturating_mul(constants::BYTES_PER_MB)
    }

    /// `host:port` to bind the HTTP listener to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

fn parse<T>(lookup: impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(var)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ConfigError::invalid(var, raw.as_str(), e.to_string()))
        })
        .transpose()
}

fn parse_positive(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<usize>, ConfigError> {
    match parse::<usize>(lookup, var)? {
        Some(0) => Err(ConfigError::invalid(var, "0", "must be greater than zero")),
        other => Ok(other),
    }
}

/// Default worker count: two per available core.
pub fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(constants::WORKERS_PER_CORE)
}

/// Builder for [`ServiceConfig`].
///
/// Unset fields take the defaults from [`constants`]. The fetch queue
/// capacity follows the worker pool size unless set explicitly.
#[derive(Debug, Clone)]
pub struct ServiceConfigBuilder {
    store_path: PathBuf,
    store_max_size_mb: usize,
    upstream_host: String,
    upstream_port: u16,
    worker_pool_size: Option<usize>,
    fetch_timeout: Option<Duration>,
    fetch_queue_capacity: Option<usize>,
    listen_host: String,
    listen_port: u16,
    log_path: Option<PathBuf>,
}

impl ServiceConfigBuilder {
    /// Start from the defaults, querying `upstream_host`.
    pub fn new(upstream_host: impl Into<String>) -> Self {
        Self {
            store_path: PathBuf::from(constants::DEFAULT_STORE_PATH),
            store_max_size_mb: constants::DEFAULT_STORE_MAX_SIZE_MB,
            upstream_host: upstream_host.into(),
            upstream_port: constants::DEFAULT_UPSTREAM_PORT,
            worker_pool_size: None,
            fetch_timeout: Some(Duration::from_secs(constants::DEFAULT_FETCH_TIMEOUT_SECS)),
            fetch_queue_capacity: None,
            listen_host: constants::DEFAULT_LISTEN_HOST.to_string(),
            listen_port: constants::DEFAULT_LISTEN_PORT,
            log_path: None,
        }
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn store_max_size_mb(mut self, mb: usize) -> Self {
        self.store_max_size_mb = mb;
        self
    }

    pub fn upstream_port(mut self, port: u16) -> Self {
        self.upstream_port = port;
        self
    }

    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = Some(size);
        self
    }

    /// Set the per-fetch timeout; `None` disables it.
    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_queue_capacity(mut self, capacity: usize) -> Self {
        self.fetch_queue_capacity = Some(capacity);
        self
    }

    pub fn listen_host(mut self, host: impl Into<String>) -> Self {
        self.listen_host = host.into();
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> ServiceConfig {
        let worker_pool_size = self
            .worker_pool_size
            .unwrap_or_else(default_worker_pool_size)
            .max(1);
        let fetch_queue_capacity = self.fetch_queue_capacity.unwrap_or_else(|| {
            worker_pool_size.saturating_mul(constants::QUEUED_FETCHES_PER_WORKER)
        });

        ServiceConfig {
            store_path: self.store_path,
            store_max_size_mb: self.store_max_size_mb,
            upstream_host: self.upstream_host,
            upstream_port: self.upstream_port,
            worker_pool_size,
            fetch_timeout: self.fetch_timeout,
            fetch_queue_capacity,
            listen_host: self.listen_host,
            listen_port: self.listen_port,
            log_path: self.log_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("UPSTREAM_HOST", "node.example")]).unwrap();

        assert_eq!(config.store_path, PathBuf::from("transactionsDB"));
        assert_eq!(config.store_max_size_mb, 10);
        assert_eq!(config.store_max_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.upstream_host, "node.example");
        assert_eq!(config.upstream_port, 40403);
        assert_eq!(config.worker_pool_size, default_worker_pool_size());
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.fetch_queue_capacity, config.worker_pool_size * 4);
        assert_eq!(config.listen_addr(), "127.0.0.1:7070");
        assert_eq!(config.log_path, None);
    }

    #[test]
    fn test_missing_upstream_host() {
        assert_eq!(
            load(&[]),
            Err(ConfigError::Missing {
                var: "UPSTREAM_HOST"
            })
        );
        // Blank counts as unset
        assert!(matches!(
            load(&[("UPSTREAM_HOST", "  ")]),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("UPSTREAM_HOST", "10.0.0.5"),
            ("UPSTREAM_PORT", "40413"),
            ("STORE_PATH", "/var/lib/blocktx"),
            ("STORE_MAX_SIZE_MB", "512"),
            ("WORKER_POOL_SIZE", "3"),
            ("FETCH_QUEUE_CAPACITY", "7"),
            ("LISTEN_HOST", "0.0.0.0"),
            ("LISTEN_PORT", "8080"),
            ("LOG_PATH", "/var/log/blocktx.log"),
        ])
        .unwrap();

        assert_eq!(config.upstream_port, 40413);
        assert_eq!(config.store_path, PathBuf::from("/var/lib/blocktx"));
        assert_eq!(config.store_max_bytes(), 512 * 1024 * 1024);
        assert_eq!(config.worker_pool_size, 3);
        assert_eq!(config.fetch_queue_capacity, 7);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.log_path, Some(PathBuf::from("/var/log/blocktx.log")));
    }

    #[test]
    fn test_queue_capacity_follows_pool_size() {
        let config = load(&[("UPSTREAM_HOST", "h"), ("WORKER_POOL_SIZE", "5")]).unwrap();
        assert_eq!(config.fetch_queue_capacity, 20);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = load(&[("UPSTREAM_HOST", "h"), ("FETCH_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(config.fetch_timeout, None);

        let config = load(&[("UPSTREAM_HOST", "h"), ("FETCH_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("UPSTREAM_HOST", "h"), ("LISTEN_PORT", "seventy")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "LISTEN_PORT",
                ..
            }
        ));

        let err = load(&[("UPSTREAM_HOST", "h"), ("UPSTREAM_PORT", "70000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = load(&[("UPSTREAM_HOST", "h"), ("WORKER_POOL_SIZE", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "WORKER_POOL_SIZE",
                ..
            }
        ));

        let err = load(&[("UPSTREAM_HOST", "h"), ("STORE_MAX_SIZE_MB", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_builder() {
        let config = ServiceConfigBuilder::new("node.example")
            .store_path("/tmp/tx")
            .worker_pool_size(0)
            .fetch_timeout(None)
            .listen_port(9090)
            .build();

        // Pool size is clamped to one worker
        assert_eq!(config.worker_pool_size, 1);
        assert_eq!(config.fetch_queue_capacity, 4);
        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.listen_addr(), "127.0.0.1:9090");
    }
}
