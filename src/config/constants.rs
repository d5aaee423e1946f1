// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Defaults and environment variable names.
//!
//! Centralizes the knobs of the service so the config loader, the tests and
//! the README agree on them.

/// Environment variable names.
pub mod env {
    pub const STORE_PATH: &str = "STORE_PATH";
    pub const STORE_MAX_SIZE_MB: &str = "STORE_MAX_SIZE_MB";
    pub const UPSTREAM_HOST: &str = "UPSTREAM_HOST";
    pub const UPSTREAM_PORT: &str = "UPSTREAM_PORT";
    pub const WORKER_POOL_SIZE: &str = "WORKER_POOL_SIZE";
    pub const FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
    pub const FETCH_QUEUE_CAPACITY: &str = "FETCH_QUEUE_CAPACITY";
    pub const LISTEN_HOST: &str = "LISTEN_HOST";
    pub const LISTEN_PORT: &str = "LISTEN_PORT";
    pub const LOG_PATH: &str = "LOG_PATH";
}

/// Directory of the LMDB environment.
pub const DEFAULT_STORE_PATH: &str = "transactionsDB";

/// Store capacity in MiB.
pub const DEFAULT_STORE_MAX_SIZE_MB: usize = 10;

/// HTTP port of the upstream node.
pub const DEFAULT_UPSTREAM_PORT: u16 = 40403;

/// Workers per available core.
pub const WORKERS_PER_CORE: usize = 2;

/// Waiting fetches allowed per worker.
pub const QUEUED_FETCHES_PER_WORKER: usize = 4;

/// Per-fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

pub const DEFAULT_LISTEN_PORT: u16 = 7070;

pub const BYTES_PER_MB: usize = 1024 * 1024;
