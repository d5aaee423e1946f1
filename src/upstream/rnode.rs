// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for an RNode transaction report endpoint.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{blocking::Client, StatusCode};
use tracing::{debug, info};
use url::Url;

use super::types::render_payload;
use super::TransactionSource;
use crate::errors::FetchError;
use crate::types::{entry::CacheEntry, key::BlockKey};

/// Path under which the node serves per-block transaction reports.
const TRANSACTIONS_PATH: &str = "api/transactions/";

/// Blocking client for `GET {base}/api/transactions/{block}`.
///
/// The underlying `reqwest` blocking client is built lazily on the first
/// fetch, which always happens on a blocking worker thread.
#[derive(Debug)]
pub struct RNodeClient {
    endpoint: Url,
    request_timeout: Option<Duration>,
    client: OnceLock<Client>,
}

impl RNodeClient {
    /// Creates a client for the node at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `host` does not form a valid URL.
    pub fn new(host: &str, port: u16) -> Result<Self, url::ParseError> {
        let base = Url::parse(&format!("http://{host}:{port}/"))?;
        Ok(Self {
            endpoint: base.join(TRANSACTIONS_PATH)?,
            request_timeout: None,
            client: OnceLock::new(),
        })
    }

    /// Sets the HTTP request timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// URL queried for `key`.
    pub fn url_for(&self, key: &BlockKey) -> Result<Url, url::ParseError> {
        self.endpoint.join(key.as_str())
    }

    fn client(&self, key: &BlockKey) -> Result<&Client, FetchError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let mut builder = Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::upstream(key.as_str(), e))?;
        info!(endpoint = %self.endpoint, "Created upstream HTTP client");
        Ok(self.client.get_or_init(|| client))
    }
}

impl TransactionSource for RNodeClient {
    fn fetch_transactions(&self, key: &BlockKey) -> Result<CacheEntry, FetchError> {
        let url = self
            .url_for(key)
            .map_err(|e| FetchError::upstream(key.as_str(), e))?;

        debug!(key = %key, url = %url, "Requesting transactions from upstream");

        let response = self
            .client(key)?
            .get(url)
            .send()
            .map_err(|e| FetchError::upstream(key.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(key.as_str()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| FetchError::upstream(key.as_str(), e))?;
        let body = response
            .bytes()
            .map_err(|e| FetchError::upstream(key.as_str(), e))?;

        debug!(key = %key, status = %status, len = body.len(), "Received upstream response");
        render_payload(key, &body)
    }

    fn name(&self) -> &'static str {
        "rnode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_key() {
        let client = RNodeClient::new("node.example", 40403).unwrap();
        let key = BlockKey::new("abc123").unwrap();

        assert_eq!(
            client.url_for(&key).unwrap().as_str(),
            "http://node.example:40403/api/transactions/abc123"
        );
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(RNodeClient::new("bad host", 40403).is_err());
    }

    #[test]
    fn test_unreachable_upstream_is_upstream_error() {
        // Port 9 (discard) on localhost is normally closed.
        let client = RNodeClient::new("127.0.0.1", 9)
            .unwrap()
            .with_request_timeout(Some(Duration::from_secs(2)));
        let key = BlockKey::new("b1").unwrap();

        let result = client.fetch_transactions(&key);
        assert!(matches!(result, Err(FetchError::Upstream { .. })));
    }
}
