// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface of the service.
//!
//! - `GET /transactions/{key}`: the block's transactions as JSON
//! - `GET /getTransaction/{key}`: same, under the path older clients use
//! - `GET /status`: liveness, always `OK`

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cache::TransactionCache;
use crate::errors::{CacheError, FetchError, KeyError};
use crate::types::key::BlockKey;

/// Builds the service router over a shared cache.
pub fn router(cache: Arc<TransactionCache>) -> Router {
    Router::new()
        .route("/transactions/:key", get(get_transactions))
        .route("/getTransaction/:key", get(get_transactions))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(cache)
}

/// Handler for `/transactions/{key}` and `/getTransaction/{key}`.
async fn get_transactions(
    State(cache): State<Arc<TransactionCache>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let key = BlockKey::new(&key)?;
    info!(key = %key, "Received transactions request");

    let entry = cache.resolve(&key).await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], entry.to_vec()).into_response())
}

async fn status() -> &'static str {
    "OK"
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid block key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ApiError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ApiError::Cache(CacheError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Cache(CacheError::Fetch(e)) => match e {
                FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                FetchError::Overloaded { .. } | FetchError::PoolClosed => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                FetchError::Upstream { .. }
                | FetchError::NotFound { .. }
                | FetchError::MalformedResponse { .. }
                | FetchError::WorkerFailed { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Internal server error");
            "Internal server error".to_string()
        } else {
            warn!(error = %self, status = status.as_u16(), "Request failed");
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
