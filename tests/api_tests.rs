// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP route tests
//!
//! Requests go straight into the router with `oneshot`; no socket is bound.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use blocktx::{router, FetchOffloader, TransactionCache};
use helpers::{build_cache, payload_for, temp_store, MockSource, TEST_STORE_BYTES};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(source: Arc<MockSource>) -> (TempDir, Router) {
    let (dir, store) = temp_store(TEST_STORE_BYTES);
    let cache = build_cache(source, store, 2);
    (dir, router(cache))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

fn error_status(body: &[u8]) -> u64 {
    let json: Value = serde_json::from_slice(body).unwrap();
    assert!(json["error"].is_string());
    json["status"].as_u64().unwrap()
}

#[tokio::test]
async fn test_status_route() {
    let (_dir, app) = app(MockSource::new().into_arc());

    let (status, _, body) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_transactions_served_verbatim() {
    let source = MockSource::new().into_arc();
    let (_dir, app) = app(source.clone());

    let (status, content_type, body) = get(&app, "/transactions/b1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, payload_for("b1"));

    // The legacy path resolves through the same cache
    let (status, _, body) = get(&app, "/getTransaction/b1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, payload_for("b1"));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_invalid_key_is_bad_request() {
    let source = MockSource::new().into_arc();
    let (_dir, app) = app(source.clone());

    let (status, content_type, body) = get(&app, "/transactions/not.a.key").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(error_status(&body), 400);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let (_dir, app) = app(MockSource::new().always_failing().into_arc());

    let (status, _, body) = get(&app, "/transactions/b2").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_status(&body), 502);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetch_timeout_is_gateway_timeout() {
    let source = MockSource::new()
        .with_delay(Duration::from_millis(300))
        .into_arc();
    let (_dir, store) = temp_store(TEST_STORE_BYTES);
    let offloader =
        FetchOffloader::new(source, 1, 1).with_timeout(Some(Duration::from_millis(20)));
    let app = router(Arc::new(TransactionCache::new(store, offloader)));

    let (status, _, body) = get(&app, "/transactions/slow").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_status(&body), 504);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (_dir, app) = app(MockSource::new().into_arc());

    let (status, _, _) = get(&app, "/transactions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
