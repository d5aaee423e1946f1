// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream transaction report types and their client-facing rendering.
//!
//! The upstream reports one [`DeployTransactions`] per deploy in the block.
//! Clients receive an array with one element per deploy, each an array of
//! [`TransactionRecord`]s that carry a copy of their deploy's metadata.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::errors::FetchError;
use crate::types::{entry::CacheEntry, key::BlockKey};

/// Deploy metadata, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployInfo {
    pub deployer: String,
    pub term: String,
    pub timestamp: i64,
    pub sig: String,
    pub sig_algorithm: String,
    pub phlo_price: i64,
    pub phlo_limit: i64,
    pub valid_after_block_number: i64,
    pub cost: u64,
    pub errored: bool,
    #[serde(default)]
    pub system_deploy_error: String,
}

/// A transfer as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamTransaction {
    pub from_addr: String,
    pub to_addr: String,
    pub amount: i64,
    /// Serialized unforgeable return channel, hex encoded
    pub ret_unforgeable: String,
    pub success: bool,
    #[serde(default)]
    pub reason: String,
}

/// All transfers produced by one deploy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployTransactions {
    pub deploy_info: DeployInfo,
    #[serde(default)]
    pub transactions: Vec<UpstreamTransaction>,
}

/// A transfer as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub from_addr: String,
    pub to_addr: String,
    pub amount: i64,
    /// Serialized unforgeable return channel, base64 encoded
    pub ret_unforgeable: String,
    pub deploy: DeployInfo,
    pub success: bool,
    pub reason: String,
}

/// Converts an upstream report into client records.
///
/// # Errors
///
/// Returns [`FetchError::MalformedResponse`] if a return channel is not
/// valid hex.
pub fn render_records(
    key: &BlockKey,
    deploys: Vec<DeployTransactions>,
) -> Result<Vec<Vec<TransactionRecord>>, FetchError> {
    deploys
        .into_iter()
        .map(|deploy| {
            let DeployTransactions {
                deploy_info,
                transactions,
            } = deploy;
            transactions
                .into_iter()
                .map(|tx| {
                    let raw = hex::decode(tx.ret_unforgeable.trim_start_matches("0x")).map_err(
                        |e| FetchError::malformed(key.as_str(), format!("retUnforgeable: {e}")),
                    )?;
                    Ok::<_, FetchError>(TransactionRecord {
                        from_addr: tx.from_addr,
                        to_addr: tx.to_addr,
                        amount: tx.amount,
                        ret_unforgeable: STANDARD.encode(raw),
                        deploy: deploy_info.clone(),
                        success: tx.success,
                        reason: tx.reason,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// Decodes an upstream body and renders it into the cached JSON payload.
///
/// # Errors
///
/// Returns [`FetchError::MalformedResponse`] if the body is not a valid
/// report.
pub fn render_payload(key: &BlockKey, body: &[u8]) -> Result<CacheEntry, FetchError> {
    let deploys: Vec<DeployTransactions> = serde_json::from_slice(body)
        .map_err(|e| FetchError::malformed(key.as_str(), e.to_string()))?;
    let records = render_records(key, deploys)?;
    let json = serde_json::to_vec(&records)
        .map_err(|e| FetchError::malformed(key.as_str(), e.to_string()))?;
    Ok(CacheEntry::from(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> BlockKey {
        BlockKey::new("b1").unwrap()
    }

    fn deploy_info() -> serde_json::Value {
        json!({
            "deployer": "04ab",
            "term": "new x in { x!(1) }",
            "timestamp": 1_700_000_000_000i64,
            "sig": "3045",
            "sigAlgorithm": "secp256k1",
            "phloPrice": 1,
            "phloLimit": 500_000,
            "validAfterBlockNumber": 42,
            "cost": 1234,
            "errored": false,
            "systemDeployError": ""
        })
    }

    #[test]
    fn test_render_payload_shape() {
        let body = json!([{
            "deployInfo": deploy_info(),
            "transactions": [{
                "fromAddr": "1111a",
                "toAddr": "1111b",
                "amount": 100,
                "retUnforgeable": "0a0b0c",
                "success": true,
                "reason": ""
            }]
        }]);

        let entry = render_payload(&key(), body.to_string().as_bytes()).unwrap();
        let rendered: serde_json::Value = serde_json::from_slice(entry.as_bytes()).unwrap();

        let record = &rendered[0][0];
        assert_eq!(record["fromAddr"], "1111a");
        assert_eq!(record["toAddr"], "1111b");
        assert_eq!(record["amount"], 100);
        assert_eq!(record["retUnforgeable"], STANDARD.encode([0x0a, 0x0b, 0x0c]));
        assert_eq!(record["deploy"]["phloLimit"], 500_000);
        assert_eq!(record["success"], true);
        assert_eq!(record["reason"], "");
    }

    #[test]
    fn test_one_array_per_deploy() {
        let body = json!([
            { "deployInfo": deploy_info(), "transactions": [] },
            { "deployInfo": deploy_info() }
        ]);

        let entry = render_payload(&key(), body.to_string().as_bytes()).unwrap();
        let rendered: Vec<Vec<TransactionRecord>> =
            serde_json::from_slice(entry.as_bytes()).unwrap();

        assert_eq!(rendered.len(), 2);
        assert!(rendered.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let result = render_payload(&key(), b"{not json");
        assert!(matches!(result, Err(FetchError::MalformedResponse { .. })));
    }

    #[test]
    fn test_invalid_hex_is_malformed() {
        let body = json!([{
            "deployInfo": deploy_info(),
            "transactions": [{
                "fromAddr": "a",
                "toAddr": "b",
                "amount": 1,
                "retUnforgeable": "zz",
                "success": false,
                "reason": "insufficient funds"
            }]
        }]);

        let result = render_payload(&key(), body.to_string().as_bytes());
        assert!(matches!(result, Err(FetchError::MalformedResponse { .. })));
    }
}
