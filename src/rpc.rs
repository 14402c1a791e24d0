//! JSON-RPC query client
//!
//! A [`ContractQueryClient`] that POSTs JSON-RPC 2.0 requests to a node's
//! HTTP endpoint. One request per call; failures are returned as
//! [`ClientError`] and never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::amount::CcdAmount;
use crate::client::{ContractAddress, ContractQueryClient, InstanceInfo, InvokeResult};
use crate::contract::ReceiveName;
use crate::error::ClientError;

/// Query client for a node's JSON-RPC endpoint
pub struct JsonRpcClient {
    url: String,
    /// reqwest::Client is internally Arc-based
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    /// `None` when the field is missing, `Some(Value::Null)` for an explicit null
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// `getInstanceInfo` result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceInfoResponse {
    version: u32,
    name: String,
    owner: String,
    /// micro-CCD as a decimal string
    amount: String,
    methods: Vec<String>,
}

/// `invokeContract` result
#[derive(Debug, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
enum InvokeResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        #[serde(default)]
        used_energy: u64,
        #[serde(default)]
        return_value: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        #[serde(default)]
        used_energy: u64,
        #[serde(default)]
        reason: Value,
    },
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_http_client(url, reqwest::Client::new())
    }

    /// Client whose requests give up after `timeout`
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::connection_failed(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http_client(url, http_client))
    }

    pub fn with_http_client(url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http_client,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, ClientError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        log::debug!("   → {} {}", method, request.params);

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("   ❌ HTTP request failed: {}", e);
                ClientError::connection_failed(format!("HTTP error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            log::error!("   ❌ HTTP error: {}", status);
            return Err(ClientError::QueryFailed(format!("HTTP {}", status)));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            log::error!("   ❌ JSON parse failed: {}", e);
            ClientError::invalid_response(format!("Invalid JSON: {}", e))
        })?;

        if let Some(error) = body.error {
            log::error!("   ❌ {} returned error {}: {}", method, error.code, error.message);
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        match body.result {
            None => {
                log::error!("   ❌ {} response has neither result nor error", method);
                Err(ClientError::invalid_response(
                    "response has neither result nor error",
                ))
            }
            Some(Value::Null) => Ok(None),
            Some(result) => serde_json::from_value(result).map(Some).map_err(|e| {
                log::error!("   ❌ Unexpected {} result: {}", method, e);
                ClientError::invalid_response(format!("Unexpected {} result: {}", method, e))
            }),
        }
    }
}

#[async_trait]
impl ContractQueryClient for JsonRpcClient {
    async fn get_instance_info(
        &self,
        address: ContractAddress,
    ) -> Result<Option<InstanceInfo>, ClientError> {
        let response: Option<InstanceInfoResponse> = self
            .call("getInstanceInfo", json!({ "address": address }))
            .await?;

        response
            .map(|info| {
                let amount = info.amount.parse::<u64>().map_err(|e| {
                    ClientError::invalid_response(format!(
                        "Invalid amount \"{}\": {}",
                        info.amount, e
                    ))
                })?;
                Ok(InstanceInfo {
                    version: info.version,
                    name: info.name,
                    owner: info.owner,
                    amount: CcdAmount::from_micro_ccd(amount),
                    methods: info.methods,
                })
            })
            .transpose()
    }

    async fn invoke_contract(
        &self,
        address: ContractAddress,
        method: &ReceiveName,
    ) -> Result<InvokeResult, ClientError> {
        let response: InvokeResponse = self
            .call(
                "invokeContract",
                json!({
                    "contract": address,
                    "method": method,
                    "amount": "0",
                }),
            )
            .await?
            .ok_or_else(|| ClientError::invalid_response("invokeContract returned no result"))?;

        match response {
            InvokeResponse::Success {
                used_energy,
                return_value,
            } => {
                let return_value = return_value
                    .map(|hex_value| {
                        hex::decode(&hex_value).map_err(|e| {
                            ClientError::invalid_response(format!("Invalid return value: {}", e))
                        })
                    })
                    .transpose()?;
                Ok(InvokeResult::Success {
                    return_value,
                    used_energy,
                })
            }
            InvokeResponse::Failure {
                used_energy,
                reason,
            } => Ok(InvokeResult::Failure {
                reason: match reason {
                    Value::String(reason) => reason,
                    other => other.to_string(),
                },
                used_energy,
            }),
        }
    }
}
