use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcClientError;

/// Request id used for every call. Correlation is advisory: the stub
/// services answer with `id: 1` regardless of the request, so the client
/// warns on a mismatch instead of failing the call.
pub const CALL_ID: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

pub struct RpcClient {
    base_url: String,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(base_url: String, call_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { base_url, client }
    }

    /// Issue one JSON-RPC call and return the `result` member, which may be
    /// `Value::Null`. An error envelope becomes `RpcClientError::Rpc` with the
    /// payload serialized; anything below the envelope (connect, timeout,
    /// non-JSON body) becomes `RpcClientError::Transport`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        let request = RpcRequest {
            id: CALL_ID,
            method: method.to_string(),
            params,
        };

        tracing::debug!("rpc call {} -> {}", request.method, self.base_url);

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcClientError::Transport {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let envelope: RpcResponse =
            response
                .json()
                .await
                .map_err(|e| RpcClientError::Transport {
                    url: self.base_url.clone(),
                    reason: e.to_string(),
                })?;

        if let Some(payload) = envelope.error.filter(|e| !e.is_null()) {
            return Err(RpcClientError::Rpc {
                payload: payload.to_string(),
            });
        }

        if envelope.id != Value::from(CALL_ID) {
            tracing::warn!(
                "response id {} does not match request id {}",
                envelope.id,
                CALL_ID
            );
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}
