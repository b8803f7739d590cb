//! Bounded-retry JSON-RPC gateway.
//!
//! Every node interaction goes through [`RpcClient::invoke`]: transport
//! errors, non-2xx statuses, JSON-RPC error objects and null results are
//! all retried a bounded number of times with a fixed delay, and calls
//! are spaced out so tight polling loops cannot overload the node.
//!
//! Request parameters are never logged; `importRawKey` carries secret
//! key material.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};
use url::Url;

use crate::metrics::RPC_RETRIES;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node returned HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("node returned error for {method}: {message}")]
    Node {
        method: &'static str,
        message: String,
    },
    #[error("empty result for {method}")]
    EmptyResult { method: &'static str },
    #[error("unexpected response shape for {method}: {detail}")]
    Decode {
        method: &'static str,
        detail: String,
    },
}

/// Retry and pacing knobs for the gateway.
#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Total attempts per call, including the first one.
    pub max_retries: u32,
    /// Sleep between failed attempts.
    pub retry_delay: Duration,
    /// Minimum spacing between any two calls.
    pub min_spacing: Duration,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            min_spacing: Duration::from_millis(500),
        }
    }
}

/// Seam between the retry logic and the actual HTTP round trip, so
/// tests can script transport behavior.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts one JSON-RPC request body and returns the parsed response
    /// body.
    async fn post(&self, body: Value) -> Result<Value, RpcError>;
}

/// [`Transport`] over plain HTTP POST.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: Value) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    result: Option<Value>,
    error: Option<NodeError>,
}

#[derive(Deserialize)]
struct NodeError {
    message: String,
}

enum ResultPolicy {
    /// A null or absent result is a failure (callers would dereference
    /// absent data otherwise).
    Required,
    /// The method legitimately returns nothing on success, e.g.
    /// `unlockAccount`.
    Optional,
}

pub struct RpcClient<T> {
    transport: T,
    settings: RpcSettings,
    last_call: Mutex<Option<Instant>>,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T, settings: RpcSettings) -> Self {
        Self {
            transport,
            settings,
            last_call: Mutex::new(None),
        }
    }

    /// Invokes a method whose result must carry data.
    pub async fn invoke(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        self.call(method, params, ResultPolicy::Required).await
    }

    /// Invokes a method whose success response is empty.
    pub async fn invoke_void(&self, method: &'static str, params: Value) -> Result<(), RpcError> {
        self.call(method, params, ResultPolicy::Optional)
            .await
            .map(|_| ())
    }

    async fn call(
        &self,
        method: &'static str,
        params: Value,
        policy: ResultPolicy,
    ) -> Result<Value, RpcError> {
        let mut attempt = 1;
        loop {
            self.pace().await;
            match self.call_once(method, &params, &policy).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.settings.max_retries => {
                    counter!(RPC_RETRIES, "method" => method).increment(1);
                    warn!(
                        method,
                        attempt,
                        error = %err,
                        "rpc call failed, retrying",
                    );
                    attempt += 1;
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(err) => {
                    error!(method, attempts = attempt, error = %err, "rpc call failed");
                    return Err(err);
                }
            }
        }
    }

    async fn call_once(
        &self,
        method: &'static str,
        params: &Value,
        policy: &ResultPolicy,
    ) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self.transport.post(body).await?;
        let envelope: ResponseEnvelope =
            serde_json::from_value(response).map_err(|e| RpcError::Decode {
                method,
                detail: e.to_string(),
            })?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Node {
                method,
                message: err.message,
            });
        }

        // The node wraps payloads in a `data` envelope.
        let result = match envelope.result {
            Some(Value::Object(mut map)) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            Some(other) => other,
            None => Value::Null,
        };

        match (result, policy) {
            (Value::Null, ResultPolicy::Required) => Err(RpcError::EmptyResult { method }),
            (result, _) => Ok(result),
        }
    }

    /// Enforces the minimum inter-call spacing. The lock is held across
    /// the sleep so concurrent callers stay serialized.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.settings.min_spacing {
                let wait = self.settings.min_spacing - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "pacing rpc call");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
