use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Timeout for the capabilities call doubling as a health probe.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

/// Provider-side failure kinds.
///
/// `Remote` is an application-level error field in an otherwise successful
/// reply; `Transport`/`Timeout` mean the invocation itself failed. The
/// router wraps all of them, but callers can still tell them apart through
/// the source chain.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned error: {0}")]
    Remote(String),

    #[error("provider call timed out after {0} ms")]
    Timeout(u64),

    #[error("failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Capability descriptor set reported by one provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Capabilities {
    #[serde(default)]
    pub tools: Vec<ProviderToolDef>,
    #[serde(default)]
    pub provider_version: String,
}

/// One provider-native tool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Point-in-time health snapshot for one provider client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthStatus {
    pub provider: String,
    pub address: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    /// Unix millis of the last health check; `None` before the first check.
    pub last_check_unix_ms: Option<u64>,
}

/// Health bookkeeping shared by client implementations. Mutated only by
/// health checks; reads are lock-free.
#[derive(Debug)]
pub struct HealthState {
    healthy: AtomicBool,
    consecutive_failures: AtomicU32,
    last_check_unix_ms: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            consecutive_failures: AtomicU32::new(0),
            last_check_unix_ms: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.stamp();
    }

    pub fn record_failure(&self) -> u32 {
        self.healthy.store(false, Ordering::Relaxed);
        self.stamp();
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn snapshot(&self, provider: &str, address: &str) -> HealthStatus {
        let last = self.last_check_unix_ms.load(Ordering::Relaxed);
        HealthStatus {
            provider: provider.to_string(),
            address: address.to_string(),
            healthy: self.is_healthy(),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_check_unix_ms: (last > 0).then_some(last),
        }
    }

    fn stamp(&self) {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.last_check_unix_ms.store(now, Ordering::Relaxed);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// The invoke/discover/health capability set the gateway needs from one
/// upstream provider. Mockable for testing.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;

    async fn list_capabilities(&self, timeout: Duration) -> Result<Capabilities, ProviderError>;

    /// Invoke a provider tool. The payload is the already-rewritten
    /// argument map (no `venue`, provider-native key names).
    async fn invoke(
        &self,
        tool_name: &str,
        payload: Map<String, Value>,
        correlation_id: &str,
        timeout: Duration,
    ) -> Result<Value, ProviderError>;

    /// Probe the provider and update health state. Returns the new state.
    async fn health_check(&self) -> bool;

    fn is_healthy(&self) -> bool;

    fn health_status(&self) -> HealthStatus;
}

/// JSON-over-HTTP provider client.
///
/// `POST {address}/invoke` with `{tool_name, payload, correlation_id}`;
/// `GET {address}/capabilities`. The reply is `{"result": ...}` or
/// `{"error": "..."}`. Connection pooling is reqwest's.
pub struct HttpProviderClient {
    name: String,
    address: String,
    http: reqwest::Client,
    health: HealthState,
}

impl HttpProviderClient {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            http: reqwest::Client::new(),
            health: HealthState::new(),
        }
    }

    async fn post_invoke(
        &self,
        tool_name: &str,
        payload: &Map<String, Value>,
        correlation_id: &str,
    ) -> Result<Value, ProviderError> {
        let body = serde_json::json!({
            "tool_name": tool_name,
            "payload": payload,
            "correlation_id": correlation_id,
        });

        let response = self
            .http
            .post(format!("{}/invoke", self.address))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "{} returned HTTP {status}",
                self.address
            )));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if let Some(error) = reply.get("error").and_then(Value::as_str) {
            return Err(ProviderError::Remote(error.to_string()));
        }

        reply
            .get("result")
            .cloned()
            .ok_or_else(|| ProviderError::Transport("reply missing 'result' field".to_string()))
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_capabilities(&self, timeout: Duration) -> Result<Capabilities, ProviderError> {
        let request = async {
            let response = self
                .http
                .get(format!("{}/capabilities", self.address))
                .send()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            response
                .json::<Capabilities>()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))
        };

        let capabilities = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(timeout.as_millis() as u64))??;

        debug!(
            provider = %self.name,
            tools = capabilities.tools.len(),
            "Retrieved provider capabilities"
        );
        Ok(capabilities)
    }

    async fn invoke(
        &self,
        tool_name: &str,
        payload: Map<String, Value>,
        correlation_id: &str,
        timeout: Duration,
    ) -> Result<Value, ProviderError> {
        tokio::time::timeout(timeout, self.post_invoke(tool_name, &payload, correlation_id))
            .await
            .map_err(|_| ProviderError::Timeout(timeout.as_millis() as u64))?
    }

    async fn health_check(&self) -> bool {
        match self.list_capabilities(HEALTH_CHECK_TIMEOUT).await {
            Ok(_) => {
                self.health.record_success();
                debug!(provider = %self.name, "Health check passed");
                true
            }
            Err(e) => {
                let failures = self.health.record_failure();
                warn!(
                    provider = %self.name,
                    consecutive_failures = failures,
                    error = %e,
                    "Health check failed"
                );
                false
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    fn health_status(&self) -> HealthStatus {
        self.health.snapshot(&self.name, &self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_starts_healthy() {
        let state = HealthState::new();
        assert!(state.is_healthy());
        let snapshot = state.snapshot("binance", "http://localhost:50051");
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.last_check_unix_ms.is_none());
    }

    #[test]
    fn failures_accumulate_until_success() {
        let state = HealthState::new();
        assert_eq!(state.record_failure(), 1);
        assert_eq!(state.record_failure(), 2);
        assert!(!state.is_healthy());

        state.record_success();
        assert!(state.is_healthy());
        let snapshot = state.snapshot("binance", "addr");
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.last_check_unix_ms.is_some());
    }

    #[test]
    fn capabilities_deserialize_with_defaults() {
        let caps: Capabilities = serde_json::from_str(
            r#"{"tools": [{"name": "binance.get_ticker"}], "provider_version": "1.2.0"}"#,
        )
        .unwrap();
        assert_eq!(caps.tools.len(), 1);
        assert_eq!(caps.tools[0].name, "binance.get_ticker");
        assert!(caps.tools[0].input_schema.is_none());
    }
}
