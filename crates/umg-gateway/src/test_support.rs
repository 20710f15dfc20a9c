//! Test support: a scriptable mock provider client.
//!
//! `MockProvider` returns canned per-tool responses, records every invoke
//! so tests can assert on argument rewriting (or on the absence of any
//! network call), and can be flipped unhealthy or into a failure mode.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::provider::{
    Capabilities, HealthState, HealthStatus, ProviderClient, ProviderError, ProviderToolDef,
};

/// How a failing mock should fail.
#[derive(Debug, Clone)]
pub enum FailMode {
    Transport(String),
    Remote(String),
    Timeout(u64),
}

pub struct MockProvider {
    name: String,
    address: String,
    responses: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    fail_mode: Mutex<Option<FailMode>>,
    health: HealthState,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: format!("mock://{name}"),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_mode: Mutex::new(None),
            health: HealthState::new(),
        }
    }

    /// A mock whose every invoke fails the given way.
    pub fn failing(name: &str, mode: FailMode) -> Self {
        let mock = Self::new(name);
        *mock.fail_mode.lock().unwrap() = Some(mode);
        mock
    }

    /// Builder: canned result for one provider tool.
    pub fn with_response(self, tool: &str, result: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), result);
        self
    }

    pub fn set_response(&self, tool: &str, result: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), result);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.health.set_healthy(healthy);
    }

    pub fn set_fail_mode(&self, mode: Option<FailMode>) {
        *self.fail_mode.lock().unwrap() = mode;
    }

    /// Every (tool, payload) pair invoked so far.
    pub fn recorded_calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_capabilities(&self, _timeout: Duration) -> Result<Capabilities, ProviderError> {
        let tools = self
            .responses
            .lock()
            .unwrap()
            .keys()
            .map(|tool| ProviderToolDef {
                name: tool.clone(),
                description: format!("Mock tool {tool}"),
                input_schema: None,
            })
            .collect();
        Ok(Capabilities {
            tools,
            provider_version: "mock-0.1".to_string(),
        })
    }

    async fn invoke(
        &self,
        tool_name: &str,
        payload: Map<String, Value>,
        _correlation_id: &str,
        _timeout: Duration,
    ) -> Result<Value, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), payload));

        if let Some(mode) = self.fail_mode.lock().unwrap().clone() {
            return Err(match mode {
                FailMode::Transport(message) => ProviderError::Transport(message),
                FailMode::Remote(message) => ProviderError::Remote(message),
                FailMode::Timeout(ms) => ProviderError::Timeout(ms),
            });
        }

        self.responses
            .lock()
            .unwrap()
            .get(tool_name)
            .cloned()
            .ok_or_else(|| ProviderError::Remote(format!("unknown tool: {tool_name}")))
    }

    async fn health_check(&self) -> bool {
        if self.health.is_healthy() {
            self.health.record_success();
            true
        } else {
            self.health.record_failure();
            false
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
    use serde_json::json;

    #[tokio::test]
    async fn mock_returns_canned_response() {
        let mock = MockProvider::new("binance")
            .with_response("binance.get_ticker", json!({"bidPrice": "1"}));

        let result = mock
            .invoke("binance.get_ticker", Map::new(), "corr", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result["bidPrice"], json!("1"));
        assert_eq!(mock.recorded_calls().len(), 1);
    }

    #[tokio::test]
    async fn mock_unknown_tool_is_remote_error() {
        let mock = MockProvider::new("binance");
        let err = mock
            .invoke("binance.nope", Map::new(), "corr", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote(_)));
    }

    #[tokio::test]
    async fn mock_capabilities_reflect_responses() {
        let mock = MockProvider::new("binance")
            .with_response("binance.get_ticker", json!({}))
            .with_response("binance.get_klines", json!({}));
        let caps = mock.list_capabilities(Duration::from_secs(1)).await.unwrap();
        assert_eq!(caps.tools.len(), 2);
    }
}
