//! Connector implementations

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agentmart_types::{AgentListing, AgentSlug, ConnectorKind, MartError, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for external agent connectors
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Get the connector name
    fn name(&self) -> &'static str;

    /// Get the connector kind
    fn kind(&self) -> ConnectorKind;

    /// Carry the payload to the external system and return its raw reply
    async fn invoke(
        &self,
        listing: &AgentListing,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value>;
}

// ============================================================================
// HTTP API Connector
// ============================================================================

/// Configuration for HTTP-backed connectors
#[derive(Debug, Clone)]
pub struct HttpConnectorConfig {
    /// Bounded timeout applied around each external call
    pub timeout: Duration,
}

impl Default for HttpConnectorConfig {
    fn default() -> Self {
        let timeout_secs = std::env::var("AGENTMART_CONNECTOR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Direct HTTP API connector
///
/// POSTs the agent-specific payload to the listing endpoint and returns the
/// JSON reply.
pub struct HttpApiConnector {
    config: HttpConnectorConfig,
    client: reqwest::Client,
}

impl HttpApiConnector {
    pub fn new(config: HttpConnectorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(HttpConnectorConfig::default())
    }

    fn endpoint<'a>(&self, listing: &'a AgentListing) -> Result<&'a str> {
        listing.endpoint.as_deref().ok_or_else(|| {
            MartError::internal(format!("listing '{}' has no endpoint configured", listing.slug))
        })
    }
}

#[async_trait]
impl AgentConnector for HttpApiConnector {
    fn name(&self) -> &'static str {
        "HttpApi"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::HttpApi
    }

    async fn invoke(
        &self,
        listing: &AgentListing,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let endpoint = self.endpoint(listing)?;
        debug!(slug = %listing.slug, endpoint, timeout = ?self.config.timeout, "invoking agent api");

        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| MartError::external(format!("request to {endpoint} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MartError::external(format!(
                "agent api at {endpoint} returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MartError::malformed(format!("reply was not valid JSON: {e}")))
    }
}

// ============================================================================
// Webhook Connector
// ============================================================================

/// Envelope delivered to webhook-backed agents
#[derive(Debug, Serialize)]
struct WebhookEnvelope<'a> {
    event: &'static str,
    agent: String,
    payload: &'a serde_json::Value,
    delivered_at: chrono::DateTime<chrono::Utc>,
}

/// Webhook connector
///
/// Same transport as [`HttpApiConnector`] but wraps the payload in a
/// delivery envelope so the receiving end can dispatch on the event name.
pub struct WebhookConnector {
    config: HttpConnectorConfig,
    client: reqwest::Client,
}

impl WebhookConnector {
    pub fn new(config: HttpConnectorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(HttpConnectorConfig::default())
    }
}

#[async_trait]
impl AgentConnector for WebhookConnector {
    fn name(&self) -> &'static str {
        "Webhook"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Webhook
    }

    async fn invoke(
        &self,
        listing: &AgentListing,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let endpoint = listing.endpoint.as_deref().ok_or_else(|| {
            MartError::internal(format!("listing '{}' has no endpoint configured", listing.slug))
        })?;

        let envelope = WebhookEnvelope {
            event: "agent.invoke",
            agent: listing.slug.to_string(),
            payload,
            delivered_at: chrono::Utc::now(),
        };
        debug!(slug = %listing.slug, endpoint, timeout = ?self.config.timeout, "delivering webhook");

        let response = self
            .client
            .post(endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| MartError::external(format!("webhook delivery to {endpoint} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MartError::external(format!(
                "webhook at {endpoint} returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MartError::malformed(format!("webhook reply was not valid JSON: {e}")))
    }
}

// ============================================================================
// Static Connector (demo and tests)
// ============================================================================

/// Canned-reply connector for demos and tests
///
/// Replies can be registered per slug; unregistered slugs get the default
/// reply. A failure message can be set to simulate a down external system.
#[derive(Clone, Default)]
pub struct StaticConnector {
    replies: Arc<RwLock<HashMap<AgentSlug, serde_json::Value>>>,
    default_reply: Arc<RwLock<Option<serde_json::Value>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl StaticConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector that always answers with the given reply
    pub fn always(reply: serde_json::Value) -> Self {
        Self {
            replies: Arc::new(RwLock::new(HashMap::new())),
            default_reply: Arc::new(RwLock::new(Some(reply))),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a canned reply for one slug
    pub async fn set_reply(&self, slug: AgentSlug, reply: serde_json::Value) {
        self.replies.write().await.insert(slug, reply);
    }

    /// Set the reply used for slugs with no registered reply
    pub async fn set_default_reply(&self, reply: serde_json::Value) {
        *self.default_reply.write().await = Some(reply);
    }

    /// Make every invocation fail with an external service error
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Clear a previously set failure
    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }
}

#[async_trait]
impl AgentConnector for StaticConnector {
    fn name(&self) -> &'static str {
        "Static"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Static
    }

    async fn invoke(
        &self,
        listing: &AgentListing,
        _payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(MartError::external(message));
        }

        if let Some(reply) = self.replies.read().await.get(&listing.slug) {
            return Ok(reply.clone());
        }

        self.default_reply
            .read()
            .await
            .clone()
            .ok_or_else(|| MartError::external(format!("no canned reply for '{}'", listing.slug)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmart_types::Amount;
    use serde_json::json;

    fn listing(slug: &str) -> AgentListing {
        AgentListing::new(AgentSlug::parse(slug).unwrap(), slug.to_string(), Amount::usd(1.0))
            .with_connector(ConnectorKind::Static, None)
    }

    #[tokio::test]
    async fn test_static_connector_per_slug_reply() {
        let connector = StaticConnector::new();
        let echo = listing("echo");
        connector
            .set_reply(echo.slug.clone(), json!({"success": true, "result": "pong"}))
            .await;

        let reply = connector.invoke(&echo, &json!({})).await.unwrap();
        assert_eq!(reply["result"], "pong");
    }

    #[tokio::test]
    async fn test_static_connector_default_reply() {
        let connector = StaticConnector::new();
        connector
            .set_default_reply(json!({"success": true, "result": "default"}))
            .await;

        let reply = connector.invoke(&listing("anything"), &json!({})).await.unwrap();
        assert_eq!(reply["result"], "default");
    }

    #[tokio::test]
    async fn test_static_connector_failure_and_recovery() {
        let connector = StaticConnector::new();
        connector
            .set_default_reply(json!({"success": true, "result": "ok"}))
            .await;
        connector.fail_with("upstream down").await;

        let err = connector.invoke(&listing("echo"), &json!({})).await.unwrap_err();
        assert!(matches!(err, MartError::ExternalService { .. }));

        connector.recover().await;
        assert!(connector.invoke(&listing("echo"), &json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_connector_requires_endpoint() {
        let connector = HttpApiConnector::from_env();
        let bare = listing("no-endpoint");

        let err = connector.invoke(&bare, &json!({})).await.unwrap_err();
        assert!(matches!(err, MartError::Internal { .. }));
    }
}
