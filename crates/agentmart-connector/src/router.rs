//! Connector router - selects the connector a listing is driven by

use std::collections::HashMap;
use std::sync::Arc;

use agentmart_types::{AgentListing, ConnectorKind, MartError, Result};

use crate::connectors::*;

/// Routes each listing to the connector implementation for its kind
#[derive(Clone, Default)]
pub struct ConnectorRouter {
    connectors: HashMap<ConnectorKind, Arc<dyn AgentConnector>>,
}

impl ConnectorRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router with the HTTP-backed connectors configured from the
    /// environment
    pub fn from_env() -> Self {
        Self::new()
            .with(Arc::new(HttpApiConnector::from_env()))
            .with(Arc::new(WebhookConnector::from_env()))
    }

    /// Register a connector under its own kind
    pub fn with(mut self, connector: Arc<dyn AgentConnector>) -> Self {
        self.connectors.insert(connector.kind(), connector);
        self
    }

    /// Get the connector for a listing
    pub fn route(&self, listing: &AgentListing) -> Result<Arc<dyn AgentConnector>> {
        self.connectors
            .get(&listing.connector)
            .cloned()
            .ok_or_else(|| {
                MartError::internal(format!(
                    "no connector registered for kind '{}'",
                    listing.connector
                ))
            })
    }

    /// Carry a payload to the external system behind a listing
    pub async fn invoke(
        &self,
        listing: &AgentListing,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.route(listing)?.invoke(listing, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmart_types::{AgentSlug, Amount};
    use serde_json::json;

    fn static_listing(slug: &str) -> AgentListing {
        AgentListing::new(AgentSlug::parse(slug).unwrap(), slug.to_string(), Amount::usd(1.0))
            .with_connector(ConnectorKind::Static, None)
    }

    #[tokio::test]
    async fn test_route_to_registered_connector() {
        let router = ConnectorRouter::new().with(Arc::new(StaticConnector::always(
            json!({"success": true, "result": "ok"}),
        )));

        let reply = router
            .invoke(&static_listing("echo"), &json!({}))
            .await
            .unwrap();
        assert_eq!(reply["result"], "ok");
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_internal_error() {
        let router = ConnectorRouter::new();
        let err = router
            .invoke(&static_listing("echo"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MartError::Internal { .. }));
    }
}
