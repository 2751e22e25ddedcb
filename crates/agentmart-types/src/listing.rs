//! Catalog listing types
//!
//! A listing describes one purchasable agent capability: its slug, display
//! name, price, and which connector drives it. Listings are mutated only
//! through catalog administrative operations; the processor just reads them.

use crate::{Amount, ListingId, MartError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL-safe identifier for an agent listing
///
/// Slugs are lowercase ASCII alphanumerics and hyphens, non-empty, and unique
/// within the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSlug(String);

impl AgentSlug {
    /// Parse and validate a slug
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(MartError::InvalidSlug {
                slug: s.to_string(),
                reason: "slug must not be empty".to_string(),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(MartError::InvalidSlug {
                slug: s.to_string(),
                reason: "slug must be lowercase alphanumerics and hyphens".to_string(),
            });
        }
        if s.starts_with('-') || s.ends_with('-') {
            return Err(MartError::InvalidSlug {
                slug: s.to_string(),
                reason: "slug must not start or end with a hyphen".to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Get the slug as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which connector implementation drives an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Direct HTTP API call
    HttpApi,
    /// Webhook delivery with an envelope
    Webhook,
    /// Canned replies (demo and tests)
    Static,
}

impl ConnectorKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http_api" | "http-api" | "http" | "api" => Some(Self::HttpApi),
            "webhook" => Some(Self::Webhook),
            "static" | "canned" => Some(Self::Static),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpApi => write!(f, "http_api"),
            Self::Webhook => write!(f, "webhook"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// A purchasable agent capability in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentListing {
    /// Unique listing ID
    pub id: ListingId,
    /// Unique URL-safe identifier
    pub slug: AgentSlug,
    /// Display name
    pub name: String,
    /// Description shown to buyers
    pub description: String,
    /// Price charged per successful invocation
    pub price: Amount,
    /// Whether the listing accepts new requests
    pub active: bool,
    /// Whether the agent keeps per-session conversation state
    pub conversational: bool,
    /// Which connector drives this agent
    pub connector: ConnectorKind,
    /// Endpoint for HTTP/webhook connectors
    pub endpoint: Option<String>,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
}

impl AgentListing {
    /// Create a new active listing
    pub fn new(slug: AgentSlug, name: impl Into<String>, price: Amount) -> Self {
        let now = Utc::now();
        Self {
            id: ListingId::new(),
            slug,
            name: name.into(),
            description: String::new(),
            price,
            active: true,
            conversational: false,
            connector: ConnectorKind::HttpApi,
            endpoint: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the connector and endpoint
    pub fn with_connector(mut self, connector: ConnectorKind, endpoint: Option<String>) -> Self {
        self.connector = connector;
        self.endpoint = endpoint;
        self
    }

    /// Mark the agent as conversational (multi-turn sessions)
    pub fn conversational(mut self) -> Self {
        self.conversational = true;
        self
    }
}
