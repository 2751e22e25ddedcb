//! Agentmart Catalog - slug-keyed registry of agent listings
//!
//! The catalog is:
//! - Slug-keyed (one listing per slug, slugs are unique)
//! - Read-mostly (the processor only ever calls [`Catalog::lookup`])
//! - Mutated only through administrative operations (publish, retire,
//!   reprice, rename)
//!
//! # Invariants
//!
//! 1. `lookup` resolves only active listings; a retired or unknown slug is
//!    `AgentNotFound`
//! 2. Request cost snapshots are taken by the caller at submission time, so
//!    `reprice` never affects in-flight requests

use std::collections::HashMap;
use std::sync::Arc;

use agentmart_types::{AgentListing, AgentSlug, Amount, MartError, Result};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The agent catalog
///
/// Thread-safe, in-memory, designed for concurrent readers.
#[derive(Clone, Default)]
pub struct Catalog {
    listings: Arc<RwLock<HashMap<AgentSlug, AgentListing>>>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a listing, replacing any existing listing under the same slug
    pub async fn publish(&self, listing: AgentListing) -> Result<AgentSlug> {
        let slug = listing.slug.clone();
        let mut listings = self.listings.write().await;
        info!(slug = %slug, price = %listing.price, "publishing listing");
        listings.insert(slug.clone(), listing);
        Ok(slug)
    }

    /// Resolve a slug to an active listing
    ///
    /// Unknown and retired slugs are both `AgentNotFound`; callers never see
    /// inactive listings.
    pub async fn lookup(&self, slug: &AgentSlug) -> Result<AgentListing> {
        let listings = self.listings.read().await;
        match listings.get(slug) {
            Some(listing) if listing.active => Ok(listing.clone()),
            _ => {
                debug!(slug = %slug, "lookup missed");
                Err(MartError::AgentNotFound {
                    slug: slug.to_string(),
                })
            }
        }
    }

    /// Retire a listing (stops new requests; existing requests are unaffected)
    pub async fn retire(&self, slug: &AgentSlug) -> Result<()> {
        let mut listings = self.listings.write().await;
        let listing = listings.get_mut(slug).ok_or_else(|| MartError::AgentNotFound {
            slug: slug.to_string(),
        })?;
        listing.active = false;
        listing.updated_at = Utc::now();
        info!(slug = %slug, "listing retired");
        Ok(())
    }

    /// Reactivate a retired listing
    pub async fn reactivate(&self, slug: &AgentSlug) -> Result<()> {
        let mut listings = self.listings.write().await;
        let listing = listings.get_mut(slug).ok_or_else(|| MartError::AgentNotFound {
            slug: slug.to_string(),
        })?;
        listing.active = true;
        listing.updated_at = Utc::now();
        info!(slug = %slug, "listing reactivated");
        Ok(())
    }

    /// Change the price of a listing (in-flight requests keep their snapshot)
    pub async fn reprice(&self, slug: &AgentSlug, price: Amount) -> Result<()> {
        let mut listings = self.listings.write().await;
        let listing = listings.get_mut(slug).ok_or_else(|| MartError::AgentNotFound {
            slug: slug.to_string(),
        })?;
        info!(slug = %slug, old = %listing.price, new = %price, "listing repriced");
        listing.price = price;
        listing.updated_at = Utc::now();
        Ok(())
    }

    /// Change the display name of a listing
    pub async fn rename(&self, slug: &AgentSlug, name: impl Into<String>) -> Result<()> {
        let mut listings = self.listings.write().await;
        let listing = listings.get_mut(slug).ok_or_else(|| MartError::AgentNotFound {
            slug: slug.to_string(),
        })?;
        listing.name = name.into();
        listing.updated_at = Utc::now();
        Ok(())
    }

    /// List all active listings
    pub async fn active_listings(&self) -> Vec<AgentListing> {
        let listings = self.listings.read().await;
        listings.values().filter(|l| l.active).cloned().collect()
    }

    /// Total number of listings, active or not
    pub async fn listing_count(&self) -> usize {
        self.listings.read().await.len()
    }
}
