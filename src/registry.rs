// src/registry.rs
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::types::{short_endpoint, Subscription};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("subscription endpoint is empty")]
    EmptyEndpoint,
}

/// Result of an upsert: whether the endpoint was new, and the count afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    pub is_new: bool,
    pub total: usize,
}

/// In-memory subscriber set keyed by endpoint.
///
/// Entries keep insertion order; an update replaces the entry where it sits.
/// Nothing is persisted, the registry starts empty with the process.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, subscription: Subscription) -> Result<Upsert, RegistryError> {
        if subscription.endpoint.trim().is_empty() {
            return Err(RegistryError::EmptyEndpoint);
        }

        let mut entries = self.entries.write().await;
        match entries.iter().position(|s| s.endpoint == subscription.endpoint) {
            Some(i) => {
                info!(endpoint = short_endpoint(&subscription.endpoint), "subscription updated");
                entries[i] = subscription;
                Ok(Upsert { is_new: false, total: entries.len() })
            }
            None => {
                info!(endpoint = short_endpoint(&subscription.endpoint), "subscription added");
                entries.push(subscription);
                Ok(Upsert { is_new: true, total: entries.len() })
            }
        }
    }

    /// Drops the entry for `endpoint`; unknown endpoints are a no-op.
    pub async fn remove(&self, endpoint: &str) -> bool {
        let mut entries = self.entries.write().await;
        let Some(i) = entries.iter().position(|s| s.endpoint == endpoint) else {
            debug!(endpoint = short_endpoint(endpoint), "remove: endpoint not registered");
            return false;
        };
        entries.remove(i);
        info!(endpoint = short_endpoint(endpoint), remaining = entries.len(), "subscription removed");
        true
    }

    /// Owned copy of every entry, in insertion order.
    pub async fn list(&self) -> Vec<Subscription> {
        self.entries.read().await.clone()
    }

    pub async fn get(&self, endpoint: &str) -> Option<Subscription> {
        self.entries
            .read()
            .await
            .iter()
            .find(|s| s.endpoint == endpoint)
            .cloned()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Discards every entry and returns how many there were.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        info!(removed, "registry cleared");
        removed
    }
}
