// src/dispatch.rs
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::registry::SubscriptionRegistry;
use crate::transport::PushTransport;
use crate::types::short_endpoint;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no subscribers registered")]
    NoSubscribers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Outcome for the subscriber at `index` of the broadcast snapshot.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub index: usize,
    pub endpoint: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct BroadcastReport {
    pub broadcast_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Same order as the registry snapshot.
    pub deliveries: Vec<Delivery>,
}

/// Sends `payload` to every registered subscriber.
///
/// Each delivery runs as its own task; all of them are awaited before the
/// report is built, and a failed or panicked attempt only affects its own
/// entry. Nothing is retried and failed subscribers stay registered.
///
/// Tasks log their own outcome, so deliveries that outlive a dropped caller
/// still leave a trace.
pub async fn broadcast(
    registry: &SubscriptionRegistry,
    transport: Arc<dyn PushTransport>,
    payload: Vec<u8>,
) -> Result<BroadcastReport, DispatchError> {
    let snapshot = registry.list().await;
    if snapshot.is_empty() {
        return Err(DispatchError::NoSubscribers);
    }

    let broadcast_id = Uuid::new_v4();
    info!(%broadcast_id, subscribers = snapshot.len(), bytes = payload.len(), "broadcast started");

    let payload: Arc<[u8]> = payload.into();
    let handles: Vec<_> = snapshot
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, sub)| {
            let transport = Arc::clone(&transport);
            let payload = Arc::clone(&payload);
            tokio::spawn(async move {
                let res = transport.deliver(&sub, &payload).await;
                let endpoint = short_endpoint(&sub.endpoint);
                match &res {
                    Ok(()) => debug!(%broadcast_id, index, endpoint, "delivery succeeded"),
                    Err(e) => warn!(%broadcast_id, index, endpoint, reason = %format!("{e:#}"), "delivery failed"),
                }
                res
            })
        })
        .collect();

    let deliveries: Vec<Delivery> = join_all(handles)
        .await
        .into_iter()
        .zip(snapshot)
        .enumerate()
        .map(|(index, (joined, sub))| {
            let outcome = match joined {
                Ok(Ok(())) => Outcome::Succeeded,
                Ok(Err(e)) => Outcome::Failed(format!("{e:#}")),
                Err(e) => {
                    warn!(%broadcast_id, index, endpoint = short_endpoint(&sub.endpoint), "delivery task aborted: {e}");
                    Outcome::Failed(format!("delivery task aborted: {e}"))
                }
            };
            Delivery {
                index,
                endpoint: sub.endpoint,
                outcome,
            }
        })
        .collect();

    let succeeded = deliveries.iter().filter(|d| d.outcome.is_success()).count();
    let total = deliveries.len();
    let failed = total - succeeded;
    info!(%broadcast_id, total, succeeded, failed, "broadcast finished");

    Ok(BroadcastReport {
        broadcast_id,
        total,
        succeeded,
        failed,
        deliveries,
    })
}
