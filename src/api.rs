// src/api.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::dispatch::{self, DispatchError, Outcome};
use crate::payload::NotificationPayload;
use crate::registry::{RegistryError, SubscriptionRegistry};
use crate::transport::PushTransport;
use crate::types::*;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub transport: Arc<dyn PushTransport>,
    pub vapid_public_key: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/push/vapid", get(vapid))
        .route(
            "/api/push/subscribe",
            post(subscribe).get(list_subscriptions).delete(clear_subscriptions),
        )
        .route("/api/push/unsubscribe", post(unsubscribe))
        .route("/api/push/send", post(send))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing/invalid {0}")]
    Missing(&'static str),
    #[error("malformed request body: {0}")]
    Malformed(String),
    #[error("no subscription registered for that endpoint")]
    NotFound,
    #[error("no subscribers registered; enable notifications first")]
    NoSubscribers,
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Missing(_) | ApiError::Malformed(_) | ApiError::NoSubscribers => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("{e:#}");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::EmptyEndpoint => ApiError::Missing("endpoint"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Malformed(e.body_text())
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::NoSubscribers => ApiError::NoSubscribers,
        }
    }
}

// ---------- API HANDLERS ---------- //

async fn vapid(State(state): State<AppState>) -> Json<VapidRes> {
    Json(VapidRes {
        public_key: state.vapid_public_key.to_string(),
    })
}

async fn subscribe(
    State(state): State<AppState>,
    body: Result<Json<Subscription>, JsonRejection>,
) -> Result<Json<SubscribeRes>, ApiError> {
    let Json(sub) = body?;
    if let Some(field) = sub.missing_field() {
        return Err(ApiError::Missing(field));
    }
    let res = state.registry.upsert(sub).await?;
    Ok(Json(SubscribeRes {
        status: "subscribed",
        total: res.total,
        is_new: res.is_new,
    }))
}

async fn list_subscriptions(State(state): State<AppState>) -> Json<SubscriptionListRes> {
    let subscriptions: Vec<EndpointView> = state
        .registry
        .list()
        .await
        .into_iter()
        .map(|s| EndpointView { endpoint: s.endpoint })
        .collect();
    Json(SubscriptionListRes {
        total: subscriptions.len(),
        subscriptions,
    })
}

async fn clear_subscriptions(State(state): State<AppState>) -> Json<ClearRes> {
    Json(ClearRes {
        status: "cleared",
        removed: state.registry.clear().await,
    })
}

async fn unsubscribe(
    State(state): State<AppState>,
    body: Result<Json<UnsubscribeReq>, JsonRejection>,
) -> Result<Json<UnsubscribeRes>, ApiError> {
    let Json(req) = body?;
    if req.endpoint.trim().is_empty() {
        return Err(ApiError::Missing("endpoint"));
    }
    if !state.registry.remove(&req.endpoint).await {
        return Err(ApiError::NotFound);
    }
    Ok(Json(UnsubscribeRes {
        status: "unsubscribed",
        total: state.registry.count().await,
        message: "subscription removed",
    }))
}

async fn send(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SendRes>, ApiError> {
    // an empty body means "no overrides"; anything else must parse
    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        SendReq::default()
    } else {
        serde_json::from_slice::<SendReq>(&body).map_err(|e| ApiError::Malformed(e.to_string()))?
    };
    let payload = NotificationPayload::announcement(Utc::now())
        .with_overrides(&overrides)
        .to_bytes()
        .map_err(|e| ApiError::Internal(e.into()))?;

    let report = dispatch::broadcast(&state.registry, Arc::clone(&state.transport), payload).await?;
    info!(broadcast_id = %report.broadcast_id, "send request served");

    let results = report
        .deliveries
        .into_iter()
        .map(|d| {
            let (success, error) = match d.outcome {
                Outcome::Succeeded => (true, None),
                Outcome::Failed(reason) => (false, Some(reason)),
            };
            SendResultView {
                index: d.index,
                endpoint: d.endpoint,
                success,
                error,
            }
        })
        .collect();

    Ok(Json(SendRes {
        status: "sent",
        broadcast_id: report.broadcast_id,
        total: report.total,
        successful: report.succeeded,
        failed: report.failed,
        results,
    }))
}
