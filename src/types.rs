// src/types.rs
use serde::{Deserialize, Serialize};

/// A browser push subscription as reported by `PushManager.subscribe()`.
///
/// Missing fields deserialize as empty strings so the handler can reject
/// them with a proper error instead of a generic extractor failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    #[serde(default)]
    pub p256dh: String,
    #[serde(default)]
    pub auth: String,
}

impl Subscription {
    pub fn new(endpoint: impl Into<String>, p256dh: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    /// Name of the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.endpoint.trim().is_empty() {
            Some("endpoint")
        } else if self.keys.p256dh.trim().is_empty() {
            Some("keys.p256dh")
        } else if self.keys.auth.trim().is_empty() {
            Some("keys.auth")
        } else {
            None
        }
    }
}

/// Shortened endpoint for log lines; push endpoints carry long opaque tokens.
pub fn short_endpoint(endpoint: &str) -> &str {
    match endpoint.char_indices().nth(48) {
        Some((i, _)) => &endpoint[..i],
        None => endpoint,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidRes {
    pub public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRes {
    pub status: &'static str,
    pub total: usize,
    pub is_new: bool,
}

#[derive(Serialize)]
pub struct EndpointView {
    pub endpoint: String,
}

#[derive(Serialize)]
pub struct SubscriptionListRes {
    pub total: usize,
    pub subscriptions: Vec<EndpointView>,
}

#[derive(Serialize)]
pub struct ClearRes {
    pub status: &'static str,
    pub removed: usize,
}

#[derive(Deserialize)]
pub struct UnsubscribeReq {
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Serialize)]
pub struct UnsubscribeRes {
    pub status: &'static str,
    pub total: usize,
    pub message: &'static str,
}

/// Optional overrides for the server-built broadcast message.
#[derive(Debug, Default, Deserialize)]
pub struct SendReq {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRes {
    pub status: &'static str,
    pub broadcast_id: uuid::Uuid,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<SendResultView>,
}

#[derive(Serialize)]
pub struct SendResultView {
    pub index: usize,
    pub endpoint: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
