// src/payload.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::types::SendReq;

/// Notification content pushed to subscribers.
///
/// Field names follow the browser `showNotification` options so a service
/// worker can pass the decoded JSON straight through.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrate: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    /// Milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    pub fn new(action: &str, title: &str, icon: Option<&str>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
            icon: icon.map(str::to_string),
        }
    }
}

impl NotificationPayload {
    /// The message sent by the manual broadcast trigger.
    pub fn announcement(now: DateTime<Utc>) -> Self {
        let millis = now.timestamp_millis();
        Self {
            title: "🎉 You have a new notification!".into(),
            body: Some(format!(
                "Hello! There is a new message for you.\nReceived at: {}",
                now.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            icon: Some("/next.svg".into()),
            badge: Some("/next.svg".into()),
            image: Some("/globe.svg".into()),
            tag: Some("new-notification".into()),
            data: Some(json!({
                "url": "/",
                "timestamp": millis,
                "type": "info",
                "priority": "high",
            })),
            require_interaction: Some(true),
            silent: Some(false),
            vibrate: Some(vec![200, 100, 200]),
            actions: vec![
                NotificationAction::new("open", "Open", Some("/next.svg")),
                NotificationAction::new("close", "Close", None),
            ],
            timestamp: Some(millis),
        }
    }

    /// Applies caller overrides; blank strings are ignored.
    pub fn with_overrides(mut self, req: &SendReq) -> Self {
        let pick = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(title) = pick(&req.title) {
            self.title = title;
        }
        if let Some(body) = pick(&req.body) {
            self.body = Some(body);
        }
        if let Some(tag) = pick(&req.tag) {
            self.tag = Some(tag);
        }
        if let Some(url) = pick(&req.url) {
            match self.data.as_mut().and_then(Value::as_object_mut) {
                Some(data) => {
                    data.insert("url".into(), Value::String(url));
                }
                None => self.data = Some(json!({ "url": url })),
            }
        }
        self
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn announcement_uses_browser_option_names() {
        let v: Value = serde_json::from_slice(&NotificationPayload::announcement(fixed_now()).to_bytes().unwrap()).unwrap();

        assert_eq!(v["tag"], "new-notification");
        assert_eq!(v["requireInteraction"], true);
        assert_eq!(v["silent"], false);
        assert_eq!(v["vibrate"], json!([200, 100, 200]));
        assert_eq!(v["data"]["url"], "/");
        assert_eq!(v["data"]["timestamp"], fixed_now().timestamp_millis());
        assert_eq!(v["actions"][0]["action"], "open");
        assert!(v["actions"][1].get("icon").is_none());
        assert!(v["body"].as_str().unwrap().contains("2025-03-01 12:30:00 UTC"));
    }

    #[test]
    fn unset_options_are_omitted() {
        let p = NotificationPayload {
            title: "hi".into(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&p).unwrap(), json!({ "title": "hi" }));
    }

    #[test]
    fn overrides_replace_non_blank_fields_only() {
        let req = SendReq {
            title: Some("Deploy finished".into()),
            body: Some("   ".into()),
            tag: None,
            url: Some("/builds/42".into()),
        };
        let p = NotificationPayload::announcement(fixed_now()).with_overrides(&req);

        assert_eq!(p.title, "Deploy finished");
        assert!(p.body.unwrap().starts_with("Hello!"));
        assert_eq!(p.tag.as_deref(), Some("new-notification"));
        let data = p.data.unwrap();
        assert_eq!(data["url"], "/builds/42");
        assert_eq!(data["priority"], "high");
    }
}
