// src/transport.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

use crate::types::{short_endpoint, Subscription};
use crate::vapid::VapidKeys;

/// Delivers one encrypted payload to one subscriber.
///
/// An `Err` is a terminal failure for that subscriber and notification; the
/// error text is reported back to the caller verbatim.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> Result<()>;
}

/// Who is sending: the signing keypair plus the `sub` contact claim
/// (`mailto:` or `https:`) push services use to reach the operator.
#[derive(Debug, Clone)]
pub struct VapidIdentity {
    pub keys: VapidKeys,
    pub subject: String,
}

/// Web Push over HTTP: `web-push` encrypts and signs, `reqwest` sends.
///
/// Deliveries fail until a sender identity has been set.
#[derive(Debug, Clone)]
pub struct WebPushTransport {
    client: reqwest::Client,
    identity: Option<VapidIdentity>,
    ttl: u32,
}

impl WebPushTransport {
    pub fn new(ttl: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build push HTTP client")?;
        Ok(Self {
            client,
            identity: None,
            ttl,
        })
    }

    pub fn set_identity(&mut self, identity: VapidIdentity) {
        self.identity = Some(identity);
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        let identity = self
            .identity
            .as_ref()
            .context("VAPID identity not set")?;
        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder =
            VapidSignatureBuilder::from_base64(identity.keys.private_key_base64url(), &sub_info)
                .context("failed to build VAPID signature")?;
        sig_builder.add_claim("sub", identity.subject.as_str());
        let sig = sig_builder.build().context("failed to sign VAPID JWT")?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(sig);
        builder.set_ttl(self.ttl);
        let message = builder.build().context("failed to build web push message")?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }
        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }
        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");
            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }
            request = request.body(push_payload.content);
        }

        let response = request.send().await.context("push HTTP request failed")?;
        let status = response.status().as_u16();

        match status {
            200..=299 => {
                debug!(endpoint = short_endpoint(&subscription.endpoint), status, "push accepted");
                Ok(())
            }
            404 | 410 => {
                warn!(endpoint = short_endpoint(&subscription.endpoint), status, "push subscription gone");
                Err(anyhow::anyhow!("subscription gone (HTTP {status})"))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow::anyhow!("push service rejected message (HTTP {status}): {body}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
    use p256::ecdsa::SigningKey;
    use rand::{rngs::OsRng, RngCore};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A subscription with real browser-side keys so encryption succeeds.
    fn browser_subscription(endpoint: String) -> Subscription {
        let ua_key = SigningKey::random(&mut OsRng);
        let p256dh = BASE64URL.encode(ua_key.verifying_key().to_encoded_point(false).as_bytes());
        let mut auth = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut auth);
        Subscription::new(endpoint, p256dh, BASE64URL.encode(auth))
    }

    fn transport() -> WebPushTransport {
        let mut t = WebPushTransport::new(60, Duration::from_secs(5)).unwrap();
        t.set_identity(VapidIdentity {
            keys: VapidKeys::generate(),
            subject: "mailto:ops@example.com".into(),
        });
        t
    }

    #[tokio::test]
    async fn delivers_encrypted_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/abc"))
            .and(header("TTL", "60"))
            .and(header("Content-Encoding", "aes128gcm"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sub = browser_subscription(format!("{}/push/abc", server.uri()));
        transport().deliver(&sub, br#"{"title":"hi"}"#).await.unwrap();
    }

    #[tokio::test]
    async fn gone_subscription_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let sub = browser_subscription(format!("{}/push/old", server.uri()));
        let err = transport().deliver(&sub, b"{}").await.unwrap_err();
        assert!(err.to_string().contains("410"), "{err}");
    }

    #[tokio::test]
    async fn server_error_carries_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad jwt"))
            .mount(&server)
            .await;

        let sub = browser_subscription(format!("{}/push/x", server.uri()));
        let err = transport().deliver(&sub, b"{}").await.unwrap_err();
        assert!(err.to_string().contains("bad jwt"), "{err}");
    }

    #[tokio::test]
    async fn malformed_keys_fail_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let sub = Subscription::new(format!("{}/push/x", server.uri()), "not-a-key", "nope");
        assert!(transport().deliver(&sub, b"{}").await.is_err());
    }

    #[tokio::test]
    async fn missing_identity_fails_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let t = WebPushTransport::new(60, Duration::from_secs(5)).unwrap();
        let sub = browser_subscription(format!("{}/push/x", server.uri()));
        let err = t.deliver(&sub, b"{}").await.unwrap_err();
        assert!(err.to_string().contains("identity not set"), "{err}");
    }
}
