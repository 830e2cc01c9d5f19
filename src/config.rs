// src/config.rs
use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_SUBJECT: &str = "mailto:you@example.com";
/// Four weeks, the usual push-service maximum.
pub const DEFAULT_TTL_SECS: u32 = 2_419_200;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `(public, private)` base64url pair; `None` means generate at startup.
    pub vapid_keys: Option<(String, String)>,
    pub vapid_subject: String,
    pub push_ttl: u32,
    pub push_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let vapid_keys = match (get("VAPID_PUBLIC_KEY"), get("VAPID_PRIVATE_KEY")) {
            (Some(public), Some(private)) => Some((public, private)),
            (None, None) => None,
            _ => anyhow::bail!("VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY must be set together"),
        };

        let vapid_subject = get("VAPID_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        anyhow::ensure!(
            vapid_subject.starts_with("mailto:") || vapid_subject.starts_with("https:"),
            "VAPID_SUBJECT must be a mailto: or https: URL, got {vapid_subject:?}"
        );

        let push_timeout = Duration::from_millis(parse_or(&get, "PUSH_TIMEOUT_MS", 10_000u64)?);
        let request_timeout = Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 30u64)?);
        // a broadcast request has to outlive its slowest delivery
        anyhow::ensure!(
            request_timeout > push_timeout,
            "REQUEST_TIMEOUT_SECS ({request_timeout:?}) must exceed PUSH_TIMEOUT_MS ({push_timeout:?})"
        );

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            vapid_keys,
            vapid_subject,
            push_ttl: parse_or(&get, "PUSH_TTL_SECS", DEFAULT_TTL_SECS)?,
            push_timeout,
            request_timeout,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(cfg.vapid_keys.is_none());
        assert_eq!(cfg.vapid_subject, DEFAULT_SUBJECT);
        assert_eq!(cfg.push_ttl, DEFAULT_TTL_SECS);
        assert_eq!(cfg.push_timeout, Duration::from_secs(10));
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn values_are_read() {
        let cfg = load(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("VAPID_PUBLIC_KEY", "pub"),
            ("VAPID_PRIVATE_KEY", "priv"),
            ("VAPID_SUBJECT", "https://example.com/contact"),
            ("PUSH_TTL_SECS", "60"),
            ("PUSH_TIMEOUT_MS", "2500"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.vapid_keys, Some(("pub".into(), "priv".into())));
        assert_eq!(cfg.push_ttl, 60);
        assert_eq!(cfg.push_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn half_a_keypair_is_an_error() {
        let err = load(&[("VAPID_PUBLIC_KEY", "pub")]).unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn bad_numbers_and_subjects_are_errors() {
        assert!(load(&[("PUSH_TTL_SECS", "soon")]).is_err());
        assert!(load(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(load(&[("VAPID_SUBJECT", "you@example.com")]).is_err());
    }

    #[test]
    fn request_timeout_must_exceed_push_timeout() {
        let err = load(&[("PUSH_TIMEOUT_MS", "30000"), ("REQUEST_TIMEOUT_SECS", "30")]).unwrap_err();
        assert!(err.to_string().contains("must exceed"));
        assert!(load(&[("PUSH_TIMEOUT_MS", "29000"), ("REQUEST_TIMEOUT_SECS", "30")]).is_ok());
    }
}
