// src/vapid.rs
//! VAPID keypair (RFC 8292) used to sign outgoing pushes.
//!
//! Keys travel as base64url without padding: the private key is the raw
//! 32-byte P-256 scalar, the public key the 65-byte uncompressed SEC1 point.
//! That is the format `web-push` reads and the format browsers expect for
//! `applicationServerKey`.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use rand::rngs::OsRng;

#[derive(Clone)]
pub struct VapidKeys {
    public_key_b64: String,
    private_key_b64: String,
}

impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key_b64", &self.public_key_b64)
            .finish_non_exhaustive()
    }
}

impl VapidKeys {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self {
            public_key_b64: encode_public(&signing_key),
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
        }
    }

    /// Loads a configured keypair, checking that the public half belongs to
    /// the private scalar.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self> {
        let public_key_b64 = public_key_b64.trim().trim_end_matches('=');
        let private_key_b64 = private_key_b64.trim().trim_end_matches('=');

        let pub_bytes = BASE64URL
            .decode(public_key_b64)
            .context("invalid base64url for VAPID public key")?;
        anyhow::ensure!(
            pub_bytes.len() == 65 && pub_bytes[0] == 0x04,
            "VAPID public key must be a 65-byte uncompressed P-256 point"
        );

        let priv_bytes = BASE64URL
            .decode(private_key_b64)
            .context("invalid base64url for VAPID private key")?;
        anyhow::ensure!(
            priv_bytes.len() == 32,
            "VAPID private key must be a 32-byte P-256 scalar, got {} bytes",
            priv_bytes.len()
        );
        let signing_key = SigningKey::from_bytes(priv_bytes.as_slice().into())
            .context("VAPID private key is not a valid P-256 scalar")?;

        anyhow::ensure!(
            encode_public(&signing_key) == public_key_b64,
            "VAPID public key does not match the private key"
        );

        Ok(Self {
            public_key_b64: public_key_b64.to_string(),
            private_key_b64: private_key_b64.to_string(),
        })
    }

    /// Handed to browsers as `applicationServerKey`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }
}

fn encode_public(signing_key: &SigningKey) -> String {
    let point = signing_key.verifying_key().to_encoded_point(false);
    BASE64URL.encode(point.as_bytes())
}
