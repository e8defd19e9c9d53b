//! HMAC-signed URLs for objects served by this process.
//!
//! URL layout: `{public_url}/signed/{key}?expires={unix}&signature={sig}` where
//! `sig = base64url(HMAC-SHA256(secret, "GET\n{key}\n{expires}"))`.
//! Backends that sign natively (S3) do not use this.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing key rejected")]
    InvalidKey,
    #[error("signature is malformed")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
    #[error("signed url expired")]
    Expired,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    public_url: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>, public_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Signer with a per-process random secret. Links die with the process.
    pub fn ephemeral(public_url: impl Into<String>) -> Self {
        let mut secret = Vec::with_capacity(32);
        secret.extend_from_slice(Uuid::new_v4().as_bytes());
        secret.extend_from_slice(Uuid::new_v4().as_bytes());
        Self::new(secret, public_url)
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Build the signed URL for `key`, valid until `expires_at`.
    pub fn sign(&self, key: &str, expires_at: DateTime<Utc>) -> Result<String, SignatureError> {
        let expires = expires_at.timestamp();
        let mac = self.mac(key, expires)?;
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!(
            "{}/signed/{}?expires={}&signature={}",
            self.public_url, key, expires, signature
        ))
    }

    /// Check a signature presented for `key` at instant `now`.
    ///
    /// The MAC is checked before the expiry so a forged link never learns
    /// anything about timing.
    pub fn verify(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let tag = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Malformed)?;
        self.mac(key, expires)?
            .verify_slice(&tag)
            .map_err(|_| SignatureError::Mismatch)?;
        if now.timestamp() > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }

    fn mac(&self, key: &str, expires: i64) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::InvalidKey)?;
        mac.update(format!("GET\n{}\n{}", key, expires).as_bytes());
        Ok(mac)
    }
}
