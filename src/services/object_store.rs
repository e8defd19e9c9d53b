//! Object store abstraction.
//!
//! The streaming path only ever reads: it checks existence, asks for an
//! object's size, opens a byte range as a stream and requests signed URLs.
//! Backends are injected as `Arc<dyn ObjectStore>` so handlers and tests
//! never depend on a concrete cloud SDK.

use crate::models::signed_url::SignedUrl;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::{io, pin::Pin, time::Duration};
use thiserror::Error;

/// Chunked object body. Dropping it stops reading from the store.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("invalid byte range {start}-{end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;

    async fn exists(&self, key: &str) -> ObjectStoreResult<bool>;

    /// Total size of the object in bytes.
    async fn stat(&self, key: &str) -> ObjectStoreResult<u64>;

    /// Open the inclusive byte interval `start..=end` as a stream.
    ///
    /// Callers validate the interval against `stat` first; backends only
    /// reject `start > end`.
    async fn read_range(&self, key: &str, start: u64, end: u64) -> ObjectStoreResult<ByteStream>;

    /// Issue a read-only URL for `key` that expires after `ttl`.
    async fn sign_url(&self, key: &str, ttl: Duration) -> ObjectStoreResult<SignedUrl>;

    /// Cheap round trip used by the readiness probe.
    async fn probe(&self) -> ObjectStoreResult<()>;
}

pub(crate) fn check_interval(start: u64, end: u64) -> ObjectStoreResult<()> {
    if start > end {
        return Err(ObjectStoreError::InvalidRange { start, end });
    }
    Ok(())
}

pub(crate) fn expiry_after(ttl: Duration) -> ObjectStoreResult<chrono::DateTime<chrono::Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| ObjectStoreError::Signing(format!("ttl {:?} out of range", ttl)))
}
