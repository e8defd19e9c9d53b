//! In-memory object store.
//!
//! Holds objects as shared `Bytes` and streams ranges in fixed-size chunks,
//! so callers see the same chunked delivery as the disk and S3 backends.
//! Used as the injected store in tests.

use crate::{
    models::signed_url::SignedUrl,
    services::{
        object_store::{
            ByteStream, ObjectStore, ObjectStoreError, ObjectStoreResult, check_interval,
            expiry_after,
        },
        url_signer::UrlSigner,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    io,
    sync::{Arc, RwLock},
    time::Duration,
};

const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Clone)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    signer: Arc<UrlSigner>,
}

impl MemoryObjectStore {
    pub fn new(signer: Arc<UrlSigner>) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            signer,
        }
    }

    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) -> ObjectStoreResult<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| ObjectStoreError::Backend("object map poisoned".into()))?;
        objects.insert(key.into(), data.into());
        Ok(())
    }

    fn get(&self, key: &str) -> ObjectStoreResult<Bytes> {
        let objects = self
            .objects
            .read()
            .map_err(|_| ObjectStoreError::Backend("object map poisoned".into()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn stat(&self, key: &str) -> ObjectStoreResult<u64> {
        Ok(self.get(key)?.len() as u64)
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> ObjectStoreResult<ByteStream> {
        check_interval(start, end)?;
        let data = self.get(key)?;
        let len = data.len() as u64;
        if end >= len {
            return Err(ObjectStoreError::InvalidRange { start, end });
        }
        let slice = data.slice(start as usize..=end as usize);
        let chunks: Vec<io::Result<Bytes>> = (0..slice.len())
            .step_by(CHUNK_SIZE)
            .map(|offset| Ok(slice.slice(offset..(offset + CHUNK_SIZE).min(slice.len()))))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn sign_url(&self, key: &str, ttl: Duration) -> ObjectStoreResult<SignedUrl> {
        let expires_at = expiry_after(ttl)?;
        let url = self
            .signer
            .sign(key, expires_at)
            .map_err(|err| ObjectStoreError::Signing(err.to_string()))?;
        Ok(SignedUrl {
            key: key.to_string(),
            url,
            expires_at,
            method: "GET",
        })
    }

    async fn probe(&self) -> ObjectStoreResult<()> {
        self.objects
            .read()
            .map(|_| ())
            .map_err(|_| ObjectStoreError::Backend("object map poisoned".into()))
    }
}
