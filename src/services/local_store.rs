//! LocalObjectStore: read-only object access on local disk.
//!
//! Objects live at `base_path/{key}`, written there by whatever process
//! publishes the encoded variants. Signed URLs point back at this service's
//! `/signed/{key}` route and are verified with the same [`UrlSigner`].

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
use std::{
    io::{self, SeekFrom},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct LocalObjectStore {
    /// Root directory holding object payloads.
    pub base_path: PathBuf,

    signer: Arc<UrlSigner>,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, signer: Arc<UrlSigner>) -> Self {
        Self {
            base_path: base_path.into(),
            signer,
        }
    }

    /// Basic key validation to avoid path traversal and keys that would not
    /// survive being embedded in a signed URL unescaped.
    fn ensure_key_safe(&self, key: &str) -> ObjectStoreResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.contains("..")
            || key.bytes().any(|b| {
                b.is_ascii_control() || matches!(b, b'\\' | b'\0' | b'?' | b'#' | b'%' | b' ')
            });
        if invalid {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> ObjectStoreResult<PathBuf> {
        self.ensure_key_safe(key)?;
        Ok(self.base_path.join(key))
    }

    async fn open(&self, key: &str) -> ObjectStoreResult<File> {
        let path = self.object_path(key)?;
        File::open(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ObjectStoreError::NotFound(key.to_string())
            } else {
                ObjectStoreError::Io(err)
            }
        })
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        let path = self.object_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(ObjectStoreError::Io(err)),
        }
    }

    async fn stat(&self, key: &str) -> ObjectStoreResult<u64> {
        let path = self.object_path(key)?;
        let meta = fs::metadata(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ObjectStoreError::NotFound(key.to_string())
            } else {
                ObjectStoreError::Io(err)
            }
        })?;
        if !meta.is_file() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        Ok(meta.len())
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> ObjectStoreResult<ByteStream> {
        check_interval(start, end)?;
        let mut file = self.open(key).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let reader = file.take(end - start + 1);
        debug!(key, start, end, "opened local range reader");
        Ok(Box::pin(ReaderStream::with_capacity(reader, READ_CHUNK_SIZE)))
    }

    async fn sign_url(&self, key: &str, ttl: Duration) -> ObjectStoreResult<SignedUrl> {
        self.ensure_key_safe(key)?;
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

    /// Best-effort write/read/delete of a temp file under `base_path`.
    async fn probe(&self) -> ObjectStoreResult<()> {
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read_back? != b"readyz" {
            return Err(ObjectStoreError::Backend("file content mismatch".into()));
        }
        Ok(())
    }
}
