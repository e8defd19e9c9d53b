//! S3ObjectStore: objects in an S3 (or S3-compatible) bucket.
//!
//! Range reads are pushed down to the bucket with a `Range` header and the
//! response body is streamed through without collecting it. Signed URLs are
//! SDK presigned `GetObject` requests.

use crate::{
    models::signed_url::SignedUrl,
    services::object_store::{
        ByteStream, ObjectStore, ObjectStoreError, ObjectStoreResult, check_interval,
        expiry_after,
    },
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, config::Region, presigning::PresigningConfig};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the default credential chain.
    ///
    /// A custom `endpoint` switches to path-style addressing, which is what
    /// S3-compatible providers expect.
    pub async fn new(bucket: String, region: String, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if endpoint.is_some() {
            builder = builder.force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket,
        }
    }

    fn backend_error(err: impl std::fmt::Display) -> ObjectStoreError {
        ObjectStoreError::Backend(err.to_string())
    }
}

/// Size reported by `HeadObject`; a missing or negative length is a backend fault.
fn object_size(key: &str, content_length: Option<i64>) -> ObjectStoreResult<u64> {
    let size = content_length.ok_or_else(|| {
        ObjectStoreError::Backend(format!("missing content length for {}", key))
    })?;
    u64::try_from(size)
        .map_err(|_| ObjectStoreError::Backend(format!("negative size {} for {}", size, key)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn stat(&self, key: &str) -> ObjectStoreResult<u64> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    Self::backend_error(err)
                }
            })?;

        object_size(key, head.content_length())
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> ObjectStoreResult<ByteStream> {
        check_interval(start, end)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(format!("bytes={}-{}", start, end))
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    Self::backend_error(err)
                }
            })?;

        debug!(key, start, end, bucket = %self.bucket, "opened s3 range reader");
        let reader = output.body.into_async_read();
        Ok(Box::pin(ReaderStream::new(reader)))
    }

    async fn sign_url(&self, key: &str, ttl: Duration) -> ObjectStoreResult<SignedUrl> {
        let expires_at = expiry_after(ttl)?;
        let presigning =
            PresigningConfig::expires_in(ttl).map_err(|err| ObjectStoreError::Signing(err.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| ObjectStoreError::Signing(err.to_string()))?;

        Ok(SignedUrl {
            key: key.to_string(),
            url: request.uri().to_string(),
            expires_at,
            method: "GET",
        })
    }

    async fn probe(&self) -> ObjectStoreResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(Self::backend_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_size_must_be_present() {
        assert_eq!(object_size("movies/demo-720p.mp4", Some(1_000)).unwrap(), 1_000);
        assert!(matches!(
            object_size("movies/demo-720p.mp4", None),
            Err(ObjectStoreError::Backend(_))
        ));
        assert!(matches!(
            object_size("movies/demo-720p.mp4", Some(-1)),
            Err(ObjectStoreError::Backend(_))
        ));
    }
}
