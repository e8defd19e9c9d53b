//! StreamingService: movie lookups, range planning and URL issuance.
//!
//! Everything the HTTP handlers need flows through here. The object store,
//! catalog and URL signer are injected at construction; the service itself
//! holds no mutable state and is cloned into every request.

use crate::{
    config::AppConfig,
    models::{media::MediaKey, signed_url::SignedUrl},
    services::{
        catalog::{CatalogError, MovieCatalog},
        object_store::{ByteStream, ObjectStore, ObjectStoreError},
        range::{RangeOutcome, parse_range},
        url_signer::{SignatureError, UrlSigner},
    },
};
use chrono::Utc;
use futures::future::try_join_all;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info};

/// Lifetime of a secure URL when the caller does not ask for one.
pub const DEFAULT_URL_TTL_HOURS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("movie `{0}` not found")]
    MovieNotFound(String),
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("invalid expiry: {0}")]
    InvalidTtl(String),
    #[error("signed url rejected: {0}")]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(ObjectStoreError),
}

impl From<ObjectStoreError> for StreamingError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound(key) => StreamingError::ObjectNotFound(key),
            other => StreamingError::Store(other),
        }
    }
}

pub type StreamingResult<T> = Result<T, StreamingError>;

/// Settings the service needs from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub public_url: String,
    pub qualities: Vec<String>,
    pub default_quality: String,
    pub max_url_ttl_hours: f64,
}

impl From<&AppConfig> for StreamSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            public_url: cfg.public_url.trim_end_matches('/').to_string(),
            qualities: cfg.qualities.clone(),
            default_quality: cfg.default_quality.clone(),
            max_url_ttl_hours: cfg.max_url_ttl_hours,
        }
    }
}

/// How a stream request will be answered. Produced before any header is
/// written so every failure up to this point can still become an error body.
pub enum StreamPlan {
    Whole {
        key: String,
        size: u64,
        body: ByteStream,
    },
    Partial {
        key: String,
        start: u64,
        end: u64,
        size: u64,
        body: ByteStream,
    },
    Unsatisfiable {
        size: u64,
    },
}

/// A signed URL together with the lifetime that was actually granted.
#[derive(Debug, Clone)]
pub struct SecureUrl {
    pub media: MediaKey,
    pub signed: SignedUrl,
    pub ttl: Duration,
}

/// Quality variants available for one movie.
#[derive(Debug, Clone)]
pub struct QualityListing {
    pub movie_id: String,
    /// Quality label to stream URL, for variants present in the store.
    pub qualities: BTreeMap<String, String>,
    pub default_quality: Option<String>,
}

#[derive(Clone)]
pub struct StreamingService {
    pub store: Arc<dyn ObjectStore>,
    pub catalog: Arc<dyn MovieCatalog>,
    pub signer: Arc<UrlSigner>,
    pub settings: StreamSettings,
}

impl StreamingService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn MovieCatalog>,
        signer: Arc<UrlSigner>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            signer,
            settings,
        }
    }

    /// Validate identifiers and confirm the movie exists.
    pub async fn resolve_media(&self, movie_id: &str, quality: &str) -> StreamingResult<MediaKey> {
        let media = MediaKey::new(movie_id, quality).ok_or_else(|| {
            StreamingError::InvalidIdentifier(format!("{}/{}", movie_id, quality))
        })?;
        self.ensure_movie(movie_id).await?;
        Ok(media)
    }

    async fn ensure_movie(&self, movie_id: &str) -> StreamingResult<()> {
        match self.catalog.find_movie(movie_id).await? {
            Some(_) => Ok(()),
            None => Err(StreamingError::MovieNotFound(movie_id.to_string())),
        }
    }

    /// Plan the response for `GET /stream/{movieId}/{quality}`.
    pub async fn open_media(
        &self,
        movie_id: &str,
        quality: &str,
        range_header: Option<&str>,
    ) -> StreamingResult<StreamPlan> {
        let media = self.resolve_media(movie_id, quality).await?;
        self.open(&media.storage_key(), range_header).await
    }

    /// Plan the response for a locally signed URL.
    pub async fn open_signed(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        range_header: Option<&str>,
    ) -> StreamingResult<StreamPlan> {
        self.signer.verify(key, expires, signature, Utc::now())?;
        self.open(key, range_header).await
    }

    /// Stat `key`, match the range header against its size and open the
    /// selected bytes.
    pub async fn open(&self, key: &str, range_header: Option<&str>) -> StreamingResult<StreamPlan> {
        let size = self.store.stat(key).await?;
        let outcome = parse_range(range_header, size);
        debug!(key, size, ?outcome, range = ?range_header, "planned stream");

        match outcome {
            RangeOutcome::Unsatisfiable => Ok(StreamPlan::Unsatisfiable { size }),
            RangeOutcome::Whole => {
                let body: ByteStream = if size == 0 {
                    Box::pin(futures::stream::empty())
                } else {
                    self.store.read_range(key, 0, size - 1).await?
                };
                Ok(StreamPlan::Whole {
                    key: key.to_string(),
                    size,
                    body,
                })
            }
            RangeOutcome::Partial { start, end } => {
                let body = self.store.read_range(key, start, end).await?;
                Ok(StreamPlan::Partial {
                    key: key.to_string(),
                    start,
                    end,
                    size,
                    body,
                })
            }
        }
    }

    /// Issue a time-limited URL for one quality variant.
    ///
    /// `ttl_hours` defaults to one hour, must be a positive finite number and
    /// is clamped to the configured maximum. The object must exist when the
    /// URL is issued.
    pub async fn secure_url(
        &self,
        movie_id: &str,
        quality: &str,
        ttl_hours: Option<f64>,
    ) -> StreamingResult<SecureUrl> {
        let ttl = self.effective_ttl(ttl_hours)?;
        let media = self.resolve_media(movie_id, quality).await?;
        let key = media.storage_key();

        if !self.store.exists(&key).await? {
            return Err(StreamingError::ObjectNotFound(key));
        }

        let signed = self.store.sign_url(&key, ttl).await?;
        info!(
            key = %signed.key,
            expires_at = %signed.expires_at,
            backend = self.store.backend_name(),
            "issued signed url"
        );
        Ok(SecureUrl { media, signed, ttl })
    }

    fn effective_ttl(&self, ttl_hours: Option<f64>) -> StreamingResult<Duration> {
        let hours = ttl_hours.unwrap_or(DEFAULT_URL_TTL_HOURS);
        if !hours.is_finite() || hours <= 0.0 {
            return Err(StreamingError::InvalidTtl(format!(
                "expires must be a positive number of hours, got {}",
                hours
            )));
        }
        let hours = hours.min(self.settings.max_url_ttl_hours);
        Duration::try_from_secs_f64(hours * 3600.0).map_err(|err| {
            StreamingError::InvalidTtl(format!("expires of {} hours is out of range: {}", hours, err))
        })
    }

    /// List the configured qualities that exist in the store for a movie.
    pub async fn qualities(&self, movie_id: &str) -> StreamingResult<QualityListing> {
        let mut candidates = Vec::with_capacity(self.settings.qualities.len());
        for quality in &self.settings.qualities {
            let media = MediaKey::new(movie_id, quality)
                .ok_or_else(|| StreamingError::InvalidIdentifier(movie_id.to_string()))?;
            candidates.push(media);
        }
        self.ensure_movie(movie_id).await?;

        let present = try_join_all(candidates.iter().map(|media| {
            let key = media.storage_key();
            async move { self.store.exists(&key).await }
        }))
        .await?;

        let available: Vec<&MediaKey> = candidates
            .iter()
            .zip(present)
            .filter_map(|(media, exists)| exists.then_some(media))
            .collect();

        let default_quality = available
            .iter()
            .find(|media| media.quality == self.settings.default_quality)
            .or_else(|| available.first())
            .map(|media| media.quality.clone());

        let qualities = available
            .iter()
            .map(|media| (media.quality.clone(), self.stream_url(media)))
            .collect();

        Ok(QualityListing {
            movie_id: movie_id.to_string(),
            qualities,
            default_quality,
        })
    }

    /// Public URL of the range-capable stream endpoint for `media`.
    pub fn stream_url(&self, media: &MediaKey) -> String {
        format!(
            "{}/stream/{}/{}",
            self.settings.public_url, media.movie_id, media.quality
        )
    }
}
