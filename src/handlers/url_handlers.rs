//! JSON endpoints handing out stream locations.

use crate::{errors::AppError, services::streaming_service::StreamingService};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct SecureUrlQuery {
    /// Requested lifetime in hours.
    pub expires: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureUrlResponse {
    pub streaming_url: String,
    /// Granted lifetime in seconds, after clamping.
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
    pub quality: String,
    pub movie_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitiesResponse {
    pub movie_id: String,
    pub qualities: BTreeMap<String, String>,
    pub default_quality: Option<String>,
}

/// `GET /secure-url/{movieId}/{quality}?expires={hours}`
pub async fn secure_url(
    State(service): State<StreamingService>,
    Path((movie_id, quality)): Path<(String, String)>,
    query: Result<Query<SecureUrlQuery>, QueryRejection>,
) -> Result<Json<SecureUrlResponse>, AppError> {
    let Query(query) = query?;
    let issued = service
        .secure_url(&movie_id, &quality, query.expires)
        .await?;

    Ok(Json(SecureUrlResponse {
        streaming_url: issued.signed.url,
        expires_in: issued.ttl.as_secs(),
        expires_at: issued.signed.expires_at,
        quality: issued.media.quality,
        movie_id: issued.media.movie_id,
    }))
}

/// `GET /qualities/{movieId}`
pub async fn list_qualities(
    State(service): State<StreamingService>,
    Path(movie_id): Path<String>,
) -> Result<Json<QualitiesResponse>, AppError> {
    let listing = service.qualities(&movie_id).await?;
    Ok(Json(QualitiesResponse {
        movie_id: listing.movie_id,
        qualities: listing.qualities,
        default_quality: listing.default_quality,
    }))
}
