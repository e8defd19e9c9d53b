//! HTTP handlers that deliver video bytes.
//!
//! Both routes share one planning path in `StreamingService` and one
//! response builder, so range semantics are identical whether the client
//! comes through the catalog route or a signed link.

use crate::{
    errors::AppError, handlers::responder::plan_response,
    services::streaming_service::StreamingService,
};
use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, header},
    response::Response,
};
use serde::Deserialize;

/// Query string carried by a locally signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// `GET /stream/{movieId}/{quality}`: full or partial video delivery.
pub async fn stream_media(
    State(service): State<StreamingService>,
    Path((movie_id, quality)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let plan = service
        .open_media(&movie_id, &quality, range_header(&headers))
        .await?;
    Ok(plan_response(plan))
}

/// `GET /signed/{*key}?expires=&signature=`: delivery through a signed URL.
pub async fn stream_signed(
    State(service): State<StreamingService>,
    Path(key): Path<String>,
    query: Result<Query<SignedQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let plan = service
        .open_signed(&key, query.expires, &query.signature, range_header(&headers))
        .await?;
    Ok(plan_response(plan))
}

/// A `Range` header that is not visible ASCII is treated as absent.
fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|v| v.to_str().ok())
}
