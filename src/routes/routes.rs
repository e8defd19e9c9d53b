//! Defines routes for the streaming API.
//!
//! ## Structure
//! - `GET /healthz`, `GET /readyz`: liveness and readiness
//! - `GET /stream/{movieId}/{quality}`: video bytes, honours `Range`
//! - `GET /secure-url/{movieId}/{quality}?expires={hours}`: issue a signed URL
//! - `GET /qualities/{movieId}`: available quality variants
//! - `GET /signed/{*key}?expires=&signature=`: target of locally signed URLs
//!
//! HEAD is answered on every route with the GET headers and no body.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        stream_handlers::{stream_media, stream_signed},
        url_handlers::{list_qualities, secure_url},
    },
    services::streaming_service::StreamingService,
};
use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build and return the router for all streaming routes.
///
/// The router carries shared state (`StreamingService`) to all handlers.
pub fn routes() -> Router<StreamingService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/stream/{movie_id}/{quality}", get(stream_media))
        .route("/secure-url/{movie_id}/{quality}", get(secure_url))
        .route("/qualities/{movie_id}", get(list_qualities))
        .route("/signed/{*key}", get(stream_signed))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Browsers' video elements need to read the range headers cross-origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ])
}

/// Router with its state attached, ready to serve.
pub fn app(service: StreamingService) -> Router {
    routes().with_state(service)
}
