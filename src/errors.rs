use crate::services::{
    catalog::CatalogError, object_store::ObjectStoreError, streaming_service::StreamingError,
    url_signer::SignatureError,
};
use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Object key or movie id a not-found error refers to.
    pub key: Option<String>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            key: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// 404 with the `{ "error": "not found", "key": ... }` body.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(StatusCode::NOT_FOUND, "not found")
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    /// Shortcut for 502 Bad Gateway, used when the object store fails.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = match &self.key {
            Some(key) => json!({
                "error": self.message,
                "key": key,
                "status": self.status.as_u16()
            }),
            None => json!({
                "error": self.message,
                "status": self.status.as_u16()
            }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Malformed query strings get the same JSON body as every other error.
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}

impl From<ObjectStoreError> for AppError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound(key) => AppError::not_found(key),
            ObjectStoreError::InvalidKey(_) | ObjectStoreError::InvalidRange { .. } => {
                AppError::bad_request(err.to_string())
            }
            ObjectStoreError::Signing(_) => AppError::internal(err.to_string()),
            ObjectStoreError::Backend(_) | ObjectStoreError::Io(_) => {
                AppError::upstream(err.to_string())
            }
        }
    }
}

impl From<StreamingError> for AppError {
    fn from(err: StreamingError) -> Self {
        match err {
            StreamingError::MovieNotFound(key) | StreamingError::ObjectNotFound(key) => {
                AppError::not_found(key)
            }
            StreamingError::InvalidIdentifier(_) | StreamingError::InvalidTtl(_) => {
                AppError::bad_request(err.to_string())
            }
            StreamingError::Signature(SignatureError::InvalidKey) => {
                AppError::internal(err.to_string())
            }
            StreamingError::Signature(_) => AppError::forbidden(err.to_string()),
            StreamingError::Catalog(CatalogError::MovieAlreadyExists(_)) => {
                AppError::new(StatusCode::CONFLICT, err.to_string())
            }
            StreamingError::Catalog(CatalogError::Sqlx(_)) => AppError::internal(err.to_string()),
            StreamingError::Store(inner) => inner.into(),
        }
    }
}
