//! Represents a time-limited, read-only URL for a single object.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A signed URL issued by an object store.
///
/// Never persisted: it is returned to the caller once and is only valid for
/// `key` until `expires_at`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedUrl {
    /// Object the URL grants access to.
    pub key: String,

    /// The URL itself.
    pub url: String,

    /// Instant after which the store rejects the URL.
    pub expires_at: DateTime<Utc>,

    /// HTTP method the URL is valid for. Always `GET`.
    pub method: &'static str,
}
