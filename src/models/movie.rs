//! Represents a movie record in the metadata catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A movie known to the catalog.
///
/// Only the identifier matters to the streaming path: it is checked for
/// existence before a storage key is built from it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Movie {
    /// Public identifier used in URLs and storage keys.
    pub id: String,

    /// Display title.
    pub title: String,

    /// When the record was added to the catalog.
    pub created_at: DateTime<Utc>,
}
