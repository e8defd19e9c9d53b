//! Movie streaming service: HTTP range delivery of pre-encoded video
//! variants from an object store, plus time-limited signed URLs.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
