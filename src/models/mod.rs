//! Core data models for the movie streaming service.
//!
//! Movies come from the metadata catalog. A media key names one stored
//! quality variant of a movie.

pub mod media;
pub mod movie;
pub mod signed_url;
