//! Media objects: the pre-encoded quality variants of a movie.

/// Content type of every stored media object.
pub const VIDEO_MP4: &str = "video/mp4";

const MAX_IDENT_LEN: usize = 128;

/// Identifies one quality variant of one movie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaKey {
    pub movie_id: String,
    pub quality: String,
}

impl MediaKey {
    /// Build a media key, rejecting identifiers that are not safe to embed in
    /// a storage key.
    pub fn new(movie_id: &str, quality: &str) -> Option<Self> {
        if !is_valid_ident(movie_id) || !is_valid_ident(quality) {
            return None;
        }
        Some(Self {
            movie_id: movie_id.to_string(),
            quality: quality.to_string(),
        })
    }

    /// Storage key of this variant: `movies/{movieId}-{quality}.mp4`.
    pub fn storage_key(&self) -> String {
        format!("movies/{}-{}.mp4", self.movie_id, self.quality)
    }
}

/// Identifiers are 1..=128 chars of ASCII alphanumerics, `-` or `_`.
pub fn is_valid_ident(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_IDENT_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
