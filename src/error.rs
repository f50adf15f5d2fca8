//! Error taxonomy for the synchronization engine.
//!
//! Remote collaborators report `anyhow::Error`; each operation translates the
//! failure into one of these variants at its own boundary, logs it and raises
//! the matching tab flag. Nothing here escapes the public mutators.

use crate::models::MovieId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Genres could not be loaded; the whole session is unusable.
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    /// Guest session could not be created; browsing still works.
    #[error("Guest session unavailable: {0}")]
    Session(String),

    #[error("Catalog fetch failed: {0}")]
    CatalogFetch(String),

    #[error("Rated list fetch failed: {0}")]
    RatedFetch(String),

    #[error("Rating write for movie {movie_id} failed: {message}")]
    RatingWrite { movie_id: MovieId, message: String },

    #[error("Rating {0} is outside 0..=10")]
    InvalidRating(f32),

    #[error("Offline")]
    Offline,
}

impl SyncError {
    pub(crate) fn describe(err: &anyhow::Error) -> String {
        format!("{err:#}")
    }
}
