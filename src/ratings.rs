use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::{Movie, MovieId, RatedList, SessionId};
use crate::tmdb::MovieApi;

pub(crate) const MAX_RATING: f32 = 10.0;

/// Positive ratings capped at the maximum; anything else means unrated.
pub(crate) fn normalize(rating: Option<f32>) -> Option<f32> {
    rating.filter(|r| *r > 0.0).map(|r| r.min(MAX_RATING))
}

/// What `apply_rating` did to the rated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Appended,
    Updated,
    Removed,
    /// Removal of an id that was not rated.
    Unchanged,
    /// A new rating arrived for a movie the collection has never seen and no
    /// source movie was supplied, so there was nothing to append.
    MissingSource,
}

/// The state of one movie's entry before an edit, for undoing that edit.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSnapshot {
    movie_id: MovieId,
    entry: Option<(usize, Movie)>,
    has_ever_rated: bool,
}

impl RatingSnapshot {
    pub fn rating(&self) -> Option<f32> {
        self.entry.as_ref().and_then(|(_, m)| m.rating)
    }
}

/// Identifies one reconciliation request; results from older tickets are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileTicket(u64);

/// Owns the rated collection and keeps it consistent with local edits and the
/// remote rated list.
#[derive(Debug, Default)]
pub struct RatingSynchronizer {
    rated: Vec<Movie>,
    has_ever_rated: bool,
    error: bool,
    loading: bool,
    generation: u64,
}

impl RatingSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rated(&self) -> &[Movie] {
        &self.rated
    }

    pub fn has_ever_rated(&self) -> bool {
        self.has_ever_rated
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn rating_of(&self, movie_id: MovieId) -> Option<f32> {
        self.find(movie_id).and_then(|m| m.rating)
    }

    pub fn find(&self, movie_id: MovieId) -> Option<&Movie> {
        self.rated.iter().find(|m| m.id == movie_id)
    }

    /// Copies of `items` with locally known ratings laid over them.
    pub fn overlay_ratings(&self, items: &[Movie]) -> Vec<Movie> {
        items
            .iter()
            .map(|movie| match self.find(movie.id) {
                Some(rated) => movie.with_rating(rated.rating),
                None => movie.clone(),
            })
            .collect()
    }

    /// Records a rating change for `movie_id`. `None`, zero or a negative value
    /// removes the entry. Performs no I/O.
    pub fn apply_rating(
        &mut self,
        movie_id: MovieId,
        new_rating: Option<f32>,
        source: Option<&Movie>,
    ) -> ApplyOutcome {
        match normalize(new_rating) {
            Some(rating) => {
                self.has_ever_rated = true;
                if let Some(existing) = self.rated.iter_mut().find(|m| m.id == movie_id) {
                    existing.rating = Some(rating);
                    return ApplyOutcome::Updated;
                }
                match source {
                    Some(movie) => {
                        self.rated.push(Movie {
                            id: movie_id,
                            ..movie.with_rating(Some(rating))
                        });
                        ApplyOutcome::Appended
                    }
                    None => {
                        warn!(
                            movie_id,
                            "Rating for a movie missing from the rated list arrived without its details; not added"
                        );
                        ApplyOutcome::MissingSource
                    }
                }
            }
            None => {
                let before = self.rated.len();
                self.rated.retain(|m| m.id != movie_id);
                if self.rated.len() == before {
                    return ApplyOutcome::Unchanged;
                }
                if self.rated.is_empty() {
                    self.has_ever_rated = false;
                }
                ApplyOutcome::Removed
            }
        }
    }

    pub fn snapshot(&self, movie_id: MovieId) -> RatingSnapshot {
        RatingSnapshot {
            movie_id,
            entry: self
                .rated
                .iter()
                .position(|m| m.id == movie_id)
                .map(|i| (i, self.rated[i].clone())),
            has_ever_rated: self.has_ever_rated,
        }
    }

    /// Puts the entry back exactly as `snapshot` saw it, at its old position.
    pub fn restore(&mut self, snapshot: RatingSnapshot) {
        self.rated.retain(|m| m.id != snapshot.movie_id);
        if let Some((index, movie)) = snapshot.entry {
            let index = index.min(self.rated.len());
            self.rated.insert(index, movie);
        }
        self.has_ever_rated = snapshot.has_ever_rated;
    }

    /// Starts a reconciliation; any ticket handed out earlier becomes stale.
    pub fn begin_reconcile(&mut self) -> ReconcileTicket {
        self.generation += 1;
        self.loading = true;
        self.error = false;
        ReconcileTicket(self.generation)
    }

    pub fn is_current(&self, ticket: ReconcileTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Applies the outcome of a reconciliation. Returns `false` when the
    /// ticket was superseded and the result ignored.
    pub fn finish_reconcile(
        &mut self,
        ticket: ReconcileTicket,
        result: Result<RatedList, SyncError>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!("Discarding superseded rated list response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(list) => {
                let mut seen = HashSet::new();
                let items: Vec<Movie> = list
                    .items
                    .into_iter()
                    .filter(|m| m.rating.is_some_and(|r| r > 0.0))
                    .filter(|m| seen.insert(m.id))
                    .collect();
                self.has_ever_rated = !items.is_empty() || self.has_ever_rated;
                info!("Rated list reconciled ({} movies)", items.len());
                self.rated = items;
                self.error = false;
            }
            Err(e) => {
                warn!("{}", e);
                self.rated.clear();
                self.error = true;
            }
        }
        true
    }

    /// Reconciliation without a guest session: an empty list, not an error.
    pub fn clear_without_session(&mut self) {
        self.generation += 1;
        self.rated.clear();
        self.error = false;
        self.loading = false;
    }
}

/// The I/O half of reconciliation.
pub async fn fetch_rated(api: &dyn MovieApi, session: &SessionId) -> Result<RatedList, SyncError> {
    api.rated_movies(session)
        .await
        .map_err(|e| SyncError::RatedFetch(SyncError::describe(&e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, rating: Option<f32>) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            release_date: Some("2001-01-01".to_string()),
            overview: "overview".to_string(),
            poster_path: Some(format!("/{id}.jpg")),
            genre_ids: vec![18],
            rating,
        }
    }

    fn reconciled(items: Vec<Movie>) -> RatingSynchronizer {
        let mut sync = RatingSynchronizer::new();
        let ticket = sync.begin_reconcile();
        let total = items.len() as u32;
        assert!(sync.finish_reconcile(ticket, Ok(RatedList { items, total })));
        sync
    }

    #[test]
    fn overlay_replaces_known_ratings_only() {
        let sync = reconciled(vec![movie(1, Some(8.0))]);
        let browse = vec![movie(1, None), movie(2, None)];
        let overlaid = sync.overlay_ratings(&browse);
        assert_eq!(overlaid[0].rating, Some(8.0));
        assert_eq!(overlaid[1].rating, None);
        assert_eq!(browse[0].rating, None);
    }

    #[test]
    fn overlay_is_idempotent() {
        let sync = reconciled(vec![movie(1, Some(8.0)), movie(3, Some(2.5))]);
        let browse = vec![movie(1, None), movie(2, Some(4.0)), movie(3, Some(9.0))];
        let once = sync.overlay_ratings(&browse);
        let twice = sync.overlay_ratings(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn rating_appends_then_updates_in_place() {
        let mut sync = RatingSynchronizer::new();
        let first = movie(1, None);
        let second = movie(2, None);
        assert_eq!(sync.apply_rating(1, Some(6.0), Some(&first)), ApplyOutcome::Appended);
        assert_eq!(sync.apply_rating(2, Some(7.0), Some(&second)), ApplyOutcome::Appended);
        assert_eq!(sync.apply_rating(1, Some(9.5), None), ApplyOutcome::Updated);
        let ids: Vec<_> = sync.rated().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(sync.rating_of(1), Some(9.5));
        assert!(sync.has_ever_rated());
    }

    #[test]
    fn rating_without_source_is_reported() {
        let mut sync = RatingSynchronizer::new();
        assert_eq!(sync.apply_rating(5, Some(3.0), None), ApplyOutcome::MissingSource);
        assert!(sync.rated().is_empty());
    }

    #[test]
    fn zero_rating_removes_entry() {
        let mut sync = RatingSynchronizer::new();
        let m = movie(1, None);
        sync.apply_rating(1, Some(4.0), Some(&m));
        assert_eq!(sync.apply_rating(1, Some(0.0), Some(&m)), ApplyOutcome::Removed);
        assert!(sync.rated().is_empty());
    }

    #[test]
    fn removing_last_entry_resets_has_ever_rated() {
        let mut sync = RatingSynchronizer::new();
        let a = movie(1, None);
        let b = movie(2, None);
        sync.apply_rating(1, Some(4.0), Some(&a));
        sync.apply_rating(2, Some(5.0), Some(&b));
        sync.apply_rating(1, None, None);
        assert!(sync.has_ever_rated(), "one entry still remains");
        sync.apply_rating(2, None, None);
        assert!(!sync.has_ever_rated());
        sync.apply_rating(2, Some(5.0), Some(&b));
        assert!(sync.has_ever_rated());
    }

    #[test]
    fn removing_from_empty_collection_keeps_flag() {
        let mut sync = reconciled(vec![movie(1, Some(3.0))]);
        sync.apply_rating(1, None, None);
        assert!(!sync.has_ever_rated());
        sync.has_ever_rated = true;
        assert_eq!(sync.apply_rating(9, None, None), ApplyOutcome::Unchanged);
        assert!(sync.has_ever_rated());
    }

    #[test]
    fn ratings_above_maximum_are_capped() {
        let mut sync = RatingSynchronizer::new();
        sync.apply_rating(1, Some(12.0), Some(&movie(1, None)));
        assert_eq!(sync.rating_of(1), Some(MAX_RATING));
        assert_eq!(normalize(Some(12.0)), Some(MAX_RATING));
        assert_eq!(normalize(Some(0.0)), None);
        assert_eq!(normalize(Some(-2.0)), None);
    }

    #[test]
    fn restore_puts_entry_back_in_place() {
        let mut sync = reconciled(vec![
            movie(1, Some(3.0)),
            movie(2, Some(4.0)),
            movie(3, Some(5.0)),
        ]);
        let snapshot = sync.snapshot(1);
        sync.apply_rating(1, None, None);
        sync.restore(snapshot);
        let ids: Vec<_> = sync.rated().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(sync.rating_of(1), Some(3.0));
    }

    #[test]
    fn restore_undoes_append_and_keeps_flag() {
        let mut sync = RatingSynchronizer::new();
        sync.has_ever_rated = true;
        let snapshot = sync.snapshot(7);
        assert_eq!(snapshot.rating(), None);
        sync.apply_rating(7, Some(5.0), Some(&movie(7, None)));
        sync.apply_rating(7, None, None);
        assert!(!sync.has_ever_rated());
        sync.restore(snapshot);
        assert!(sync.rated().is_empty());
        assert!(sync.has_ever_rated());
    }

    #[test]
    fn reconcile_failure_keeps_has_ever_rated() {
        let mut sync = reconciled(vec![movie(1, Some(3.0))]);
        let ticket = sync.begin_reconcile();
        sync.finish_reconcile(ticket, Err(SyncError::RatedFetch("timeout".into())));
        assert!(sync.rated().is_empty());
        assert!(sync.error());
        assert!(sync.has_ever_rated());
    }

    #[test]
    fn reconcile_empty_list_keeps_previous_flag() {
        let mut sync = reconciled(vec![movie(1, Some(3.0))]);
        let ticket = sync.begin_reconcile();
        sync.finish_reconcile(ticket, Ok(RatedList::default()));
        assert!(sync.has_ever_rated());
        assert!(!sync.error());
    }

    #[test]
    fn reconcile_drops_unrated_and_duplicate_entries() {
        let sync = reconciled(vec![
            movie(1, Some(3.0)),
            movie(2, None),
            movie(1, Some(6.0)),
            movie(3, Some(0.0)),
        ]);
        assert_eq!(sync.rated().len(), 1);
        assert_eq!(sync.rating_of(1), Some(3.0));
    }

    #[test]
    fn stale_reconcile_is_discarded() {
        let mut sync = RatingSynchronizer::new();
        let old = sync.begin_reconcile();
        let new = sync.begin_reconcile();
        assert!(sync.finish_reconcile(new, Ok(RatedList { items: vec![movie(2, Some(2.0))], total: 1 })));
        assert!(!sync.finish_reconcile(old, Err(SyncError::RatedFetch("late".into()))));
        assert!(!sync.error());
        assert_eq!(sync.rated().len(), 1);
    }

    #[test]
    fn clearing_without_session_is_not_an_error() {
        let mut sync = reconciled(vec![movie(1, Some(3.0))]);
        sync.clear_without_session();
        assert!(sync.rated().is_empty());
        assert!(!sync.error());
        assert!(!sync.loading());
    }
}
