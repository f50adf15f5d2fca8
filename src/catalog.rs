use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::{BrowseQuery, CatalogPage, Movie, MovieId};
use crate::ratings::RatingSynchronizer;
use crate::tmdb::MovieApi;

/// Tags one catalog request with the query it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTicket {
    seq: u64,
    query: BrowseQuery,
}

impl CatalogTicket {
    pub fn query(&self) -> &BrowseQuery {
        &self.query
    }
}

/// Browse-list state: the current query and the page it produced.
#[derive(Debug, Default)]
pub struct CatalogPager {
    query: BrowseQuery,
    movies: Vec<Movie>,
    total: u32,
    loading: bool,
    error: bool,
    seq: u64,
}

impl CatalogPager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &BrowseQuery {
        &self.query
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn find(&self, movie_id: MovieId) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == movie_id)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> bool {
        self.error
    }

    /// Switches to `query` and hands out the ticket its response must carry.
    /// The previous page stays visible until the response arrives.
    pub fn begin(&mut self, query: BrowseQuery) -> CatalogTicket {
        self.seq += 1;
        self.query = query.clone();
        self.loading = true;
        self.error = false;
        debug!(seq = self.seq, page = query.page, search = %query.search_text, "Catalog request issued");
        CatalogTicket {
            seq: self.seq,
            query,
        }
    }

    pub fn is_current(&self, ticket: &CatalogTicket) -> bool {
        ticket.seq == self.seq && ticket.query == self.query
    }

    /// Stores a response. Ratings known to `ratings` are laid over the items
    /// before they are kept. Returns `false` for a superseded ticket.
    pub fn complete(
        &mut self,
        ticket: &CatalogTicket,
        result: Result<CatalogPage, SyncError>,
        ratings: &RatingSynchronizer,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!(seq = ticket.seq, "Discarding superseded catalog response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                info!(
                    "Catalog page {} loaded ({} movies, {} total)",
                    ticket.query.page,
                    page.items.len(),
                    page.total
                );
                self.movies = ratings.overlay_ratings(&page.items);
                self.total = page.total;
                self.error = false;
            }
            Err(e) => {
                warn!("{}", e);
                self.movies.clear();
                self.total = 0;
                self.error = true;
            }
        }
        true
    }

    /// Marks the browse tab as failed without issuing a request.
    pub fn fail(&mut self) {
        self.seq += 1;
        self.loading = false;
        self.movies.clear();
        self.total = 0;
        self.error = true;
    }

    /// Sets the rating shown on the browse copy of `movie_id`, if loaded.
    pub fn set_rating(&mut self, movie_id: MovieId, rating: Option<f32>) {
        let rating = rating.filter(|r| *r > 0.0);
        for movie in self.movies.iter_mut().filter(|m| m.id == movie_id) {
            movie.rating = rating;
        }
    }

    /// Re-derives browse ratings after the rated collection was replaced.
    /// Entries not in the collection are shown unrated.
    pub fn resync(&mut self, ratings: &RatingSynchronizer) {
        for movie in &mut self.movies {
            movie.rating = ratings.rating_of(movie.id);
        }
    }
}

/// Fetches one catalog page. A blank search falls back to the popular listing.
pub async fn fetch_page(api: &dyn MovieApi, query: &BrowseQuery) -> Result<CatalogPage, SyncError> {
    let result = match query.effective_text() {
        None => api.popular_movies(query.page).await,
        Some(text) => api.search_movies(text, query.page).await,
    };
    result.map_err(|e| SyncError::CatalogFetch(SyncError::describe(&e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatedList;

    fn movie(id: MovieId) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            release_date: None,
            overview: String::new(),
            poster_path: None,
            genre_ids: vec![],
            rating: None,
        }
    }

    fn page(ids: &[MovieId], total: u32) -> CatalogPage {
        CatalogPage {
            items: ids.iter().copied().map(movie).collect(),
            total,
        }
    }

    #[test]
    fn keeps_previous_page_while_loading() {
        let ratings = RatingSynchronizer::new();
        let mut pager = CatalogPager::new();
        let first = pager.begin(BrowseQuery::default());
        pager.complete(&first, Ok(page(&[1, 2], 40)), &ratings);

        pager.begin(BrowseQuery::default().with_page(2));
        assert!(pager.loading());
        assert_eq!(pager.movies().len(), 2);
    }

    #[test]
    fn failure_clears_list_and_raises_flag() {
        let ratings = RatingSynchronizer::new();
        let mut pager = CatalogPager::new();
        let first = pager.begin(BrowseQuery::default());
        pager.complete(&first, Ok(page(&[1], 1)), &ratings);
        let second = pager.begin(BrowseQuery::new("x", 1));
        pager.complete(&second, Err(SyncError::CatalogFetch("boom".into())), &ratings);
        assert!(pager.error());
        assert!(!pager.loading());
        assert!(pager.movies().is_empty());
    }

    #[test]
    fn superseded_response_is_ignored() {
        let ratings = RatingSynchronizer::new();
        let mut pager = CatalogPager::new();
        let slow = pager.begin(BrowseQuery::new("sl", 1));
        let fast = pager.begin(BrowseQuery::new("slow", 1));
        assert!(pager.complete(&fast, Ok(page(&[7], 1)), &ratings));
        assert!(!pager.complete(&slow, Ok(page(&[1, 2, 3], 3)), &ratings));
        assert_eq!(pager.movies()[0].id, 7);
        assert_eq!(pager.total(), 1);
    }

    #[test]
    fn reissuing_same_query_still_supersedes() {
        let ratings = RatingSynchronizer::new();
        let mut pager = CatalogPager::new();
        let first = pager.begin(BrowseQuery::default());
        let second = pager.begin(BrowseQuery::default());
        assert!(!pager.complete(&first, Ok(page(&[1], 1)), &ratings));
        assert!(pager.loading());
        assert!(pager.complete(&second, Ok(page(&[2], 1)), &ratings));
    }

    #[test]
    fn stored_page_carries_known_ratings() {
        let mut ratings = RatingSynchronizer::new();
        let ticket = ratings.begin_reconcile();
        ratings.finish_reconcile(
            ticket,
            Ok(RatedList {
                items: vec![movie(2).with_rating(Some(6.5))],
                total: 1,
            }),
        );
        let mut pager = CatalogPager::new();
        let t = pager.begin(BrowseQuery::default());
        pager.complete(&t, Ok(page(&[1, 2], 2)), &ratings);
        assert_eq!(pager.find(2).and_then(|m| m.rating), Some(6.5));
        assert_eq!(pager.find(1).and_then(|m| m.rating), None);
    }
}
