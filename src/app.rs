use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::{self, CatalogPager};
use crate::connectivity::Connectivity;
use crate::error::SyncError;
use crate::models::{BrowseQuery, Movie, MovieId, PAGE_SIZE};
use crate::rated_pager;
use crate::ratings::{self, ApplyOutcome, RatingSnapshot, RatingSynchronizer, MAX_RATING};
use crate::session::{self, Context};
use crate::tmdb::MovieApi;
use crate::view::{self, BrowseSnapshot, RatedSnapshot, Tab, View};

/// Result of a `rate`/`unrate` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RateOutcome {
    /// Remote write succeeded; the optimistic edit stands.
    Confirmed,
    /// Remote write failed; the previous rating was restored.
    RolledBack(SyncError),
    /// Nothing was attempted.
    Rejected(SyncError),
}

/// The synchronization engine behind both tabs.
///
/// Cloning is cheap and every clone drives the same state. The state lock is
/// never held across a remote call, so overlapping requests interleave only at
/// their await points.
#[derive(Clone)]
pub struct Engine {
    api: Arc<dyn MovieApi>,
    connectivity: Arc<dyn Connectivity>,
    context: Context,
    state: Arc<Mutex<EngineState>>,
}

struct EngineState {
    catalog: CatalogPager,
    ratings: RatingSynchronizer,
    tab: Tab,
    rated_page: u32,
    online: bool,
    bootstrap_error: Option<SyncError>,
    session_error: Option<SyncError>,
}

impl EngineState {
    fn new(online: bool) -> Self {
        Self {
            catalog: CatalogPager::new(),
            ratings: RatingSynchronizer::new(),
            tab: Tab::Search,
            rated_page: 1,
            online,
            bootstrap_error: None,
            session_error: None,
        }
    }

    fn correct_rated_page(&mut self) {
        let corrected =
            rated_pager::corrected_page(self.ratings.rated().len(), self.rated_page, PAGE_SIZE);
        if corrected != self.rated_page {
            debug!(from = self.rated_page, to = corrected, "Rated page corrected");
            self.rated_page = corrected;
        }
    }

    fn apply_rating(
        &mut self,
        movie_id: MovieId,
        rating: Option<f32>,
        source: Option<&Movie>,
    ) -> ApplyOutcome {
        let rating = ratings::normalize(rating);
        let outcome = self.ratings.apply_rating(movie_id, rating, source);
        self.catalog.set_rating(movie_id, rating);
        self.correct_rated_page();
        outcome
    }

    fn undo(&mut self, undo: Undo) {
        self.ratings.restore(undo.rated);
        self.catalog.set_rating(undo.movie_id, undo.browse_rating);
        self.rated_page = undo.rated_page;
        self.correct_rated_page();
    }
}

/// Everything an optimistic edit touched, captured before it was applied.
struct Undo {
    movie_id: MovieId,
    rated: RatingSnapshot,
    browse_rating: Option<f32>,
    rated_page: u32,
}

impl Engine {
    /// Bootstraps genres and the guest session, then loads the default listing.
    pub async fn start(api: Arc<dyn MovieApi>, connectivity: Arc<dyn Connectivity>) -> Self {
        let online = connectivity.is_online().await;
        let mut state = EngineState::new(online);

        let context = match session::bootstrap(api.as_ref()).await {
            Ok(boot) => {
                state.session_error = boot.session_error;
                boot.context
            }
            Err(e) => {
                error!("{}", e);
                state.catalog.fail();
                state.bootstrap_error = Some(e);
                Context::default()
            }
        };

        let engine = Self {
            api,
            connectivity,
            context,
            state: Arc::new(Mutex::new(state)),
        };
        engine.load(BrowseQuery::default()).await;
        engine
    }

    /// Builds an engine around an existing context without any I/O.
    pub fn with_context(
        api: Arc<dyn MovieApi>,
        connectivity: Arc<dyn Connectivity>,
        context: Context,
    ) -> Self {
        Self {
            api,
            connectivity,
            context,
            state: Arc::new(Mutex::new(EngineState::new(true))),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub async fn session_error(&self) -> Option<SyncError> {
        self.state.lock().await.session_error.clone()
    }

    pub async fn bootstrap_error(&self) -> Option<SyncError> {
        self.state.lock().await.bootstrap_error.clone()
    }

    pub async fn search(&self, text: &str) {
        let query = self.state.lock().await.catalog.query().with_text(text);
        self.load(query).await;
    }

    pub async fn set_page(&self, page: u32) {
        let query = self.state.lock().await.catalog.query().with_page(page);
        self.load(query).await;
    }

    async fn load(&self, query: BrowseQuery) {
        let ticket = {
            let mut state = self.state.lock().await;
            if state.bootstrap_error.is_some() {
                warn!("Ignoring catalog request: bootstrap failed");
                return;
            }
            if !state.online {
                warn!("Ignoring catalog request while offline");
                return;
            }
            state.catalog.begin(query)
        };

        let result = catalog::fetch_page(self.api.as_ref(), ticket.query()).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.catalog.complete(&ticket, result, &state.ratings);
    }

    pub async fn set_rated_page(&self, page: u32) {
        let mut state = self.state.lock().await;
        state.rated_page = page.max(1);
        state.correct_rated_page();
    }

    /// Switches tabs. Entering the rated tab reconciles with the server.
    pub async fn activate_tab(&self, tab: Tab) {
        {
            let mut state = self.state.lock().await;
            if state.tab == tab {
                return;
            }
            info!("Switching to {:?} tab", tab);
            state.tab = tab;
        }
        if tab == Tab::Rated {
            self.reconcile().await;
        }
    }

    /// Replaces the rated collection with the server's list.
    pub async fn reconcile(&self) {
        let Some(session) = self.context.session.clone() else {
            let mut state = self.state.lock().await;
            state.ratings.clear_without_session();
            state.rated_page = 1;
            return;
        };

        let ticket = {
            let mut state = self.state.lock().await;
            if !state.online {
                warn!("Skipping rated list refresh while offline");
                return;
            }
            state.ratings.begin_reconcile()
        };

        let result = ratings::fetch_rated(self.api.as_ref(), &session).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.ratings.finish_reconcile(ticket, result) {
            if !state.ratings.error() {
                state.catalog.resync(&state.ratings);
            }
            state.correct_rated_page();
        }
    }

    /// Records a rating change locally without any remote write.
    pub async fn apply_rating(
        &self,
        movie_id: MovieId,
        rating: Option<f32>,
        source: Option<&Movie>,
    ) -> ApplyOutcome {
        self.state
            .lock()
            .await
            .apply_rating(movie_id, rating, source)
    }

    /// Rates a movie. Zero means "remove my rating".
    pub async fn rate(&self, movie_id: MovieId, value: f32) -> RateOutcome {
        if !value.is_finite() || !(0.0..=MAX_RATING).contains(&value) {
            warn!(movie_id, value, "Rejecting out-of-range rating");
            return RateOutcome::Rejected(SyncError::InvalidRating(value));
        }
        if value == 0.0 {
            return self.unrate(movie_id).await;
        }
        self.write_rating(movie_id, Some(value)).await
    }

    pub async fn unrate(&self, movie_id: MovieId) -> RateOutcome {
        self.write_rating(movie_id, None).await
    }

    /// Applies the edit optimistically, writes it remotely and puts the prior
    /// entry back in place if the write fails.
    async fn write_rating(&self, movie_id: MovieId, rating: Option<f32>) -> RateOutcome {
        let Some(session) = self.context.session.clone() else {
            error!(movie_id, "Rating attempted without a guest session");
            return RateOutcome::Rejected(SyncError::Session("no guest session".to_string()));
        };

        let undo = {
            let mut state = self.state.lock().await;
            if !state.online {
                warn!(movie_id, "Ignoring rating change while offline");
                return RateOutcome::Rejected(SyncError::Offline);
            }
            let browse_copy = state.catalog.find(movie_id);
            let rated = state.ratings.snapshot(movie_id);
            let undo = Undo {
                movie_id,
                browse_rating: browse_copy.and_then(|m| m.rating).or_else(|| rated.rating()),
                rated,
                rated_page: state.rated_page,
            };
            let source = browse_copy
                .or_else(|| state.ratings.find(movie_id))
                .cloned();
            let outcome = state.apply_rating(movie_id, rating, source.as_ref());
            debug!(movie_id, ?rating, ?outcome, "Optimistic rating applied");
            undo
        };

        let written = match rating {
            Some(value) => self.api.rate_movie(&session, movie_id, value).await,
            None => self.api.unrate_movie(&session, movie_id).await,
        };

        match written {
            Ok(()) => {
                info!("Rating for movie {} saved ({:?})", movie_id, rating);
                RateOutcome::Confirmed
            }
            Err(e) => {
                let err = SyncError::RatingWrite {
                    movie_id,
                    message: SyncError::describe(&e),
                };
                warn!("{}; restoring previous rating {:?}", err, undo.rated.rating());
                self.state.lock().await.undo(undo);
                RateOutcome::RolledBack(err)
            }
        }
    }

    /// Reads the connectivity signal once and records any transition.
    pub async fn poll_connectivity(&self) -> bool {
        let online = self.connectivity.is_online().await;
        let mut state = self.state.lock().await;
        if state.online != online {
            if online {
                info!("Back online");
            } else {
                warn!("Connection lost; requests are suspended");
            }
            state.online = online;
        }
        online
    }

    /// Polls connectivity every `interval` until the handle is aborted.
    pub fn watch_connectivity(&self, interval: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                engine.poll_connectivity().await;
            }
        })
    }

    pub async fn browse(&self) -> BrowseSnapshot {
        let state = self.state.lock().await;
        Self::browse_snapshot(&state, &self.context)
    }

    pub async fn rated(&self) -> RatedSnapshot {
        let state = self.state.lock().await;
        Self::rated_snapshot(&state, &self.context)
    }

    pub async fn view(&self) -> View {
        let state = self.state.lock().await;
        view::select(
            state.tab,
            state.online,
            Self::browse_snapshot(&state, &self.context),
            Self::rated_snapshot(&state, &self.context),
        )
    }

    fn browse_snapshot(state: &EngineState, context: &Context) -> BrowseSnapshot {
        let catalog = &state.catalog;
        BrowseSnapshot {
            search_text: catalog.query().search_text.clone(),
            movies: catalog.movies().to_vec(),
            loading: catalog.loading(),
            error: catalog.error(),
            total: catalog.total(),
            page: catalog.query().page,
            view_only: context.is_view_only(),
        }
    }

    fn rated_snapshot(state: &EngineState, context: &Context) -> RatedSnapshot {
        let rated = state.ratings.rated();
        RatedSnapshot {
            rated_movies: rated_pager::default_page(rated, state.rated_page).to_vec(),
            loading: state.ratings.loading(),
            error: state.ratings.error(),
            has_ever_rated: state.ratings.has_ever_rated(),
            rated_page: state.rated_page,
            total: rated.len(),
            session_available: !context.is_view_only(),
        }
    }
}
