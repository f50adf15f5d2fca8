use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::genres::GenreDirectory;
use crate::models::SessionId;
use crate::tmdb::MovieApi;

/// Process-wide context built once at bootstrap and handed to every component
/// that needs genres or the guest session.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub genres: Arc<GenreDirectory>,
    pub session: Option<SessionId>,
}

impl Context {
    pub fn new(genres: GenreDirectory, session: Option<SessionId>) -> Self {
        Self {
            genres: Arc::new(genres),
            session,
        }
    }

    /// Without a guest session the rated tab and all rating controls are off.
    pub fn is_view_only(&self) -> bool {
        self.session.is_none()
    }
}

#[derive(Debug)]
pub struct Bootstrap {
    pub context: Context,
    /// Set when the guest session could not be created.
    pub session_error: Option<SyncError>,
}

/// Loads genres and creates the guest session.
///
/// The two calls are independent. A genre failure aborts bootstrap; a session
/// failure only degrades to view-only mode.
pub async fn bootstrap(api: &dyn MovieApi) -> Result<Bootstrap, SyncError> {
    let (genres, session) = tokio::join!(api.genres(), api.create_guest_session());

    let genres = match genres {
        Ok(g) => GenreDirectory::new(g),
        Err(e) => {
            error!("Failed to load genres: {:#}", e);
            return Err(SyncError::Bootstrap(SyncError::describe(&e)));
        }
    };
    info!("Loaded {} genres", genres.len());

    let (session, session_error) = match session {
        Ok(id) => {
            info!("Guest session created");
            (Some(id), None)
        }
        Err(e) => {
            warn!("Guest session unavailable, continuing view-only: {:#}", e);
            (None, Some(SyncError::Session(SyncError::describe(&e))))
        }
    };

    Ok(Bootstrap {
        context: Context::new(genres, session),
        session_error,
    })
}
