//! Read-only snapshots handed to the presentation layer.

use crate::models::{Movie, PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Search,
    Rated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseSnapshot {
    pub search_text: String,
    pub movies: Vec<Movie>,
    pub loading: bool,
    pub error: bool,
    pub total: u32,
    pub page: u32,
    /// Rating controls are disabled because no guest session exists.
    pub view_only: bool,
}

impl BrowseSnapshot {
    pub fn show_pagination(&self) -> bool {
        !self.loading && !self.error && !self.movies.is_empty()
    }
}

/// Which empty state, if any, the rated tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatedState {
    /// No guest session; rating is unavailable.
    Unavailable,
    Error,
    NeverRated,
    /// Rated before, then removed every rating.
    AllUnrated,
    Movies,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatedSnapshot {
    /// The current page of the rated collection only.
    pub rated_movies: Vec<Movie>,
    pub loading: bool,
    pub error: bool,
    pub has_ever_rated: bool,
    pub rated_page: u32,
    pub total: usize,
    pub session_available: bool,
}

impl RatedSnapshot {
    pub fn state(&self) -> RatedState {
        if !self.session_available {
            RatedState::Unavailable
        } else if self.error {
            RatedState::Error
        } else if self.total == 0 && !self.has_ever_rated {
            RatedState::NeverRated
        } else if self.total == 0 {
            RatedState::AllUnrated
        } else {
            RatedState::Movies
        }
    }

    pub fn show_pagination(&self) -> bool {
        !self.loading && self.total > PAGE_SIZE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabView {
    Browse(BrowseSnapshot),
    Rated(RatedSnapshot),
}

/// The whole screen: the active tab's content plus the connectivity banner.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub tab: Tab,
    pub online: bool,
    pub content: TabView,
}

pub fn select(tab: Tab, online: bool, browse: BrowseSnapshot, rated: RatedSnapshot) -> View {
    let content = match tab {
        Tab::Search => TabView::Browse(browse),
        Tab::Rated => TabView::Rated(rated),
    };
    View {
        tab,
        online,
        content,
    }
}
