use serde::{Deserialize, Serialize};
use std::fmt;

pub type MovieId = i32;

/// Fixed number of movies per page, for both the catalog and the rated list.
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    /// The user's own rating. `None` means unrated.
    #[serde(default)]
    pub rating: Option<f32>,
}

impl Movie {
    pub fn with_rating(&self, rating: Option<f32>) -> Movie {
        Movie {
            rating,
            ..self.clone()
        }
    }
}

/// Guest session token. Created at most once per process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseQuery {
    pub search_text: String,
    pub page: u32,
}

impl BrowseQuery {
    pub fn new(search_text: impl Into<String>, page: u32) -> Self {
        Self {
            search_text: search_text.into(),
            page: page.max(1),
        }
    }

    /// Trimmed search text, or `None` when the default listing applies.
    pub fn effective_text(&self) -> Option<&str> {
        let trimmed = self.search_text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// A new search always starts again from page 1.
    pub fn with_text(&self, search_text: impl Into<String>) -> Self {
        Self::new(search_text, 1)
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self::new(self.search_text.clone(), page)
    }
}

impl Default for BrowseQuery {
    fn default() -> Self {
        Self::new("", 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<Movie>,
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatedList {
    pub items: Vec<Movie>,
    pub total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_change_resets_page() {
        let query = BrowseQuery::new("alien", 4);
        let next = query.with_text("aliens");
        assert_eq!(next.page, 1);
        assert_eq!(next.search_text, "aliens");
    }

    #[test]
    fn blank_search_uses_default_listing() {
        assert_eq!(BrowseQuery::new("   ", 1).effective_text(), None);
        assert_eq!(BrowseQuery::new(" heat ", 1).effective_text(), Some("heat"));
    }

    #[test]
    fn page_zero_is_clamped() {
        assert_eq!(BrowseQuery::default().with_page(0).page, 1);
    }
}
