//! Display helpers for a single movie card.

use crate::genres::GenreDirectory;
use crate::models::Movie;

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w185";
pub const POSTER_PLACEHOLDER: &str = "out-of-poster";
const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBand {
    Poor,
    Mixed,
    Good,
    Great,
}

impl RatingBand {
    pub fn of(rating: Option<f32>) -> Self {
        let value = rating.unwrap_or(0.0);
        if value <= 3.0 {
            RatingBand::Poor
        } else if value <= 5.0 {
            RatingBand::Mixed
        } else if value <= 7.0 {
            RatingBand::Good
        } else {
            RatingBand::Great
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RatingBand::Poor => "#E90000",
            RatingBand::Mixed => "#E97E00",
            RatingBand::Good => "#E9D100",
            RatingBand::Great => "#66E900",
        }
    }
}

/// Everything a card needs, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieCard<'a> {
    pub id: i32,
    pub title: &'a str,
    pub release_date: Option<&'a str>,
    pub poster_url: String,
    pub genres: Vec<&'a str>,
    pub description: String,
    /// One decimal place, absent when unrated.
    pub rating_label: Option<String>,
    pub band: RatingBand,
}

impl<'a> MovieCard<'a> {
    pub fn new(movie: &'a Movie, genres: &'a GenreDirectory) -> Self {
        Self {
            id: movie.id,
            title: &movie.title,
            release_date: movie.release_date.as_deref(),
            poster_url: poster_url(movie.poster_path.as_deref()),
            genres: genres.names_for(&movie.genre_ids),
            description: truncate_overview(
                &movie.overview,
                movie.title.chars().count(),
                movie.genre_ids.len(),
            ),
            rating_label: movie.rating.map(|r| format!("{r:.1}")),
            band: RatingBand::of(movie.rating),
        }
    }
}

pub fn poster_url(path: Option<&str>) -> String {
    match path {
        Some(p) if !p.is_empty() => format!("{POSTER_BASE}{p}"),
        _ => POSTER_PLACEHOLDER.to_string(),
    }
}

/// Longer titles and more genre tags leave less room for the overview.
fn overview_limit(title_len: usize, genre_count: usize) -> usize {
    match (title_len, genre_count > 3) {
        (t, true) if t > 44 => 40,
        (t, _) if t > 44 => 80,
        (t, true) if t > 22 => 80,
        (t, many) if t > 22 || many => 120,
        _ => 160,
    }
}

pub fn truncate_overview(overview: &str, title_len: usize, genre_count: usize) -> String {
    if overview.trim().is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    let limit = overview_limit(title_len, genre_count);
    if overview.chars().count() <= limit {
        return overview.to_string();
    }
    let prefix: String = overview.chars().take(limit).collect();
    let cut = prefix.rfind(' ').map(|i| &prefix[..i]).unwrap_or(prefix.as_str());
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(RatingBand::of(None), RatingBand::Poor);
        assert_eq!(RatingBand::of(Some(3.0)), RatingBand::Poor);
        assert_eq!(RatingBand::of(Some(4.5)), RatingBand::Mixed);
        assert_eq!(RatingBand::of(Some(7.0)), RatingBand::Good);
        assert_eq!(RatingBand::of(Some(7.5)).color(), "#66E900");
    }

    #[test]
    fn limits_depend_on_title_and_genres() {
        assert_eq!(overview_limit(10, 2), 160);
        assert_eq!(overview_limit(23, 2), 120);
        assert_eq!(overview_limit(10, 4), 120);
        assert_eq!(overview_limit(23, 4), 80);
        assert_eq!(overview_limit(45, 1), 80);
        assert_eq!(overview_limit(45, 5), 40);
    }

    #[test]
    fn truncates_on_word_boundary() {
        let text = "word ".repeat(50);
        let short = truncate_overview(&text, 50, 5);
        assert!(short.ends_with("..."));
        assert!(short.len() <= 43);
        assert!(!short.contains("wor..."));
    }

    #[test]
    fn keeps_short_and_fills_empty_overviews() {
        assert_eq!(truncate_overview("Short.", 5, 1), "Short.");
        assert_eq!(truncate_overview("", 5, 1), NO_DESCRIPTION);
    }

    #[test]
    fn card_resolves_poster_genres_and_rating() {
        let genres: GenreDirectory = [(18, "Drama".to_string())].into_iter().collect();
        let movie = Movie {
            id: 1,
            title: "Heat".to_string(),
            release_date: Some("1995-12-15".to_string()),
            overview: "Crime.".to_string(),
            poster_path: Some("/heat.jpg".to_string()),
            genre_ids: vec![18, 99],
            rating: Some(8.0),
        };
        let card = MovieCard::new(&movie, &genres);
        assert_eq!(card.poster_url, "https://image.tmdb.org/t/p/w185/heat.jpg");
        assert_eq!(card.genres, vec!["Drama", "Unknown"]);
        assert_eq!(card.rating_label.as_deref(), Some("8.0"));
        assert_eq!(poster_url(None), POSTER_PLACEHOLDER);
    }
}
