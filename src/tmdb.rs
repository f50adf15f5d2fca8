use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::models::{CatalogPage, Movie, MovieId, RatedList, SessionId};

/// TMDB stops paging after this many pages, whatever `total_pages` claims.
const MAX_REMOTE_PAGES: u32 = 500;

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

/// The remote catalog and rating service.
#[async_trait]
pub trait MovieApi: Send + Sync {
    async fn genres(&self) -> Result<HashMap<i32, String>>;
    async fn create_guest_session(&self) -> Result<SessionId>;
    async fn popular_movies(&self, page: u32) -> Result<CatalogPage>;
    async fn search_movies(&self, query: &str, page: u32) -> Result<CatalogPage>;
    async fn rated_movies(&self, session: &SessionId) -> Result<RatedList>;
    async fn rate_movie(&self, session: &SessionId, movie_id: MovieId, value: f32) -> Result<()>;
    async fn unrate_movie(&self, session: &SessionId, movie_id: MovieId) -> Result<()>;
}

impl TmdbClient {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = format!("cinerate/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            language: config.language.clone(),
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{}?api_key={}&language={}",
            self.base_url,
            path,
            self.api_key,
            urlencoding::encode(&self.language)
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(StatusCode, String)> {
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        Ok((status, text))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let (status, text) = self.send(Method::GET, url, None).await?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", redact(url), text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }

    async fn write_rating(
        &self,
        method: Method,
        session: &SessionId,
        movie_id: MovieId,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        let url = self.url(
            &format!("/movie/{movie_id}/rating"),
            &[("guest_session_id", session.as_str().to_string())],
        );
        let (status, text) = self.send(method, &url, body).await?;
        if !status.is_success() {
            return Err(anyhow!("rating write for {} -> {} {}", movie_id, status, text));
        }
        let parsed: StatusResponse = serde_json::from_str(&text).unwrap_or_default();
        if parsed.success == Some(false) {
            return Err(anyhow!(
                "rating write for {} rejected: {}",
                movie_id,
                parsed.status_message.unwrap_or_default()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MovieApi for TmdbClient {
    async fn genres(&self) -> Result<HashMap<i32, String>> {
        let url = self.url("/genre/movie/list", &[]);
        let data: GenreList = self.get_json(&url).await?;
        Ok(data.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    async fn create_guest_session(&self) -> Result<SessionId> {
        #[derive(Deserialize)]
        struct GuestSession {
            success: bool,
            guest_session_id: Option<String>,
        }

        let url = self.url("/authentication/guest_session/new", &[]);
        let data: GuestSession = self.get_json(&url).await?;
        match data.guest_session_id {
            Some(id) if data.success && !id.is_empty() => Ok(SessionId::new(id)),
            _ => Err(anyhow!("TMDB refused to create a guest session")),
        }
    }

    async fn popular_movies(&self, page: u32) -> Result<CatalogPage> {
        let url = self.url("/movie/popular", &[("page", page.to_string())]);
        let data: PagedResults = self.get_json(&url).await?;
        Ok(data.into_catalog_page())
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<CatalogPage> {
        let url = self.url(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        );
        let data: PagedResults = self.get_json(&url).await?;
        Ok(data.into_catalog_page())
    }

    async fn rated_movies(&self, session: &SessionId) -> Result<RatedList> {
        let mut items = Vec::new();
        let mut page = 1;
        let total = loop {
            let url = self.url(
                &format!("/guest_session/{}/rated/movies", session),
                &[
                    ("sort_by", "created_at.asc".to_string()),
                    ("page", page.to_string()),
                ],
            );
            let (status, text) = self.send(Method::GET, &url, None).await?;
            // A guest session that has not rated anything yet is reported as missing.
            if status == StatusCode::NOT_FOUND && page == 1 {
                debug!("No rated list for session yet");
                return Ok(RatedList::default());
            }
            if !status.is_success() {
                return Err(anyhow!("{} -> {}", redact(&url), text));
            }
            let data: PagedResults =
                serde_json::from_str(&text).context("JSON parse failed")?;
            let last_page = data.total_pages.min(MAX_REMOTE_PAGES);
            let total_results = data.total_results;
            items.extend(data.results.into_iter().map(MovieResult::into_movie));
            if page >= last_page {
                break total_results;
            }
            page += 1;
        };
        Ok(RatedList {
            total: total.max(items.len() as u32),
            items,
        })
    }

    async fn rate_movie(&self, session: &SessionId, movie_id: MovieId, value: f32) -> Result<()> {
        self.write_rating(Method::POST, session, movie_id, Some(json!({ "value": value })))
            .await
    }

    async fn unrate_movie(&self, session: &SessionId, movie_id: MovieId) -> Result<()> {
        self.write_rating(Method::DELETE, session, movie_id, None)
            .await
    }
}

fn redact(url: &str) -> String {
    match url.split_once("api_key=") {
        Some((head, tail)) => {
            let rest = tail.split_once('&').map(|(_, r)| r).unwrap_or("");
            format!("{head}api_key=***&{rest}")
        }
        None => url.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct GenreList {
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    id: i32,
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct StatusResponse {
    success: Option<bool>,
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PagedResults {
    #[serde(default)]
    results: Vec<MovieResult>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u32,
}

impl PagedResults {
    fn into_catalog_page(self) -> CatalogPage {
        CatalogPage {
            items: self.results.into_iter().map(MovieResult::into_movie).collect(),
            total: self.total_results,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: MovieId,
    #[serde(default)]
    title: String,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i32>,
    rating: Option<f32>,
}

impl MovieResult {
    fn into_movie(self) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            release_date: self.release_date.filter(|d| !d.is_empty()),
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path.filter(|p| !p.is_empty()),
            genre_ids: self.genre_ids,
            rating: self.rating.filter(|r| *r > 0.0),
        }
    }
}
