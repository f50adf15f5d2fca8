use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_PROBE_URL: &str = "https://www.google.com/favicon.ico";
const DEFAULT_POLL_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
    pub probe_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_key = get("TMDB_API_KEY").ok_or_else(|| anyhow!("TMDB_API_KEY not set"))?;
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(raw) => {
                    let n: u64 = raw
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a whole number of seconds"))?;
                    if n == 0 {
                        anyhow::bail!("{key} must be greater than zero");
                    }
                    Ok(Duration::from_secs(n))
                }
                None => Ok(Duration::from_secs(default)),
            }
        };

        Ok(Self {
            api_key,
            base_url: get("TMDB_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            language: get("TMDB_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            probe_url: get("CINERATE_PROBE_URL").unwrap_or_else(|| DEFAULT_PROBE_URL.to_string()),
            poll_interval: secs("CINERATE_POLL_SECS", DEFAULT_POLL_SECS)?,
            request_timeout: secs("CINERATE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}
