use anyhow::Result;
use cinerate::app::Engine;
use cinerate::card::MovieCard;
use cinerate::config::Config;
use cinerate::connectivity::{Connectivity, HttpProbe};
use cinerate::tmdb::{MovieApi, TmdbClient};
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// `cinerate [query] [page]`; a numeric last argument is the page.
fn parse_args() -> (String, u32) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let page = match args.last().and_then(|a| a.parse::<u32>().ok()) {
        // `cinerate 1917` is a page number, `cinerate 1917 1` a search for "1917"
        Some(p) if p > 0 => {
            args.pop();
            p
        }
        _ => 1,
    };
    (args.join(" "), page)
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }

    let config = Config::from_env()?;
    let api: Arc<dyn MovieApi> = Arc::new(TmdbClient::new(&config)?);
    let probe: Arc<dyn Connectivity> = Arc::new(HttpProbe::new(&config)?);

    let (query, page) = parse_args();
    let engine = Engine::start(api, probe).await;
    if let Some(e) = engine.bootstrap_error().await {
        anyhow::bail!("{}", e);
    }
    if let Some(e) = engine.session_error().await {
        warn!("{} - ratings are disabled", e);
    }
    if !query.is_empty() {
        engine.search(&query).await;
    }
    if page > 1 {
        engine.set_page(page).await;
    }

    let browse = engine.browse().await;
    if browse.error {
        anyhow::bail!("Could not load movies");
    }
    println!(
        "Page {} ({} results){}",
        browse.page,
        browse.total,
        if browse.view_only { " [view only]" } else { "" }
    );
    let genres = engine.context().genres.clone();
    for movie in &browse.movies {
        let card = MovieCard::new(movie, &genres);
        println!(
            "{:>8}  {}  ({})  [{}]  {}",
            card.id,
            card.title,
            card.release_date.unwrap_or("n/a"),
            card.genres.join(", "),
            card.rating_label.as_deref().unwrap_or("-"),
        );
        println!("          {}", card.description);
    }
    Ok(())
}
