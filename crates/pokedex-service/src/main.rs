//! Pokédex Service - caching proxy and HTTP API over PokéAPI.
//!
//! Run with: `cargo run -p pokedex-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use pokedex_core::{HttpUpstream, Pokedex};
use pokedex_service::{AppState, Config, Refresher, api};
use pokedex_store::JsonFileStore;

/// Pokédex Service - caching proxy and HTTP REST API.
#[derive(Parser, Debug)]
#[command(name = "pokedex-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Cache file path (overrides config).
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Crawl the catalog at startup when the cache is empty.
    #[arg(long)]
    refresh_on_start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pokedex_service=info".parse()?)
                .add_directive("pokedex_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(store_path) = args.store {
        config.storage.path = store_path;
    }
    if args.refresh_on_start {
        config.crawl.refresh_on_start = true;
    }
    config.validate()?;

    info!("Opening cache at {:?}", config.storage.path);
    let store = Arc::new(JsonFileStore::open(&config.storage.path)?);
    let upstream = Arc::new(HttpUpstream::new()?);
    let pokedex = Pokedex::with_options(upstream, store, config.pokedex_options());

    let state = AppState::new(pokedex, config.clone());

    if config.crawl.refresh_on_start {
        Refresher::new(Arc::clone(&state)).warm_up();
    }

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = config.server.bind.parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
