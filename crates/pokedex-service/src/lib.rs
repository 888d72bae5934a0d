//! HTTP REST API and background cache refresher for the Pokédex caching proxy.
//!
//! This crate provides a service that:
//! - Serves Pokémon records from a local JSON cache, resolving misses from PokéAPI
//! - Answers pagination and filter queries from the cache alone
//! - Rebuilds the whole cache in the background on request
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/status` - Version, maintainer contact and upstream availability
//! - `GET /api/pokemon/{id}` - Record by id
//! - `GET /api/pokemon/search/{name}` - Record by name
//! - `GET /api/pokemon/all/details` - Every record (crawls unless a complete catalog is cached)
//! - `GET /api/pokemon/paged?page&limit` - One page of the cache
//! - `GET /api/pokemon/ability/{id}` - Ability effect and holders
//! - `GET /api/pokemon/evolution/{id}` - Evolution steps
//! - `GET /api/pokemon/filter/{type|region|generation}/{value}` - Cache filters
//! - `GET|POST /api/pokemon/refresh-cache`, `/api/pokemon/cache/update` - Start a rebuild
//! - `GET /api/pokemon/cache/status` - Cache and rebuild status
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/pokedex/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5145"
//!
//! [storage]
//! path = "~/.local/share/pokedex/pokemon_data.json"
//!
//! [upstream]
//! base_url = "https://pokeapi.co/api/v2"
//!
//! [crawl]
//! page_size = 100
//! delay_ms = 100
//! refresh_on_start = false
//! ```

pub mod api;
pub mod config;
pub mod refresher;
pub mod state;

pub use config::{
    Config, ConfigError, CrawlConfig, ServerConfig, StorageConfig, UpstreamConfig,
    ValidationError,
};
pub use refresher::{RefreshError, Refresher};
pub use state::{AppState, RefreshRun, RefreshState};
