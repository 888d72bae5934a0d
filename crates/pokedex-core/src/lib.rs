//! Upstream client and caching aggregation engine for PokéAPI data.
//!
//! This crate resolves Pokémon records from the public PokéAPI, flattens the
//! base resource and its species into one [`DetailRecord`], and keeps every
//! resolved record in an injected [`CacheStore`](pokedex_store::CacheStore).
//!
//! # Features
//!
//! - **Cache-or-fetch lookups**: by id, by name, evolution chains and abilities
//! - **Cache-only queries**: pagination and type/region/generation filters
//! - **Bulk crawl**: page through the whole catalog with a courtesy throttle
//! - **Partial failure tolerance**: crawl and fan-out items are skipped, not fatal
//! - **Mock upstream**: canned responses with call accounting for tests
//!
//! # Request cost
//!
//! | Operation | Upstream calls on a cold cache |
//! |-----------|-------------------------------|
//! | [`Pokedex::get_by_id`] | 2 (base + species) |
//! | [`Pokedex::get_evolution_chain`] | 2 + one per uncached stage |
//! | [`Pokedex::get_ability_detail`] | 1 + 2 per uncached holder |
//! | [`Pokedex::get_all_details`] | listing pages + 2 per entry |
//! | filters, [`Pokedex::paginate`] | 0 |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pokedex_core::{HttpUpstream, Pokedex};
//! use pokedex_store::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upstream = Arc::new(HttpUpstream::new()?);
//!     let store = Arc::new(JsonFileStore::open_default()?);
//!     let pokedex = Pokedex::new(upstream, store);
//!
//!     let pikachu = pokedex.search_by_name("Pikachu").await?;
//!     println!("#{} {} ({})", pikachu.id, pikachu.name, pikachu.region);
//!
//!     for step in pokedex.get_evolution_chain(pikachu.id).await? {
//!         println!("  -> {}", step.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod crawl;
pub mod error;
pub mod mock;
pub mod pokedex;
pub mod resources;
pub mod upstream;

pub use crawl::CrawlReport;
pub use error::{BoxError, Error, Result, UpstreamError, UpstreamResult};
pub use mock::{MockFailure, MockUpstream, PokemonFixture};
pub use pokedex::{Pokedex, PokedexOptions};
pub use resources::{NO_EFFECT_TEXT, build_detail_record};
pub use upstream::{DEFAULT_BASE_URL, Endpoints, HttpUpstream, Upstream};

// Re-export from pokedex-types
pub use pokedex_types::{
    AbilityDetail, AbilityHolder, CollectionEnvelope, DetailRecord, EvolutionStep, GenderRate,
    Generation,
};
