//! Local persistence for resolved Pokédex records.
//!
//! The whole cache is one JSON document holding a
//! [`CollectionEnvelope`](pokedex_types::CollectionEnvelope). Reads are
//! self-healing: a missing or corrupt file is replaced with an empty envelope
//! instead of surfacing an error.
//!
//! # Features
//!
//! - [`CacheStore`] trait for injecting the store into the aggregation engine
//! - [`JsonFileStore`] with atomic whole-file rewrites
//! - [`MemoryStore`] for tests
//!
//! # Example
//!
//! ```no_run
//! use pokedex_store::{CacheStore, JsonFileStore};
//!
//! let store = JsonFileStore::open_default()?;
//! if !store.is_populated() {
//!     println!("cache is empty");
//! }
//! let envelope = store.load();
//! println!("{} cached records", envelope.total);
//! # Ok::<(), pokedex_store::Error>(())
//! ```

mod error;
mod store;

pub use error::{Error, Result};
pub use store::{CacheStore, JsonFileStore, MemoryStore};

/// Default store path following platform conventions.
///
/// - Linux: `~/.local/share/pokedex/pokemon_data.json`
/// - macOS: `~/Library/Application Support/pokedex/pokemon_data.json`
/// - Windows: `C:\Users\<user>\AppData\Local\pokedex\pokemon_data.json`
pub fn default_store_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("pokedex")
        .join("pokemon_data.json")
}
