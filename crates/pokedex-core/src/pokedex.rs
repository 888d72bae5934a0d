//! The cache-or-fetch aggregation engine.
//!
//! Every lookup follows the same state machine: check the cached collection,
//! return on a hit, and on a miss resolve from upstream, upsert into the
//! store and return. Filters and pagination never leave the cache.
//!
//! All read-modify-write cycles on the store are serialized through one
//! async lock and reload the envelope inside it, so concurrent misses do not
//! overwrite each other. Upstream requests are made outside the lock.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use pokedex_store::CacheStore;
use pokedex_types::{
    AbilityDetail, AbilityHolder, CollectionEnvelope, DetailRecord, EvolutionStep, resource_id,
};

use crate::error::{Error, Result, UpstreamError};
use crate::resources::{
    AbilityResource, EvolutionChainResource, NO_EFFECT_TEXT, NamedResource, PokemonResource,
    SpeciesResource, build_detail_record,
};
use crate::upstream::{Endpoints, Upstream, fetch_as};

/// Tuning for the engine.
#[derive(Debug, Clone)]
pub struct PokedexOptions {
    /// Upstream URL layout.
    pub endpoints: Endpoints,
    /// Entries requested per listing page during a crawl.
    pub page_size: u32,
    /// Stagger between detail resolutions inside one crawl page.
    pub crawl_delay: Duration,
}

impl Default for PokedexOptions {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            page_size: 100,
            crawl_delay: Duration::from_millis(100),
        }
    }
}

impl PokedexOptions {
    /// Set the listing page size.
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the crawl stagger.
    #[must_use]
    pub fn crawl_delay(mut self, delay: Duration) -> Self {
        self.crawl_delay = delay;
        self
    }

    /// Set the upstream URL layout.
    #[must_use]
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Caching aggregation engine over an upstream provider and a local store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pokedex_core::Pokedex;
/// use pokedex_core::mock::{MockUpstream, PokemonFixture};
/// use pokedex_store::MemoryStore;
///
/// #[tokio::main]
/// async fn main() -> pokedex_core::Result<()> {
///     let upstream = Arc::new(MockUpstream::new());
///     upstream.add_pokemon(&PokemonFixture::new(25, "pikachu").types(&["electric"]));
///
///     let pokedex = Pokedex::new(upstream, Arc::new(MemoryStore::new()));
///     let pikachu = pokedex.get_by_id(25).await?;
///     assert_eq!(pikachu.name, "pikachu");
///
///     let electric = pokedex.filter_by_type("Electric");
///     assert_eq!(electric.len(), 1);
///     Ok(())
/// }
/// ```
pub struct Pokedex {
    pub(crate) upstream: Arc<dyn Upstream>,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) options: PokedexOptions,
    pub(crate) write_lock: Mutex<()>,
    /// Held for the whole of a bulk crawl.
    pub(crate) crawl_lock: Mutex<()>,
}

impl std::fmt::Debug for Pokedex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pokedex")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pokedex {
    /// Create an engine with default options.
    pub fn new(upstream: Arc<dyn Upstream>, store: Arc<dyn CacheStore>) -> Self {
        Self::with_options(upstream, store, PokedexOptions::default())
    }

    /// Create an engine with custom options.
    pub fn with_options(
        upstream: Arc<dyn Upstream>,
        store: Arc<dyn CacheStore>,
        options: PokedexOptions,
    ) -> Self {
        Self {
            upstream,
            store,
            options,
            write_lock: Mutex::new(()),
            crawl_lock: Mutex::new(()),
        }
    }

    /// Get the engine options.
    pub fn options(&self) -> &PokedexOptions {
        &self.options
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Get a record by numeric id.
    ///
    /// Cached complete records are returned without any upstream call. Stub
    /// records count as a miss.
    pub async fn get_by_id(&self, id: u32) -> Result<DetailRecord> {
        if let Some(record) = self.store.load().find_by_id(id)
            && !record.is_stub()
        {
            debug!("Cache hit for pokemon {}", id);
            return Ok(record.clone());
        }

        debug!("Cache miss for pokemon {}", id);
        let record = self
            .resolve_record(&id.to_string())
            .await
            .map_err(|e| not_found_as(e, format!("Pokemon with ID {id} not found")))?;
        Ok(self.persist_record(record).await)
    }

    /// Get a record by name, case-insensitively.
    pub async fn search_by_name(&self, name: &str) -> Result<DetailRecord> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "Pokemon name must not be empty".to_string(),
            ));
        }

        if let Some(record) = self.store.load().find_by_name(&name)
            && !record.is_stub()
        {
            debug!("Cache hit for pokemon '{}'", name);
            return Ok(record.clone());
        }

        debug!("Cache miss for pokemon '{}'", name);
        let record = self
            .resolve_record(&name)
            .await
            .map_err(|e| not_found_as(e, format!("Pokemon with name {name} not found")))?;
        Ok(self.persist_record(record).await)
    }

    /// Slice one 1-based page out of the cached collection.
    pub fn paginate(&self, page: u32, limit: u32) -> Result<CollectionEnvelope> {
        if page < 1 || limit < 1 {
            return Err(Error::InvalidArgument(
                "Page and limit must be at least 1".to_string(),
            ));
        }
        Ok(self.store.load().page(page, limit))
    }

    /// Cached records whose types include `type_name`.
    pub fn filter_by_type(&self, type_name: &str) -> Vec<DetailRecord> {
        let type_name = type_name.trim();
        self.filter(|r| r.has_type(type_name))
    }

    /// Cached records from `region`.
    pub fn filter_by_region(&self, region: &str) -> Vec<DetailRecord> {
        let region = region.trim();
        self.filter(|r| r.region.eq_ignore_ascii_case(region))
    }

    /// Cached records from `generation` (e.g. `generation-iii`).
    pub fn filter_by_generation(&self, generation: &str) -> Vec<DetailRecord> {
        let generation = generation.trim();
        self.filter(|r| r.generation.eq_ignore_ascii_case(generation))
    }

    fn filter(&self, predicate: impl Fn(&DetailRecord) -> bool) -> Vec<DetailRecord> {
        self.store
            .load()
            .data
            .into_iter()
            .filter(|r| predicate(r))
            .collect()
    }

    /// Ordered evolution steps for a Pokémon, following the first branch.
    ///
    /// An empty result means the species has no evolution chain.
    pub async fn get_evolution_chain(&self, id: u32) -> Result<Vec<EvolutionStep>> {
        let cached = self.store.load();
        if let Some(record) = cached.find_by_id(id)
            && !record.evolution_steps.is_empty()
        {
            debug!("Cache hit for evolution chain of {}", id);
            return Ok(record.evolution_steps.clone());
        }

        let species = self.species_for(id).await?;

        let Some(link) = species.evolution_chain.as_ref() else {
            debug!("Pokemon {} has no evolution chain", id);
            return Ok(Vec::new());
        };

        let chain: EvolutionChainResource = fetch_as(self.upstream.as_ref(), &link.url)
            .await
            .map_err(|e| Error::upstream(format!("evolution chain for pokemon {id}"), e))?;

        // Stages resolve one at a time, in chain order.
        let mut steps = Vec::new();
        for node in chain.chain.first_path() {
            steps.push(self.resolve_step(&cached, node).await?);
        }

        if !steps.is_empty() {
            self.attach_evolution(id, &species.name, steps.clone()).await;
        }
        Ok(steps)
    }

    /// Species of a Pokémon id.
    ///
    /// Alternate forms have no species under their own id; for those the
    /// species URL is taken from the base resource.
    async fn species_for(&self, id: u32) -> Result<SpeciesResource> {
        let direct = self.options.endpoints.species(id);
        match fetch_as(self.upstream.as_ref(), &direct).await {
            Ok(species) => return Ok(species),
            Err(e) if !e.is_not_found() => {
                return Err(Error::upstream(format!("species for pokemon {id}"), e));
            }
            Err(_) => {}
        }

        let pokemon: PokemonResource =
            fetch_as(self.upstream.as_ref(), &self.options.endpoints.pokemon(&id.to_string()))
                .await
                .map_err(|e| {
                    if e.is_not_found() {
                        Error::NotFound(format!("Pokemon species {id} not found"))
                    } else {
                        Error::upstream(format!("pokemon {id}"), e)
                    }
                })?;
        if pokemon.species.url.is_empty() {
            return Err(Error::NotFound(format!("Pokemon species {id} not found")));
        }
        debug!("Species of {} is {}", id, pokemon.species.name);
        fetch_as(self.upstream.as_ref(), &pokemon.species.url)
            .await
            .map_err(|e| Error::upstream(format!("species for pokemon {id}"), e))
    }

    async fn resolve_step(
        &self,
        cached: &CollectionEnvelope,
        node: &NamedResource,
    ) -> Result<EvolutionStep> {
        if let Some(record) = cached.find_by_name(&node.name) {
            return Ok(EvolutionStep {
                id: record.id,
                name: record.name.clone(),
                image_url: record.image_url.clone(),
            });
        }

        let url = self.options.endpoints.pokemon(&node.name.to_lowercase());
        let id = match fetch_as::<PokemonResource>(self.upstream.as_ref(), &url).await {
            Ok(pokemon) => pokemon.id,
            // Species without a default form of the same name still carry
            // their id in the species URL.
            Err(e) if e.is_not_found() => resource_id(&node.url)
                .map_err(|_| Error::upstream(format!("evolution stage {}", node.name), e))?,
            Err(e) => return Err(Error::upstream(format!("evolution stage {}", node.name), e)),
        };

        Ok(EvolutionStep {
            id,
            name: node.name.to_lowercase(),
            image_url: self.options.endpoints.image(id),
        })
    }

    async fn attach_evolution(&self, id: u32, species_name: &str, steps: Vec<EvolutionStep>) {
        let _guard = self.write_lock.lock().await;
        let mut envelope = self.store.load();

        let record = match envelope.find_by_id(id) {
            Some(existing) => DetailRecord {
                evolution_steps: steps,
                last_updated: OffsetDateTime::now_utc(),
                ..existing.clone()
            },
            None => {
                let mut stub =
                    DetailRecord::stub(id, species_name, self.options.endpoints.image(id));
                stub.evolution_steps = steps;
                stub
            }
        };
        envelope.upsert(record);

        if let Err(e) = self.store.save(&envelope) {
            warn!("Failed to persist evolution chain for {}: {}", id, e);
        }
    }

    /// Ability description plus every Pokémon that can have it.
    ///
    /// Holders are resolved concurrently through [`get_by_id`](Self::get_by_id);
    /// holders that fail to resolve are left out.
    pub async fn get_ability_detail(&self, ability_id: u32) -> Result<AbilityDetail> {
        let ability: AbilityResource =
            fetch_as(self.upstream.as_ref(), &self.options.endpoints.ability(ability_id))
                .await
                .map_err(|e| {
                    if e.is_not_found() {
                        Error::NotFound(format!("Ability with ID {ability_id} not found"))
                    } else {
                        Error::upstream(format!("ability {ability_id}"), e)
                    }
                })?;

        let effect = ability
            .english_effect()
            .unwrap_or(NO_EFFECT_TEXT)
            .to_string();

        let ids: Vec<u32> = ability
            .pokemon
            .iter()
            .filter_map(|entry| match resource_id(&entry.pokemon.url) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Skipping holder '{}' of {}: {}", entry.pokemon.name, ability.name, e);
                    None
                }
            })
            .collect();

        let results = join_all(ids.iter().map(|&id| self.get_by_id(id))).await;
        let holders: Vec<AbilityHolder> = ids
            .iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(record) => Some(AbilityHolder::from(&record)),
                Err(e) => {
                    warn!("Skipping holder {} of {}: {}", id, ability.name, e);
                    None
                }
            })
            .collect();

        Ok(AbilityDetail {
            name: ability.name,
            effect,
            pokemon_with_ability: holders,
        })
    }

    /// Whether the upstream answers a minimal listing request.
    pub async fn upstream_available(&self) -> bool {
        match self
            .upstream
            .fetch_json(&self.options.endpoints.probe())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Upstream probe failed: {}", e);
                false
            }
        }
    }

    /// Fetch the base resource and its species, and flatten them.
    pub(crate) async fn resolve_record(&self, id_or_name: &str) -> Result<DetailRecord> {
        let pokemon: PokemonResource =
            fetch_as(self.upstream.as_ref(), &self.options.endpoints.pokemon(id_or_name))
                .await
                .map_err(|e| Error::upstream(format!("pokemon {id_or_name}"), e))?;

        let species_url = if pokemon.species.url.is_empty() {
            self.options.endpoints.species(pokemon.id)
        } else {
            pokemon.species.url.clone()
        };
        let species: SpeciesResource = fetch_as(self.upstream.as_ref(), &species_url)
            .await
            .map_err(|e| Error::upstream(format!("species for pokemon {}", pokemon.id), e))?;

        Ok(build_detail_record(
            &pokemon,
            &species,
            self.options.endpoints.sprite_base_url(),
        ))
    }

    /// Upsert a freshly resolved record, keeping any cached evolution steps.
    ///
    /// Persistence failures are logged; the caller still gets the record.
    async fn persist_record(&self, mut record: DetailRecord) -> DetailRecord {
        let _guard = self.write_lock.lock().await;
        let mut envelope = self.store.load();

        if record.evolution_steps.is_empty()
            && let Some(existing) = envelope.find_by_id(record.id)
        {
            record.evolution_steps = existing.evolution_steps.clone();
        }

        if envelope.upsert(record.clone()) {
            info!("Cached pokemon {} ({})", record.id, record.name);
        }
        if let Err(e) = self.store.save(&envelope) {
            warn!("Failed to persist pokemon {}: {}", record.id, e);
        }
        record
    }
}

/// Replace an upstream 404 on the base resource with a caller-facing message.
fn not_found_as(error: Error, message: String) -> Error {
    let base_missing = matches!(
        &error,
        Error::Upstream {
            source: UpstreamError::NotFound { .. },
            context,
        } if context.starts_with("pokemon ")
    );
    if base_missing {
        Error::NotFound(message)
    } else {
        error
    }
}
