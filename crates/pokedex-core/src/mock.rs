//! Mock upstream implementation for testing.
//!
//! This module provides a fake data provider that can be used for unit
//! testing without network access.
//!
//! The [`MockUpstream`] implements the [`Upstream`] trait, allowing it to be
//! injected into [`Pokedex`](crate::Pokedex) in place of the HTTP client.
//!
//! # Features
//!
//! - **Canned responses**: JSON bodies keyed by URL (trailing slashes ignored)
//! - **Call accounting**: Per-URL and total call counts
//! - **Failure injection**: Fail specific URLs with 404, an HTTP status, or a transport error
//! - **Latency simulation**: Delay specific URLs to shuffle completion order
//! - **Fixtures**: Register consistent pokemon/species/chain/ability/listing resources

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{UpstreamError, UpstreamResult};
use crate::upstream::{Endpoints, Upstream};

/// Failure to inject for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Answer 404.
    NotFound,
    /// Answer with the given non-success status.
    Status(u16),
    /// Fail before any response.
    Transport,
}

/// A fake upstream serving canned JSON.
///
/// # Example
///
/// ```
/// use pokedex_core::mock::{MockUpstream, PokemonFixture};
/// use pokedex_core::Upstream;
///
/// #[tokio::main]
/// async fn main() {
///     let upstream = MockUpstream::new();
///     upstream.add_pokemon(&PokemonFixture::new(25, "pikachu").types(&["electric"]));
///
///     let url = upstream.endpoints().pokemon("25");
///     let body = upstream.fetch_json(&url).await.unwrap();
///     assert_eq!(body["name"], "pikachu");
///     assert_eq!(upstream.call_count(&url), 1);
/// }
/// ```
pub struct MockUpstream {
    endpoints: Endpoints,
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, MockFailure>>,
    latencies: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
    forbidden: AtomicBool,
}

impl std::fmt::Debug for MockUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockUpstream")
            .field("endpoints", &self.endpoints)
            .field("total_calls", &self.total_calls())
            .field("forbidden", &self.forbidden.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

fn key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl MockUpstream {
    /// Create an empty mock using the default endpoint layout.
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    /// Create an empty mock for a custom endpoint layout.
    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            responses: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            latencies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            forbidden: AtomicBool::new(false),
        }
    }

    /// Create a mock that fails every call.
    pub fn forbidding_calls() -> Self {
        let upstream = Self::new();
        upstream.forbidden.store(true, Ordering::SeqCst);
        upstream
    }

    /// Endpoint layout the fixtures are registered under.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Serve `body` for `url`.
    pub fn set_json(&self, url: &str, body: Value) {
        lock(&self.responses).insert(key(url), body);
    }

    /// Fail every request to `url`.
    pub fn set_failure(&self, url: &str, failure: MockFailure) {
        lock(&self.failures).insert(key(url), failure);
    }

    /// Remove an injected failure.
    pub fn clear_failure(&self, url: &str) {
        lock(&self.failures).remove(&key(url));
    }

    /// Delay responses for `url`.
    pub fn set_latency(&self, url: &str, latency: Duration) {
        lock(&self.latencies).insert(key(url), latency);
    }

    /// Number of requests made to `url`.
    pub fn call_count(&self, url: &str) -> usize {
        let url = key(url);
        lock(&self.calls).iter().filter(|c| **c == url).count()
    }

    /// Number of requests made to any URL.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requested URLs in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    // --- Fixtures ---

    /// Register the base resource (by id and by name) and species of a Pokémon.
    pub fn add_pokemon(&self, fixture: &PokemonFixture) {
        let body = fixture.pokemon_json(&self.endpoints);
        self.set_json(&self.endpoints.pokemon(&fixture.id.to_string()), body.clone());
        self.set_json(&self.endpoints.pokemon(&fixture.name), body);
        self.set_json(
            &self.endpoints.species(fixture.species_id()),
            fixture.species_json(&self.endpoints),
        );
    }

    /// Register a linear evolution chain.
    ///
    /// Stages are listed from base form forward.
    pub fn add_evolution_chain(&self, chain_id: u32, stages: &[&str]) {
        let mut link: Option<Value> = None;
        for name in stages.iter().rev() {
            let evolves_to = link.take().map(|l| vec![l]).unwrap_or_default();
            link = Some(json!({
                "species": {"name": name, "url": ""},
                "evolves_to": evolves_to,
            }));
        }
        let chain = link.unwrap_or_else(|| json!({"species": {"name": ""}, "evolves_to": []}));
        self.set_json(
            &chain_url(&self.endpoints, chain_id),
            json!({"id": chain_id, "chain": chain}),
        );
    }

    /// Register an ability with English effect text and its holders.
    pub fn add_ability(&self, id: u32, name: &str, effect: &str, holders: &[(u32, &str)]) {
        let pokemon: Vec<Value> = holders
            .iter()
            .map(|(pid, pname)| {
                json!({
                    "is_hidden": false,
                    "slot": 1,
                    "pokemon": {"name": pname, "url": format!("{}/", self.endpoints.pokemon(&pid.to_string()))},
                })
            })
            .collect();
        self.set_json(
            &self.endpoints.ability(id),
            json!({
                "id": id,
                "name": name,
                "effect_entries": [
                    {"effect": format!("{effect} (de)"), "language": {"name": "de"}},
                    {"effect": effect, "language": {"name": "en"}},
                ],
                "pokemon": pokemon,
            }),
        );
    }

    /// Register listing pages covering `entries`, ending with a short page.
    pub fn add_listing(&self, page_size: u32, entries: &[(u32, &str)]) {
        let total = entries.len() as u32;
        let page_size = page_size.max(1);
        let mut offset = 0;
        loop {
            let results: Vec<Value> = entries
                .iter()
                .skip(offset as usize)
                .take(page_size as usize)
                .map(|(id, name)| {
                    json!({"name": name, "url": format!("{}/", self.endpoints.pokemon(&id.to_string()))})
                })
                .collect();
            let short = (results.len() as u32) < page_size;
            self.set_json(
                &self.endpoints.listing(offset, page_size),
                json!({"count": total, "results": results}),
            );
            if short {
                break;
            }
            offset += page_size;
        }
    }
}

/// URL of an evolution chain resource.
pub fn chain_url(endpoints: &Endpoints, chain_id: u32) -> String {
    format!("{}/evolution-chain/{}/", endpoints.base_url(), chain_id)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn fetch_json(&self, url: &str) -> UpstreamResult<Value> {
        let k = key(url);
        lock(&self.calls).push(k.clone());

        if self.forbidden.load(Ordering::SeqCst) {
            return Err(UpstreamError::Transport {
                url: url.to_string(),
                source: "mock upstream forbids all calls".into(),
            });
        }

        let latency = lock(&self.latencies).get(&k).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = lock(&self.failures).get(&k).copied();
        match failure {
            Some(MockFailure::NotFound) => {
                return Err(UpstreamError::NotFound {
                    url: url.to_string(),
                });
            }
            Some(MockFailure::Status(status)) => {
                return Err(UpstreamError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            Some(MockFailure::Transport) => {
                return Err(UpstreamError::Transport {
                    url: url.to_string(),
                    source: "mock transport failure".into(),
                });
            }
            None => {}
        }

        lock(&self.responses)
            .get(&k)
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound {
                url: url.to_string(),
            })
    }
}

/// Builder for a consistent pokemon + species fixture.
#[derive(Debug, Clone)]
pub struct PokemonFixture {
    pub id: u32,
    pub name: String,
    pub types: Vec<String>,
    pub generation: String,
    pub growth_rate: String,
    pub gender_rate: i32,
    pub abilities: Vec<(u32, String)>,
    pub evolution_chain: Option<u32>,
    /// Species this Pokémon is a form of, when it differs from `id`/`name`.
    pub species: Option<(u32, String)>,
}

impl PokemonFixture {
    /// Create a generation-i normal-type fixture.
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            types: vec!["normal".to_string()],
            generation: "generation-i".to_string(),
            growth_rate: "medium".to_string(),
            gender_rate: 4,
            abilities: Vec::new(),
            evolution_chain: None,
            species: None,
        }
    }

    /// Set the types in slot order.
    pub fn types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Set the species generation.
    pub fn generation(mut self, generation: &str) -> Self {
        self.generation = generation.to_string();
        self
    }

    /// Set the species growth rate.
    pub fn growth_rate(mut self, growth_rate: &str) -> Self {
        self.growth_rate = growth_rate.to_string();
        self
    }

    /// Set the species gender code.
    pub fn gender_rate(mut self, code: i32) -> Self {
        self.gender_rate = code;
        self
    }

    /// Add an ability reference.
    pub fn ability(mut self, id: u32, name: &str) -> Self {
        self.abilities.push((id, name.to_string()));
        self
    }

    /// Link the species to an evolution chain.
    pub fn evolution_chain(mut self, chain_id: u32) -> Self {
        self.evolution_chain = Some(chain_id);
        self
    }

    /// Make this an alternate form of another species.
    pub fn form_of(mut self, species_id: u32, species_name: &str) -> Self {
        self.species = Some((species_id, species_name.to_string()));
        self
    }

    fn species_id(&self) -> u32 {
        self.species.as_ref().map_or(self.id, |(id, _)| *id)
    }

    fn species_name(&self) -> &str {
        self.species.as_ref().map_or(&self.name, |(_, name)| name)
    }

    fn pokemon_json(&self, endpoints: &Endpoints) -> Value {
        let types: Vec<Value> = self
            .types
            .iter()
            .enumerate()
            .map(|(i, t)| json!({"slot": i + 1, "type": {"name": t, "url": ""}}))
            .collect();
        let abilities: Vec<Value> = self
            .abilities
            .iter()
            .map(|(id, name)| {
                json!({
                    "ability": {"name": name, "url": format!("{}/", endpoints.ability(*id))},
                    "is_hidden": false,
                    "slot": 1,
                })
            })
            .collect();

        json!({
            "id": self.id,
            "name": self.name,
            "height": 10,
            "weight": 100,
            "types": types,
            "stats": [
                {"base_stat": 50, "effort": 0, "stat": {"name": "hp", "url": ""}},
                {"base_stat": 60, "effort": 0, "stat": {"name": "attack", "url": ""}},
            ],
            "abilities": abilities,
            "species": {
                "name": self.species_name(),
                "url": format!("{}/", endpoints.species(self.species_id())),
            },
        })
    }

    fn species_json(&self, endpoints: &Endpoints) -> Value {
        let chain = self
            .evolution_chain
            .map(|id| json!({"url": chain_url(endpoints, id)}));
        json!({
            "id": self.species_id(),
            "name": self.species_name(),
            "generation": {"name": self.generation, "url": ""},
            "growth_rate": {"name": self.growth_rate, "url": ""},
            "gender_rate": self.gender_rate,
            "evolution_chain": chain,
        })
    }
}
