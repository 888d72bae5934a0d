//! End-to-end tests for pokedex-core against a mock upstream and a real
//! JSON file store.

use std::sync::Arc;
use std::time::Duration;

use pokedex_core::mock::{MockFailure, MockUpstream, PokemonFixture};
use pokedex_core::{Pokedex, PokedexOptions};
use pokedex_store::{CacheStore, JsonFileStore};
use pokedex_types::{CollectionEnvelope, DetailRecord};
use tempfile::TempDir;

const PAGE_SIZE: u32 = 4;

fn open_store(dir: &TempDir) -> Arc<JsonFileStore> {
    Arc::new(JsonFileStore::open(dir.path().join("pokemon_data.json")).unwrap())
}

fn engine(upstream: &Arc<MockUpstream>, store: &Arc<JsonFileStore>) -> Pokedex {
    Pokedex::with_options(
        upstream.clone(),
        store.clone(),
        PokedexOptions::default()
            .page_size(PAGE_SIZE)
            .crawl_delay(Duration::ZERO),
    )
}

/// Register `ids` as a catalog listing plus their detail resources.
fn register_catalog(upstream: &MockUpstream, ids: std::ops::RangeInclusive<u32>) {
    let names: Vec<(u32, String)> = ids.map(|id| (id, format!("mon{id}"))).collect();
    for (id, name) in &names {
        upstream.add_pokemon(&PokemonFixture::new(*id, name).types(&["normal"]));
    }
    let entries: Vec<(u32, &str)> = names.iter().map(|(id, n)| (*id, n.as_str())).collect();
    upstream.add_listing(PAGE_SIZE, &entries);
}

#[tokio::test]
async fn test_cache_hit_skips_second_species_call() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_pokemon(&PokemonFixture::new(25, "pikachu").types(&["electric"]));
    let pokedex = engine(&upstream, &store);

    let first = pokedex.get_by_id(25).await.unwrap();
    let second = pokedex.get_by_id(25).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(upstream.call_count(&upstream.endpoints().species(25)), 1);

    // The record survives a reopen of the same file.
    let reopened = open_store(&dir);
    assert_eq!(reopened.load().find_by_id(25).unwrap().name, "pikachu");
}

#[tokio::test]
async fn test_pagination_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut envelope = CollectionEnvelope::default();
    for id in 1..=7 {
        envelope.upsert(DetailRecord::stub(id, &format!("mon{id}"), String::new()));
    }
    store.save(&envelope).unwrap();
    let pokedex = engine(&Arc::new(MockUpstream::forbidding_calls()), &store);

    for page in 1..=4 {
        let a = serde_json::to_vec(&pokedex.paginate(page, 3).unwrap()).unwrap();
        let b = serde_json::to_vec(&pokedex.paginate(page, 3).unwrap()).unwrap();
        assert_eq!(a, b);

        let result = pokedex.paginate(page, 3).unwrap();
        assert_eq!(result.has_more, page * 3 < result.total);
    }
    assert!(!pokedex.paginate(3, 3).unwrap().has_more);
}

#[tokio::test]
async fn test_filters_make_no_upstream_calls() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let seeding = Arc::new(MockUpstream::new());
    seeding.add_pokemon(&PokemonFixture::new(1, "bulbasaur").types(&["grass", "poison"]));
    seeding.add_pokemon(
        &PokemonFixture::new(252, "treecko")
            .types(&["grass"])
            .generation("generation-iii"),
    );
    let seeder = engine(&seeding, &store);
    seeder.get_by_id(1).await.unwrap();
    seeder.get_by_id(252).await.unwrap();

    let forbidden = Arc::new(MockUpstream::forbidding_calls());
    let pokedex = engine(&forbidden, &store);

    assert_eq!(pokedex.filter_by_type("grass").len(), 2);
    assert_eq!(pokedex.filter_by_region("hoenn").len(), 1);
    assert_eq!(pokedex.filter_by_generation("GENERATION-I").len(), 1);
    assert!(pokedex.filter_by_type("dragon").is_empty());
    assert_eq!(forbidden.total_calls(), 0);
}

#[tokio::test]
async fn test_linear_evolution_chain_of_depth_two() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_pokemon(
        &PokemonFixture::new(1, "bulbasaur")
            .types(&["grass", "poison"])
            .evolution_chain(1),
    );
    upstream.add_pokemon(&PokemonFixture::new(2, "ivysaur").evolution_chain(1));
    upstream.add_pokemon(&PokemonFixture::new(3, "venusaur").evolution_chain(1));
    upstream.add_evolution_chain(1, &["bulbasaur", "ivysaur", "venusaur"]);
    let pokedex = engine(&upstream, &store);

    // Base form is already cached, so only the two later stages need lookups.
    pokedex.get_by_id(1).await.unwrap();
    upstream.reset_calls();

    let steps = pokedex.get_evolution_chain(1).await.unwrap();
    assert_eq!(
        steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["bulbasaur", "ivysaur", "venusaur"]
    );
    assert_eq!(steps.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2, 3]);

    let endpoints = upstream.endpoints();
    let stage_lookups = upstream.call_count(&endpoints.pokemon("ivysaur"))
        + upstream.call_count(&endpoints.pokemon("venusaur"))
        + upstream.call_count(&endpoints.pokemon("bulbasaur"));
    assert_eq!(stage_lookups, 2);

    // Attached to the cached record rather than duplicated.
    let envelope = store.load();
    assert_eq!(envelope.total, 1);
    assert_eq!(envelope.find_by_id(1).unwrap().evolution_steps.len(), 3);
}

#[tokio::test]
async fn test_crawl_skips_single_failed_item() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let upstream = Arc::new(MockUpstream::new());
    register_catalog(&upstream, 1..=3 * PAGE_SIZE);

    // Second entry of the second page.
    let failing = PAGE_SIZE + 2;
    upstream.set_failure(
        &upstream.endpoints().species(failing),
        MockFailure::Status(500),
    );
    let pokedex = engine(&upstream, &store);

    let records = pokedex.get_all_details().await.unwrap();
    assert_eq!(records.len(), (3 * PAGE_SIZE - 1) as usize);
    assert!(records.iter().all(|r| r.id != failing));

    let envelope = store.load();
    assert_eq!(envelope.total, 3 * PAGE_SIZE - 1);
    assert!(!envelope.has_more);
}

#[tokio::test]
async fn test_corrupt_store_self_heals() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pokemon_data.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    assert_eq!(store.load(), CollectionEnvelope::default());
    assert!(!store.is_populated());

    let healed: CollectionEnvelope =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(healed, CollectionEnvelope::default());
}

#[tokio::test]
async fn test_refresh_replaces_old_records() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let mut old = CollectionEnvelope::default();
    for id in [500, 501, 2] {
        old.upsert(DetailRecord::stub(id, &format!("old{id}"), String::new()));
    }
    store.save(&old).unwrap();

    let upstream = Arc::new(MockUpstream::new());
    register_catalog(&upstream, 1..=6);
    let pokedex = engine(&upstream, &store);

    let report = pokedex.refresh_cache().await.unwrap();
    assert!(report.complete);
    assert_eq!(report.skipped, 0);

    let mut ids: Vec<u32> = store.load().data.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

    // The rediscovered id carries fresh data, not the old stub.
    let envelope = store.load();
    let two = envelope.find_by_id(2).unwrap();
    assert_eq!(two.name, "mon2");
    assert!(!two.is_stub());
}

#[tokio::test]
async fn test_concurrent_misses_are_all_persisted() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let upstream = Arc::new(MockUpstream::new());
    for id in 1..=8 {
        upstream.add_pokemon(&PokemonFixture::new(id, &format!("mon{id}")));
        upstream.set_latency(
            &upstream.endpoints().species(id),
            Duration::from_millis(u64::from(9 - id) * 3),
        );
    }
    let pokedex = Arc::new(engine(&upstream, &store));

    let handles: Vec<_> = (1..=8)
        .map(|id| {
            let pokedex = Arc::clone(&pokedex);
            tokio::spawn(async move { pokedex.get_by_id(id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let envelope = store.load();
    assert_eq!(envelope.total, 8);
    assert_eq!(envelope.data.len(), 8);
}
