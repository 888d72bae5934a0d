//! Shared record types for the Pokédex caching proxy.
//!
//! This crate holds the shapes that are persisted by `pokedex-store`,
//! produced by `pokedex-core` and served by `pokedex-service`.
//!
//! # Features
//!
//! - [`DetailRecord`], the canonical cached unit
//! - [`CollectionEnvelope`], the persisted wrapper with pagination bookkeeping
//! - [`AbilityDetail`] and [`EvolutionStep`] view models
//! - The fixed [`Generation`] to region table
//! - Sprite URL and resource id helpers
//!
//! # Example
//!
//! ```
//! use pokedex_types::{CollectionEnvelope, GenderRate, Generation};
//!
//! let envelope = CollectionEnvelope::default();
//! assert_eq!(envelope.limit, 100);
//! assert!(envelope.has_more);
//!
//! assert_eq!(Generation::region_for("generation-iii"), "hoenn");
//! assert_eq!(GenderRate::from_code(4).male_percentage, 50.0);
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    AbilityDetail, AbilityHolder, AbilitySummary, CollectionEnvelope, DEFAULT_SPRITE_BASE_URL,
    DetailRecord, EvolutionStep, GenderRate, Generation, UNKNOWN_REGION, UNKNOWN_TYPE,
    resource_id, sprite_url,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::OffsetDateTime;

    fn record(id: u32, name: &str, types: &[&str]) -> DetailRecord {
        DetailRecord {
            id,
            name: name.to_string(),
            image_url: sprite_url(DEFAULT_SPRITE_BASE_URL, id),
            types: types.iter().map(|t| t.to_string()).collect(),
            stats: vec!["hp: 45".to_string()],
            height: 0.7,
            weight: 6.9,
            abilities: Vec::new(),
            region: "kanto".to_string(),
            generation: "generation-i".to_string(),
            growth_rate: "medium-slow".to_string(),
            gender_rate: GenderRate::from_code(1),
            evolution_steps: Vec::new(),
            last_updated: OffsetDateTime::UNIX_EPOCH,
        }
    }

    // --- GenderRate ---

    #[test]
    fn test_gender_rate_genderless() {
        let rate = GenderRate::from_code(-1);
        assert_eq!(rate.male_percentage, 0.0);
        assert_eq!(rate.female_percentage, 0.0);
        assert!(rate.is_genderless());
    }

    #[test]
    fn test_gender_rate_all_male_and_all_female() {
        let male = GenderRate::from_code(0);
        assert_eq!(male.male_percentage, 100.0);
        assert_eq!(male.female_percentage, 0.0);

        let female = GenderRate::from_code(8);
        assert_eq!(female.male_percentage, 0.0);
        assert_eq!(female.female_percentage, 100.0);
        assert!(!female.is_genderless());
    }

    proptest! {
        #[test]
        fn prop_gender_rate_sums_to_hundred(code in 0i32..=8) {
            let rate = GenderRate::from_code(code);
            prop_assert!((rate.male_percentage + rate.female_percentage - 100.0).abs() < 1e-9);
            prop_assert!(rate.female_percentage >= 0.0);
            prop_assert!(rate.male_percentage >= 0.0);
        }
    }

    // --- Generation ---

    #[test]
    fn test_generation_region_table() {
        let regions: Vec<&str> = Generation::ALL.iter().map(|g| g.region()).collect();
        assert_eq!(
            regions,
            vec![
                "kanto", "johto", "hoenn", "sinnoh", "unova", "kalos", "alola", "galar", "paldea"
            ]
        );
    }

    #[test]
    fn test_generation_parse_case_insensitive() {
        assert_eq!("Generation-IV".parse::<Generation>().unwrap(), Generation::IV);
        assert_eq!(Generation::VIII.to_string(), "generation-viii");
        assert!(matches!(
            "generation-x".parse::<Generation>(),
            Err(ParseError::UnknownGeneration(_))
        ));
        assert_eq!(Generation::region_for("generation-x"), UNKNOWN_REGION);
    }

    // --- URL helpers ---

    #[test]
    fn test_resource_id_with_and_without_trailing_slash() {
        assert_eq!(resource_id("https://pokeapi.co/api/v2/pokemon/133/").unwrap(), 133);
        assert_eq!(resource_id("https://pokeapi.co/api/v2/pokemon/133").unwrap(), 133);
        assert!(resource_id("not a url").is_err());
    }

    #[test]
    fn test_ability_summary_id() {
        let ability = AbilitySummary {
            name: "blaze".to_string(),
            url: "https://pokeapi.co/api/v2/ability/66/".to_string(),
            is_hidden: false,
        };
        assert_eq!(ability.id().unwrap(), 66);
    }

    // --- DetailRecord ---

    #[test]
    fn test_stub_record_is_placeholder() {
        let stub = DetailRecord::stub(7, "Squirtle", sprite_url(DEFAULT_SPRITE_BASE_URL, 7));
        assert!(stub.is_stub());
        assert_eq!(stub.name, "squirtle");
        assert_eq!(stub.primary_type(), UNKNOWN_TYPE);

        let full = record(7, "squirtle", &["water"]);
        assert!(!full.is_stub());
        assert!(full.has_type("WATER"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record(1, "bulbasaur", &["grass", "poison"])).unwrap();
        assert_eq!(json["imageUrl"], "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/1.png");
        assert_eq!(json["genderRate"]["femalePercentage"], 12.5);
        assert_eq!(json["growthRate"], "medium-slow");
        assert!(json["evolutionSteps"].as_array().unwrap().is_empty());
        assert!(json["lastUpdated"].is_string());
    }

    // --- CollectionEnvelope ---

    #[test]
    fn test_envelope_default_shape() {
        let envelope = CollectionEnvelope::default();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": [], "page": 1, "limit": 100, "total": 0, "hasMore": true})
        );
    }

    #[test]
    fn test_envelope_upsert_keeps_ids_unique() {
        let mut envelope = CollectionEnvelope::default();
        assert!(envelope.upsert(record(1, "bulbasaur", &["grass"])));
        assert!(envelope.upsert(record(4, "charmander", &["fire"])));

        let mut updated = record(1, "bulbasaur", &["grass", "poison"]);
        updated.growth_rate = "fast".to_string();
        assert!(!envelope.upsert(updated));

        assert_eq!(envelope.total, 2);
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.find_by_id(1).unwrap().growth_rate, "fast");
        assert_eq!(envelope.find_by_name("CHARMANDER").unwrap().id, 4);
        assert!(envelope.find_by_id(25).is_none());
    }

    #[test]
    fn test_envelope_page_slicing() {
        let mut envelope = CollectionEnvelope::default();
        for id in 1..=5 {
            envelope.upsert(record(id, &format!("mon-{id}"), &["normal"]));
        }

        let first = envelope.page(1, 2);
        assert_eq!(first.data.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(first.total, 5);
        assert!(first.has_more);

        let last = envelope.page(3, 2);
        assert_eq!(last.data.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5]);
        assert!(!last.has_more);

        let beyond = envelope.page(10, 2);
        assert!(beyond.data.is_empty());
        assert!(!beyond.has_more);

        // Exact boundary: page * limit == total
        let exact = envelope.page(1, 5);
        assert_eq!(exact.data.len(), 5);
        assert!(!exact.has_more);
    }
}
