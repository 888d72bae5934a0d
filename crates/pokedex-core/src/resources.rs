//! Typed shapes of upstream responses and their mapping into records.
//!
//! Only the fields this crate reads are declared; everything else the
//! upstream sends is ignored during deserialization. [`build_detail_record`]
//! maps these shapes into [`DetailRecord`](pokedex_types::DetailRecord).

use serde::Deserialize;
use time::OffsetDateTime;

use pokedex_types::{AbilitySummary, DetailRecord, GenderRate, Generation, sprite_url};

/// Effect text used when an ability has no English entry.
pub const NO_EFFECT_TEXT: &str = "No English effect description available.";

/// A `{name, url}` reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// A `{url}` reference.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceLink {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatEntry {
    pub stat: NamedResource,
    pub base_stat: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

/// `/pokemon/{id|name}`
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonResource {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    /// Decimeters.
    #[serde(default)]
    pub height: u32,
    /// Hectograms.
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    pub species: NamedResource,
}

fn genderless() -> i32 {
    GenderRate::GENDERLESS
}

/// `/pokemon-species/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub generation: Option<NamedResource>,
    #[serde(default)]
    pub growth_rate: Option<NamedResource>,
    #[serde(default = "genderless")]
    pub gender_rate: i32,
    #[serde(default)]
    pub evolution_chain: Option<ResourceLink>,
}

/// `/evolution-chain/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionChainResource {
    pub chain: ChainLink,
}

/// One node of the evolution graph.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

impl ChainLink {
    /// Walk from this node along the first child edge until a leaf.
    ///
    /// Alternate branches are dropped: a species with several evolutions
    /// contributes only its first listed one.
    pub fn first_path(&self) -> Vec<&NamedResource> {
        let mut path = Vec::new();
        let mut node = Some(self);
        while let Some(link) = node {
            path.push(&link.species);
            node = link.evolves_to.first();
        }
        path
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    pub language: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilityPokemon {
    pub pokemon: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

/// `/ability/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct AbilityResource {
    pub name: String,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    pub pokemon: Vec<AbilityPokemon>,
}

impl AbilityResource {
    /// First effect text whose language is English.
    pub fn english_effect(&self) -> Option<&str> {
        self.effect_entries
            .iter()
            .find(|entry| entry.language.name == "en")
            .map(|entry| entry.effect.as_str())
    }
}

/// `/pokemon?offset&limit`
#[derive(Debug, Clone, Deserialize)]
pub struct ListingPage {
    /// Catalog size as reported by the upstream.
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub results: Vec<NamedResource>,
}

/// Flatten a base resource and its species into a cached record.
///
/// Heights and weights are converted from decimeters/hectograms to
/// meters/kilograms. Region is looked up from the species generation.
pub fn build_detail_record(
    pokemon: &PokemonResource,
    species: &SpeciesResource,
    sprite_base_url: &str,
) -> DetailRecord {
    let generation = species
        .generation
        .as_ref()
        .map(|g| g.name.clone())
        .unwrap_or_default();

    DetailRecord {
        id: pokemon.id,
        name: pokemon.name.to_lowercase(),
        image_url: sprite_url(sprite_base_url, pokemon.id),
        types: pokemon.types.iter().map(|t| t.kind.name.clone()).collect(),
        stats: pokemon
            .stats
            .iter()
            .map(|s| format!("{}: {}", s.stat.name, s.base_stat))
            .collect(),
        height: f64::from(pokemon.height) / 10.0,
        weight: f64::from(pokemon.weight) / 10.0,
        abilities: pokemon
            .abilities
            .iter()
            .map(|a| AbilitySummary {
                name: a.ability.name.clone(),
                url: a.ability.url.clone(),
                is_hidden: a.is_hidden,
            })
            .collect(),
        region: Generation::region_for(&generation).to_string(),
        generation,
        growth_rate: species
            .growth_rate
            .as_ref()
            .map(|g| g.name.clone())
            .unwrap_or_default(),
        gender_rate: GenderRate::from_code(species.gender_rate),
        evolution_steps: Vec::new(),
        last_updated: OffsetDateTime::now_utc(),
    }
}
