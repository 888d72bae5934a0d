//! Core record types for cached Pokédex data.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};

/// Default host for the front-facing sprite of a Pokémon.
pub const DEFAULT_SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Placeholder type used when a record could not be fully resolved.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Region reported for records whose generation is missing or unrecognised.
pub const UNKNOWN_REGION: &str = "unknown";

/// Build the sprite URL for a Pokémon id.
///
/// The image URL is never stored as independent truth; it is always derived
/// from the id and can be recomputed at any time.
///
/// # Examples
///
/// ```
/// use pokedex_types::sprite_url;
///
/// assert_eq!(
///     sprite_url("https://img.example/sprites/", 25),
///     "https://img.example/sprites/25.png"
/// );
/// ```
#[must_use]
pub fn sprite_url(base_url: &str, id: u32) -> String {
    format!("{}/{}.png", base_url.trim_end_matches('/'), id)
}

/// Extract the trailing numeric id from an upstream resource URL.
///
/// Upstream references look like `https://pokeapi.co/api/v2/ability/65/`;
/// the id is the last non-empty path segment.
///
/// # Examples
///
/// ```
/// use pokedex_types::resource_id;
///
/// assert_eq!(resource_id("https://pokeapi.co/api/v2/ability/65/").unwrap(), 65);
/// assert!(resource_id("https://pokeapi.co/api/v2/ability/").is_err());
/// ```
pub fn resource_id(url: &str) -> ParseResult<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| ParseError::InvalidResourceUrl(url.to_string()))
}

/// Game generation, the closed set used for region lookup.
///
/// This enum is marked `#[non_exhaustive]` so new generations can be added
/// without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Generation {
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
    VIII,
    IX,
}

impl Generation {
    /// All known generations in release order.
    pub const ALL: [Generation; 9] = [
        Generation::I,
        Generation::II,
        Generation::III,
        Generation::IV,
        Generation::V,
        Generation::VI,
        Generation::VII,
        Generation::VIII,
        Generation::IX,
    ];

    /// Upstream name of the generation (e.g. `generation-iv`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::I => "generation-i",
            Generation::II => "generation-ii",
            Generation::III => "generation-iii",
            Generation::IV => "generation-iv",
            Generation::V => "generation-v",
            Generation::VI => "generation-vi",
            Generation::VII => "generation-vii",
            Generation::VIII => "generation-viii",
            Generation::IX => "generation-ix",
        }
    }

    /// Home region introduced with this generation.
    ///
    /// # Examples
    ///
    /// ```
    /// use pokedex_types::Generation;
    ///
    /// assert_eq!(Generation::I.region(), "kanto");
    /// assert_eq!(Generation::IX.region(), "paldea");
    /// ```
    #[must_use]
    pub fn region(&self) -> &'static str {
        match self {
            Generation::I => "kanto",
            Generation::II => "johto",
            Generation::III => "hoenn",
            Generation::IV => "sinnoh",
            Generation::V => "unova",
            Generation::VI => "kalos",
            Generation::VII => "alola",
            Generation::VIII => "galar",
            Generation::IX => "paldea",
        }
    }

    /// Region for an upstream generation name, falling back to `"unknown"`.
    #[must_use]
    pub fn region_for(name: &str) -> &'static str {
        name.parse::<Generation>()
            .map(|g| g.region())
            .unwrap_or(UNKNOWN_REGION)
    }
}

impl FromStr for Generation {
    type Err = ParseError;

    /// Parse an upstream generation name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Generation::ALL
            .into_iter()
            .find(|g| g.as_str() == lower)
            .ok_or_else(|| ParseError::UnknownGeneration(s.to_string()))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Male/female split derived from the upstream `gender_rate` code.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderRate {
    pub male_percentage: f64,
    pub female_percentage: f64,
}

impl GenderRate {
    /// Code used upstream for genderless species.
    pub const GENDERLESS: i32 = -1;

    /// Convert an upstream gender code into percentages.
    ///
    /// The code is the number of eighths that are female; `-1` marks a
    /// genderless species, for which both percentages are zero. Codes outside
    /// `0..=8` are clamped into that range.
    ///
    /// # Examples
    ///
    /// ```
    /// use pokedex_types::GenderRate;
    ///
    /// let rate = GenderRate::from_code(1);
    /// assert_eq!(rate.female_percentage, 12.5);
    /// assert_eq!(rate.male_percentage, 87.5);
    ///
    /// let none = GenderRate::from_code(-1);
    /// assert_eq!(none.male_percentage + none.female_percentage, 0.0);
    /// ```
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        if code == Self::GENDERLESS {
            return Self::default();
        }
        let female_percentage = f64::from(code.clamp(0, 8)) / 8.0 * 100.0;
        Self {
            male_percentage: 100.0 - female_percentage,
            female_percentage,
        }
    }

    /// Whether this rate describes a genderless species.
    #[must_use]
    pub fn is_genderless(&self) -> bool {
        self.male_percentage == 0.0 && self.female_percentage == 0.0
    }
}

/// An ability reference attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilitySummary {
    pub name: String,
    /// Upstream reference URL for the ability resource.
    pub url: String,
    pub is_hidden: bool,
}

impl AbilitySummary {
    /// Numeric ability id parsed from the reference URL.
    pub fn id(&self) -> ParseResult<u32> {
        resource_id(&self.url)
    }
}

/// One stage of an evolution chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionStep {
    pub id: u32,
    pub name: String,
    pub image_url: String,
}

/// The canonical cached unit: one fully resolved catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: u32,
    /// Lowercase upstream name.
    pub name: String,
    pub image_url: String,
    pub types: Vec<String>,
    /// `"name: value"` entries in upstream order.
    pub stats: Vec<String>,
    /// Height in meters.
    pub height: f64,
    /// Weight in kilograms.
    pub weight: f64,
    #[serde(default)]
    pub abilities: Vec<AbilitySummary>,
    pub region: String,
    pub generation: String,
    #[serde(default)]
    pub growth_rate: String,
    #[serde(default)]
    pub gender_rate: GenderRate,
    /// Populated lazily by the evolution lookup.
    #[serde(default)]
    pub evolution_steps: Vec<EvolutionStep>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl DetailRecord {
    /// Create a placeholder record for an entry that has not been fully resolved.
    ///
    /// Stubs carry `["Unknown"]` as their type list so callers can tell them
    /// apart from complete records.
    #[must_use]
    pub fn stub(id: u32, name: &str, image_url: String) -> Self {
        Self {
            id,
            name: name.to_lowercase(),
            image_url,
            types: vec![UNKNOWN_TYPE.to_string()],
            stats: Vec::new(),
            height: 0.0,
            weight: 0.0,
            abilities: Vec::new(),
            region: UNKNOWN_REGION.to_string(),
            generation: String::new(),
            growth_rate: String::new(),
            gender_rate: GenderRate::default(),
            evolution_steps: Vec::new(),
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    /// Whether this record is only a placeholder.
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.types.is_empty() || self.types.iter().all(|t| t == UNKNOWN_TYPE)
    }

    /// First listed type, or `"Unknown"` if none.
    #[must_use]
    pub fn primary_type(&self) -> &str {
        self.types.first().map(String::as_str).unwrap_or(UNKNOWN_TYPE)
    }

    /// Case-insensitive type membership.
    #[must_use]
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t.eq_ignore_ascii_case(type_name))
    }
}

/// A Pokémon listed as having a given ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityHolder {
    pub id: u32,
    pub name: String,
    pub image_url: String,
    pub primary_type: String,
}

impl From<&DetailRecord> for AbilityHolder {
    fn from(record: &DetailRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            image_url: record.image_url.clone(),
            primary_type: record.primary_type().to_string(),
        }
    }
}

/// Ability description plus the Pokémon that can have it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityDetail {
    pub name: String,
    /// English effect text.
    pub effect: String,
    pub pokemon_with_ability: Vec<AbilityHolder>,
}

/// Persisted collection of records plus pagination bookkeeping.
///
/// This is also the response shape for paged listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEnvelope {
    #[serde(default)]
    pub data: Vec<DetailRecord>,
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub has_more: bool,
}

impl Default for CollectionEnvelope {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            page: 1,
            limit: Self::DEFAULT_LIMIT,
            total: 0,
            has_more: true,
        }
    }
}

impl CollectionEnvelope {
    /// Limit recorded in a freshly initialised envelope.
    pub const DEFAULT_LIMIT: u32 = 100;

    /// Look up a record by id.
    #[must_use]
    pub fn find_by_id(&self, id: u32) -> Option<&DetailRecord> {
        self.data.iter().find(|r| r.id == id)
    }

    /// Look up a record by name, case-insensitively.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&DetailRecord> {
        let name = name.trim();
        self.data.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Insert a record, or replace the one with the same id.
    ///
    /// Returns `true` when the record was new. Only inserts change `total`,
    /// so ids stay unique within the collection.
    pub fn upsert(&mut self, record: DetailRecord) -> bool {
        match self.data.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                self.data.push(record);
                self.total = self.total.saturating_add(1);
                true
            }
        }
    }

    /// Slice out one 1-based page of the cached collection.
    ///
    /// `has_more` is `page * limit < total`. Callers reject zero values
    /// before getting here; they are treated as 1 to keep the slice defined.
    #[must_use]
    pub fn page(&self, page: u32, limit: u32) -> CollectionEnvelope {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = u32::try_from(self.data.len()).unwrap_or(u32::MAX);
        let skip = (u64::from(page) - 1) * u64::from(limit);

        let data = self
            .data
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect();

        CollectionEnvelope {
            data,
            page,
            limit,
            total,
            has_more: u64::from(page) * u64::from(limit) < u64::from(total),
        }
    }
}
