//! Upstream data provider client.
//!
//! The [`Upstream`] trait abstracts over the real HTTP client and the
//! [`MockUpstream`](crate::mock::MockUpstream) used in tests. It makes exactly
//! one attempt per call and keeps no cache of its own.
//!
//! # Example
//!
//! ```no_run
//! use pokedex_core::{Endpoints, HttpUpstream, Upstream};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let upstream = HttpUpstream::new()?;
//! let endpoints = Endpoints::default();
//!
//! let pikachu = upstream.fetch_json(&endpoints.pokemon("pikachu")).await?;
//! println!("id = {}", pikachu["id"]);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use pokedex_types::{DEFAULT_SPRITE_BASE_URL, sprite_url};

use crate::error::{UpstreamError, UpstreamResult};

/// Default base URL of the upstream data API.
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Trait abstracting the upstream JSON provider.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issue a single GET request and return the parsed JSON body.
    async fn fetch_json(&self, url: &str) -> UpstreamResult<serde_json::Value>;
}

/// Fetch a URL and deserialize it into an upstream resource shape.
pub(crate) async fn fetch_as<T: DeserializeOwned>(
    upstream: &dyn Upstream,
    url: &str,
) -> UpstreamResult<T> {
    let value = upstream.fetch_json(url).await?;
    serde_json::from_value(value).map_err(|e| UpstreamError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// URL layout of the upstream API and the sprite host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    sprite_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_SPRITE_BASE_URL)
    }
}

impl Endpoints {
    /// Create endpoints from a data API base URL and a sprite base URL.
    ///
    /// Trailing slashes are removed.
    pub fn new(base_url: &str, sprite_base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            sprite_base_url: sprite_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the data API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the sprite base URL.
    pub fn sprite_base_url(&self) -> &str {
        &self.sprite_base_url
    }

    /// Base resource for an id or lowercase name.
    pub fn pokemon(&self, id_or_name: &str) -> String {
        format!("{}/pokemon/{}", self.base_url, id_or_name)
    }

    /// Species resource for an id.
    pub fn species(&self, id: u32) -> String {
        format!("{}/pokemon-species/{}", self.base_url, id)
    }

    /// Ability resource for an id.
    pub fn ability(&self, id: u32) -> String {
        format!("{}/ability/{}", self.base_url, id)
    }

    /// One page of the catalog listing.
    pub fn listing(&self, offset: u32, limit: u32) -> String {
        format!("{}/pokemon?offset={}&limit={}", self.base_url, offset, limit)
    }

    /// Cheapest request that proves the upstream is answering.
    pub fn probe(&self) -> String {
        format!("{}/pokemon?limit=1", self.base_url)
    }

    /// Sprite URL for an id.
    pub fn image(&self, id: u32) -> String {
        sprite_url(&self.sprite_base_url, id)
    }
}

/// HTTP implementation of [`Upstream`] over reqwest.
///
/// Uses the transport's default timeouts.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    /// Create a client with a descriptive user agent.
    pub fn new() -> UpstreamResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("pokedex-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Transport {
                url: String::new(),
                source: Box::new(e),
            })?;
        Ok(Self { client })
    }

    /// Create a client around an existing reqwest Client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch_json(&self, url: &str) -> UpstreamResult<serde_json::Value> {
        debug!("GET {}", url);
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| UpstreamError::Transport {
                    url: url.to_string(),
                    source: Box::new(e),
                })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| UpstreamError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_default() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.base_url(), "https://pokeapi.co/api/v2");
        assert_eq!(endpoints.pokemon("25"), "https://pokeapi.co/api/v2/pokemon/25");
        assert_eq!(
            endpoints.species(25),
            "https://pokeapi.co/api/v2/pokemon-species/25"
        );
        assert_eq!(endpoints.ability(9), "https://pokeapi.co/api/v2/ability/9");
        assert_eq!(
            endpoints.listing(200, 100),
            "https://pokeapi.co/api/v2/pokemon?offset=200&limit=100"
        );
        assert_eq!(
            endpoints.image(25),
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png"
        );
    }

    #[test]
    fn test_endpoints_trim_trailing_slash() {
        let endpoints = Endpoints::new("http://localhost:9000/api/", "http://img.local/");
        assert_eq!(endpoints.base_url(), "http://localhost:9000/api");
        assert_eq!(endpoints.probe(), "http://localhost:9000/api/pokemon?limit=1");
        assert_eq!(endpoints.image(4), "http://img.local/4.png");
    }

    #[test]
    fn test_http_upstream_creation() {
        assert!(HttpUpstream::new().is_ok());
    }
}
