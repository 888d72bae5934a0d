//! Server configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pokedex_core::{DEFAULT_BASE_URL, Endpoints, PokedexOptions};
use pokedex_types::DEFAULT_SPRITE_BASE_URL;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Upstream provider settings.
    pub upstream: UpstreamConfig,
    /// Bulk crawl settings.
    pub crawl: CrawlConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is a socket address
    /// - Storage path is not empty
    /// - Upstream URLs are http(s)
    /// - Crawl page size and delay are within bounds
    ///
    /// # Example
    ///
    /// ```
    /// use pokedex_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.upstream.validate());
        errors.extend(self.crawl.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Engine options derived from the upstream and crawl sections.
    pub fn pokedex_options(&self) -> PokedexOptions {
        PokedexOptions::default()
            .endpoints(Endpoints::new(
                &self.upstream.base_url,
                &self.upstream.sprite_base_url,
            ))
            .page_size(self.crawl.page_size)
            .crawl_delay(Duration::from_millis(self.crawl.delay_ms))
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5145").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5145".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        match self.bind.parse::<SocketAddr>() {
            Ok(_) => Vec::new(),
            Err(_) => vec![ValidationError {
                field: "server.bind".to_string(),
                message: format!("invalid bind address '{}': expected 'ip:port'", self.bind),
            }],
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Cache file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: pokedex_store::default_store_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "cache file path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Data API base URL.
    pub base_url: String,
    /// Sprite host base URL.
    pub sprite_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sprite_base_url: DEFAULT_SPRITE_BASE_URL.to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Validate upstream configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("upstream.base_url", &self.base_url),
            ("upstream.sprite_base_url", &self.sprite_base_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("'{}' must start with http:// or https://", value),
                });
            }
        }

        errors
    }
}

/// Maximum listing page size.
pub const MAX_PAGE_SIZE: u32 = 1000;
/// Maximum stagger between crawl requests in milliseconds.
pub const MAX_CRAWL_DELAY_MS: u64 = 10_000;

/// Bulk crawl configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Entries requested per listing page.
    pub page_size: u32,
    /// Stagger between detail requests inside a page, in milliseconds.
    pub delay_ms: u64,
    /// Crawl at startup when the cache is empty.
    pub refresh_on_start: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            delay_ms: 100,
            refresh_on_start: false,
        }
    }
}

impl CrawlConfig {
    /// Validate crawl configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.page_size == 0 {
            errors.push(ValidationError {
                field: "crawl.page_size".to_string(),
                message: "page size must be at least 1".to_string(),
            });
        } else if self.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "crawl.page_size".to_string(),
                message: format!(
                    "page size {} is too large (maximum {})",
                    self.page_size, MAX_PAGE_SIZE
                ),
            });
        }

        if self.delay_ms > MAX_CRAWL_DELAY_MS {
            errors.push(ValidationError {
                field: "crawl.delay_ms".to_string(),
                message: format!(
                    "delay {} ms is too long (maximum {} ms)",
                    self.delay_ms, MAX_CRAWL_DELAY_MS
                ),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `crawl.page_size`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pokedex")
        .join("server.toml")
}
