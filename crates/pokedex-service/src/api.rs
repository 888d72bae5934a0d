//! REST API endpoints for the pokedex-service.
//!
//! Every handler is a thin mapping onto one [`Pokedex`](pokedex_core::Pokedex)
//! operation. Errors are returned as JSON via [`AppError`]:
//!
//! | Engine outcome | HTTP |
//! |----------------|------|
//! | Not found upstream | 404 |
//! | Invalid argument | 400 |
//! | Refresh already running | 409 |
//! | Anything else | 500 |
//!
//! # Example
//!
//! ```ignore
//! use pokedex_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use pokedex_types::{AbilityDetail, CollectionEnvelope, DetailRecord, EvolutionStep};

use crate::refresher::{RefreshError, Refresher};
use crate::state::{AppState, RefreshRun};

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health and status
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        // Cache maintenance
        .route(
            "/api/pokemon/cache/update",
            get(refresh_cache).post(refresh_cache),
        )
        .route(
            "/api/pokemon/refresh-cache",
            get(refresh_cache).post(refresh_cache),
        )
        .route("/api/pokemon/cache/status", get(cache_status))
        // Collection queries
        .route("/api/pokemon/all/details", get(all_details))
        .route("/api/pokemon/paged", get(paged))
        .route("/api/pokemon/filter/type/{value}", get(filter_by_type))
        .route("/api/pokemon/filter/region/{value}", get(filter_by_region))
        .route(
            "/api/pokemon/filter/generation/{value}",
            get(filter_by_generation),
        )
        // Single lookups
        .route("/api/pokemon/search/{name}", get(search_by_name))
        .route("/api/pokemon/ability/{id}", get(ability_detail))
        .route("/api/pokemon/evolution/{id}", get(evolution_chain))
        .route("/api/pokemon/{id}", get(get_by_id))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Maintainer contact block reported by the status endpoint.
pub const AUTHOR: &str = "EspeeeBne";
pub const CONTACT: &str = "espeebne@proton.me";
pub const GITHUB: &str = "https://github.com/EspeeeBne";

/// Service status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub author: &'static str,
    pub contact: &'static str,
    pub github: &'static str,
    pub version: &'static str,
    /// `"OK"` when the upstream answers, `"DOWN"` otherwise.
    pub status: &'static str,
}

/// Report version and upstream availability.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let up = state.pokedex.upstream_available().await;
    Json(StatusResponse {
        author: AUTHOR,
        contact: CONTACT,
        github: GITHUB,
        version: env!("CARGO_PKG_VERSION"),
        status: if up { "OK" } else { "DOWN" },
    })
}

async fn get_by_id(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u32>, PathRejection>,
) -> Result<Json<DetailRecord>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.pokedex.get_by_id(id).await?))
}

async fn search_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<DetailRecord>, AppError> {
    Ok(Json(state.pokedex.search_by_name(&name).await?))
}

/// Return every record, crawling the catalog first unless a complete crawl is cached.
async fn all_details(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DetailRecord>>, AppError> {
    Ok(Json(state.pokedex.get_all_details().await?))
}

/// Query parameters for the paged listing.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    /// Validate and narrow the parameters.
    pub fn validate(&self) -> Result<(u32, u32), AppError> {
        let page = u32::try_from(self.page).ok().filter(|p| *p >= 1);
        let limit = u32::try_from(self.limit).ok().filter(|l| *l >= 1);
        match (page, limit) {
            (Some(page), Some(limit)) => Ok((page, limit)),
            _ => Err(AppError::BadRequest(
                "Page and limit must be greater than 0".to_string(),
            )),
        }
    }
}

async fn paged(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<CollectionEnvelope>, AppError> {
    let Query(query) = query?;
    let (page, limit) = query.validate()?;
    Ok(Json(state.pokedex.paginate(page, limit)?))
}

async fn ability_detail(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u32>, PathRejection>,
) -> Result<Json<AbilityDetail>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.pokedex.get_ability_detail(id).await?))
}

async fn evolution_chain(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u32>, PathRejection>,
) -> Result<Json<Vec<EvolutionStep>>, AppError> {
    let Path(id) = id?;
    let steps = state.pokedex.get_evolution_chain(id).await?;
    if steps.is_empty() {
        return Err(AppError::NotFound("No evolution chain found".to_string()));
    }
    Ok(Json(steps))
}

async fn filter_by_type(
    State(state): State<Arc<AppState>>,
    Path(value): Path<String>,
) -> Json<Vec<DetailRecord>> {
    Json(state.pokedex.filter_by_type(&value))
}

async fn filter_by_region(
    State(state): State<Arc<AppState>>,
    Path(value): Path<String>,
) -> Json<Vec<DetailRecord>> {
    Json(state.pokedex.filter_by_region(&value))
}

async fn filter_by_generation(
    State(state): State<Arc<AppState>>,
    Path(value): Path<String>,
) -> Json<Vec<DetailRecord>> {
    Json(state.pokedex.filter_by_generation(&value))
}

/// Response for refresh triggers.
#[derive(Debug, Serialize)]
pub struct RefreshActionResponse {
    pub message: String,
    pub running: bool,
}

/// Start a full cache rebuild in the background.
async fn refresh_cache(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RefreshActionResponse>), AppError> {
    Refresher::new(Arc::clone(&state)).start()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshActionResponse {
            message: "Cache refresh started".to_string(),
            running: true,
        }),
    ))
}

/// Cache and refresh status response.
#[derive(Debug, Serialize)]
pub struct CacheStatusResponse {
    /// Whether the store holds any records.
    pub populated: bool,
    /// Number of cached records.
    pub total: u32,
    /// Whether a refresh is running.
    pub refreshing: bool,
    /// When the running refresh started.
    #[serde(with = "time::serde::rfc3339::option")]
    pub refresh_started_at: Option<OffsetDateTime>,
    /// Outcome of the last finished refresh.
    pub last_refresh: Option<RefreshRun>,
    /// Listing page size used by crawls.
    pub crawl_page_size: u32,
    /// Location of the cache file.
    pub store_path: String,
}

async fn cache_status(State(state): State<Arc<AppState>>) -> Json<CacheStatusResponse> {
    let envelope = state.pokedex.store().load();
    Json(CacheStatusResponse {
        populated: !envelope.data.is_empty(),
        total: envelope.total,
        refreshing: state.refresh.is_running(),
        refresh_started_at: state.refresh.started_at(),
        last_refresh: state.refresh.last_run().await,
        crawl_page_size: state.config.crawl.page_size,
        store_path: state.config.storage.path.display().to_string(),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Engine(pokedex_core::Error),
}

impl From<pokedex_core::Error> for AppError {
    fn from(e: pokedex_core::Error) -> Self {
        match e {
            pokedex_core::Error::NotFound(msg) => AppError::NotFound(msg),
            pokedex_core::Error::InvalidArgument(msg) => AppError::BadRequest(msg),
            e if e.is_not_found() => AppError::NotFound(e.to_string()),
            e => AppError::Engine(e),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<RefreshError> for AppError {
    fn from(e: RefreshError) -> Self {
        AppError::Conflict(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Engine(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
