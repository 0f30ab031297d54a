use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cache::{CacheStats, ResponseCache};
use crate::data::AlertGroup;
use crate::derived::{search_hints, ColorMap};
use crate::filters::{apply_filters, compile_filters, FilterStatus};
use crate::poller::{AlertStore, InstanceStatus};
use crate::upstream::Registry;

/// Application state shared across handlers
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<AlertStore>,
    pub cache: ResponseCache,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, store: Arc<AlertStore>) -> Self {
        Self {
            registry,
            store,
            cache: ResponseCache::new(),
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub instances: usize,
    pub last_pull: Option<DateTime<Utc>>,
    pub cache: CacheStats,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        instances: state.registry.len(),
        last_pull: state.store.view().generated_at,
        cache: state.cache.stats(),
    })
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AlertsRequest {
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertsResponse {
    pub groups: Vec<AlertGroup>,
    pub filters: Vec<FilterStatus>,
    pub total_groups: usize,
    pub total_alerts: usize,
    pub colors: ColorMap,
    pub instances: Vec<InstanceStatus>,
    pub timestamp: Option<DateTime<Utc>>,
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AlertsRequest>,
) -> Json<Arc<AlertsResponse>> {
    let (generation, view) = state.store.snapshot();
    if let Some(cached) = state.cache.get(generation, &request.filters) {
        return Json(cached);
    }

    let mut filters = compile_filters(&request.filters);
    let groups = apply_filters(&view.groups, &mut filters);

    for filter in filters.iter().filter(|f| !f.is_valid()) {
        if let Some(error) = filter.error() {
            tracing::debug!(filter = %filter.raw_text(), error = %error, "Ignoring invalid filter");
        }
    }

    let response = Arc::new(AlertsResponse {
        total_groups: groups.len(),
        total_alerts: groups.iter().map(AlertGroup::len).sum(),
        groups,
        filters: filters.iter().map(|f| f.status()).collect(),
        colors: view.colors.clone(),
        instances: view.instances.clone(),
        timestamp: view.generated_at,
    });

    state
        .cache
        .put(generation, &request.filters, Arc::clone(&response));
    Json(response)
}

// ============================================================================
// Autocomplete
// ============================================================================

const DEFAULT_HINT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    pub term: Option<String>,
    pub limit: Option<usize>,
}

pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing search term".to_string()))?;

    let view = state.store.view();
    let limit = params.limit.unwrap_or(DEFAULT_HINT_LIMIT);
    Ok(Json(search_hints(&view.hints, term.trim(), limit)))
}

// ============================================================================
// Instances
// ============================================================================

pub async fn list_instances(State(state): State<Arc<AppState>>) -> Json<Vec<InstanceStatus>> {
    let instances = state
        .registry
        .get_all()
        .iter()
        .map(|c| InstanceStatus::of(c))
        .collect();
    Json(instances)
}

pub async fn get_instance(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<InstanceStatus>, ApiError> {
    let connector = state
        .registry
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Instance '{}' not found", name)))?;
    Ok(Json(InstanceStatus::of(&connector)))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
