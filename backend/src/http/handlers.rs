//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! [`SeriesPipeline`](crate::services::SeriesPipeline) for business logic.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::collections::BTreeMap;
use tracing::info;

use super::dto::{
    CacheClearResponse, CacheStats, ClimateData, ComparisonQuery, ComparisonResult,
    FiltersResponse, HealthResponse, NormalizedSeries, ParameterDomainsResponse,
    ParametersResponse, SeriesQuery,
    SeriesStatistics, StatisticsQuery, UpdateParameterRequest, VariablesResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::TimeWindow;
use crate::params::{ParameterKey, ParameterSnapshot};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the scenario
/// source is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let source = match state.pipeline.client().health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        source,
    }))
}

// =============================================================================
// Parameters
// =============================================================================

fn parameters_response(snapshot: &ParameterSnapshot) -> ParametersResponse {
    let parameters: BTreeMap<String, _> = snapshot
        .iter()
        .map(|(key, value)| (key.name().to_string(), value.clone()))
        .collect();
    ParametersResponse {
        revision: snapshot.revision(),
        parameters,
    }
}

/// GET /v1/parameters
pub async fn get_parameters(State(state): State<AppState>) -> HandlerResult<ParametersResponse> {
    Ok(Json(parameters_response(&state.pipeline.store().get())))
}

/// GET /v1/params
///
/// Values the catalog holds for each parameter.
pub async fn get_parameter_domains(
    State(state): State<AppState>,
) -> HandlerResult<ParameterDomainsResponse> {
    let parameters = state.pipeline.client().parameter_values().await?;
    Ok(Json(ParameterDomainsResponse { parameters }))
}

/// PUT /v1/parameters/{name}
///
/// Set one parameter. Variables listed in `series.watch` refresh in the
/// background.
pub async fn update_parameter(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateParameterRequest>,
) -> HandlerResult<ParametersResponse> {
    let key: ParameterKey = name.parse().map_err(AppError::NotFound)?;
    if !request.value.is_finite() {
        return Err(AppError::BadRequest(format!(
            "Parameter {} must be finite",
            key
        )));
    }

    info!("setting parameter {} to {:?}", key, request.value);
    let snapshot = state.pipeline.store().update(key, request.value);
    Ok(Json(parameters_response(&snapshot)))
}

/// GET /v1/filters
pub async fn get_filters(State(state): State<AppState>) -> HandlerResult<FiltersResponse> {
    let filters = state.pipeline.current_filters();
    let canonical = filters.canonical();
    Ok(Json(FiltersResponse { filters, canonical }))
}

// =============================================================================
// Series
// =============================================================================

/// GET /v1/variables
pub async fn list_variables(State(state): State<AppState>) -> HandlerResult<VariablesResponse> {
    let variables = state.pipeline.client().list_variables().await?;
    let total = variables.len();
    Ok(Json(VariablesResponse { variables, total }))
}

/// GET /v1/series?variable=...
///
/// Normalized series for the current parameters.
pub async fn get_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> HandlerResult<NormalizedSeries> {
    let variable = require_variable(&query.variable)?;
    let series = state.pipeline.series(variable).await?;
    Ok(Json(series.as_ref().clone()))
}

/// GET /v1/series/comparison?variable=...&baseline_year=...
pub async fn get_comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> HandlerResult<ComparisonResult> {
    let variable = require_variable(&query.variable)?;
    let baseline_year = query.baseline_year.unwrap_or(state.baseline_year);

    let result = if query.strict {
        state.pipeline.comparison_strict(variable, baseline_year).await?
    } else {
        state.pipeline.comparison(variable, baseline_year).await?
    };
    Ok(Json(result))
}

/// GET /v1/series/statistics?variable=...&start_year=...&end_year=...
///
/// A missing bound falls back to the configured query window.
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> HandlerResult<SeriesStatistics> {
    let variable = require_variable(&query.variable)?;

    let window = match (query.start_year, query.end_year) {
        (None, None) => None,
        (start, end) => {
            let defaults = state.pipeline.options().window;
            let window = TimeWindow::new(
                start.unwrap_or(defaults.start_year),
                end.unwrap_or(defaults.end_year),
            )
            .map_err(|e| AppError::BadRequest(e.message().to_string()))?;
            Some(window)
        }
    };

    let stats = state.pipeline.statistics(variable, window).await?;
    Ok(Json(stats))
}

/// GET /v1/climate
pub async fn get_climate(State(state): State<AppState>) -> HandlerResult<ClimateData> {
    let climate = state.pipeline.client().fetch_climate_data().await?;
    Ok(Json(climate))
}

// =============================================================================
// Cache
// =============================================================================

/// GET /v1/cache/stats
pub async fn get_cache_stats(State(state): State<AppState>) -> HandlerResult<CacheStats> {
    Ok(Json(state.pipeline.cache().stats()))
}

/// POST /v1/cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> HandlerResult<CacheClearResponse> {
    let cache = state.pipeline.cache();
    let cleared = cache.len();
    cache.clear();
    info!("cleared {} cached series", cleared);
    Ok(Json(CacheClearResponse { cleared }))
}

fn require_variable(variable: &str) -> Result<&str, AppError> {
    let variable = variable.trim();
    if variable.is_empty() {
        return Err(AppError::BadRequest("variable must not be empty".to_string()));
    }
    Ok(variable)
}
