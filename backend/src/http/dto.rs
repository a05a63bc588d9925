//! Data Transfer Objects for the HTTP API.
//!
//! Series, comparison, statistics and climate payloads are served directly
//! from the model types, which already derive `Serialize`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use crate::models::{ClimateData, ComparisonResult, NormalizedSeries};
pub use crate::params::{FilterSet, ParameterValue};
pub use crate::services::{CacheStats, SeriesStatistics};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Reachability of the scenario source
    pub source: String,
}

/// Current parameter values keyed by wire name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersResponse {
    pub revision: u64,
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// Stored values of each catalog parameter, keyed by backend filter key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDomainsResponse {
    pub parameters: BTreeMap<String, Vec<f64>>,
}

/// Request body for `PUT /v1/parameters/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateParameterRequest {
    /// `null` (any), a number, a boolean or a list of numbers
    #[serde(default)]
    pub value: ParameterValue,
}

/// Filters the current parameters translate to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersResponse {
    pub filters: FilterSet,
    /// Canonical string form, stable across insertion orders
    pub canonical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariablesResponse {
    pub variables: Vec<String>,
    pub total: usize,
}

/// Query parameters for the series endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesQuery {
    pub variable: String,
}

/// Query parameters for the comparison endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonQuery {
    pub variable: String,
    /// Defaults to the configured baseline year
    pub baseline_year: Option<i32>,
    /// Reject a baseline outside the series instead of using `now = 0`
    #[serde(default)]
    pub strict: bool,
}

/// Query parameters for the statistics endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsQuery {
    pub variable: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// Response for `POST /v1/cache/clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClearResponse {
    pub cleared: usize,
}
