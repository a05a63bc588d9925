//! In-memory scenario catalog.
//!
//! This module provides a local implementation of [`SeriesClient`] suitable
//! for unit testing and local development. Scenarios, their parameter
//! assignments and their series are held in memory, so every query is fast,
//! deterministic and isolated.

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::error::{SeriesError, SeriesResult};
use super::series_client::SeriesClient;
use crate::models::{
    AggregatedSeriesResponse, ClimateData, QueryOptions, RawSeriesPoint, RawSeriesResponse,
    ScenarioId, ScenarioSeries, SeriesResponse,
};
use crate::params::FilterSet;
use crate::services::aggregator::summarize_scenarios;

/// Serializable content of a [`LocalCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Parameter assignment of each scenario, keyed by backend filter key.
    #[serde(default)]
    pub scenarios: BTreeMap<ScenarioId, BTreeMap<String, f64>>,
    /// Per variable, per scenario yearly rows.
    #[serde(default)]
    pub series: BTreeMap<String, BTreeMap<ScenarioId, Vec<RawSeriesPoint>>>,
    #[serde(default)]
    pub climate: ClimateData,
}

/// In-memory scenario catalog.
///
/// # Example
/// ```
/// use yrb_scenarios::client::LocalCatalog;
/// use yrb_scenarios::models::RawSeriesPoint;
///
/// let catalog = LocalCatalog::new();
/// catalog.add_scenario("sc_1", [("SNWTP", 1.0)]);
/// catalog.add_series("YRB WSI", "sc_1", vec![RawSeriesPoint::new(2020, 0.4)]);
/// assert_eq!(catalog.scenario_count(), 1);
/// ```
#[derive(Clone)]
pub struct LocalCatalog {
    data: Arc<RwLock<CatalogData>>,
}

struct CatalogData {
    content: CatalogSnapshot,
    is_healthy: bool,
}

impl LocalCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::from_snapshot(CatalogSnapshot::default())
    }

    pub fn from_snapshot(content: CatalogSnapshot) -> Self {
        Self {
            data: Arc::new(RwLock::new(CatalogData {
                content,
                is_healthy: true,
            })),
        }
    }

    /// Load a catalog from a JSON [`CatalogSnapshot`] file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SeriesResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SeriesError::configuration(format!(
                "Failed to read catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let content: CatalogSnapshot = serde_json::from_str(&text).map_err(|e| {
            SeriesError::configuration(format!(
                "Failed to parse catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        info!(
            "Loaded local catalog from {} ({} scenarios, {} variables)",
            path.display(),
            content.scenarios.len(),
            content.series.len()
        );
        Ok(Self::from_snapshot(content))
    }

    /// Register a scenario with its parameter assignment.
    pub fn add_scenario<I, K>(&self, id: impl Into<ScenarioId>, parameters: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let parameters = parameters.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.data
            .write()
            .content
            .scenarios
            .insert(id.into(), parameters);
    }

    /// Store the rows of one variable for one scenario, replacing earlier rows.
    pub fn add_series(
        &self,
        variable: impl Into<String>,
        id: impl Into<ScenarioId>,
        points: Vec<RawSeriesPoint>,
    ) {
        self.data
            .write()
            .content
            .series
            .entry(variable.into())
            .or_default()
            .insert(id.into(), points);
    }

    pub fn set_climate_data(&self, climate: ClimateData) {
        self.data.write().content.climate = climate;
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the catalog.
    pub fn clear(&self) {
        self.data.write().content = CatalogSnapshot::default();
    }

    pub fn scenario_count(&self) -> usize {
        self.data.read().content.scenarios.len()
    }

    /// Copy of the current content.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.data.read().content.clone()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> SeriesResult<()> {
        if !self.data.read().is_healthy {
            return Err(SeriesError::network("Scenario source is offline"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("LocalCatalog")
            .field("scenarios", &data.content.scenarios.len())
            .field("variables", &data.content.series.len())
            .field("is_healthy", &data.is_healthy)
            .finish()
    }
}

impl Default for LocalCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeriesClient for LocalCatalog {
    async fn fetch_series(
        &self,
        variable: &str,
        filters: &FilterSet,
        options: QueryOptions,
    ) -> SeriesResult<SeriesResponse> {
        self.check_health()
            .map_err(|e| e.with_operation("fetch_series").with_variable(variable))?;

        let scenarios: Vec<ScenarioSeries> = {
            let data = self.data.read();
            let rows = data.content.series.get(variable).ok_or_else(|| {
                SeriesError::not_found(format!("Unknown variable '{}'", variable))
                    .with_operation("fetch_series")
                    .with_variable(variable)
            })?;

            data.content
                .scenarios
                .iter()
                .filter(|(_, assignment)| filters.matches(assignment))
                .filter_map(|(id, assignment)| {
                    rows.get(id).map(|points| ScenarioSeries {
                        scenario_id: id.clone(),
                        parameters: assignment.clone(),
                        points: points
                            .iter()
                            .filter(|p| options.window.contains(p.year))
                            .copied()
                            .collect(),
                    })
                })
                .collect()
        };

        debug!(
            "local catalog matched {} scenarios for '{}' [{}]",
            scenarios.len(),
            variable,
            filters.canonical()
        );

        if options.aggregate && scenarios.len() > 1 {
            let summary = summarize_scenarios(&scenarios, true)
                .map_err(|e| e.with_operation("fetch_series").with_variable(variable))?;
            return Ok(SeriesResponse::Aggregated(AggregatedSeriesResponse {
                variable: variable.to_string(),
                n_scenarios: scenarios.len(),
                is_single_scenario: false,
                primary_scenario: None,
                summary,
            }));
        }

        Ok(SeriesResponse::Raw(RawSeriesResponse {
            variable: variable.to_string(),
            scenarios,
        }))
    }

    async fn fetch_climate_data(&self) -> SeriesResult<ClimateData> {
        self.check_health()
            .map_err(|e| e.with_operation("fetch_climate_data"))?;
        Ok(self.data.read().content.climate.clone().sanitized())
    }

    async fn list_variables(&self) -> SeriesResult<Vec<String>> {
        self.check_health()
            .map_err(|e| e.with_operation("list_variables"))?;
        Ok(self.data.read().content.series.keys().cloned().collect())
    }

    async fn parameter_values(&self) -> SeriesResult<BTreeMap<String, Vec<f64>>> {
        self.check_health()
            .map_err(|e| e.with_operation("parameter_values"))?;

        let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for assignment in self.data.read().content.scenarios.values() {
            for (key, value) in assignment {
                values.entry(key.clone()).or_default().push(*value);
            }
        }
        for domain in values.values_mut() {
            domain.sort_by(f64::total_cmp);
            domain.dedup();
        }
        Ok(values)
    }

    async fn health_check(&self) -> SeriesResult<bool> {
        Ok(self.data.read().is_healthy)
    }
}
