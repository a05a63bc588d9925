//! Scenario series source trait.
//!
//! This trait is the only boundary between the dashboard core and the
//! service that stores scenario outputs. Implementations may answer a
//! series query with raw per-scenario rows or with a summary they computed
//! themselves; the core accepts both shapes.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::SeriesResult;
use crate::models::{ClimateData, QueryOptions, SeriesResponse};
use crate::params::FilterSet;

/// Source of scenario time series.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so one client can be shared by
/// every concurrent fetch.
#[async_trait]
pub trait SeriesClient: Send + Sync {
    /// Fetch one variable for every scenario matching `filters`.
    ///
    /// # Arguments
    /// * `variable` - Output variable name, e.g. `YRB available surface water`
    /// * `filters` - Backend filter constraints
    /// * `options` - Year window and whether the source should aggregate
    ///
    /// # Returns
    /// * `Ok(SeriesResponse)` - Raw rows or a pre-aggregated summary
    /// * `Err(SeriesError::NotFound)` - The variable is unknown
    /// * `Err(SeriesError::Network)` - The source could not be reached
    async fn fetch_series(
        &self,
        variable: &str,
        filters: &FilterSet,
        options: QueryOptions,
    ) -> SeriesResult<SeriesResponse>;

    /// Fetch temperature and precipitation projections per climate pathway.
    async fn fetch_climate_data(&self) -> SeriesResult<ClimateData>;

    /// List the variables the source can serve.
    async fn list_variables(&self) -> SeriesResult<Vec<String>>;

    /// Distinct stored values of each scenario parameter, keyed by backend
    /// filter key and sorted ascending.
    ///
    /// Only these values can ever match a `Fixed` parameter.
    async fn parameter_values(&self) -> SeriesResult<BTreeMap<String, Vec<f64>>>;

    /// Check if the source is reachable.
    async fn health_check(&self) -> SeriesResult<bool>;
}
