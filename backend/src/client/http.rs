//! Remote scenario API client.
//!
//! Speaks the scenario service's `/series/multi` contract. The service
//! answers with either pre-aggregated statistics or raw per-scenario rows
//! depending on the `aggregate` flag; both bodies are decoded here into
//! [`SeriesResponse`].

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::error::{SeriesError, SeriesResult};
use super::series_client::SeriesClient;
use crate::models::{
    year_from_time, AggregatedSeriesResponse, ClimateData, ClimateSeries, QueryOptions,
    RawSeriesPoint, RawSeriesResponse, ScenarioId, ScenarioSeries, SeriesResponse, SeriesSummary,
};
use crate::params::FilterSet;

/// Detail text the service sends when no scenario matches. It arrives as a
/// 404, or wrapped in a 500 by the service's catch-all handler.
const NO_MATCH_DETAIL: &str = "No scenarios found matching filters";

/// HTTP implementation of [`SeriesClient`].
#[derive(Clone)]
pub struct HttpSeriesClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSeriesClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SeriesResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SeriesError::configuration(
                "HTTP client requires a base URL",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SeriesError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        info!("HTTP series client targeting {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_body(
        &self,
        path: &str,
        query: &[(&str, String)],
        filters: Option<&FilterSet>,
    ) -> SeriesResult<String> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(status_error(status, &body, filters));
        }
        Ok(body)
    }
}

#[async_trait]
impl SeriesClient for HttpSeriesClient {
    async fn fetch_series(
        &self,
        variable: &str,
        filters: &FilterSet,
        options: QueryOptions,
    ) -> SeriesResult<SeriesResponse> {
        let filters_json = serde_json::to_string(filters)
            .map_err(|e| SeriesError::internal(format!("Failed to encode filters: {}", e)))?;
        let query = [
            ("variable", variable.to_string()),
            ("filters", filters_json),
            ("start_year", options.window.start_year.to_string()),
            ("end_year", options.window.end_year.to_string()),
            ("aggregate", options.aggregate.to_string()),
        ];

        debug!("GET /series/multi variable={} filters={}", variable, filters.canonical());
        let body = self
            .get_body("/series/multi", &query, Some(filters))
            .await
            .map_err(|e| e.with_operation("fetch_series").with_variable(variable))?;

        decode_series_body(&body).map_err(|e| {
            e.with_operation("fetch_series")
                .with_variable(variable)
                .with_filters(filters.canonical())
        })
    }

    async fn fetch_climate_data(&self) -> SeriesResult<ClimateData> {
        let body = self
            .get_body("/climate-data", &[], None)
            .await
            .map_err(|e| e.with_operation("fetch_climate_data"))?;
        decode_climate_body(&body).map_err(|e| e.with_operation("fetch_climate_data"))
    }

    async fn list_variables(&self) -> SeriesResult<Vec<String>> {
        let body = self
            .get_body("/variables", &[], None)
            .await
            .map_err(|e| e.with_operation("list_variables"))?;
        serde_json::from_str(&body).map_err(|e| {
            SeriesError::invalid_response(format!("Failed to decode variables: {}", e))
                .with_operation("list_variables")
        })
    }

    async fn parameter_values(&self) -> SeriesResult<BTreeMap<String, Vec<f64>>> {
        let body = self
            .get_body("/params", &[], None)
            .await
            .map_err(|e| e.with_operation("parameter_values"))?;
        decode_params_body(&body).map_err(|e| e.with_operation("parameter_values"))
    }

    async fn health_check(&self) -> SeriesResult<bool> {
        match self.client.get(self.url("/")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                debug!("health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Map a non-success status and its body to an error.
fn status_error(status: u16, body: &str, filters: Option<&FilterSet>) -> SeriesError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if detail.contains(NO_MATCH_DETAIL) {
        return SeriesError::no_match(filters.map(FilterSet::canonical).unwrap_or_default())
            .with_details(detail);
    }

    match status {
        404 => SeriesError::not_found(if detail.is_empty() {
            "Resource not found".to_string()
        } else {
            detail
        }),
        500..=599 => SeriesError::network(format!("Scenario service returned {}", status))
            .with_details(detail),
        _ => SeriesError::invalid_response(format!("Unexpected status {}", status))
            .with_details(detail),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireSeriesBody {
    Aggregated(WireAggregated),
    Raw(WireRaw),
}

#[derive(Deserialize)]
struct WireAggregated {
    variable: String,
    n_scenarios: usize,
    series: WireSummary,
    #[serde(default)]
    is_single_scenario: Option<bool>,
    #[serde(default)]
    primary_scenario: Option<String>,
}

#[derive(Deserialize)]
struct WireSummary {
    time: Vec<f64>,
    mean: Vec<f64>,
    min: Vec<f64>,
    max: Vec<f64>,
    #[serde(default, alias = "p05")]
    p_low: Option<Vec<f64>>,
    #[serde(default, alias = "p95")]
    p_high: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct WireRaw {
    variable: String,
    scenarios: Vec<WireScenario>,
}

#[derive(Deserialize)]
struct WireScenario {
    scenario_name: String,
    #[serde(default)]
    parameters: BTreeMap<String, serde_json::Value>,
    series: WirePoints,
}

#[derive(Deserialize)]
struct WirePoints {
    time: Vec<f64>,
    value: Vec<f64>,
}

/// Decode a `/series/multi` body of either shape.
pub fn decode_series_body(body: &str) -> SeriesResult<SeriesResponse> {
    let wire: WireSeriesBody = serde_json::from_str(body).map_err(|e| {
        SeriesError::invalid_response(format!("Failed to decode series body: {}", e))
    })?;

    match wire {
        WireSeriesBody::Aggregated(agg) => {
            let time = agg
                .series
                .time
                .iter()
                .map(|t| year_from_time(*t))
                .collect::<SeriesResult<Vec<i32>>>()?;
            let is_single_scenario = agg.is_single_scenario.unwrap_or(agg.n_scenarios == 1);
            Ok(SeriesResponse::Aggregated(AggregatedSeriesResponse {
                variable: agg.variable,
                n_scenarios: agg.n_scenarios,
                is_single_scenario,
                primary_scenario: agg.primary_scenario.map(ScenarioId::from),
                summary: SeriesSummary {
                    time,
                    mean: agg.series.mean,
                    min: agg.series.min,
                    max: agg.series.max,
                    p_low: agg.series.p_low,
                    p_high: agg.series.p_high,
                },
            }))
        }
        WireSeriesBody::Raw(raw) => {
            let scenarios = raw
                .scenarios
                .into_iter()
                .map(decode_scenario)
                .collect::<SeriesResult<Vec<_>>>()?;
            Ok(SeriesResponse::Raw(RawSeriesResponse {
                variable: raw.variable,
                scenarios,
            }))
        }
    }
}

fn decode_scenario(wire: WireScenario) -> SeriesResult<ScenarioSeries> {
    if wire.series.time.len() != wire.series.value.len() {
        return Err(SeriesError::invalid_response(format!(
            "scenario {} has {} times but {} values",
            wire.scenario_name,
            wire.series.time.len(),
            wire.series.value.len()
        )));
    }
    let points = wire
        .series
        .time
        .iter()
        .zip(&wire.series.value)
        .map(|(t, v)| Ok(RawSeriesPoint::new(year_from_time(*t)?, *v)))
        .collect::<SeriesResult<Vec<_>>>()?;
    let parameters = wire
        .parameters
        .into_iter()
        .filter_map(|(k, v)| v.as_f64().map(|v| (k, v)))
        .collect();

    Ok(ScenarioSeries {
        scenario_id: ScenarioId::new(wire.scenario_name),
        parameters,
        points,
    })
}

/// Decode a `/params` body. Non-numeric values (labels) are dropped, as is
/// a parameter left with none.
pub fn decode_params_body(body: &str) -> SeriesResult<BTreeMap<String, Vec<f64>>> {
    let wire: BTreeMap<String, Vec<serde_json::Value>> =
        serde_json::from_str(body).map_err(|e| {
            SeriesError::invalid_response(format!("Failed to decode parameters: {}", e))
        })?;

    Ok(wire
        .into_iter()
        .filter_map(|(key, values)| {
            let values: Vec<f64> = values.iter().filter_map(serde_json::Value::as_f64).collect();
            (!values.is_empty()).then_some((key, values))
        })
        .collect())
}

#[derive(Deserialize)]
struct WireClimate {
    #[serde(default)]
    temperature: BTreeMap<String, WireClimateSeries>,
    #[serde(default)]
    precipitation: BTreeMap<String, WireClimateSeries>,
}

#[derive(Deserialize)]
struct WireClimateSeries {
    years: Vec<f64>,
    values: Vec<Option<f64>>,
}

/// Decode a `/climate-data` body, dropping non-finite values.
pub fn decode_climate_body(body: &str) -> SeriesResult<ClimateData> {
    let wire: WireClimate = serde_json::from_str(body).map_err(|e| {
        SeriesError::invalid_response(format!("Failed to decode climate body: {}", e))
    })?;

    let convert = |map: BTreeMap<String, WireClimateSeries>| -> SeriesResult<_> {
        map.into_iter()
            .map(|(pathway, series)| {
                let years = series
                    .years
                    .iter()
                    .map(|y| year_from_time(*y))
                    .collect::<SeriesResult<Vec<i32>>>()?;
                let values = series
                    .values
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect();
                Ok((pathway, ClimateSeries::new(years, values)))
            })
            .collect::<SeriesResult<BTreeMap<_, _>>>()
    };

    Ok(ClimateData {
        temperature: convert(wire.temperature)?,
        precipitation: convert(wire.precipitation)?,
    }
    .sanitized())
}
