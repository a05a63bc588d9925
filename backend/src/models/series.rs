use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::scenario::{ScenarioId, ScenarioMode};
use super::time::TimeWindow;

/// One yearly value of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSeriesPoint {
    #[serde(rename = "time")]
    pub year: i32,
    pub value: f64,
}

impl RawSeriesPoint {
    pub fn new(year: i32, value: f64) -> Self {
        Self { year, value }
    }
}

/// Raw rows of one matched scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSeries {
    pub scenario_id: ScenarioId,
    /// Stored parameter assignment, keyed by backend filter key.
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    pub points: Vec<RawSeriesPoint>,
}

/// Per-scenario response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeriesResponse {
    pub variable: String,
    pub scenarios: Vec<ScenarioSeries>,
}

/// Cross-scenario summary computed by the source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub time: Vec<i32>,
    pub mean: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_low: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_high: Option<Vec<f64>>,
}

/// Pre-aggregated response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeriesResponse {
    pub variable: String,
    pub n_scenarios: usize,
    pub is_single_scenario: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_scenario: Option<ScenarioId>,
    pub summary: SeriesSummary,
}

/// Either shape the scenario source may answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesResponse {
    Raw(RawSeriesResponse),
    Aggregated(AggregatedSeriesResponse),
}

impl SeriesResponse {
    pub fn variable(&self) -> &str {
        match self {
            SeriesResponse::Raw(raw) => &raw.variable,
            SeriesResponse::Aggregated(agg) => &agg.variable,
        }
    }
}

/// Options of a single series query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub window: TimeWindow,
    /// Ask the source to aggregate across scenarios when it can.
    pub aggregate: bool,
}

/// Uniform series shape read by every chart.
///
/// Single mode fills `value`; multi mode fills `mean`, `min` and `max` and,
/// when the source supplied them, the `p_low`/`p_high` band edges. Absent
/// arrays are omitted from JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub variable: String,
    pub mode: ScenarioMode,
    pub n_scenarios: usize,
    pub time: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_low: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_high: Option<Vec<f64>>,
}

impl NormalizedSeries {
    pub fn single(variable: impl Into<String>, time: Vec<i32>, value: Vec<f64>) -> Self {
        Self {
            variable: variable.into(),
            mode: ScenarioMode::Single,
            n_scenarios: 1,
            time,
            value: Some(value),
            mean: None,
            min: None,
            max: None,
            p_low: None,
            p_high: None,
        }
    }

    pub fn multi(
        variable: impl Into<String>,
        n_scenarios: usize,
        time: Vec<i32>,
        mean: Vec<f64>,
        min: Vec<f64>,
        max: Vec<f64>,
    ) -> Self {
        Self {
            variable: variable.into(),
            mode: ScenarioMode::Multi,
            n_scenarios,
            time,
            value: None,
            mean: Some(mean),
            min: Some(min),
            max: Some(max),
            p_low: None,
            p_high: None,
        }
    }

    /// Attach confidence band edges.
    pub fn with_band(mut self, p_low: Option<Vec<f64>>, p_high: Option<Vec<f64>>) -> Self {
        self.p_low = p_low;
        self.p_high = p_high;
        self
    }

    /// The values a single-line consumer should plot: `value` in single
    /// mode, `mean` in multi mode.
    pub fn primary_values(&self) -> &[f64] {
        match self.mode {
            ScenarioMode::Single => self.value.as_deref().unwrap_or(&[]),
            ScenarioMode::Multi => self.mean.as_deref().unwrap_or(&[]),
        }
    }

    pub fn start_year(&self) -> Option<i32> {
        self.time.first().copied()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn is_multi(&self) -> bool {
        self.mode == ScenarioMode::Multi
    }
}

/// Future-vs-now reduction of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub now: f64,
    pub future: f64,
    pub diff: f64,
    #[serde(alias = "diff_percent")]
    pub diff_percent: f64,
}
