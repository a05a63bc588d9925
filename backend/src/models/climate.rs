use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Yearly values of one climate pathway.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateSeries {
    pub years: Vec<i32>,
    pub values: Vec<f64>,
}

impl ClimateSeries {
    pub fn new(years: Vec<i32>, values: Vec<f64>) -> Self {
        Self { years, values }
    }

    /// Drop year/value pairs whose value is NaN or infinite, and any
    /// trailing unpaired entries.
    pub fn sanitized(self) -> Self {
        let (years, values) = self
            .years
            .into_iter()
            .zip(self.values)
            .filter(|(_, value)| value.is_finite())
            .unzip();
        Self { years, values }
    }
}

/// Temperature and precipitation projections keyed by pathway (e.g. `ssp245`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateData {
    #[serde(default)]
    pub temperature: BTreeMap<String, ClimateSeries>,
    #[serde(default)]
    pub precipitation: BTreeMap<String, ClimateSeries>,
}

impl ClimateData {
    pub fn sanitized(self) -> Self {
        Self {
            temperature: sanitize_all(self.temperature),
            precipitation: sanitize_all(self.precipitation),
        }
    }
}

fn sanitize_all(series: BTreeMap<String, ClimateSeries>) -> BTreeMap<String, ClimateSeries> {
    series
        .into_iter()
        .map(|(pathway, s)| (pathway, s.sanitized()))
        .collect()
}
