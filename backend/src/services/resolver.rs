//! Single- vs multi-scenario resolution.

use std::collections::BTreeSet;

use crate::client::{SeriesError, SeriesResult};
use crate::models::{Resolution, ScenarioId, ScenarioMode, SeriesResponse};
use crate::params::FilterSet;

/// Classify the scenarios matched by `filters`.
///
/// Zero matches is a `NoMatch` error carrying the canonical filters. One
/// match is single-scenario mode with that scenario as primary.
pub fn resolve(filters: &FilterSet, matched: &[ScenarioId]) -> SeriesResult<Resolution> {
    match matched {
        [] => Err(SeriesError::no_match(filters.canonical()).with_operation("resolve")),
        [only] => Ok(Resolution {
            mode: ScenarioMode::Single,
            primary_scenario: Some(only.clone()),
            count: 1,
        }),
        many => Ok(Resolution {
            mode: ScenarioMode::Multi,
            primary_scenario: None,
            count: many.len(),
        }),
    }
}

/// Resolve from a source response of either shape.
///
/// Raw rows are classified by their scenario ids, and a repeated id is an
/// `InvalidResponse`. A summary is
/// classified by its scenario count; its own single-scenario flag and
/// primary id are kept when they agree with that count.
pub fn resolve_response(filters: &FilterSet, response: &SeriesResponse) -> SeriesResult<Resolution> {
    match response {
        SeriesResponse::Raw(raw) => {
            let mut seen = BTreeSet::new();
            if let Some(repeated) = raw.scenarios.iter().find(|s| !seen.insert(&s.scenario_id)) {
                return Err(SeriesError::invalid_response(format!(
                    "scenario {} appears more than once",
                    repeated.scenario_id
                ))
                .with_operation("resolve")
                .with_variable(raw.variable.clone()));
            }
            let ids: Vec<ScenarioId> = raw.scenarios.iter().map(|s| s.scenario_id.clone()).collect();
            resolve(filters, &ids)
        }
        SeriesResponse::Aggregated(agg) => {
            if agg.n_scenarios == 0 {
                return Err(SeriesError::no_match(filters.canonical()).with_operation("resolve"));
            }
            if agg.is_single_scenario != (agg.n_scenarios == 1) {
                return Err(SeriesError::invalid_response(format!(
                    "summary flags single scenario {} but covers {} scenarios",
                    agg.is_single_scenario, agg.n_scenarios
                ))
                .with_operation("resolve"));
            }
            let mode = ScenarioMode::from_count(agg.n_scenarios);
            Ok(Resolution {
                mode,
                primary_scenario: match mode {
                    ScenarioMode::Single => agg.primary_scenario.clone(),
                    ScenarioMode::Multi => None,
                },
                count: agg.n_scenarios,
            })
        }
    }
}
