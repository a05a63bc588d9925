//! Normalization of scenario source responses into [`NormalizedSeries`].

use std::collections::BTreeMap;

use crate::client::{SeriesError, SeriesResult};
use crate::models::{
    AggregatedSeriesResponse, NormalizedSeries, RawSeriesPoint, RawSeriesResponse, Resolution,
    ScenarioMode, ScenarioSeries, SeriesResponse, SeriesSummary,
};

/// Lower percentile reported by pre-aggregating sources.
pub const BAND_LOW_QUANTILE: f64 = 0.05;
/// Upper percentile reported by pre-aggregating sources.
pub const BAND_HIGH_QUANTILE: f64 = 0.95;

/// Turn either response shape into the uniform series shape.
///
/// Raw single-scenario rows pass through sorted by year. Raw multi-scenario
/// rows are reduced per year over the intersection of the year axes and
/// carry no percentile band. Pre-aggregated summaries are validated and
/// passed through.
pub fn aggregate(
    variable: &str,
    response: &SeriesResponse,
    resolution: &Resolution,
) -> SeriesResult<NormalizedSeries> {
    let result = match response {
        SeriesResponse::Raw(raw) => aggregate_raw(variable, raw, resolution),
        SeriesResponse::Aggregated(agg) => aggregate_summary(variable, agg, resolution),
    };
    result.map_err(|e| e.with_operation("aggregate").with_variable(variable))
}

fn aggregate_raw(
    variable: &str,
    raw: &RawSeriesResponse,
    resolution: &Resolution,
) -> SeriesResult<NormalizedSeries> {
    if raw.scenarios.is_empty() {
        return Err(SeriesError::empty_series("response contains no scenarios"));
    }
    if raw.scenarios.len() != resolution.count {
        return Err(SeriesError::invalid_response(format!(
            "response carries {} scenario rows but {} scenarios were resolved",
            raw.scenarios.len(),
            resolution.count
        )));
    }

    match resolution.mode {
        ScenarioMode::Single => {
            let points = sorted_points(&raw.scenarios[0])?;
            let time = points.iter().map(|p| p.year).collect();
            let value = points.iter().map(|p| p.value).collect();
            Ok(NormalizedSeries::single(variable, time, value))
        }
        ScenarioMode::Multi => {
            let summary = summarize_scenarios(&raw.scenarios, false)?;
            Ok(NormalizedSeries::multi(
                variable,
                resolution.count,
                summary.time,
                summary.mean,
                summary.min,
                summary.max,
            ))
        }
    }
}

fn aggregate_summary(
    variable: &str,
    agg: &AggregatedSeriesResponse,
    resolution: &Resolution,
) -> SeriesResult<NormalizedSeries> {
    if agg.n_scenarios != resolution.count {
        return Err(SeriesError::invalid_response(format!(
            "summary covers {} scenarios but {} were resolved",
            agg.n_scenarios, resolution.count
        )));
    }

    let summary = &agg.summary;
    if summary.time.is_empty() {
        return Err(SeriesError::empty_series("summary has no time steps"));
    }
    check_increasing(&summary.time)?;

    let n = summary.time.len();
    check_length("mean", summary.mean.len(), n)?;
    check_length("min", summary.min.len(), n)?;
    check_length("max", summary.max.len(), n)?;
    if let Some(p_low) = &summary.p_low {
        check_length("p_low", p_low.len(), n)?;
    }
    if let Some(p_high) = &summary.p_high {
        check_length("p_high", p_high.len(), n)?;
    }

    match resolution.mode {
        ScenarioMode::Single => Ok(NormalizedSeries::single(
            variable,
            summary.time.clone(),
            summary.mean.clone(),
        )),
        ScenarioMode::Multi => Ok(NormalizedSeries::multi(
            variable,
            agg.n_scenarios,
            summary.time.clone(),
            summary.mean.clone(),
            summary.min.clone(),
            summary.max.clone(),
        )
        .with_band(summary.p_low.clone(), summary.p_high.clone())),
    }
}

/// Reduce several scenarios to per-year mean, min and max over the years
/// every scenario covers. With `with_bands` the 5th and 95th percentiles
/// (nearest rank) are included as well.
pub fn summarize_scenarios(
    scenarios: &[ScenarioSeries],
    with_bands: bool,
) -> SeriesResult<SeriesSummary> {
    if scenarios.is_empty() {
        return Err(SeriesError::empty_series("no scenarios to summarize"));
    }

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for scenario in scenarios {
        for point in sorted_points(scenario)? {
            by_year.entry(point.year).or_default().push(point.value);
        }
    }
    by_year.retain(|_, values| values.len() == scenarios.len());

    if by_year.is_empty() {
        return Err(SeriesError::disjoint_series(format!(
            "{} scenarios share no common year",
            scenarios.len()
        )));
    }

    let mut summary = SeriesSummary::default();
    let mut p_low = Vec::with_capacity(by_year.len());
    let mut p_high = Vec::with_capacity(by_year.len());

    for (year, mut values) in by_year {
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        summary.time.push(year);
        summary.mean.push(values.iter().sum::<f64>() / n as f64);
        summary.min.push(values[0]);
        summary.max.push(values[n - 1]);
        if with_bands {
            p_low.push(nearest_quantile(&values, BAND_LOW_QUANTILE));
            p_high.push(nearest_quantile(&values, BAND_HIGH_QUANTILE));
        }
    }

    if with_bands {
        summary.p_low = Some(p_low);
        summary.p_high = Some(p_high);
    }
    Ok(summary)
}

/// Nearest-rank quantile of an ascending, non-empty slice.
fn nearest_quantile(sorted: &[f64], q: f64) -> f64 {
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn sorted_points(scenario: &ScenarioSeries) -> SeriesResult<Vec<RawSeriesPoint>> {
    if scenario.points.is_empty() {
        return Err(SeriesError::empty_series(format!(
            "scenario {} has no data points",
            scenario.scenario_id
        )));
    }
    let mut points = scenario.points.clone();
    points.sort_by_key(|p| p.year);
    if let Some(pair) = points.windows(2).find(|w| w[0].year == w[1].year) {
        return Err(SeriesError::invalid_response(format!(
            "scenario {} repeats year {}",
            scenario.scenario_id, pair[0].year
        )));
    }
    Ok(points)
}

fn check_increasing(time: &[i32]) -> SeriesResult<()> {
    match time.windows(2).find(|w| w[0] >= w[1]) {
        Some(pair) => Err(SeriesError::invalid_response(format!(
            "time axis is not strictly increasing at {} -> {}",
            pair[0], pair[1]
        ))),
        None => Ok(()),
    }
}

fn check_length(name: &str, actual: usize, expected: usize) -> SeriesResult<()> {
    if actual != expected {
        return Err(SeriesError::invalid_response(format!(
            "{} has {} entries, expected {}",
            name, actual, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScenarioId;
    use proptest::prelude::*;

    fn scenario(id: &str, points: &[(i32, f64)]) -> ScenarioSeries {
        ScenarioSeries {
            scenario_id: ScenarioId::from(id),
            parameters: BTreeMap::new(),
            points: points
                .iter()
                .map(|&(year, value)| RawSeriesPoint::new(year, value))
                .collect(),
        }
    }

    fn raw(scenarios: Vec<ScenarioSeries>) -> SeriesResponse {
        SeriesResponse::Raw(RawSeriesResponse {
            variable: "YRB WSI".to_string(),
            scenarios,
        })
    }

    fn resolution(count: usize) -> Resolution {
        Resolution {
            mode: ScenarioMode::from_count(count),
            primary_scenario: None,
            count,
        }
    }

    #[test]
    fn test_single_raw_passes_through_sorted() {
        let response = raw(vec![scenario("sc_1", &[(2021, 2.0), (2020, 1.0)])]);
        let series = aggregate("YRB WSI", &response, &resolution(1)).unwrap();

        assert_eq!(series.mode, ScenarioMode::Single);
        assert_eq!(series.time, vec![2020, 2021]);
        assert_eq!(series.value, Some(vec![1.0, 2.0]));
        assert!(series.mean.is_none());
    }

    #[test]
    fn test_multi_raw_uses_year_intersection() {
        let response = raw(vec![
            scenario("sc_1", &[(2020, 1.0), (2021, 2.0), (2022, 3.0)]),
            scenario("sc_2", &[(2021, 4.0), (2022, 5.0), (2023, 6.0)]),
        ]);
        let series = aggregate("YRB WSI", &response, &resolution(2)).unwrap();

        assert_eq!(series.time, vec![2021, 2022]);
        assert_eq!(series.mean, Some(vec![3.0, 4.0]));
        assert_eq!(series.min, Some(vec![2.0, 3.0]));
        assert_eq!(series.max, Some(vec![4.0, 5.0]));
        assert!(series.value.is_none());
        assert!(series.p_low.is_none());
        assert!(series.p_high.is_none());
        assert_eq!(series.n_scenarios, 2);
    }

    #[test]
    fn test_disjoint_years_fail() {
        let response = raw(vec![
            scenario("sc_1", &[(2020, 1.0)]),
            scenario("sc_2", &[(2021, 2.0)]),
        ]);
        let err = aggregate("YRB WSI", &response, &resolution(2)).unwrap_err();
        assert_eq!(err.code(), "DISJOINT_SERIES");
    }

    #[test]
    fn test_empty_scenario_fails() {
        let response = raw(vec![scenario("sc_1", &[])]);
        let err = aggregate("YRB WSI", &response, &resolution(1)).unwrap_err();
        assert_eq!(err.code(), "EMPTY_SERIES");
        assert_eq!(err.context().operation.as_deref(), Some("aggregate"));
    }

    #[test]
    fn test_duplicate_year_is_invalid() {
        let response = raw(vec![scenario("sc_1", &[(2020, 1.0), (2020, 2.0)])]);
        let err = aggregate("YRB WSI", &response, &resolution(1)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
    }

    #[test]
    fn test_count_mismatch_is_invalid() {
        let response = raw(vec![scenario("sc_1", &[(2020, 1.0)])]);
        let err = aggregate("YRB WSI", &response, &resolution(3)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
    }

    fn summary_response(n_scenarios: usize, summary: SeriesSummary) -> SeriesResponse {
        SeriesResponse::Aggregated(AggregatedSeriesResponse {
            variable: "YRB WSI".to_string(),
            n_scenarios,
            is_single_scenario: n_scenarios == 1,
            primary_scenario: None,
            summary,
        })
    }

    #[test]
    fn test_aggregated_multi_keeps_band() {
        let summary = SeriesSummary {
            time: vec![2020, 2021],
            mean: vec![1.0, 2.0],
            min: vec![0.0, 1.0],
            max: vec![2.0, 3.0],
            p_low: Some(vec![0.1, 1.1]),
            p_high: Some(vec![1.9, 2.9]),
        };
        let series = aggregate("YRB WSI", &summary_response(4, summary), &resolution(4)).unwrap();

        assert!(series.is_multi());
        assert_eq!(series.n_scenarios, 4);
        assert_eq!(series.p_low, Some(vec![0.1, 1.1]));
        assert_eq!(series.p_high, Some(vec![1.9, 2.9]));
    }

    #[test]
    fn test_aggregated_single_copies_mean_into_value() {
        let summary = SeriesSummary {
            time: vec![2020, 2021],
            mean: vec![5.0, 6.0],
            min: vec![5.0, 6.0],
            max: vec![5.0, 6.0],
            p_low: None,
            p_high: None,
        };
        let series = aggregate("YRB WSI", &summary_response(1, summary), &resolution(1)).unwrap();

        assert_eq!(series.mode, ScenarioMode::Single);
        assert_eq!(series.value, Some(vec![5.0, 6.0]));
        assert!(series.mean.is_none());
    }

    #[test]
    fn test_aggregated_length_mismatch_is_invalid() {
        let summary = SeriesSummary {
            time: vec![2020, 2021],
            mean: vec![1.0],
            min: vec![0.0, 1.0],
            max: vec![2.0, 3.0],
            p_low: None,
            p_high: None,
        };
        let err = aggregate("YRB WSI", &summary_response(2, summary), &resolution(2)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
    }

    #[test]
    fn test_aggregated_unsorted_time_is_invalid() {
        let summary = SeriesSummary {
            time: vec![2021, 2020],
            mean: vec![1.0, 2.0],
            min: vec![1.0, 2.0],
            max: vec![1.0, 2.0],
            p_low: None,
            p_high: None,
        };
        let err = aggregate("YRB WSI", &summary_response(2, summary), &resolution(2)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
    }

    #[test]
    fn test_summarize_with_bands_uses_nearest_rank() {
        let scenarios: Vec<ScenarioSeries> = (0..21)
            .map(|i| scenario(&format!("sc_{}", i), &[(2020, i as f64)]))
            .collect();
        let summary = summarize_scenarios(&scenarios, true).unwrap();

        assert_eq!(summary.mean, vec![10.0]);
        assert_eq!(summary.p_low, Some(vec![1.0]));
        assert_eq!(summary.p_high, Some(vec![19.0]));
    }

    proptest! {
        #[test]
        fn prop_mean_within_min_max(
            values in proptest::collection::vec(
                proptest::collection::vec(-1.0e6f64..1.0e6, 5),
                2..8,
            )
        ) {
            let scenarios: Vec<ScenarioSeries> = values
                .iter()
                .enumerate()
                .map(|(i, row)| ScenarioSeries {
                    scenario_id: ScenarioId::new(format!("sc_{}", i)),
                    parameters: BTreeMap::new(),
                    points: row
                        .iter()
                        .enumerate()
                        .map(|(j, v)| RawSeriesPoint::new(2020 + j as i32, *v))
                        .collect(),
                })
                .collect();
            let series = aggregate("YRB WSI", &raw(scenarios), &resolution(values.len())).unwrap();

            let mean = series.mean.unwrap();
            let min = series.min.unwrap();
            let max = series.max.unwrap();
            prop_assert_eq!(mean.len(), series.time.len());
            for i in 0..mean.len() {
                prop_assert!(min[i] <= mean[i] + 1e-6);
                prop_assert!(mean[i] <= max[i] + 1e-6);
            }
        }
    }
}
