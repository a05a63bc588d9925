//! Future-vs-now reduction of a series around a baseline year.
//!
//! `future` is the mean of the later half of the horizon after the
//! baseline: the values from the horizon midpoint (rounded up) through the
//! end of the series. With a 2020 baseline over 2020..=2100 that is the
//! 2060..=2100 average.

use log::warn;

use crate::client::{SeriesError, SeriesResult};
use crate::models::{ComparisonResult, NormalizedSeries};

/// Compare the value at `baseline_year` with the late-horizon mean.
///
/// The baseline is located by `baseline_year - series_start_year`. An
/// out-of-range baseline yields `now = 0`. A baseline before the series
/// start therefore measures the horizon from the first value.
pub fn compare(values: &[f64], baseline_year: i32, series_start_year: i32) -> ComparisonResult {
    let index = i64::from(baseline_year) - i64::from(series_start_year);
    let now = usize::try_from(index)
        .ok()
        .and_then(|i| values.get(i).copied())
        .unwrap_or_else(|| out_of_range(baseline_year, series_start_year, values.len()));

    result_from(values, first_after(index, values.len()), now)
}

/// Like [`compare`] but an out-of-range baseline is an error.
pub fn compare_strict(
    values: &[f64],
    baseline_year: i32,
    series_start_year: i32,
) -> SeriesResult<ComparisonResult> {
    let index = i64::from(baseline_year) - i64::from(series_start_year);
    let now = usize::try_from(index)
        .ok()
        .and_then(|i| values.get(i).copied())
        .ok_or_else(|| {
            SeriesError::baseline_out_of_range(format!(
                "baseline year {} is outside the series {}..{}",
                baseline_year,
                series_start_year,
                i64::from(series_start_year) + values.len() as i64
            ))
            .with_operation("compare")
        })?;
    Ok(result_from(values, first_after(index, values.len()), now))
}

/// Compare a normalized series on its primary values.
///
/// The baseline is looked up on the time axis, which may have gaps after a
/// multi-scenario intersection. A year missing from the axis yields
/// `now = 0`, and `future` covers the years after it.
pub fn compare_series(series: &NormalizedSeries, baseline_year: i32) -> ComparisonResult {
    let values = series.primary_values();
    let later = series.time.partition_point(|&year| year <= baseline_year);
    let now = baseline_position(series, baseline_year)
        .and_then(|i| values.get(i).copied())
        .unwrap_or_else(|| {
            out_of_range(
                baseline_year,
                series.start_year().unwrap_or(baseline_year),
                values.len(),
            )
        });
    result_from(values, later, now)
}

/// Strict variant of [`compare_series`]. A baseline year absent from the
/// time axis is an error.
pub fn compare_series_strict(
    series: &NormalizedSeries,
    baseline_year: i32,
) -> SeriesResult<ComparisonResult> {
    if series.time.is_empty() {
        return Err(SeriesError::empty_series("cannot compare an empty series")
            .with_operation("compare")
            .with_variable(series.variable.clone()));
    }
    let values = series.primary_values();
    let now = baseline_position(series, baseline_year)
        .and_then(|i| values.get(i).copied())
        .ok_or_else(|| {
            SeriesError::baseline_out_of_range(format!(
                "baseline year {} is not on the series time axis",
                baseline_year
            ))
            .with_operation("compare")
            .with_variable(series.variable.clone())
        })?;
    let later = series.time.partition_point(|&year| year <= baseline_year);
    Ok(result_from(values, later, now))
}

fn baseline_position(series: &NormalizedSeries, baseline_year: i32) -> Option<usize> {
    series.time.iter().position(|&year| year == baseline_year)
}

fn first_after(index: i64, len: usize) -> usize {
    usize::try_from(index + 1).map_or(0, |first| first.min(len))
}

fn out_of_range(baseline_year: i32, series_start_year: i32, len: usize) -> f64 {
    warn!(
        "baseline year {} outside series starting {} ({} values); using 0",
        baseline_year, series_start_year, len
    );
    0.0
}

fn result_from(values: &[f64], first_later: usize, now: f64) -> ComparisonResult {
    let later = values.get(first_later..).unwrap_or(&[]);
    // Skip the first half of the horizon; the midpoint itself is kept.
    let tail = later.get(later.len().saturating_sub(1) / 2..).unwrap_or(&[]);

    let future = if tail.is_empty() {
        now
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    };
    let diff = future - now;
    let diff_percent = if now == 0.0 { 0.0 } else { diff / now * 100.0 };

    ComparisonResult {
        now,
        future,
        diff,
        diff_percent,
    }
}
