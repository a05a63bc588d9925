//! Descriptive statistics of one normalized series over a year window.

use serde::Serialize;

use crate::client::{SeriesError, SeriesResult};
use crate::models::{NormalizedSeries, TimeWindow};

/// A value and the year it occurs in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearValue {
    pub value: f64,
    pub year: i32,
}

/// Peak, valley, spread and trend of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStatistics {
    pub variable: String,
    pub year_range: TimeWindow,
    pub peak: YearValue,
    pub valley: YearValue,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single point.
    pub std: f64,
    /// Change per year between the first and last point.
    pub trend: f64,
    pub range: f64,
    pub data_points: usize,
}

/// Summarize the primary values of `series` inside `window` (the whole
/// series when `None`).
pub fn summarize(
    series: &NormalizedSeries,
    window: Option<TimeWindow>,
) -> SeriesResult<SeriesStatistics> {
    let points: Vec<(i32, f64)> = series
        .time
        .iter()
        .copied()
        .zip(series.primary_values().iter().copied())
        .filter(|(year, _)| window.map_or(true, |w| w.contains(*year)))
        .collect();

    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            let range = window.map_or_else(|| "series".to_string(), |w| w.to_string());
            return Err(SeriesError::empty_series(format!("No data in year range {}", range))
                .with_operation("statistics")
                .with_variable(series.variable.clone()));
        }
    };

    // First occurrence wins on ties.
    let mut peak = first;
    let mut valley = first;
    for &(year, value) in &points[1..] {
        if value > peak.1 {
            peak = (year, value);
        }
        if value < valley.1 {
            valley = (year, value);
        }
    }

    let n = points.len() as f64;
    let mean = points.iter().map(|(_, v)| v).sum::<f64>() / n;
    let std = if points.len() > 1 {
        let variance = points.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    let span = last.0 - first.0;
    let trend = if span > 0 {
        (last.1 - first.1) / span as f64
    } else {
        0.0
    };

    Ok(SeriesStatistics {
        variable: series.variable.clone(),
        year_range: window.unwrap_or(TimeWindow {
            start_year: first.0,
            end_year: last.0,
        }),
        peak: YearValue {
            value: peak.1,
            year: peak.0,
        },
        valley: YearValue {
            value: valley.1,
            year: valley.0,
        },
        mean,
        std,
        trend,
        range: peak.1 - valley.1,
        data_points: points.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> NormalizedSeries {
        NormalizedSeries::single(
            "YRB available surface water",
            vec![2020, 2021, 2022, 2023, 2024],
            vec![2.0, 4.0, 4.0, 1.0, 6.0],
        )
    }

    #[test]
    fn test_summarize_whole_series() {
        let stats = summarize(&series(), None).unwrap();

        assert_eq!(stats.peak, YearValue { value: 6.0, year: 2024 });
        assert_eq!(stats.valley, YearValue { value: 1.0, year: 2023 });
        assert_eq!(stats.mean, 3.4);
        assert_eq!(stats.range, 5.0);
        assert_eq!(stats.trend, 1.0);
        assert_eq!(stats.data_points, 5);
        assert!((stats.std - 1.949358868961793).abs() < 1e-12);
        assert_eq!(stats.year_range, TimeWindow::new(2020, 2024).unwrap());
    }

    #[test]
    fn test_summarize_window_and_ties() {
        let window = TimeWindow::new(2021, 2022).unwrap();
        let stats = summarize(&series(), Some(window)).unwrap();

        assert_eq!(stats.peak.year, 2021);
        assert_eq!(stats.trend, 0.0);
        assert_eq!(stats.data_points, 2);
        assert_eq!(stats.year_range, window);
    }

    #[test]
    fn test_single_point_has_zero_spread() {
        let window = TimeWindow::new(2023, 2023).unwrap();
        let stats = summarize(&series(), Some(window)).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.trend, 0.0);
        assert_eq!(stats.range, 0.0);
    }

    #[test]
    fn test_empty_window_fails() {
        let window = TimeWindow::new(2050, 2060).unwrap();
        let err = summarize(&series(), Some(window)).unwrap_err();
        assert_eq!(err.code(), "EMPTY_SERIES");
        assert!(err.message().contains("2050-2060"));
    }

    #[test]
    fn test_multi_series_uses_mean() {
        let series = NormalizedSeries::multi(
            "YRB WSI",
            3,
            vec![2020, 2021],
            vec![1.0, 3.0],
            vec![0.0, 2.0],
            vec![2.0, 4.0],
        );
        let stats = summarize(&series, None).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.peak.value, 3.0);
    }
}
