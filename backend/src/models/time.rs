use serde::{Deserialize, Serialize};

use crate::client::{SeriesError, SeriesResult};

/// First projection year served by the dashboard.
pub const DEFAULT_START_YEAR: i32 = 2020;

/// Last projection year served by the dashboard.
pub const DEFAULT_END_YEAR: i32 = 2100;

/// Inclusive year range of a series query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct TimeWindow {
    pub start_year: i32,
    pub end_year: i32,
}

impl TimeWindow {
    /// Create a window, rejecting an inverted range.
    pub fn new(start_year: i32, end_year: i32) -> SeriesResult<Self> {
        if start_year > end_year {
            return Err(SeriesError::configuration(format!(
                "time window start {} is after end {}",
                start_year, end_year
            )));
        }
        Ok(Self {
            start_year,
            end_year,
        })
    }

    /// Whether `year` lies inside the window.
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }

}

#[derive(Deserialize)]
struct WindowBounds {
    start_year: i32,
    end_year: i32,
}

impl TryFrom<WindowBounds> for TimeWindow {
    type Error = SeriesError;

    fn try_from(bounds: WindowBounds) -> SeriesResult<Self> {
        Self::new(bounds.start_year, bounds.end_year)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year)
    }
}

/// Convert a wire time value (years are sent as floats) into a calendar year.
pub fn year_from_time(time: f64) -> SeriesResult<i32> {
    if !time.is_finite() {
        return Err(SeriesError::invalid_response(format!(
            "non-finite time value {}",
            time
        )));
    }
    let rounded = time.round();
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return Err(SeriesError::invalid_response(format!(
            "time value {} is not a calendar year",
            time
        )));
    }
    Ok(rounded as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let window = TimeWindow::default();
        assert_eq!(window.start_year, 2020);
        assert_eq!(window.end_year, 2100);
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = TimeWindow::new(2030, 2040).unwrap();
        assert!(window.contains(2030));
        assert!(window.contains(2040));
        assert!(!window.contains(2029));
        assert!(!window.contains(2041));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = TimeWindow::new(2050, 2020).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_deserialize_validates_bounds() {
        let window: TimeWindow =
            serde_json::from_str(r#"{"start_year": 2030, "end_year": 2040}"#).unwrap();
        assert_eq!(window, TimeWindow::new(2030, 2040).unwrap());

        let err = serde_json::from_str::<TimeWindow>(r#"{"start_year": 2050, "end_year": 2020}"#)
            .unwrap_err();
        assert!(err.to_string().contains("after end"));
    }

    #[test]
    fn test_year_from_time() {
        assert_eq!(year_from_time(2020.0).unwrap(), 2020);
        assert_eq!(year_from_time(2049.9999).unwrap(), 2050);
        assert!(year_from_time(f64::NAN).is_err());
        assert!(year_from_time(f64::INFINITY).is_err());
    }
}
