//! Application state for the HTTP server.

use crate::services::SeriesPipeline;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline owning the parameter store, client and cache
    pub pipeline: SeriesPipeline,
    /// Baseline year used when a comparison request names none
    pub baseline_year: i32,
}

impl AppState {
    /// Create a new application state around a pipeline.
    pub fn new(pipeline: SeriesPipeline, baseline_year: i32) -> Self {
        Self {
            pipeline,
            baseline_year,
        }
    }
}
