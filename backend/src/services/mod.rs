//! Service layer: resolution, aggregation, comparison, caching and the
//! orchestration that ties them to the parameter store.
//!
//! Everything here except [`pipeline`] is pure and usable on its own.

pub mod aggregator;
pub mod cache;
pub mod comparison;
pub mod pipeline;
pub mod resolver;
pub mod statistics;

pub use aggregator::{aggregate, summarize_scenarios};
pub use cache::{CacheKey, CacheStats, ScenarioSeriesCache};
pub use comparison::{compare, compare_series, compare_series_strict, compare_strict};
pub use pipeline::{SeriesPipeline, SeriesState, SeriesUpdate};
pub use resolver::{resolve, resolve_response};
pub use statistics::{summarize, SeriesStatistics, YearValue};
