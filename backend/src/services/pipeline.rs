//! Parameter-driven series orchestration.
//!
//! A [`SeriesPipeline`] turns the current parameter snapshot into a
//! normalized series for one variable: translate, fetch, resolve, aggregate,
//! through the cache. Each request is tagged with a generation number when
//! it is issued. When a response arrives after a newer request for the same
//! variable was issued, it is discarded and nothing is published, so the
//! consumer-visible state always reflects the last-issued request.

use futures::future::join_all;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::aggregator::aggregate;
use super::cache::{CacheKey, ScenarioSeriesCache};
use super::comparison::{compare_series, compare_series_strict};
use super::resolver::resolve_response;
use super::statistics::{summarize, SeriesStatistics};
use crate::client::{SeriesClient, SeriesError, SeriesResult};
use crate::models::{ComparisonResult, NormalizedSeries, QueryOptions, TimeWindow};
use crate::params::{FilterSet, FilterTranslator, ParameterSnapshot, ParameterStore, SubscriptionId};

/// Consumer-visible state of one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesState {
    Loading,
    Ready(Arc<NormalizedSeries>),
    Failed(SeriesError),
}

impl SeriesState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SeriesState::Loading)
    }

    pub fn series(&self) -> Option<&Arc<NormalizedSeries>> {
        match self {
            SeriesState::Ready(series) => Some(series),
            _ => None,
        }
    }
}

/// Outcome of one [`SeriesPipeline::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesUpdate {
    /// The result was current and is now the published state.
    Published(Arc<NormalizedSeries>),
    /// A newer request was issued meanwhile; this result was dropped.
    Superseded,
}

/// An issued request: its generation and the filters it was issued for.
#[derive(Debug, Clone)]
struct Ticket {
    variable: String,
    generation: u64,
    filters: FilterSet,
    key: CacheKey,
}

#[derive(Default)]
struct PipelineState {
    next_generation: u64,
    /// Latest issued generation per variable.
    current: HashMap<String, u64>,
    states: HashMap<String, SeriesState>,
}

struct PipelineInner {
    store: ParameterStore,
    translator: FilterTranslator,
    client: Arc<dyn SeriesClient>,
    cache: Arc<ScenarioSeriesCache>,
    options: QueryOptions,
    state: Mutex<PipelineState>,
}

/// Shared orchestration handle. Cloning shares the underlying state.
#[derive(Clone)]
pub struct SeriesPipeline {
    inner: Arc<PipelineInner>,
}

impl SeriesPipeline {
    /// Pipeline asking the source to aggregate, with the default translator.
    pub fn new(
        store: ParameterStore,
        client: Arc<dyn SeriesClient>,
        cache: Arc<ScenarioSeriesCache>,
        window: TimeWindow,
    ) -> Self {
        Self::with_options(
            store,
            client,
            cache,
            QueryOptions {
                window,
                aggregate: true,
            },
            FilterTranslator::default(),
        )
    }

    pub fn with_options(
        store: ParameterStore,
        client: Arc<dyn SeriesClient>,
        cache: Arc<ScenarioSeriesCache>,
        options: QueryOptions,
        translator: FilterTranslator,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                store,
                translator,
                client,
                cache,
                options,
                state: Mutex::new(PipelineState::default()),
            }),
        }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.inner.store
    }

    pub fn client(&self) -> &Arc<dyn SeriesClient> {
        &self.inner.client
    }

    pub fn cache(&self) -> &Arc<ScenarioSeriesCache> {
        &self.inner.cache
    }

    pub fn options(&self) -> QueryOptions {
        self.inner.options
    }

    /// Filters for the store's current snapshot.
    pub fn current_filters(&self) -> FilterSet {
        self.inner.translator.translate(&self.inner.store.get())
    }

    /// Published state of `variable`, if a request was ever issued for it.
    pub fn state(&self, variable: &str) -> Option<SeriesState> {
        self.inner.state.lock().states.get(variable).cloned()
    }

    /// Issue a request for `variable` from the current snapshot and publish
    /// its result unless a newer request overtook it.
    pub async fn refresh(&self, variable: &str) -> SeriesResult<SeriesUpdate> {
        let ticket = self.inner.issue(variable, &self.inner.store.get());
        self.inner.run(ticket).await
    }

    /// Refresh several variables concurrently.
    pub async fn refresh_all(&self, variables: &[&str]) -> Vec<SeriesResult<SeriesUpdate>> {
        join_all(variables.iter().map(|variable| self.refresh(variable))).await
    }

    /// Series for the current snapshot, without touching published state.
    pub async fn fetch_current(&self, variable: &str) -> SeriesResult<Arc<NormalizedSeries>> {
        let filters = self.current_filters();
        let key = CacheKey::new(variable, &filters, self.inner.options.window);
        self.inner.compute(variable, &filters, key).await
    }

    /// Refresh and return the freshest series for `variable`.
    pub async fn series(&self, variable: &str) -> SeriesResult<Arc<NormalizedSeries>> {
        match self.refresh(variable).await? {
            SeriesUpdate::Published(series) => Ok(series),
            SeriesUpdate::Superseded => self.fetch_current(variable).await,
        }
    }

    /// Future-vs-now comparison of the freshest series. A baseline outside
    /// the series yields `now = 0`.
    pub async fn comparison(
        &self,
        variable: &str,
        baseline_year: i32,
    ) -> SeriesResult<ComparisonResult> {
        let series = self.series(variable).await?;
        Ok(compare_series(&series, baseline_year))
    }

    /// Like [`SeriesPipeline::comparison`] but an out-of-range baseline is an error.
    pub async fn comparison_strict(
        &self,
        variable: &str,
        baseline_year: i32,
    ) -> SeriesResult<ComparisonResult> {
        let series = self.series(variable).await?;
        compare_series_strict(&series, baseline_year)
    }

    pub async fn statistics(
        &self,
        variable: &str,
        window: Option<TimeWindow>,
    ) -> SeriesResult<SeriesStatistics> {
        let series = self.series(variable).await?;
        summarize(&series, window)
    }

    /// Refresh `variables` after every store update.
    ///
    /// Requests are issued synchronously inside the store notification, in
    /// update order; their fetches run on the tokio runtime current at the
    /// time of this call. Without a runtime, notifications are ignored.
    pub fn watch<I, S>(&self, variables: I) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        let weak: Weak<PipelineInner> = Arc::downgrade(&self.inner);
        let runtime = tokio::runtime::Handle::try_current().ok();
        if runtime.is_none() {
            warn!("watch called outside a tokio runtime; updates will not refresh series");
        }

        self.inner.store.subscribe(move |snapshot: &ParameterSnapshot| {
            let (Some(inner), Some(runtime)) = (weak.upgrade(), runtime.as_ref()) else {
                return;
            };
            for variable in &variables {
                let ticket = inner.issue(variable, snapshot);
                let inner = Arc::clone(&inner);
                runtime.spawn(async move {
                    let variable = ticket.variable.clone();
                    if let Err(e) = inner.run(ticket).await {
                        debug!("watched refresh of {} failed: {}", variable, e);
                    }
                });
            }
        })
    }

    /// Stop a [`SeriesPipeline::watch`] subscription.
    pub fn unwatch(&self, id: SubscriptionId) -> bool {
        self.inner.store.unsubscribe(id)
    }
}

impl PipelineInner {
    /// Tag a new request as current for its variable and publish `Loading`.
    fn issue(&self, variable: &str, snapshot: &ParameterSnapshot) -> Ticket {
        let filters = self.translator.translate(snapshot);
        let key = CacheKey::new(variable, &filters, self.options.window);

        let mut state = self.state.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        state.current.insert(variable.to_string(), generation);
        state
            .states
            .insert(variable.to_string(), SeriesState::Loading);
        drop(state);

        debug!(
            "issued {} #{} [{}] (revision {})",
            variable,
            generation,
            key.filters,
            snapshot.revision()
        );
        Ticket {
            variable: variable.to_string(),
            generation,
            filters,
            key,
        }
    }

    async fn run(&self, ticket: Ticket) -> SeriesResult<SeriesUpdate> {
        let result = self
            .compute(&ticket.variable, &ticket.filters, ticket.key.clone())
            .await;

        let mut state = self.state.lock();
        if state.current.get(&ticket.variable) != Some(&ticket.generation) {
            drop(state);
            warn!(
                "discarding stale response for {} #{} [{}]",
                ticket.variable, ticket.generation, ticket.key.filters
            );
            return Ok(SeriesUpdate::Superseded);
        }

        match result {
            Ok(series) => {
                state
                    .states
                    .insert(ticket.variable, SeriesState::Ready(Arc::clone(&series)));
                Ok(SeriesUpdate::Published(series))
            }
            Err(e) => {
                state
                    .states
                    .insert(ticket.variable, SeriesState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    async fn compute(
        &self,
        variable: &str,
        filters: &FilterSet,
        key: CacheKey,
    ) -> SeriesResult<Arc<NormalizedSeries>> {
        let client = Arc::clone(&self.client);
        let options = self.options;

        self.cache
            .get_or_compute(key, || async move {
                let response = client.fetch_series(variable, filters, options).await?;
                debug!("received {} for [{}]", variable, filters.canonical());
                let resolution = resolve_response(filters, &response)?;
                aggregate(variable, &response, &resolution)
            })
            .await
            .map_err(|e| {
                if e.context().filters.is_none() {
                    e.with_filters(filters.canonical())
                } else {
                    e
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalCatalog;
    use crate::models::{RawSeriesPoint, ScenarioMode};
    use crate::params::ParameterKey;

    const VARIABLE: &str = "YRB available surface water";

    fn catalog() -> LocalCatalog {
        let catalog = LocalCatalog::new();
        for (i, climate) in [1.0, 2.0, 2.0].iter().enumerate() {
            let id = format!("sc_{}", i);
            catalog.add_scenario(
                id.as_str(),
                [
                    ("Climate change scenario switch for water yield", *climate),
                    ("SNWTP", 1.0),
                ],
            );
            catalog.add_series(
                VARIABLE,
                id.as_str(),
                (2020..=2024)
                    .map(|y| RawSeriesPoint::new(y, i as f64 + (y - 2020) as f64))
                    .collect(),
            );
        }
        catalog
    }

    fn pipeline(snapshot: ParameterSnapshot, aggregate: bool) -> SeriesPipeline {
        SeriesPipeline::with_options(
            ParameterStore::new(snapshot),
            Arc::new(catalog()),
            Arc::new(ScenarioSeriesCache::unbounded()),
            QueryOptions {
                window: TimeWindow::default(),
                aggregate,
            },
            FilterTranslator::default(),
        )
    }

    fn snapshot(climate: f64) -> ParameterSnapshot {
        ParameterSnapshot::wildcard()
            .with(ParameterKey::ClimateScenario, climate)
            .with(ParameterKey::WaterTransfer, true)
    }

    #[tokio::test]
    async fn test_refresh_publishes_single_series() {
        let pipeline = pipeline(snapshot(1.0), true);
        assert!(pipeline.state(VARIABLE).is_none());

        let update = pipeline.refresh(VARIABLE).await.unwrap();
        let SeriesUpdate::Published(series) = update else {
            panic!("expected a published series");
        };
        assert_eq!(series.mode, ScenarioMode::Single);
        assert_eq!(series.value.as_ref().unwrap()[0], 0.0);
        assert_eq!(pipeline.state(VARIABLE), Some(SeriesState::Ready(series)));
    }

    #[tokio::test]
    async fn test_refresh_multi_raw_has_no_band() {
        let pipeline = pipeline(snapshot(2.0), false);
        let series = pipeline.series(VARIABLE).await.unwrap();

        assert!(series.is_multi());
        assert_eq!(series.n_scenarios, 2);
        assert_eq!(series.mean.as_ref().unwrap()[0], 1.5);
        assert!(series.p_low.is_none());
    }

    #[tokio::test]
    async fn test_no_match_is_published_as_failure() {
        let pipeline = pipeline(snapshot(3.0), true);
        let err = pipeline.refresh(VARIABLE).await.unwrap_err();

        assert_eq!(err.code(), "NO_MATCH");
        assert!(err.context().filters.as_deref().unwrap().contains("SNWTP=1"));
        assert!(matches!(pipeline.state(VARIABLE), Some(SeriesState::Failed(_))));
    }

    #[tokio::test]
    async fn test_unchanged_filters_hit_cache() {
        let pipeline = pipeline(snapshot(2.0), true);
        pipeline.refresh(VARIABLE).await.unwrap();
        // Re-pinning the toggle to its current value leaves the filters as they were.
        pipeline.store().update(ParameterKey::WaterTransfer, true);
        pipeline.refresh(VARIABLE).await.unwrap();

        let stats = pipeline.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_comparison_and_statistics() {
        let pipeline = pipeline(snapshot(1.0), true);

        let comparison = pipeline.comparison(VARIABLE, 2020).await.unwrap();
        assert_eq!(comparison.now, 0.0);
        assert_eq!(comparison.future, 3.0);
        assert_eq!(comparison.diff_percent, 0.0);

        let stats = pipeline.statistics(VARIABLE, None).await.unwrap();
        assert_eq!(stats.peak.year, 2024);
        assert_eq!(stats.trend, 1.0);

        let err = pipeline.comparison_strict(VARIABLE, 2019).await.unwrap_err();
        assert_eq!(err.code(), "BASELINE_OUT_OF_RANGE");
    }

    #[tokio::test]
    async fn test_refresh_all_runs_each_variable() {
        let pipeline = pipeline(snapshot(1.0), true);
        let results = pipeline.refresh_all(&[VARIABLE, "YRB typo"]).await;

        assert!(matches!(results[0], Ok(SeriesUpdate::Published(_))));
        assert_eq!(results[1].as_ref().unwrap_err().code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_watch_refreshes_on_update() {
        let pipeline = pipeline(snapshot(1.0), true);
        let id = pipeline.watch([VARIABLE]);

        pipeline.store().update(ParameterKey::ClimateScenario, 2.0);

        let mut ready = None;
        for _ in 0..100 {
            if let Some(SeriesState::Ready(series)) = pipeline.state(VARIABLE) {
                ready = Some(series);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let series = ready.expect("watched variable was not refreshed");
        assert!(series.is_multi());

        assert!(pipeline.unwatch(id));
    }
}
