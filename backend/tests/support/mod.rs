#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use yrb_scenarios::client::{LocalCatalog, SeriesClient};
use yrb_scenarios::models::{RawSeriesPoint, TimeWindow};
use yrb_scenarios::params::{ParameterSnapshot, ParameterStore};
use yrb_scenarios::services::{ScenarioSeriesCache, SeriesPipeline};

pub const SURFACE_WATER: &str = "YRB available surface water";

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Variables are restored on unwind, and access is serialized because the
/// process environment is shared by parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock();
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

fn assignment(climate: f64, fertility: f64, snwtp: f64) -> Vec<(&'static str, f64)> {
    vec![
        ("Climate change scenario switch for water yield", climate),
        ("Fertility Variation", fertility),
        ("Diet change scenario switch", 1.0),
        ("Ecological water flow variable", 0.25),
        ("water saving irrigation efficiency ratio", 0.8),
        ("fire generation share province target", 0.1),
        ("SNWTP", snwtp),
    ]
}

/// Four scenarios over 2020-2022:
///
/// | id | climate | fertility | SNWTP | surface water |
/// |----|---------|-----------|-------|---------------|
/// | s1 | 2       | 1.6       | 1     | 10, 12, 14    |
/// | s2 | 2       | 1.7       | 1     | 20, 22, 24    |
/// | s3 | 2       | 1.8       | 1     | 30, 32, 34    |
/// | s4 | 1       | 1.6       | 0     | 5, 5, 5       |
pub fn reference_catalog() -> LocalCatalog {
    let catalog = LocalCatalog::new();
    let rows = [
        ("s1", assignment(2.0, 1.6, 1.0), [10.0, 12.0, 14.0]),
        ("s2", assignment(2.0, 1.7, 1.0), [20.0, 22.0, 24.0]),
        ("s3", assignment(2.0, 1.8, 1.0), [30.0, 32.0, 34.0]),
        ("s4", assignment(1.0, 1.6, 0.0), [5.0, 5.0, 5.0]),
    ];
    for (id, parameters, values) in rows {
        catalog.add_scenario(id, parameters);
        let points = (2020..)
            .zip(values)
            .map(|(year, value)| RawSeriesPoint::new(year, value))
            .collect();
        catalog.add_series(SURFACE_WATER, id, points);
    }
    catalog
}

pub fn window() -> TimeWindow {
    TimeWindow {
        start_year: 2020,
        end_year: 2022,
    }
}

/// Pipeline over `client` starting from `snapshot`, with an unbounded cache.
pub fn pipeline(client: Arc<dyn SeriesClient>, snapshot: ParameterSnapshot) -> SeriesPipeline {
    SeriesPipeline::new(
        ParameterStore::new(snapshot),
        client,
        Arc::new(ScenarioSeriesCache::unbounded()),
        window(),
    )
}
