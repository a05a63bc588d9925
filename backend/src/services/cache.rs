//! Memoization of normalized series per (variable, filters, window).
//!
//! Only successful computations are stored. The lock is never held while a
//! computation is awaited, so two concurrent misses for the same key may
//! both compute; writes for one key are idempotent, the second simply
//! overwrites the first with an equal value.

use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::client::SeriesResult;
use crate::models::{NormalizedSeries, TimeWindow};
use crate::params::FilterSet;

/// Identity of one cached series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub variable: String,
    /// Canonical filter string, see [`FilterSet::canonical`].
    pub filters: String,
    pub window: TimeWindow,
}

impl CacheKey {
    pub fn new(variable: impl Into<String>, filters: &FilterSet, window: TimeWindow) -> Self {
        Self {
            variable: variable.into(),
            filters: filters.canonical(),
            window,
        }
    }
}

/// Counters exposed by [`ScenarioSeriesCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// `None` when unbounded.
    pub capacity: Option<usize>,
}

struct Entry {
    series: Arc<NormalizedSeries>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn touch(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Series cache with optional least-recently-used eviction.
pub struct ScenarioSeriesCache {
    capacity: Option<usize>,
    state: Mutex<CacheState>,
}

impl ScenarioSeriesCache {
    /// Cache that never evicts.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Cache holding at most `capacity` entries when set.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|c| c.max(1)),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Cached value for `key`, marking it as recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<NormalizedSeries>> {
        let mut state = self.state.lock();
        let tick = state.touch();
        let found = state.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.series)
        });
        match found {
            Some(_) => state.hits += 1,
            None => state.misses += 1,
        }
        found
    }

    /// Store a value, evicting the least recently used entry when full.
    pub fn insert(&self, key: CacheKey, series: Arc<NormalizedSeries>) {
        let mut state = self.state.lock();
        let tick = state.touch();

        if let Some(capacity) = self.capacity {
            if !state.entries.contains_key(&key) && state.entries.len() >= capacity {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!("evicting cached series {} [{}]", oldest.variable, oldest.filters);
                    state.entries.remove(&oldest);
                    state.evictions += 1;
                }
            }
        }

        state.entries.insert(
            key,
            Entry {
                series,
                last_used: tick,
            },
        );
    }

    /// Return the cached series for `key` or run `compute` and store its
    /// success.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> SeriesResult<Arc<NormalizedSeries>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SeriesResult<NormalizedSeries>>,
    {
        if let Some(series) = self.get(&key) {
            debug!("cache hit for {} [{}] {}", key.variable, key.filters, key.window);
            return Ok(series);
        }
        debug!("cache miss for {} [{}] {}", key.variable, key.filters, key.window);

        let series = Arc::new(compute().await?);
        self.insert(key, Arc::clone(&series));
        Ok(series)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Drop one entry. Returns `true` if it was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            capacity: self.capacity,
        }
    }
}

impl Default for ScenarioSeriesCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
