//! Observable in-memory parameter state.
//!
//! The store is the only place parameter values change. Each `update` call
//! produces exactly one notification carrying the full new snapshot, and
//! notifications of concurrent updates are delivered in update order.

use log::debug;
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::parameter::{ParameterKey, ParameterSnapshot, ParameterValue};

/// Handle returned by [`ParameterStore::subscribe`].
pub type SubscriptionId = u64;

type Callback = Arc<dyn Fn(&ParameterSnapshot) + Send + Sync>;

/// Shared parameter store. Cloning shares the underlying state.
#[derive(Clone)]
pub struct ParameterStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    snapshot: RwLock<ParameterSnapshot>,
    subscribers: RwLock<BTreeMap<SubscriptionId, Callback>>,
    next_subscription: AtomicU64,
    // Serializes update + notify so subscribers see snapshots in order.
    // Reentrant so a callback may itself call `update`.
    notify: ReentrantMutex<()>,
}

impl ParameterStore {
    /// Create a store seeded with the given values.
    pub fn new(initial: ParameterSnapshot) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                snapshot: RwLock::new(initial),
                subscribers: RwLock::new(BTreeMap::new()),
                next_subscription: AtomicU64::new(1),
                notify: ReentrantMutex::new(()),
            }),
        }
    }

    /// Create a store seeded with the dashboard defaults.
    pub fn with_defaults() -> Self {
        Self::new(ParameterSnapshot::defaults())
    }

    /// Current values of every parameter.
    pub fn get(&self) -> ParameterSnapshot {
        self.inner.snapshot.read().clone()
    }

    /// Replace one parameter value and notify every subscriber.
    pub fn update(&self, key: ParameterKey, value: impl Into<ParameterValue>) -> ParameterSnapshot {
        let value = value.into();
        let _ordered = self.inner.notify.lock();

        let snapshot = {
            let mut current = self.inner.snapshot.write();
            current.apply(key, value);
            current.clone()
        };
        debug!(
            "parameter {} set to {:?} (revision {})",
            key,
            snapshot.get(key),
            snapshot.revision()
        );

        let callbacks: Vec<Callback> = self.inner.subscribers.read().values().cloned().collect();
        for callback in callbacks {
            callback(&snapshot);
        }

        snapshot
    }

    /// Register a callback invoked synchronously after every update.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ParameterSnapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().insert(id, Arc::new(callback));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.write().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}
