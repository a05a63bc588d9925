//! Translation of dashboard parameters into backend query filters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::parameter::{ParameterKey, ParameterSnapshot, ParameterValue};

/// Constraint on one backend filter key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(f64),
    OneOf(Vec<f64>),
}

impl FilterValue {
    /// Whether a scenario's stored value satisfies this constraint.
    pub fn matches(&self, value: f64) -> bool {
        match self {
            FilterValue::Scalar(expected) => *expected == value,
            FilterValue::OneOf(allowed) => allowed.contains(&value),
        }
    }

    fn render(&self) -> String {
        match self {
            FilterValue::Scalar(v) => v.to_string(),
            FilterValue::OneOf(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("[{}]", items.join(","))
            }
        }
    }
}

/// Backend-facing query constraints. Keys are kept sorted, so equality and
/// [`FilterSet::canonical`] do not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, FilterValue>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    /// Order-independent string form, e.g. `Fertility Variation=1.6;SNWTP=1`.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{}={}", key, value.render()))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Whether a stored scenario assignment satisfies every constraint.
    /// A scenario missing one of the filtered keys does not match.
    pub fn matches(&self, assignment: &BTreeMap<String, f64>) -> bool {
        self.0.iter().all(|(key, constraint)| {
            assignment
                .get(key)
                .is_some_and(|value| constraint.matches(*value))
        })
    }
}

impl FromIterator<(String, FilterValue)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        FilterSet(iter.into_iter().collect())
    }
}

/// Maps a [`ParameterSnapshot`] to a [`FilterSet`] through the fixed
/// parameter → backend key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterTranslator {
    /// Toggle state used when the water-transfer parameter is left open.
    pub water_transfer_default: bool,
}

impl FilterTranslator {
    pub fn new(water_transfer_default: bool) -> Self {
        Self {
            water_transfer_default,
        }
    }

    /// Build the filter set for a snapshot.
    ///
    /// `Any` drops the key. The water-transfer toggle is always emitted as
    /// `1` or `0`: its two states are distinct stored scenario variants.
    pub fn translate(&self, snapshot: &ParameterSnapshot) -> FilterSet {
        let mut filters = FilterSet::new();

        for (key, value) in snapshot.iter() {
            if key == ParameterKey::WaterTransfer {
                continue;
            }
            match value {
                ParameterValue::Any => {}
                ParameterValue::Fixed(v) => {
                    filters.insert(key.backend_key(), FilterValue::Scalar(*v));
                }
                ParameterValue::OneOf(values) => {
                    let mut values = values.clone();
                    values.sort_by(|a, b| a.total_cmp(b));
                    values.dedup();
                    if !values.is_empty() {
                        filters.insert(key.backend_key(), FilterValue::OneOf(values));
                    }
                }
            }
        }

        let enabled = match snapshot.get(ParameterKey::WaterTransfer) {
            ParameterValue::Fixed(v) => *v != 0.0,
            ParameterValue::Any | ParameterValue::OneOf(_) => self.water_transfer_default,
        };
        filters.insert(
            ParameterKey::WaterTransfer.backend_key(),
            FilterValue::Scalar(if enabled { 1.0 } else { 0.0 }),
        );

        filters
    }
}

/// Translate with the default toggle state (disabled).
pub fn translate(snapshot: &ParameterSnapshot) -> FilterSet {
    FilterTranslator::default().translate(snapshot)
}
