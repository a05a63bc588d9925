//! Adjustable scenario parameters.
//!
//! A [`ParameterValue`] is either pinned to one value, restricted to a set of
//! values, or left open (`Any`). `Any` is the wildcard: the parameter does
//! not restrict which scenarios qualify.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The seven parameters exposed by the dashboard controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    ClimateScenario,
    Fertility,
    DietPattern,
    EcologicalFlow,
    IrrigationEfficiency,
    PowerGenerationShare,
    /// South-North Water Transfer Project toggle.
    WaterTransfer,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 7] = [
        ParameterKey::ClimateScenario,
        ParameterKey::Fertility,
        ParameterKey::DietPattern,
        ParameterKey::EcologicalFlow,
        ParameterKey::IrrigationEfficiency,
        ParameterKey::PowerGenerationShare,
        ParameterKey::WaterTransfer,
    ];

    /// Filter key spelled exactly as the remote scenario catalog spells it.
    pub fn backend_key(self) -> &'static str {
        match self {
            ParameterKey::ClimateScenario => "Climate change scenario switch for water yield",
            ParameterKey::Fertility => "Fertility Variation",
            ParameterKey::DietPattern => "Diet change scenario switch",
            ParameterKey::EcologicalFlow => "Ecological water flow variable",
            ParameterKey::IrrigationEfficiency => "water saving irrigation efficiency ratio",
            ParameterKey::PowerGenerationShare => "fire generation share province target",
            ParameterKey::WaterTransfer => "SNWTP",
        }
    }

    /// Wire name used by the HTTP API and configuration files.
    pub fn name(self) -> &'static str {
        match self {
            ParameterKey::ClimateScenario => "climate_scenario",
            ParameterKey::Fertility => "fertility",
            ParameterKey::DietPattern => "diet_pattern",
            ParameterKey::EcologicalFlow => "ecological_flow",
            ParameterKey::IrrigationEfficiency => "irrigation_efficiency",
            ParameterKey::PowerGenerationShare => "power_generation_share",
            ParameterKey::WaterTransfer => "water_transfer",
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterKey {
    type Err = String;

    /// Parse a parameter from its wire name or its backend filter key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterKey::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s || key.backend_key() == s)
            .ok_or_else(|| format!("Unknown parameter: {}", s))
    }
}

/// Current setting of one parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterValue {
    /// Unconstrained: matches every scenario on this axis.
    #[default]
    Any,
    Fixed(f64),
    /// Matches any of the listed values.
    OneOf(Vec<f64>),
}

impl ParameterValue {
    pub fn is_any(&self) -> bool {
        matches!(self, ParameterValue::Any)
    }

    /// Whether every contained number is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            ParameterValue::Any => true,
            ParameterValue::Fixed(v) => v.is_finite(),
            ParameterValue::OneOf(values) => values.iter().all(|v| v.is_finite()),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Fixed(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Fixed(if value { 1.0 } else { 0.0 })
    }
}

impl From<Option<f64>> for ParameterValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(ParameterValue::Any, ParameterValue::Fixed)
    }
}

// JSON: null | number | [numbers]. TOML has no null, so "any" is accepted
// as the wildcard spelling and booleans map to 1/0.
impl Serialize for ParameterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParameterValue::Any => serializer.serialize_none(),
            ParameterValue::Fixed(v) => serializer.serialize_f64(*v),
            ParameterValue::OneOf(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for v in values {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ParameterValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ParameterValueVisitor)
    }
}

struct ParameterValueVisitor;

impl<'de> Visitor<'de> for ParameterValueVisitor {
    type Value = ParameterValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("null, \"any\", a number, a boolean or a list of numbers")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ParameterValue::Any)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ParameterValue::Any)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(ParameterValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ParameterValue::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ParameterValue::Fixed(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ParameterValue::Fixed(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ParameterValue::Fixed(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        match v.trim().to_lowercase().as_str() {
            "any" | "*" => Ok(ParameterValue::Any),
            other => other
                .parse::<f64>()
                .map(ParameterValue::Fixed)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::new();
        while let Some(v) = seq.next_element::<f64>()? {
            values.push(v);
        }
        Ok(ParameterValue::OneOf(values))
    }
}

/// Full set of parameter values at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSnapshot {
    revision: u64,
    values: BTreeMap<ParameterKey, ParameterValue>,
}

impl ParameterSnapshot {
    /// Build a snapshot; keys not supplied are `Any`.
    pub fn new(values: impl IntoIterator<Item = (ParameterKey, ParameterValue)>) -> Self {
        let mut snapshot = Self::wildcard();
        for (key, value) in values {
            snapshot.values.insert(key, value);
        }
        snapshot
    }

    /// Every parameter unconstrained.
    pub fn wildcard() -> Self {
        Self {
            revision: 0,
            values: ParameterKey::ALL
                .iter()
                .map(|key| (*key, ParameterValue::Any))
                .collect(),
        }
    }

    /// Start-up selection of the dashboard controls.
    pub fn defaults() -> Self {
        Self::new([
            (ParameterKey::ClimateScenario, ParameterValue::Fixed(1.0)),
            (ParameterKey::Fertility, ParameterValue::Fixed(1.7)),
            (ParameterKey::DietPattern, ParameterValue::Fixed(2.0)),
            (ParameterKey::EcologicalFlow, ParameterValue::Fixed(0.25)),
            (ParameterKey::IrrigationEfficiency, ParameterValue::Fixed(0.9)),
            (ParameterKey::PowerGenerationShare, ParameterValue::Fixed(0.25)),
            (ParameterKey::WaterTransfer, ParameterValue::from(false)),
        ])
    }

    /// Builder-style override of one value.
    pub fn with(mut self, key: ParameterKey, value: impl Into<ParameterValue>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: ParameterKey) -> &ParameterValue {
        // Every key is inserted on construction.
        self.values.get(&key).unwrap_or(&ParameterValue::Any)
    }

    /// Monotonic counter bumped on every store update.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, &ParameterValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub(crate) fn apply(&mut self, key: ParameterKey, value: ParameterValue) {
        self.values.insert(key, value);
        self.revision += 1;
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self::defaults()
    }
}
