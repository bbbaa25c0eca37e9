use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

pub const TOTAL_TOKENS: &str = "total_tokens";
pub const PROMPT_TOKENS: &str = "prompt_tokens";
pub const COMPLETION_TOKENS: &str = "completion_tokens";
pub const SUCCESSFUL_REQUESTS: &str = "successful_requests";
pub const TOTAL_COST: &str = "total_cost";
/// Reserved metric that is never summed during aggregation.
pub const TIME_TAKEN_IN_SECONDS: &str = "time_taken_in_seconds";

// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Serialize a metric so whole numbers come out as JSON integers.
pub(crate) fn serialize_metric<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let value = *value;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(value as i64)
    } else {
        serializer.serialize_f64(value)
    }
}

struct Metric(f64);

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_metric(&self.0, serializer)
    }
}

/// Named counters for one (provider, model) pair.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MetricStats(BTreeMap<String, f64>);

impl MetricStats {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    /// Value of `metric`, with a missing metric read as 0.
    pub fn value(&self, metric: &str) -> f64 {
        self.get(metric).unwrap_or(0.0)
    }

    pub fn set(&mut self, metric: impl Into<String>, value: f64) {
        self.0.insert(metric.into(), value);
    }

    pub fn add(&mut self, metric: &str, value: f64) {
        *self.0.entry(metric.to_string()).or_insert(0.0) += value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.values().all(|v| *v == 0.0)
    }
}

impl Serialize for MetricStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (metric, value) in &self.0 {
            map.serialize_entry(metric, &Metric(*value))?;
        }
        map.end()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricStats {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// provider -> model -> metric -> value.
///
/// Used both for the running totals of a session and for the per-iteration
/// delta between two of those totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable(BTreeMap<String, BTreeMap<String, MetricStats>>);

impl MetricTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn model(&self, provider: &str, model: &str) -> Option<&MetricStats> {
        self.0.get(provider).and_then(|models| models.get(model))
    }

    pub fn get(&self, provider: &str, model: &str, metric: &str) -> Option<f64> {
        self.model(provider, model).and_then(|stats| stats.get(metric))
    }

    /// Mutable stats for (provider, model), created empty if absent.
    pub fn model_mut(&mut self, provider: &str, model: &str) -> &mut MetricStats {
        self.0
            .entry(provider.to_string())
            .or_default()
            .entry(model.to_string())
            .or_default()
    }

    pub fn insert_model(&mut self, provider: &str, model: &str, stats: MetricStats) {
        self.0
            .entry(provider.to_string())
            .or_default()
            .insert(model.to_string(), stats);
    }

    pub fn add(&mut self, provider: &str, model: &str, metric: &str, value: f64) {
        self.model_mut(provider, model).add(metric, value);
    }

    /// Providers with their models, in sorted order.
    pub fn providers(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, MetricStats>)> {
        self.0.iter().map(|(p, m)| (p.as_str(), m))
    }

    /// Every (provider, model, stats) entry in the table.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &MetricStats)> {
        self.0.iter().flat_map(|(provider, models)| {
            models
                .iter()
                .map(move |(model, stats)| (provider.as_str(), model.as_str(), stats))
        })
    }

    /// Every (provider, model, metric) key in the table.
    pub fn metric_keys(&self) -> Vec<(String, String, String)> {
        self.entries()
            .flat_map(|(provider, model, stats)| {
                stats.keys().map(move |metric| {
                    (provider.to_string(), model.to_string(), metric.to_string())
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_all_zero(&self) -> bool {
        self.entries().all(|(_, _, stats)| stats.is_all_zero())
    }
}

/// Network-wide totals summed across every provider and model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateRecord {
    #[serde(flatten)]
    pub totals: MetricStats,
    pub time_taken_in_seconds: f64,
}

impl AggregateRecord {
    pub fn new(totals: MetricStats, time_taken_in_seconds: f64) -> Self {
        Self {
            totals,
            time_taken_in_seconds,
        }
    }

    pub fn value(&self, metric: &str) -> f64 {
        if metric == TIME_TAKEN_IN_SECONDS {
            return self.time_taken_in_seconds;
        }
        self.totals.value(metric)
    }
}
