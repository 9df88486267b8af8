//! Tipos de valor de cada kind de métrica y su regla de merge.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Valor agregable: `identity` es el neutro de `combine`.
pub trait MetricAggregate: Clone {
    fn identity() -> Self;
    fn combine(&mut self, other: &Self);
}

/// Counter: suma saturada en los límites de `i64`.
impl MetricAggregate for i64 {
    fn identity() -> Self {
        0
    }

    fn combine(&mut self, other: &Self) {
        *self = self.saturating_add(*other);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionData {
    pub sum: i64,
    pub count: i64,
    pub min: i64,
    pub max: i64,
}

impl DistributionData {
    pub fn singleton(value: i64) -> Self {
        Self { sum: value,
               count: 1,
               min: value,
               max: value }
    }

    pub fn update(&mut self, value: i64) {
        self.combine(&Self::singleton(value));
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

impl MetricAggregate for DistributionData {
    fn identity() -> Self {
        Self { sum: 0,
               count: 0,
               min: 0,
               max: 0 }
    }

    fn combine(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        self.sum = self.sum.saturating_add(other.sum);
        self.count = self.count.saturating_add(other.count);
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Gauge: gana el valor más reciente (a igual timestamp, el entrante).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeData {
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl GaugeData {
    pub fn new(value: i64) -> Self {
        Self { value,
               timestamp: Utc::now() }
    }
}

impl MetricAggregate for GaugeData {
    fn identity() -> Self {
        Self { value: 0,
               timestamp: DateTime::<Utc>::MIN_UTC }
    }

    fn combine(&mut self, other: &Self) {
        if other.timestamp >= self.timestamp {
            *self = other.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringSetData(pub BTreeSet<String>);

impl StringSetData {
    pub fn add(&mut self, value: impl Into<String>) {
        self.0.insert(value.into());
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl MetricAggregate for StringSetData {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }
}
