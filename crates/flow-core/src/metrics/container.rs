use indexmap::IndexMap;

use super::{BoundedTrieData, DistributionData, GaugeData, MetricAggregate, MetricKey, MetricName, StringSetData};

/// Deltas de métricas de un intento, por kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricUpdates {
    pub counters: IndexMap<MetricKey, i64>,
    pub distributions: IndexMap<MetricKey, DistributionData>,
    pub gauges: IndexMap<MetricKey, GaugeData>,
    pub string_sets: IndexMap<MetricKey, StringSetData>,
    pub bounded_tries: IndexMap<MetricKey, BoundedTrieData>,
}

fn fold_cells<T: MetricAggregate>(target: &mut IndexMap<MetricKey, T>, source: &IndexMap<MetricKey, T>) {
    for (key, value) in source {
        target.entry(key.clone()).or_insert_with(T::identity).combine(value);
    }
}

impl MetricUpdates {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
        && self.distributions.is_empty()
        && self.gauges.is_empty()
        && self.string_sets.is_empty()
        && self.bounded_tries.is_empty()
    }

    /// Combina `other` celda a celda con la regla de merge de cada kind.
    pub fn fold(&mut self, other: &MetricUpdates) {
        fold_cells(&mut self.counters, &other.counters);
        fold_cells(&mut self.distributions, &other.distributions);
        fold_cells(&mut self.gauges, &other.gauges);
        fold_cells(&mut self.string_sets, &other.string_sets);
        fold_cells(&mut self.bounded_tries, &other.bounded_tries);
    }
}

/// Celdas de métricas de un intento de bundle, ligadas a un step.
#[derive(Debug)]
pub struct MetricsContainer {
    step: String,
    trie_bound: usize,
    updates: MetricUpdates,
}

impl MetricsContainer {
    pub fn new(step: impl Into<String>, trie_bound: usize) -> Self {
        Self { step: step.into(),
               trie_bound,
               updates: MetricUpdates::default() }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    fn key(&self, namespace: &str, name: &str) -> MetricKey {
        MetricKey::new(self.step.clone(), MetricName::new(namespace, name))
    }

    pub fn counter(&mut self, namespace: &str, name: &str) -> Counter<'_> {
        let key = self.key(namespace, name);
        Counter { value: self.updates.counters.entry(key).or_insert(0) }
    }

    pub fn distribution(&mut self, namespace: &str, name: &str) -> Distribution<'_> {
        let key = self.key(namespace, name);
        Distribution { data: self.updates.distributions.entry(key).or_insert_with(DistributionData::identity) }
    }

    pub fn gauge(&mut self, namespace: &str, name: &str) -> Gauge<'_> {
        let key = self.key(namespace, name);
        Gauge { key,
                cells: &mut self.updates.gauges }
    }

    pub fn string_set(&mut self, namespace: &str, name: &str) -> StringSet<'_> {
        let key = self.key(namespace, name);
        StringSet { data: self.updates.string_sets.entry(key).or_default() }
    }

    pub fn bounded_trie(&mut self, namespace: &str, name: &str) -> BoundedTrie<'_> {
        let key = self.key(namespace, name);
        let bound = self.trie_bound;
        BoundedTrie { data: self.updates.bounded_tries.entry(key).or_insert_with(|| BoundedTrieData::new(bound)) }
    }

    pub fn updates(&self) -> &MetricUpdates {
        &self.updates
    }

    pub fn into_updates(self) -> MetricUpdates {
        self.updates
    }
}

pub struct Counter<'a> {
    value: &'a mut i64,
}

impl Counter<'_> {
    pub fn inc(&mut self) {
        self.inc_by(1);
    }

    pub fn inc_by(&mut self, delta: i64) {
        self.value.combine(&delta);
    }
}

pub struct Distribution<'a> {
    data: &'a mut DistributionData,
}

impl Distribution<'_> {
    pub fn update(&mut self, value: i64) {
        self.data.update(value);
    }
}

/// Dentro de un intento gana el último `set`. La celda sólo existe tras el
/// primer `set`.
pub struct Gauge<'a> {
    key: MetricKey,
    cells: &'a mut IndexMap<MetricKey, GaugeData>,
}

impl Gauge<'_> {
    pub fn set(&mut self, value: i64) {
        self.cells.insert(self.key.clone(), GaugeData::new(value));
    }
}

pub struct StringSet<'a> {
    data: &'a mut StringSetData,
}

impl StringSet<'_> {
    pub fn add(&mut self, value: impl Into<String>) {
        self.data.add(value);
    }
}

pub struct BoundedTrie<'a> {
    data: &'a mut BoundedTrieData,
}

impl BoundedTrie<'_> {
    pub fn add<I, S>(&mut self, segments: I)
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.data.add(segments);
    }
}
