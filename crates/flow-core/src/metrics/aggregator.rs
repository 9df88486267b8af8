use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use serde::Serialize;

use super::{BoundedTrieData, DistributionData, GaugeData, MetricAggregate, MetricKey, MetricUpdates, MetricsFilter,
            StringSetData};
use crate::errors::PipelineError;

/// Snapshot inmutable de una celda.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult<T> {
    pub key: MetricKey,
    pub committed: T,
    pub attempted: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricQueryResults {
    pub counters: Vec<MetricResult<i64>>,
    pub distributions: Vec<MetricResult<DistributionData>>,
    pub gauges: Vec<MetricResult<GaugeData>>,
    pub string_sets: Vec<MetricResult<StringSetData>>,
    pub bounded_tries: Vec<MetricResult<BoundedTrieData>>,
}

impl MetricQueryResults {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
        && self.distributions.is_empty()
        && self.gauges.is_empty()
        && self.string_sets.is_empty()
        && self.bounded_tries.is_empty()
    }
}

/// Agregados de métricas de un run.
///
/// `attempted` recibe los deltas de todo intento; `committed` sólo los de
/// intentos cuyo bundle hizo commit.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    committed: Mutex<MetricUpdates>,
    attempted: Mutex<MetricUpdates>,
}

fn lock<'a>(cell: &'a Mutex<MetricUpdates>, which: &str) -> Result<MutexGuard<'a, MetricUpdates>, PipelineError> {
    cell.lock().map_err(|_| PipelineError::Protocol(format!("{which} metrics lock poisoned")))
}

fn collect<T: MetricAggregate>(filter: &MetricsFilter,
                               committed: &IndexMap<MetricKey, T>,
                               attempted: &IndexMap<MetricKey, T>)
                               -> Vec<MetricResult<T>> {
    attempted.iter()
             .filter(|(key, _)| filter.matches(key))
             .map(|(key, value)| MetricResult { key: key.clone(),
                                                committed: committed.get(key).cloned().unwrap_or_else(T::identity),
                                                attempted: value.clone() })
             .collect()
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_attempted(&self, updates: &MetricUpdates) -> Result<(), PipelineError> {
        lock(&self.attempted, "attempted")?.fold(updates);
        Ok(())
    }

    pub fn commit(&self, updates: &MetricUpdates) -> Result<(), PipelineError> {
        lock(&self.committed, "committed")?.fold(updates);
        Ok(())
    }

    pub fn query(&self, filter: &MetricsFilter) -> Result<MetricQueryResults, PipelineError> {
        let committed = lock(&self.committed, "committed")?.clone();
        let attempted = lock(&self.attempted, "attempted")?.clone();
        Ok(MetricQueryResults { counters: collect(filter, &committed.counters, &attempted.counters),
                                distributions: collect(filter, &committed.distributions, &attempted.distributions),
                                gauges: collect(filter, &committed.gauges, &attempted.gauges),
                                string_sets: collect(filter, &committed.string_sets, &attempted.string_sets),
                                bounded_tries: collect(filter, &committed.bounded_tries, &attempted.bounded_tries) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsContainer;

    #[test]
    fn failed_attempts_only_reach_attempted() {
        let agg = MetricsAggregator::new();
        let mut failed = MetricsContainer::new("SendToB", 10);
        failed.counter("ns", "calls").inc();
        let mut ok = MetricsContainer::new("SendToB", 10);
        ok.counter("ns", "calls").inc();

        agg.update_attempted(failed.updates()).unwrap();
        agg.update_attempted(ok.updates()).unwrap();
        agg.commit(ok.updates()).unwrap();

        let results = agg.query(&MetricsFilter::new()).unwrap();
        assert_eq!(results.counters.len(), 1);
        assert_eq!(results.counters[0].attempted, 2);
        assert_eq!(results.counters[0].committed, 1);
    }

    #[test]
    fn never_committed_cells_report_identity() {
        let agg = MetricsAggregator::new();
        let mut failed = MetricsContainer::new("Do", 10);
        failed.distribution("ns", "d").update(9);
        agg.update_attempted(failed.updates()).unwrap();
        let results = agg.query(&MetricsFilter::new().with_step("Do")).unwrap();
        assert_eq!(results.distributions[0].committed.count, 0);
        assert_eq!(results.distributions[0].attempted.max, 9);
        assert!(agg.query(&MetricsFilter::new().with_step("Other")).unwrap().is_empty());
    }

    #[test]
    fn large_counter_deltas_saturate_across_bundles() {
        let agg = MetricsAggregator::new();
        for _ in 0..2 {
            let mut bundle = MetricsContainer::new("Do", 10);
            bundle.counter("ns", "big").inc_by(i64::MAX / 2 + 1);
            agg.update_attempted(bundle.updates()).unwrap();
            agg.commit(bundle.updates()).unwrap();
        }
        let results = agg.query(&MetricsFilter::new()).unwrap();
        assert_eq!((results.counters[0].committed, results.counters[0].attempted), (i64::MAX, i64::MAX));
    }
}
