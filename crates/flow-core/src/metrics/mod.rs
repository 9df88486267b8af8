//! Métricas por step con separación committed / attempted.
//!
//! Cada intento de bundle escribe en un `MetricsContainer` propio. Al
//! terminar el intento sus deltas se pliegan en el `MetricsAggregator`:
//! siempre en `attempted`, y en `committed` sólo si el bundle hizo commit.

mod aggregator;
mod bounded_trie;
mod cells;
mod container;
mod filter;
mod name;

pub use aggregator::{MetricQueryResults, MetricResult, MetricsAggregator};
pub use bounded_trie::{BoundedTrieData, BoundedTrieNode, TriePath};
pub use cells::{DistributionData, GaugeData, MetricAggregate, StringSetData};
pub use container::{BoundedTrie, Counter, Distribution, Gauge, MetricUpdates, MetricsContainer, StringSet};
pub use filter::MetricsFilter;
pub use name::{MetricKey, MetricName};
