use std::collections::BTreeSet;

use super::MetricKey;

/// Filtro de consulta. Un conjunto vacío no filtra.
///
/// Los steps se comparan por segmentos completos de path: `"Do"` matchea
/// `"Outer/Do"` y `"Do/Inner"`, pero no `"Undo"`.
#[derive(Debug, Clone, Default)]
pub struct MetricsFilter {
    steps: BTreeSet<String>,
    namespaces: BTreeSet<String>,
    names: BTreeSet<String>,
}

fn matches_sub_path(actual: &str, filter: &str) -> bool {
    let haystack: Vec<&str> = actual.split('/').collect();
    let needle: Vec<&str> = filter.split('/').collect();
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

impl MetricsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.insert(step.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.insert(namespace.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    pub fn matches(&self, key: &MetricKey) -> bool {
        if !self.names.is_empty() && !self.names.contains(&key.metric.name) {
            return false;
        }
        if !self.namespaces.is_empty() && !self.namespaces.contains(&key.metric.namespace) {
            return false;
        }
        self.steps.is_empty() || self.steps.iter().any(|step| matches_sub_path(&key.step, step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricName;

    fn key(step: &str, namespace: &str, name: &str) -> MetricKey {
        MetricKey::new(step, MetricName::new(namespace, name))
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(MetricsFilter::new().matches(&key("Do", "ns", "elements")));
    }

    #[test]
    fn steps_match_whole_segments() {
        let filter = MetricsFilter::new().with_step("Do");
        assert!(filter.matches(&key("Do", "ns", "x")));
        assert!(filter.matches(&key("Outer/Do", "ns", "x")));
        assert!(filter.matches(&key("Do/Inner", "ns", "x")));
        assert!(!filter.matches(&key("Undo", "ns", "x")));
        let nested = MetricsFilter::new().with_step("Outer/Do");
        assert!(nested.matches(&key("Top/Outer/Do", "ns", "x")));
        assert!(!nested.matches(&key("Outer/Other/Do", "ns", "x")));
    }

    #[test]
    fn namespace_and_name_narrow_results() {
        let filter = MetricsFilter::new().with_namespace("ns").with_name("elements");
        assert!(filter.matches(&key("Do", "ns", "elements")));
        assert!(!filter.matches(&key("Do", "other", "elements")));
        assert!(!filter.matches(&key("Do", "ns", "bundles")));
    }
}
