use std::fmt;

use serde::{Deserialize, Serialize};

/// Nombre de una métrica dentro de su namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricName {
    pub namespace: String,
    pub name: String,
}

impl MetricName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(),
               name: name.into() }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Identidad completa de una celda: step que la reporta + nombre.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey {
    pub step: String,
    pub metric: MetricName,
}

impl MetricKey {
    pub fn new(step: impl Into<String>, metric: MetricName) -> Self {
        Self { step: step.into(),
               metric }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.step, self.metric)
    }
}
