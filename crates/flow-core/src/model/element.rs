//! Elementos y keys de estado.
//!
//! Un elemento es JSON genérico: el motor no interpreta su semántica (la
//! codificación de elementos es asunto de colaboradores externos). Las keys
//! de estado se identifican por su forma canónica para que dos JSON
//! equivalentes compartan estado.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::hashing::to_canonical_json;

/// Unidad de datos que fluye entre steps.
pub type Element = Value;

/// Key de estado keyed. Igualdad, orden y hash usan la forma canónica; el
/// valor original se conserva para poder re-emitirlo (p. ej. GroupByKey).
#[derive(Debug, Clone)]
pub struct StateKey {
    canonical: String,
    value: Value,
}

impl StateKey {
    pub fn new(value: Value) -> Self {
        Self { canonical: to_canonical_json(&value),
               value }
    }

    /// Key única usada por transforms globales (Count, Collect).
    pub fn global() -> Self {
        Self::new(Value::Null)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for StateKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for StateKey {}

impl Hash for StateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for StateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl From<&str> for StateKey {
    fn from(key: &str) -> Self {
        Self::new(Value::String(key.to_string()))
    }
}

impl From<Value> for StateKey {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl Serialize for StateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
