//! Canonical JSON minimal: claves de objetos ordenadas, sin espacios.
//!
//! Se usa como identidad de las keys de estado (dos JSON equivalentes con
//! distinto orden de claves deben caer en la misma key) y como entrada del
//! hash de definición del pipeline.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Display de Value produce el literal JSON escapado
        Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}
