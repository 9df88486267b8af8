use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

/// Descripción estática de un transform dentro del grafo. La lógica por
/// elemento vive en el evaluador que el registro asocia a `kind()`.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Identificador del tipo de step; clave del registro de evaluadores.
    fn kind(&self) -> &str;

    /// Parámetros deterministas; entran en el hash de definición.
    fn base_params(&self) -> Value {
        json!({})
    }

    /// Si `true`, el step recibe un bundle `InputComplete` cuando todo su
    /// input upstream hizo commit.
    fn wants_input_complete(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Step del grafo: id único, ids de sus inputs y el transform.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub id: String,
    pub inputs: Vec<String>,
    pub transform: Arc<dyn Transform>,
}

impl StepSpec {
    pub fn kind(&self) -> &str {
        self.transform.kind()
    }

    pub fn is_root(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Acceso tipado al transform (lo usan las fábricas de evaluadores).
    pub fn transform_as<T: Any>(&self) -> Option<&T> {
        self.transform.as_any().downcast_ref::<T>()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "kind": self.kind(),
            "inputs": self.inputs,
            "params": self.transform.base_params(),
        })
    }
}
