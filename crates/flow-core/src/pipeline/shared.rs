use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::errors::PipelineError;

type Handle = Arc<dyn Any + Send + Sync>;

/// Registro de singletons con nombre (get-or-create bajo un único mutex).
///
/// Queda fuera del protocolo transaccional: lo que el código de usuario muta
/// aquí no se revierte al reintentar un bundle.
#[derive(Default)]
pub struct SharedRegistry {
    handles: Mutex<HashMap<String, Handle>>,
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = match self.handles.lock() {
            Ok(handles) => handles.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("SharedRegistry").field("names", &names).finish()
    }
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devuelve el handle `name`, creándolo con `create` si no existe.
    /// Pedir un nombre existente con otro tipo es un error.
    pub fn acquire<T, F>(&self, name: &str, create: F) -> Result<Arc<T>, PipelineError>
        where T: Any + Send + Sync,
              F: FnOnce() -> T
    {
        let mut handles =
            self.handles.lock().map_err(|_| PipelineError::Internal("shared registry lock poisoned".to_string()))?;
        let handle = handles.entry(name.to_string()).or_insert_with(|| Arc::new(create()) as Handle).clone();
        handle.downcast::<T>()
              .map_err(|_| PipelineError::Internal(format!("shared handle '{name}' holds a different type")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.lock().map(|handles| handles.contains_key(name)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn acquire_returns_the_same_instance() {
        let registry = SharedRegistry::new();
        let a = registry.acquire("calls", || AtomicUsize::new(0)).unwrap();
        a.fetch_add(3, Ordering::SeqCst);
        let b = registry.acquire("calls", || AtomicUsize::new(100)).unwrap();
        assert_eq!(b.load(Ordering::SeqCst), 3);
        assert!(registry.contains("calls"));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let registry = SharedRegistry::new();
        registry.acquire("x", || 1_u32).unwrap();
        assert!(matches!(registry.acquire("x", String::new), Err(PipelineError::Internal(_))));
    }
}
