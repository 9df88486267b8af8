use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use log::debug;

use super::KeyedState;
use crate::errors::PipelineError;
use crate::model::StateKey;

type KeyCell = Arc<Mutex<KeyedState>>;

/// Estado `existing` (commiteado) de un step.
///
/// Cada key tiene su propio mutex: un commit toma sólo el lock de su key, de
/// modo que dos commits sobre la misma key se serializan y commits sobre keys
/// distintas avanzan en paralelo. El shard del `DashMap` se libera antes de
/// tomar el lock de la key. Los lectores toman el mismo lock, así que nunca
/// ven un commit a medias.
#[derive(Debug)]
pub struct KeyedStateStore {
    step_id: String,
    existing: DashMap<StateKey, KeyCell>,
    commits: AtomicU64,
}

impl KeyedStateStore {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self { step_id: step_id.into(),
               existing: DashMap::new(),
               commits: AtomicU64::new(0) }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    fn lookup(&self, key: &StateKey) -> Option<KeyCell> {
        self.existing.get(key).map(|cell| Arc::clone(cell.value()))
    }

    fn lock<'a>(&self, key: &StateKey, cell: &'a KeyCell) -> Result<MutexGuard<'a, KeyedState>, PipelineError> {
        cell.lock().map_err(|_| {
                        PipelineError::Protocol(format!("keyed state lock poisoned (step '{}', key {})", self.step_id, key))
                    })
    }

    /// Copia del estado commiteado de `key`; `None` si nunca hubo commit.
    pub fn snapshot(&self, key: &StateKey) -> Result<Option<KeyedState>, PipelineError> {
        match self.lookup(key) {
            Some(cell) => Ok(Some(self.lock(key, &cell)?.clone())),
            None => Ok(None),
        }
    }

    /// Ejecuta `f` sobre el estado commiteado de `key` con su lock tomado.
    pub fn with_existing<R>(&self, key: &StateKey, f: impl FnOnce(Option<&KeyedState>) -> R) -> Result<R, PipelineError> {
        match self.lookup(key) {
            Some(cell) => {
                let guard = self.lock(key, &cell)?;
                Ok(f(Some(&guard)))
            }
            None => Ok(f(None)),
        }
    }

    /// Aplica `delta` completo sobre `key` de forma atómica.
    pub fn commit(&self, key: &StateKey, delta: KeyedState) -> Result<(), PipelineError> {
        let cell = {
            let entry = self.existing.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };
        let mut guard = self.lock(key, &cell)?;
        let appended = delta.value_count();
        guard.append_all(delta);
        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!("committed {} value(s) to step '{}' key {}", appended, self.step_id, key);
        Ok(())
    }

    /// Keys con estado commiteado, ordenadas por su forma canónica.
    pub fn keys(&self) -> Vec<StateKey> {
        let mut keys: Vec<StateKey> = self.existing.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Commits por key aplicados desde la creación del store.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }
}
