use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use super::{KeyedState, KeyedStateStore, StateTag, WindowTag};
use crate::errors::PipelineError;
use crate::model::{Element, StateKey};

/// Contexto de ejecución de un run: un `KeyedStateStore` por step y el
/// conteo de bundles en vuelo.
#[derive(Debug)]
pub struct ExecutionContext {
    run_id: Uuid,
    stores: IndexMap<String, Arc<KeyedStateStore>>,
    in_flight: AtomicUsize,
}

impl ExecutionContext {
    pub fn new<'a>(run_id: Uuid, step_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let stores = step_ids.into_iter()
                             .map(|id| (id.to_string(), Arc::new(KeyedStateStore::new(id))))
                             .collect();
        Self { run_id,
               stores,
               in_flight: AtomicUsize::new(0) }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn store(&self, step_id: &str) -> Result<Arc<KeyedStateStore>, PipelineError> {
        self.stores
            .get(step_id)
            .cloned()
            .ok_or_else(|| PipelineError::Protocol(format!("no keyed state store for step '{step_id}'")))
    }

    /// Contexto de estado limpio (partial vacío) para un intento de bundle.
    pub fn step_context(&self, step_id: &str) -> Result<StepContext, PipelineError> {
        Ok(StepContext::new(step_id, self.store(step_id)?))
    }

    pub fn existing_state(&self, step_id: &str, key: &StateKey) -> Result<Option<KeyedState>, PipelineError> {
        self.store(step_id)?.snapshot(key)
    }

    pub fn committed_keys(&self, step_id: &str) -> Result<Vec<StateKey>, PipelineError> {
        Ok(self.store(step_id)?.keys())
    }

    /// Commitea todo el partial de `state`. Devuelve cuántas keys se
    /// commitearon. Un contexto ajeno a este run es una violación de
    /// protocolo.
    pub fn commit(&self, state: &mut StepContext) -> Result<usize, PipelineError> {
        let own = self.store(&state.step_id)?;
        if !Arc::ptr_eq(&own, &state.store) {
            return Err(PipelineError::Protocol(format!("step context for '{}' does not belong to run {}",
                                                       state.step_id, self.run_id)));
        }
        state.commit_all()
    }

    pub fn bundle_admitted(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn bundle_retired(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn in_flight_bundles(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Estado de un step visto por un intento de bundle: lecturas contra
/// `existing`, escrituras a un `partial` privado del intento.
///
/// Commit, discard y reset son del crate: sólo el executor decide qué pasa
/// con el partial al terminar el intento.
#[derive(Debug)]
pub struct StepContext {
    step_id: String,
    store: Arc<KeyedStateStore>,
    partial: IndexMap<StateKey, KeyedState>,
}

impl StepContext {
    pub fn new(step_id: impl Into<String>, store: Arc<KeyedStateStore>) -> Self {
        Self { step_id: step_id.into(),
               store,
               partial: IndexMap::new() }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Handle sobre `key`. Crear el handle no toca `existing` ni `partial`.
    pub fn get_keyed_state(&mut self, key: impl Into<StateKey>) -> KeyedStateHandle<'_> {
        KeyedStateHandle { key: key.into(),
                           store: &self.store,
                           partial: &mut self.partial }
    }

    pub fn partial_state(&self, key: &StateKey) -> Option<&KeyedState> {
        self.partial.get(key)
    }

    pub fn existing_state(&self, key: &StateKey) -> Result<Option<KeyedState>, PipelineError> {
        self.store.snapshot(key)
    }

    pub fn existing_keys(&self) -> Vec<StateKey> {
        self.store.keys()
    }

    /// Keys con escrituras pendientes en este intento.
    pub fn touched_keys(&self) -> Vec<StateKey> {
        self.partial.keys().cloned().collect()
    }

    pub(crate) fn commit(&mut self, key: &StateKey) -> Result<(), PipelineError> {
        match self.partial.shift_remove(key) {
            Some(delta) => self.store.commit(key, delta),
            None => Ok(()),
        }
    }

    pub(crate) fn commit_all(&mut self) -> Result<usize, PipelineError> {
        let pending = std::mem::take(&mut self.partial);
        let count = pending.len();
        for (key, delta) in pending {
            self.store.commit(&key, delta)?;
        }
        Ok(count)
    }

    pub(crate) fn discard(&mut self, key: &StateKey) {
        self.partial.shift_remove(key);
    }

    /// Descarta todo el partial. `existing` no se toca.
    pub(crate) fn reset(&mut self) {
        self.partial.clear();
    }
}

/// Handle de estado keyed ligado a una key.
pub struct KeyedStateHandle<'a> {
    key: StateKey,
    store: &'a KeyedStateStore,
    partial: &'a mut IndexMap<StateKey, KeyedState>,
}

impl KeyedStateHandle<'_> {
    pub fn key(&self) -> &StateKey {
        &self.key
    }

    /// Agrega `value` al partial de la key, en orden de llamada.
    pub fn add_state(&mut self, window: WindowTag, tag: StateTag, value: Element) {
        self.partial.entry(self.key.clone()).or_default().add(window, tag, value);
    }

    /// Valores commiteados en `window/tag` (vacío si no hay).
    pub fn read_existing(&self, window: &WindowTag, tag: &StateTag) -> Result<Vec<Element>, PipelineError> {
        self.store
            .with_existing(&self.key, |state| state.and_then(|s| s.get(window, tag)).map(<[Element]>::to_vec))
            .map(Option::unwrap_or_default)
    }

    pub fn existing(&self) -> Result<Option<KeyedState>, PipelineError> {
        self.store.snapshot(&self.key)
    }

    pub fn partial(&self) -> Option<&KeyedState> {
        self.partial.get(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ExecutionContext {
        ExecutionContext::new(Uuid::new_v4(), ["gbk", "other"])
    }

    #[test]
    fn existing_unchanged_until_commit() {
        let ctx = context();
        let key = StateKey::from("k");
        let mut step = ctx.step_context("gbk").unwrap();
        {
            let mut handle = step.get_keyed_state(key.clone());
            handle.add_state(WindowTag::Global, StateTag::elements(), json!(1));
            handle.add_state(WindowTag::Global, StateTag::elements(), json!(1));
            assert!(handle.existing().unwrap().is_none());
        }
        assert!(ctx.existing_state("gbk", &key).unwrap().is_none());
        assert_eq!(ctx.commit(&mut step).unwrap(), 1);
        let committed = ctx.existing_state("gbk", &key).unwrap().unwrap();
        assert_eq!(committed.get(&WindowTag::Global, &StateTag::elements()), Some(&[json!(1), json!(1)][..]));
        assert!(step.touched_keys().is_empty());
    }

    #[test]
    fn creating_a_handle_does_not_touch_state() {
        let ctx = context();
        let mut step = ctx.step_context("gbk").unwrap();
        let handle = step.get_keyed_state("k");
        assert!(handle.partial().is_none());
        assert_eq!(handle.read_existing(&WindowTag::Global, &StateTag::elements()).unwrap(), Vec::<Element>::new());
        drop(handle);
        assert!(step.touched_keys().is_empty());
        assert!(ctx.committed_keys("gbk").unwrap().is_empty());
    }

    #[test]
    fn discard_and_reset_only_touch_partial() {
        let ctx = context();
        let a = StateKey::from("a");
        let b = StateKey::from("b");
        let mut step = ctx.step_context("gbk").unwrap();
        step.get_keyed_state(a.clone()).add_state(WindowTag::Global, StateTag::elements(), json!("x"));
        step.commit(&a).unwrap();
        step.get_keyed_state(a.clone()).add_state(WindowTag::Global, StateTag::elements(), json!("y"));
        step.get_keyed_state(b.clone()).add_state(WindowTag::Global, StateTag::elements(), json!("z"));
        step.discard(&a);
        assert_eq!(step.touched_keys(), vec![b.clone()]);
        step.reset();
        assert!(step.touched_keys().is_empty());
        let existing = step.existing_state(&a).unwrap().unwrap();
        assert_eq!(existing.value_count(), 1);
        assert_eq!(step.existing_keys(), vec![a]);
    }

    #[test]
    fn foreign_step_context_is_a_protocol_violation() {
        let ctx = context();
        let other_run = context();
        let mut foreign = other_run.step_context("gbk").unwrap();
        foreign.get_keyed_state("k").add_state(WindowTag::Global, StateTag::elements(), json!(1));
        assert!(matches!(ctx.commit(&mut foreign), Err(PipelineError::Protocol(_))));
        assert!(matches!(ctx.step_context("missing"), Err(PipelineError::Protocol(_))));
    }
}
