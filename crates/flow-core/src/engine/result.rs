use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;

use serde::Serialize;
use uuid::Uuid;

use super::RunnerKind;
use crate::errors::PipelineError;
use crate::event::{EventStore, RunEvent};
use crate::metrics::MetricsAggregator;
use crate::model::StateKey;
use crate::state::{ExecutionContext, KeyedState};

/// Estado de un run. `Succeeded` y `Failed` son terminales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PipelineState {
    Running,
    Succeeded,
    Failed(PipelineError),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineState::Running)
    }
}

/// Estado compartido entre el coordinador y los que esperan el run.
#[derive(Debug)]
pub(crate) struct RunStatus {
    state: Mutex<PipelineState>,
    changed: Condvar,
}

impl RunStatus {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(PipelineState::Running),
               changed: Condvar::new() }
    }

    /// Fija el estado terminal. Un run ya terminado no cambia.
    pub(crate) fn finish(&self, outcome: Result<(), PipelineError>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_terminal() {
            *state = match outcome {
                Ok(()) => PipelineState::Succeeded,
                Err(error) => PipelineState::Failed(error),
            };
        }
        self.changed.notify_all();
    }

    fn current(&self) -> PipelineState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn wait_terminal(&self) -> PipelineState {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !state.is_terminal() {
            state = self.changed.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.clone()
    }
}

/// Handle de un run en curso o terminado.
pub struct PipelineResult {
    run_id: Uuid,
    runner: RunnerKind,
    status: Arc<RunStatus>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<MetricsAggregator>,
    events: Arc<dyn EventStore>,
    context: Arc<ExecutionContext>,
}

impl PipelineResult {
    pub(crate) fn new(run_id: Uuid,
                      runner: RunnerKind,
                      status: Arc<RunStatus>,
                      coordinator: JoinHandle<()>,
                      metrics: Arc<MetricsAggregator>,
                      events: Arc<dyn EventStore>,
                      context: Arc<ExecutionContext>)
                      -> Self {
        Self { run_id,
               runner,
               status,
               coordinator: Mutex::new(Some(coordinator)),
               metrics,
               events,
               context }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn runner(&self) -> RunnerKind {
        self.runner
    }

    pub fn state(&self) -> PipelineState {
        self.status.current()
    }

    fn join_coordinator(&self) {
        let mut coordinator = self.coordinator.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = coordinator.take() {
            if handle.join().is_err() {
                self.status.finish(Err(PipelineError::Internal("coordinator thread panicked".to_string())));
            }
        }
    }

    /// Bloquea hasta que el run termine. Al volver, el coordinador y todos
    /// los workers del run ya terminaron. Un run fallido devuelve su error
    /// terminal.
    pub fn wait_until_finish(&self) -> Result<PipelineState, PipelineError> {
        self.join_coordinator();
        match self.status.wait_terminal() {
            PipelineState::Failed(error) => Err(error),
            state => Ok(state),
        }
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.list(self.run_id)
    }

    /// Estado keyed commiteado de `step` para `key`.
    pub fn existing_state(&self, step_id: &str, key: &StateKey) -> Result<Option<KeyedState>, PipelineError> {
        self.context.existing_state(step_id, key)
    }

    pub fn committed_keys(&self, step_id: &str) -> Result<Vec<StateKey>, PipelineError> {
        self.context.committed_keys(step_id)
    }
}

impl Drop for PipelineResult {
    fn drop(&mut self) {
        self.join_coordinator();
    }
}
