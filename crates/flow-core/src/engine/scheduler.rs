//! Coordinador de un run: convierte el DAG en bundles listos, los despacha y
//! aplica el protocolo de reintentos sobre cada `Completion`.
//!
//! Corre en un único hilo; el estado de scheduling no se comparte.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, error, warn};

use super::executor::{Completion, ExecutorEnv, WorkItem};
use crate::config::RunnerConfig;
use crate::errors::{PipelineError, UserCodeError};
use crate::event::RunEventKind;
use crate::model::{Bundle, Element};
use crate::pipeline::Pipeline;
use crate::transform::EvaluatorRegistry;

#[derive(Debug, Default)]
struct StepProgress {
    /// Bundles del step creados y todavía sin resultado terminal.
    outstanding: usize,
    input_complete_sent: bool,
    done: bool,
}

pub(crate) struct Scheduler<'a> {
    pipeline: &'a Pipeline,
    registry: &'a EvaluatorRegistry,
    config: &'a RunnerConfig,
    env: Arc<ExecutorEnv>,
    queue: VecDeque<Bundle>,
    progress: IndexMap<String, StepProgress>,
    in_flight: usize,
    failure: Option<PipelineError>,
    fatal: bool,
}

impl<'a> Scheduler<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline,
                      registry: &'a EvaluatorRegistry,
                      config: &'a RunnerConfig,
                      env: Arc<ExecutorEnv>)
                      -> Self {
        let progress = pipeline.steps().map(|spec| (spec.id.clone(), StepProgress::default())).collect();
        Self { pipeline,
               registry,
               config,
               env,
               queue: VecDeque::new(),
               progress,
               in_flight: 0,
               failure: None,
               fatal: false }
    }

    /// Corre el run hasta que no quede trabajo en vuelo. `dispatch` entrega
    /// cada bundle a un worker, que debe enviar exactamente una completion.
    pub(crate) fn drive<D>(&mut self, mut dispatch: D) -> Result<(), PipelineError>
        where D: FnMut(WorkItem, Sender<Completion>)
    {
        let (tx, rx) = mpsc::channel();
        self.seed();
        loop {
            self.dispatch_ready(&tx, &mut dispatch);
            if self.in_flight == 0 {
                break;
            }
            let completion =
                rx.recv().map_err(|_| PipelineError::Internal("completion channel closed".to_string()))?;
            self.in_flight -= 1;
            self.handle(completion);
        }
        self.finish()
    }

    fn seed(&mut self) {
        for spec in self.pipeline.steps().filter(|spec| spec.is_root()) {
            self.enqueue(Bundle::root(&spec.id));
        }
        self.advance();
    }

    fn progress_mut(&mut self, step_id: &str) -> Option<&mut StepProgress> {
        self.progress.get_mut(step_id)
    }

    fn enqueue(&mut self, bundle: Bundle) {
        if let Some(progress) = self.progress_mut(bundle.step_id()) {
            progress.outstanding += 1;
        }
        self.queue.push_back(bundle);
    }

    fn settle(&mut self, step_id: &str) {
        if let Some(progress) = self.progress_mut(step_id) {
            progress.outstanding = progress.outstanding.saturating_sub(1);
        }
    }

    fn abort(&mut self, error: PipelineError) {
        error!("run {} aborting: {}", self.env.run_id, error);
        self.failure = Some(error);
        self.fatal = true;
    }

    fn abandon(&mut self, bundle: Bundle) {
        debug!("bundle {} abandoned step={}", bundle.id(), bundle.step_id());
        self.env.events.append_kind(self.env.run_id,
                                    RunEventKind::BundleAbandoned { bundle_id: bundle.id(),
                                                                    step_id: bundle.step_id().to_string() });
        self.settle(bundle.step_id());
    }

    /// Mientras el run aborta sólo se despachan continuaciones (reintentos y
    /// splits) de trabajo ya admitido; tras un error fatal, nada.
    fn admissible(&self, bundle: &Bundle) -> bool {
        !self.fatal && (self.failure.is_none() || bundle.is_retry())
    }

    fn dispatch_ready<D>(&mut self, tx: &Sender<Completion>, dispatch: &mut D)
        where D: FnMut(WorkItem, Sender<Completion>)
    {
        while let Some(bundle) = self.queue.pop_front() {
            if !self.admissible(&bundle) {
                self.abandon(bundle);
                continue;
            }
            let created = match self.pipeline.step(bundle.step_id()) {
                Some(spec) => self.registry.create(spec),
                None => Err(PipelineError::Protocol(format!("bundle for unknown step '{}'", bundle.step_id()))),
            };
            match created {
                Ok(evaluator) => {
                    self.in_flight += 1;
                    dispatch(WorkItem { bundle, evaluator }, tx.clone());
                }
                Err(error) => {
                    self.abort(error);
                    self.abandon(bundle);
                }
            }
        }
    }

    fn handle(&mut self, completion: Completion) {
        match completion {
            Completion::Committed { bundle, outputs } => self.on_committed(bundle, outputs),
            Completion::Failed { bundle, error, failed_element } => self.on_failed(bundle, error, failed_element),
            Completion::Fatal { step_id, error } => {
                self.settle(&step_id);
                self.abort(error);
            }
        }
        self.advance();
    }

    fn on_committed(&mut self, bundle: Bundle, outputs: Vec<Element>) {
        let step_id = bundle.step_id().to_string();
        if !outputs.is_empty() {
            let consumers: Vec<String> = self.pipeline.consumers(&step_id).into_iter().map(str::to_string).collect();
            for consumer in consumers {
                for chunk in outputs.chunks(self.config.max_bundle_size) {
                    self.enqueue(Bundle::data(&consumer, chunk.to_vec()));
                }
            }
        }
        self.settle(&step_id);
    }

    fn on_failed(&mut self, bundle: Bundle, error: UserCodeError, failed_element: Option<usize>) {
        let step_id = bundle.step_id().to_string();
        let failures = bundle.failed_attempts() + 1;
        let policy = self.config.retry;
        if policy.is_exhausted(failures) {
            error!("step '{}' exhausted {} attempt(s): {}", step_id, failures, error);
            if !self.fatal {
                self.failure = Some(PipelineError::UserCode { step_id: step_id.clone(),
                                                              attempts: failures,
                                                              source: error });
            }
            self.settle(&step_id);
            return;
        }
        let parts = policy.requeue(bundle, failed_element);
        warn!("step '{}' retrying after failure {}/{} ({} bundle(s) requeued)",
              step_id,
              failures,
              policy.max_attempts,
              parts.len());
        self.settle(&step_id);
        for part in parts {
            self.env.events.append_kind(self.env.run_id,
                                        RunEventKind::RetryScheduled { bundle_id: part.id(),
                                                                       step_id: step_id.clone(),
                                                                       attempt: part.attempt(),
                                                                       elements: part.len() });
            self.enqueue(part);
        }
    }

    /// Marca como terminados, en orden topológico, los steps sin trabajo
    /// pendiente cuyo upstream ya terminó. Los que lo piden reciben antes un
    /// bundle `InputComplete`.
    fn advance(&mut self) {
        if self.failure.is_some() {
            return;
        }
        let pipeline = self.pipeline;
        for spec in pipeline.steps() {
            let upstream_done =
                spec.inputs.iter().all(|input| self.progress.get(input).map_or(false, |progress| progress.done));
            let Some(progress) = self.progress.get_mut(&spec.id) else {
                continue;
            };
            if progress.done || !upstream_done || progress.outstanding > 0 {
                continue;
            }
            if spec.transform.wants_input_complete() && !progress.input_complete_sent {
                progress.input_complete_sent = true;
                self.enqueue(Bundle::input_complete(&spec.id));
                continue;
            }
            progress.done = true;
            debug!("step '{}' completed", spec.id);
            self.env.events.append_kind(self.env.run_id, RunEventKind::StepCompleted { step_id: spec.id.clone() });
        }
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        match self.progress.iter().find(|(_, progress)| !progress.done) {
            Some((step_id, _)) => Err(PipelineError::Protocol(format!("step '{step_id}' never completed"))),
            None => Ok(()),
        }
    }
}
