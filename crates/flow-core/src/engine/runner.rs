//! Runners: resolución por nombre, estrategia de scheduling y arranque del
//! hilo coordinador de cada run.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::executor::{execute_guarded, ExecutorEnv};
use super::result::RunStatus;
use super::scheduler::Scheduler;
use super::workers::WorkerGuard;
use super::PipelineResult;
use crate::config::RunnerConfig;
use crate::errors::PipelineError;
use crate::event::{EventStore, InMemoryEventStore, RunEventKind};
use crate::metrics::MetricsAggregator;
use crate::pipeline::Pipeline;
use crate::state::ExecutionContext;
use crate::transform::EvaluatorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunnerKind {
    Direct,
    BundleBasedDirect,
    /// Como `Direct`, pero `run` espera el final del run.
    TestDirect,
    Sequential,
}

impl RunnerKind {
    pub const ALL: [RunnerKind; 4] =
        [RunnerKind::Direct, RunnerKind::BundleBasedDirect, RunnerKind::TestDirect, RunnerKind::Sequential];

    pub fn name(&self) -> &'static str {
        match self {
            RunnerKind::Direct => "DirectRunner",
            RunnerKind::BundleBasedDirect => "BundleBasedDirectRunner",
            RunnerKind::TestDirect => "TestDirectRunner",
            RunnerKind::Sequential => "SequentialRunner",
        }
    }

    /// Acepta el nombre con o sin prefijo de módulo y sufijo `Runner`, sin
    /// distinguir mayúsculas.
    pub fn from_name(name: &str) -> Result<Self, PipelineError> {
        let short = name.trim().rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
        let short = short.strip_suffix("runner").unwrap_or(&short);
        match short {
            "direct" => Ok(RunnerKind::Direct),
            "bundlebaseddirect" => Ok(RunnerKind::BundleBasedDirect),
            "testdirect" => Ok(RunnerKind::TestDirect),
            "sequential" => Ok(RunnerKind::Sequential),
            _ => Err(PipelineError::UnknownRunner(name.to_string())),
        }
    }

    pub fn strategy(&self, config: &RunnerConfig) -> SchedulingStrategy {
        match self {
            RunnerKind::Sequential => SchedulingStrategy::Sequential,
            _ => SchedulingStrategy::Pooled { workers: config.workers },
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunnerKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// Bundles en un pool acotado de hilos; cada hilo se une antes de que el
    /// run termine.
    Pooled { workers: usize },
    /// Todo bundle corre en el hilo coordinador.
    Sequential,
}

#[derive(Debug, Clone)]
pub struct Runner {
    kind: RunnerKind,
    config: RunnerConfig,
    registry: Arc<EvaluatorRegistry>,
}

/// Runner con configuración por defecto y registro vacío.
pub fn create_runner(name: &str) -> Result<Runner, PipelineError> {
    Ok(Runner::new(RunnerKind::from_name(name)?, EvaluatorRegistry::new()))
}

impl Runner {
    pub fn new(kind: RunnerKind, registry: EvaluatorRegistry) -> Self {
        Self { kind,
               config: RunnerConfig::default(),
               registry: Arc::new(registry) }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn kind(&self) -> RunnerKind {
        self.kind
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.kind.strategy(&self.config)
    }

    /// Arranca el run en un hilo coordinador y devuelve su handle.
    pub fn run(&self, pipeline: &Pipeline) -> Result<PipelineResult, PipelineError> {
        self.config.validate()?;
        let run_id = Uuid::new_v4();
        let context = Arc::new(ExecutionContext::new(run_id, pipeline.steps().map(|spec| spec.id.as_str())));
        let metrics = Arc::new(MetricsAggregator::new());
        let events: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::default());
        let status = Arc::new(RunStatus::new());
        let env = Arc::new(ExecutorEnv { run_id,
                                         context: Arc::clone(&context),
                                         metrics: Arc::clone(&metrics),
                                         events: Arc::clone(&events),
                                         shared: Arc::clone(pipeline.shared()),
                                         trie_bound: self.config.bounded_trie_size });

        events.append_kind(run_id,
                           RunEventKind::RunStarted { definition_hash: pipeline.definition_hash(),
                                                      step_count: pipeline.len() });
        info!("run {} started: runner={} steps={} strategy={:?}",
              run_id,
              self.kind,
              pipeline.len(),
              self.strategy());

        let coordinator = {
            let pipeline = pipeline.clone();
            let registry = Arc::clone(&self.registry);
            let config = self.config.clone();
            let strategy = self.strategy();
            let status = Arc::clone(&status);
            thread::Builder::new().name("bundleflow-coordinator".to_string())
                                  .spawn(move || {
                                      let _guard = WorkerGuard::register();
                                      let outcome = coordinate(&pipeline, &registry, &config, strategy, env.clone());
                                      match &outcome {
                                          Ok(()) => {
                                              info!("run {} succeeded", env.run_id);
                                              env.events.append_kind(env.run_id, RunEventKind::RunSucceeded);
                                          }
                                          Err(err) => {
                                              error!("run {} failed: {}", env.run_id, err);
                                              env.events.append_kind(env.run_id,
                                                                     RunEventKind::RunFailed { error: err.clone() });
                                          }
                                      }
                                      status.finish(outcome);
                                  })
                                  .map_err(|e| PipelineError::Internal(format!("cannot spawn coordinator: {e}")))?
        };

        let result = PipelineResult::new(run_id, self.kind, status, coordinator, metrics, events, context);
        if self.kind == RunnerKind::TestDirect {
            result.wait_until_finish()?;
        }
        Ok(result)
    }
}

fn coordinate(pipeline: &Pipeline,
              registry: &EvaluatorRegistry,
              config: &RunnerConfig,
              strategy: SchedulingStrategy,
              env: Arc<ExecutorEnv>)
              -> Result<(), PipelineError> {
    let mut scheduler = Scheduler::new(pipeline, registry, config, Arc::clone(&env));
    match strategy {
        SchedulingStrategy::Sequential => scheduler.drive(|item, tx| {
                                                       let _ = tx.send(execute_guarded(&env, item));
                                                   }),
        SchedulingStrategy::Pooled { workers } => {
            let mut handles = Vec::with_capacity(workers);
            let pool = rayon::ThreadPoolBuilder::new().num_threads(workers)
                                                      .spawn_handler(|worker| {
                                                          let handle = thread::Builder::new()
                                                              .name(format!("bundleflow-worker-{}", worker.index()))
                                                              .spawn(move || {
                                                                  let _guard = WorkerGuard::register();
                                                                  worker.run()
                                                              })?;
                                                          handles.push(handle);
                                                          Ok(())
                                                      })
                                                      .build()
                                                      .map_err(|e| {
                                                          PipelineError::Internal(format!("cannot build worker pool: {e}"))
                                                      })?;
            let outcome = pool.in_place_scope(|scope| {
                                  scheduler.drive(|item, tx| {
                                               let env = Arc::clone(&env);
                                               scope.spawn(move |_| {
                                                        let _ = tx.send(execute_guarded(&env, item));
                                                    });
                                           })
                              });
            // Soltar el pool termina sus hilos; se unen antes de devolver.
            drop(pool);
            let panicked = handles.into_iter().map(thread::JoinHandle::join).filter(Result::is_err).count();
            match outcome {
                Ok(()) if panicked > 0 => {
                    Err(PipelineError::Internal(format!("{panicked} worker thread(s) panicked")))
                }
                outcome => outcome,
            }
        }
    }
}
