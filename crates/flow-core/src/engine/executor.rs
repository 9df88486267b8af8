//! Ejecución de un intento de bundle en un worker.
//!
//! El intento produce un `BundleOutcome` explícito; el commit (estado y
//! métricas) ocurre aquí, en el worker, y al coordinador sólo llega una
//! `Completion` con los outputs ya visibles.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use crate::errors::{PipelineError, UserCodeError};
use crate::event::{EventStore, RunEventKind};
use crate::metrics::{MetricUpdates, MetricsAggregator, MetricsContainer};
use crate::model::{Bundle, Element};
use crate::pipeline::SharedRegistry;
use crate::state::{ExecutionContext, StepContext};
use crate::transform::{BundleContext, TransformEvaluator};

/// Recursos de un run compartidos por coordinador y workers.
pub(crate) struct ExecutorEnv {
    pub run_id: Uuid,
    pub context: Arc<ExecutionContext>,
    pub metrics: Arc<MetricsAggregator>,
    pub events: Arc<dyn EventStore>,
    pub shared: Arc<SharedRegistry>,
    pub trie_bound: usize,
}

/// Bundle listo para correr junto al evaluador creado para él.
pub(crate) struct WorkItem {
    pub bundle: Bundle,
    pub evaluator: Box<dyn TransformEvaluator>,
}

/// Resultado de un intento, antes de commit o discard.
pub(crate) enum BundleOutcome {
    Success {
        state: StepContext,
        metrics: MetricUpdates,
        outputs: Vec<Element>,
    },
    Failure {
        error: UserCodeError,
        attempt: u32,
        failed_element: Option<usize>,
        metrics: MetricUpdates,
    },
}

/// Lo que el coordinador recibe de cada bundle despachado.
pub(crate) enum Completion {
    Committed { bundle: Bundle, outputs: Vec<Element> },
    Failed {
        bundle: Bundle,
        error: UserCodeError,
        failed_element: Option<usize>,
    },
    Fatal { step_id: String, error: PipelineError },
}

/// Corre start/process/finish sobre un partial limpio. Errores y panics del
/// código de usuario terminan el intento como `Failure`.
pub(crate) fn run_attempt(evaluator: &mut dyn TransformEvaluator, bundle: &Bundle, mut ctx: BundleContext) -> BundleOutcome {
    ctx.state().reset();
    let mut failed_element = None;
    let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), UserCodeError> {
        evaluator.start_bundle(&mut ctx)?;
        for (index, element) in bundle.elements().iter().enumerate() {
            failed_element = Some(index);
            evaluator.process_element(element, &mut ctx)?;
        }
        failed_element = None;
        evaluator.finish_bundle(&mut ctx)
    }));
    let error = match result {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error),
        Err(payload) => Some(UserCodeError::from_panic(payload)),
    };
    let attempt = ctx.attempt();
    let (mut state, metrics, outputs) = ctx.into_parts();
    match error {
        None => BundleOutcome::Success { state,
                                         metrics: metrics.into_updates(),
                                         outputs },
        Some(error) => {
            state.reset();
            BundleOutcome::Failure { error,
                                     attempt,
                                     failed_element,
                                     metrics: metrics.into_updates() }
        }
    }
}

/// Bundle contado en vuelo mientras el guard vive, también si el executor
/// hace panic.
struct InFlight<'a>(&'a ExecutionContext);

impl<'a> InFlight<'a> {
    fn admit(context: &'a ExecutionContext) -> Self {
        context.bundle_admitted();
        InFlight(context)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.bundle_retired();
    }
}

fn commit_attempt(env: &ExecutorEnv, state: &mut StepContext, metrics: &MetricUpdates) -> Result<usize, PipelineError> {
    let keys = env.context.commit(state)?;
    env.metrics.update_attempted(metrics)?;
    env.metrics.commit(metrics)?;
    Ok(keys)
}

pub(crate) fn execute_bundle(env: &ExecutorEnv, item: WorkItem) -> Completion {
    let WorkItem { bundle, mut evaluator } = item;
    let step_id = bundle.step_id().to_string();
    let state = match env.context.step_context(&step_id) {
        Ok(state) => state,
        Err(error) => return Completion::Fatal { step_id, error },
    };
    let _in_flight = InFlight::admit(&env.context);
    debug!("bundle {} start step={} attempt={} elements={}",
           bundle.id(),
           step_id,
           bundle.attempt(),
           bundle.len());
    env.events.append_kind(env.run_id,
                           RunEventKind::BundleStarted { bundle_id: bundle.id(),
                                                         step_id: step_id.clone(),
                                                         attempt: bundle.attempt(),
                                                         elements: bundle.len() });
    let ctx = BundleContext::new(bundle.kind(),
                                 bundle.attempt(),
                                 state,
                                 MetricsContainer::new(step_id.clone(), env.trie_bound),
                                 Arc::clone(&env.shared));

    let completion = match run_attempt(evaluator.as_mut(), &bundle, ctx) {
        BundleOutcome::Success { mut state, metrics, outputs } => match commit_attempt(env, &mut state, &metrics) {
            Ok(keys) => {
                env.events.append_kind(env.run_id,
                                       RunEventKind::BundleCommitted { bundle_id: bundle.id(),
                                                                       step_id: step_id.clone(),
                                                                       attempt: bundle.attempt(),
                                                                       outputs: outputs.len(),
                                                                       keys });
                Completion::Committed { bundle, outputs }
            }
            Err(error) => Completion::Fatal { step_id, error },
        },
        BundleOutcome::Failure { error, attempt, failed_element, metrics } => {
            warn!("bundle {} failed step={} attempt={}: {}", bundle.id(), step_id, attempt, error);
            match env.metrics.update_attempted(&metrics) {
                Ok(()) => {
                    env.events.append_kind(env.run_id,
                                           RunEventKind::BundleFailed { bundle_id: bundle.id(),
                                                                        step_id: step_id.clone(),
                                                                        attempt,
                                                                        error: error.clone() });
                    Completion::Failed { bundle,
                                         error,
                                         failed_element }
                }
                Err(fatal) => Completion::Fatal { step_id, error: fatal },
            }
        }
    };
    completion
}

/// `execute_bundle` con los panics internos convertidos en `Fatal`, para
/// que el coordinador siempre reciba una completion por bundle despachado.
pub(crate) fn execute_guarded(env: &ExecutorEnv, item: WorkItem) -> Completion {
    let step_id = item.bundle.step_id().to_string();
    panic::catch_unwind(AssertUnwindSafe(|| execute_bundle(env, item))).unwrap_or_else(|payload| {
        let detail = UserCodeError::from_panic(payload).message;
        Completion::Fatal { step_id,
                            error: PipelineError::Internal(format!("bundle executor panicked: {detail}")) }
    })
}
