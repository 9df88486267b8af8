//! Pipelines de demostración.
//!
//! - `metrics_pipeline`: un ParDo que reporta los cinco tipos de métrica por
//!   elemento y por bundle.
//! - `retry_fork_pipeline`: una raíz con dos ramas que siempre fallan, para
//!   observar el presupuesto de reintentos por rama.

use std::sync::atomic::{AtomicUsize, Ordering};

use flow_adapters::testing::Collect;
use flow_adapters::{Create, DoFn, ParDo};
use flow_core::{BundleContext, Element, Pipeline, PipelineError, UserCodeError};

pub const METRICS_NAMESPACE: &str = "bundleflow.demo.MetricsDoFn";
pub const METRICS_STEP: &str = "Do";

pub const BRANCH_B_CALLS: &str = "SendToB.calls";
pub const BRANCH_C_CALLS: &str = "SendToC.calls";

/// DoFn que cuenta bundles y elementos y reporta cada elemento entero en una
/// distribución, un gauge, un string set y un bounded trie.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsDoFn;

impl DoFn for MetricsDoFn {
    fn start_bundle(&self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        ctx.metrics().counter(METRICS_NAMESPACE, "bundles").inc();
        Ok(())
    }

    fn process(&self, element: &Element, ctx: &mut BundleContext) -> Result<Vec<Element>, UserCodeError> {
        let x = element.as_i64()
                       .ok_or_else(|| UserCodeError::new(format!("MetricsDoFn expects integers, got {element}")))?;
        let bucket = (x % 4).to_string();
        let metrics = ctx.metrics();
        metrics.gauge(METRICS_NAMESPACE, "latest_element").set(x);
        metrics.counter(METRICS_NAMESPACE, "elements").inc();
        metrics.distribution(METRICS_NAMESPACE, "element_dist").update(x);
        metrics.string_set(METRICS_NAMESPACE, "element_str_set").add(bucket.clone());
        metrics.bounded_trie(METRICS_NAMESPACE, "element_bounded_trie")
               .add(vec!["a".to_string(), "b".to_string(), bucket]);
        Ok(vec![element.clone()])
    }

    fn finish_bundle(&self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        ctx.metrics().counter(METRICS_NAMESPACE, "finished_bundles").inc();
        Ok(())
    }
}

/// Rama que incrementa un contador compartido y luego falla siempre. El
/// contador vive en el `SharedRegistry`, fuera del protocolo de commit, así
/// que cuenta cada intento.
#[derive(Debug, Clone, Copy)]
pub struct FailingBranch {
    pub counter: &'static str,
    pub message: &'static str,
}

impl DoFn for FailingBranch {
    fn process(&self, _element: &Element, ctx: &mut BundleContext) -> Result<Vec<Element>, UserCodeError> {
        let calls = ctx.shared().acquire(self.counter, || AtomicUsize::new(0))?;
        calls.fetch_add(1, Ordering::SeqCst);
        Err(UserCodeError::new(self.message))
    }
}

/// Create(1..=5) → "Do" (MetricsDoFn) → "Out" (Collect).
pub fn metrics_pipeline() -> Result<Pipeline, PipelineError> {
    let mut p = Pipeline::new();
    p.apply("Create", Create::of(1..=5), &[])?;
    p.apply(METRICS_STEP, ParDo::of(MetricsDoFn), &["Create"])?;
    p.apply("Out", Collect, &[METRICS_STEP])?;
    Ok(p)
}

/// CreateNodeA(["Ann", "Joe"]) alimenta dos ramas que fallan siempre.
pub fn retry_fork_pipeline() -> Result<Pipeline, PipelineError> {
    let mut p = Pipeline::new();
    p.apply("CreateNodeA", Create::of(["Ann", "Joe"]), &[])?;
    p.apply("SendToB",
            ParDo::of(FailingBranch { counter: BRANCH_B_CALLS,
                                      message: "exception in f_b" }),
            &["CreateNodeA"])?;
    p.apply("SendToC",
            ParDo::of(FailingBranch { counter: BRANCH_C_CALLS,
                                      message: "exception in f_c" }),
            &["CreateNodeA"])?;
    Ok(p)
}

/// Intentos registrados por una rama de `retry_fork_pipeline`.
pub fn branch_calls(pipeline: &Pipeline, counter: &str) -> Result<usize, PipelineError> {
    let calls = pipeline.shared().acquire(counter, || AtomicUsize::new(0))?;
    Ok(calls.load(Ordering::SeqCst))
}
