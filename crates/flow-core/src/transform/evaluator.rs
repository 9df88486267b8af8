use std::sync::Arc;

use crate::errors::UserCodeError;
use crate::metrics::MetricsContainer;
use crate::model::{BundleKind, Element};
use crate::pipeline::SharedRegistry;
use crate::state::StepContext;

/// Capacidad que el scheduler consume por bundle. Cualquier `Err` (o panic)
/// es el resultado del intento; commit y discard los decide el scheduler.
pub trait TransformEvaluator: Send {
    fn start_bundle(&mut self, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }

    fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError>;

    fn finish_bundle(&mut self, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }
}

/// Todo lo que un intento de bundle puede tocar: estado partial del step,
/// métricas del intento, outputs pendientes y el registro compartido.
#[derive(Debug)]
pub struct BundleContext {
    step_id: String,
    kind: BundleKind,
    attempt: u32,
    state: StepContext,
    metrics: MetricsContainer,
    outputs: Vec<Element>,
    shared: Arc<SharedRegistry>,
}

impl BundleContext {
    pub fn new(kind: BundleKind,
               attempt: u32,
               state: StepContext,
               metrics: MetricsContainer,
               shared: Arc<SharedRegistry>)
               -> Self {
        Self { step_id: state.step_id().to_string(),
               kind,
               attempt,
               state,
               metrics,
               outputs: Vec::new(),
               shared }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn bundle_kind(&self) -> BundleKind {
        self.kind
    }

    /// Número (1-based) del intento en curso.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_input_complete(&self) -> bool {
        self.kind == BundleKind::InputComplete
    }

    /// Estado keyed del step. El evaluador escribe al partial y lee
    /// `existing`; no puede hacer commit:
    ///
    /// ```compile_fail
    /// fn leak(ctx: &mut flow_core::BundleContext) {
    ///     let _ = ctx.state().commit_all();
    /// }
    /// ```
    pub fn state(&mut self) -> &mut StepContext {
        &mut self.state
    }

    pub fn metrics(&mut self) -> &mut MetricsContainer {
        &mut self.metrics
    }

    /// Emite un elemento hacia los consumidores; sólo se enruta si el
    /// intento hace commit.
    pub fn output(&mut self, element: Element) {
        self.outputs.push(element);
    }

    pub fn shared(&self) -> &SharedRegistry {
        &self.shared
    }

    pub fn into_parts(self) -> (StepContext, MetricsContainer, Vec<Element>) {
        (self.state, self.metrics, self.outputs)
    }
}
