use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use flow_core::{BundleContext, Element, EvaluatorRegistry, StepSpec, Transform, TransformEvaluator, UserCodeError};
use serde_json::{json, Value};

use super::transform_of;

pub const KIND: &str = "ParDo";

/// Código de usuario por elemento. La misma instancia se comparte entre
/// bundles concurrentes, por eso sólo recibe `&self`; el estado por bundle
/// va en el `BundleContext`.
pub trait DoFn: Send + Sync {
    fn start_bundle(&self, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }

    /// Procesa un elemento y devuelve los elementos a emitir.
    fn process(&self, element: &Element, ctx: &mut BundleContext) -> Result<Vec<Element>, UserCodeError>;

    fn finish_bundle(&self, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }
}

struct MapFn<F>(F);

impl<F> DoFn for MapFn<F> where F: Fn(&Element) -> Result<Element, UserCodeError> + Send + Sync
{
    fn process(&self, element: &Element, _ctx: &mut BundleContext) -> Result<Vec<Element>, UserCodeError> {
        Ok(vec![(self.0)(element)?])
    }
}

struct FlatMapFn<F>(F);

impl<F> DoFn for FlatMapFn<F> where F: Fn(&Element) -> Result<Vec<Element>, UserCodeError> + Send + Sync
{
    fn process(&self, element: &Element, _ctx: &mut BundleContext) -> Result<Vec<Element>, UserCodeError> {
        (self.0)(element)
    }
}

#[derive(Clone)]
pub struct ParDo {
    fn_name: &'static str,
    do_fn: Arc<dyn DoFn>,
}

impl fmt::Debug for ParDo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParDo").field("fn", &self.fn_name).finish()
    }
}

impl ParDo {
    pub fn of<D: DoFn + 'static>(do_fn: D) -> Self {
        Self { fn_name: type_name::<D>(),
               do_fn: Arc::new(do_fn) }
    }

    /// Un output por input.
    pub fn map<F>(f: F) -> Self
        where F: Fn(&Element) -> Result<Element, UserCodeError> + Send + Sync + 'static
    {
        Self { fn_name: type_name::<F>(),
               do_fn: Arc::new(MapFn(f)) }
    }

    /// Cero o más outputs por input.
    pub fn flat_map<F>(f: F) -> Self
        where F: Fn(&Element) -> Result<Vec<Element>, UserCodeError> + Send + Sync + 'static
    {
        Self { fn_name: type_name::<F>(),
               do_fn: Arc::new(FlatMapFn(f)) }
    }
}

impl Transform for ParDo {
    fn kind(&self) -> &str {
        KIND
    }

    fn base_params(&self) -> Value {
        json!({ "fn": self.fn_name })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ParDoEvaluator {
    do_fn: Arc<dyn DoFn>,
}

impl TransformEvaluator for ParDoEvaluator {
    fn start_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        self.do_fn.start_bundle(ctx)
    }

    fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        for output in self.do_fn.process(element, ctx)? {
            ctx.output(output);
        }
        Ok(())
    }

    fn finish_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        self.do_fn.finish_bundle(ctx)
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |spec: &StepSpec| {
                let par_do = transform_of::<ParDo>(spec)?;
                Ok(Box::new(ParDoEvaluator { do_fn: Arc::clone(&par_do.do_fn) }) as Box<dyn TransformEvaluator>)
            });
}
