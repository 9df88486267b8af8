use std::any::Any;

use flow_core::{BundleContext, BundleKind, Element, EvaluatorRegistry, StepSpec, Transform, TransformEvaluator,
                UserCodeError};
use serde_json::json;

pub const KIND: &str = "Impulse";

/// Step raíz que emite un único elemento vacío.
#[derive(Debug, Clone, Copy, Default)]
pub struct Impulse;

impl Transform for Impulse {
    fn kind(&self) -> &str {
        KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ImpulseEvaluator;

impl TransformEvaluator for ImpulseEvaluator {
    fn process_element(&mut self, _element: &Element, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }

    fn finish_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        if ctx.bundle_kind() == BundleKind::Root {
            ctx.output(json!(""));
        }
        Ok(())
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |_spec: &StepSpec| Ok(Box::new(ImpulseEvaluator) as Box<dyn TransformEvaluator>));
}
