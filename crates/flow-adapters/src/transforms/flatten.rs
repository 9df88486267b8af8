use std::any::Any;

use flow_core::{BundleContext, Element, EvaluatorRegistry, StepSpec, Transform, TransformEvaluator, UserCodeError};

pub const KIND: &str = "Flatten";

/// Une cualquier cantidad de inputs en una sola colección.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flatten;

impl Transform for Flatten {
    fn kind(&self) -> &str {
        KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FlattenEvaluator;

impl TransformEvaluator for FlattenEvaluator {
    fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        ctx.output(element.clone());
        Ok(())
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |_spec: &StepSpec| Ok(Box::new(FlattenEvaluator) as Box<dyn TransformEvaluator>));
}
