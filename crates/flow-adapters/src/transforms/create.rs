use std::any::Any;

use flow_core::{BundleContext, BundleKind, Element, EvaluatorRegistry, StepSpec, Transform, TransformEvaluator,
                UserCodeError};
use serde_json::{json, Value};

use super::transform_of;

pub const KIND: &str = "Create";

/// Step raíz que emite una lista fija de valores.
#[derive(Debug, Clone)]
pub struct Create {
    values: Vec<Element>,
}

impl Create {
    pub fn of<I, V>(values: I) -> Self
        where I: IntoIterator<Item = V>,
              V: Into<Element>
    {
        Self { values: values.into_iter().map(Into::into).collect() }
    }

    pub fn values(&self) -> &[Element] {
        &self.values
    }
}

impl Transform for Create {
    fn kind(&self) -> &str {
        KIND
    }

    fn base_params(&self) -> Value {
        json!({ "values": self.values })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct CreateEvaluator {
    values: Vec<Element>,
}

impl TransformEvaluator for CreateEvaluator {
    fn process_element(&mut self, _element: &Element, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        Ok(())
    }

    fn finish_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        if ctx.bundle_kind() == BundleKind::Root {
            for value in &self.values {
                ctx.output(value.clone());
            }
        }
        Ok(())
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |spec: &StepSpec| {
                let create = transform_of::<Create>(spec)?;
                Ok(Box::new(CreateEvaluator { values: create.values.clone() }) as Box<dyn TransformEvaluator>)
            });
}
