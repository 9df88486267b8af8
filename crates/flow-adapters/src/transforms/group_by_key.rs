use std::any::Any;

use flow_core::{BundleContext, Element, EvaluatorRegistry, StateKey, StateTag, StepSpec, Transform,
                TransformEvaluator, UserCodeError, WindowTag};
use log::debug;
use serde_json::{json, Value};

pub const KIND: &str = "GroupByKey";

/// Agrupa pares `[key, value]` y emite `[key, [values...]]` por key una
/// vez que todo el input hizo commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupByKey;

impl Transform for GroupByKey {
    fn kind(&self) -> &str {
        KIND
    }

    fn wants_input_complete(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct GroupByKeyEvaluator;

fn split_pair(element: &Element) -> Result<(Value, Value), UserCodeError> {
    match element.as_array().map(Vec::as_slice) {
        Some([key, value]) => Ok((key.clone(), value.clone())),
        _ => Err(UserCodeError::new(format!("GroupByKey expects [key, value] pairs, got {element}"))),
    }
}

impl TransformEvaluator for GroupByKeyEvaluator {
    fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        let (key, value) = split_pair(element)?;
        ctx.state().get_keyed_state(StateKey::new(key)).add_state(WindowTag::Global, StateTag::elements(), value);
        Ok(())
    }

    fn finish_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        if !ctx.is_input_complete() {
            return Ok(());
        }
        let mut groups = Vec::new();
        for key in ctx.state().existing_keys() {
            let values = ctx.state().get_keyed_state(key.clone()).read_existing(&WindowTag::Global, &StateTag::elements())?;
            groups.push(json!([key.value(), values]));
        }
        debug!("GroupByKey '{}' emitting {} group(s)", ctx.step_id(), groups.len());
        for group in groups {
            ctx.output(group);
        }
        Ok(())
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |_spec: &StepSpec| Ok(Box::new(GroupByKeyEvaluator) as Box<dyn TransformEvaluator>));
}
