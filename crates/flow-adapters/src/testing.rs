//! Utilidades de test: un sink que guarda cada elemento en estado keyed
//! commiteado, de modo que un test lee exactamente lo que hizo commit.

use std::any::Any;

use flow_core::{BundleContext, Element, EvaluatorRegistry, PipelineError, PipelineResult, StateKey, StateTag,
                StepSpec, Transform, TransformEvaluator, UserCodeError, WindowTag};

pub const KIND: &str = "Collect";

#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl Transform for Collect {
    fn kind(&self) -> &str {
        KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct CollectEvaluator;

impl TransformEvaluator for CollectEvaluator {
    fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        ctx.state()
           .get_keyed_state(StateKey::global())
           .add_state(WindowTag::Global, StateTag::elements(), element.clone());
        Ok(())
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |_spec: &StepSpec| Ok(Box::new(CollectEvaluator) as Box<dyn TransformEvaluator>));
}

/// Elementos commiteados por el step `Collect` con id `step_id`, en orden de
/// commit.
pub fn collected(result: &PipelineResult, step_id: &str) -> Result<Vec<Element>, PipelineError> {
    let state = result.existing_state(step_id, &StateKey::global())?;
    Ok(state.and_then(|s| s.get(&WindowTag::Global, &StateTag::elements()).map(<[Element]>::to_vec))
            .unwrap_or_default())
}

/// Igual que `collected`, ordenado por la forma canónica de cada elemento.
pub fn collected_sorted(result: &PipelineResult, step_id: &str) -> Result<Vec<Element>, PipelineError> {
    let mut values = collected(result, step_id)?;
    values.sort_by_key(|v| StateKey::new(v.clone()));
    Ok(values)
}
