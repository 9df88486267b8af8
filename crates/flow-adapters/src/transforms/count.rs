use std::any::Any;

use flow_core::{BundleContext, BundleKind, Element, EvaluatorRegistry, StateKey, StateTag, StepSpec, Transform,
                TransformEvaluator, UserCodeError, WindowTag};
use serde_json::json;

pub const KIND: &str = "Count";

const COUNT_TAG: &str = "count";

/// Cuenta todos los elementos del input y emite un único número.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl Count {
    pub fn globally() -> Self {
        Count
    }
}

impl Transform for Count {
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

/// Suma parcial por bundle; se guarda un valor por bundle commiteado.
#[derive(Default)]
struct CountEvaluator {
    seen: u64,
}

impl TransformEvaluator for CountEvaluator {
    fn process_element(&mut self, _element: &Element, _ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        self.seen += 1;
        Ok(())
    }

    fn finish_bundle(&mut self, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
        match ctx.bundle_kind() {
            BundleKind::InputComplete => {
                let partials = ctx.state()
                                  .get_keyed_state(StateKey::global())
                                  .read_existing(&WindowTag::Global, &StateTag::new(COUNT_TAG))?;
                let total: u64 = partials.iter().filter_map(|v| v.as_u64()).sum();
                ctx.output(json!(total));
            }
            _ if self.seen > 0 => {
                ctx.state()
                   .get_keyed_state(StateKey::global())
                   .add_state(WindowTag::Global, StateTag::new(COUNT_TAG), json!(self.seen));
            }
            _ => {}
        }
        Ok(())
    }
}

pub(crate) fn register(registry: &mut EvaluatorRegistry) {
    registry.register(KIND, |_spec: &StepSpec| Ok(Box::new(CountEvaluator::default()) as Box<dyn TransformEvaluator>));
}
