//! Capa de transforms: definición estática de steps, capacidad de evaluador
//! consumida por el scheduler y registro kind → fábrica.

mod definition;
mod evaluator;
mod registry;

pub use definition::{StepSpec, Transform};
pub use evaluator::{BundleContext, TransformEvaluator};
pub use registry::{EvaluatorFactory, EvaluatorRegistry};

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::errors::{PipelineError, UserCodeError};
    use crate::metrics::MetricsContainer;
    use crate::model::{BundleKind, Element};
    use crate::pipeline::SharedRegistry;
    use crate::state::{ExecutionContext, StateTag, WindowTag};

    #[derive(Debug)]
    struct Tagger;

    impl Transform for Tagger {
        fn kind(&self) -> &str {
            "Tagger"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct TaggerEvaluator;

    impl TransformEvaluator for TaggerEvaluator {
        fn process_element(&mut self, element: &Element, ctx: &mut BundleContext) -> Result<(), UserCodeError> {
            ctx.state().get_keyed_state("seen").add_state(WindowTag::Global, StateTag::elements(), element.clone());
            ctx.metrics().counter("test", "seen").inc();
            ctx.output(json!({ "tagged": element }));
            Ok(())
        }
    }

    fn spec() -> StepSpec {
        StepSpec { id: "tag".into(),
                   inputs: vec![],
                   transform: Arc::new(Tagger) }
    }

    #[test]
    fn registry_resolves_by_kind() {
        let mut registry = EvaluatorRegistry::new();
        registry.register("Tagger", |_spec: &StepSpec| Ok(Box::new(TaggerEvaluator) as Box<dyn TransformEvaluator>));
        assert!(registry.contains("Tagger"));
        assert_eq!(registry.kinds(), vec!["Tagger".to_string()]);

        let ctx = ExecutionContext::new(Uuid::new_v4(), ["tag"]);
        let mut bundle = BundleContext::new(BundleKind::Data,
                                            1,
                                            ctx.step_context("tag").unwrap(),
                                            MetricsContainer::new("tag", 10),
                                            Arc::new(SharedRegistry::new()));
        let mut evaluator = registry.create(&spec()).unwrap();
        evaluator.start_bundle(&mut bundle).unwrap();
        evaluator.process_element(&json!(1), &mut bundle).unwrap();
        evaluator.finish_bundle(&mut bundle).unwrap();
        let (state, metrics, outputs) = bundle.into_parts();
        assert_eq!(outputs, vec![json!({"tagged": 1})]);
        assert_eq!(state.touched_keys().len(), 1);
        assert_eq!(metrics.updates().counters.len(), 1);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let registry = EvaluatorRegistry::new();
        assert!(matches!(registry.create(&spec()), Err(PipelineError::UnknownTransform(kind)) if kind == "Tagger"));
    }

    #[test]
    fn step_spec_json_and_downcast() {
        let spec = spec();
        assert!(spec.transform_as::<Tagger>().is_some());
        assert_eq!(spec.to_json(), json!({"id": "tag", "kind": "Tagger", "inputs": [], "params": {}}));
        assert!(spec.is_root());
    }
}
