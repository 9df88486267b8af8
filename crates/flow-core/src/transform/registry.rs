use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{StepSpec, TransformEvaluator};
use crate::errors::PipelineError;

pub type EvaluatorFactory = Arc<dyn Fn(&StepSpec) -> Result<Box<dyn TransformEvaluator>, PipelineError> + Send + Sync>;

/// Registro kind → fábrica de evaluadores. El scheduler lo consulta al crear
/// cada bundle.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    factories: HashMap<String, EvaluatorFactory>,
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorRegistry").field("kinds", &self.kinds()).finish()
    }
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (o reemplaza) la fábrica de `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
        where F: Fn(&StepSpec) -> Result<Box<dyn TransformEvaluator>, PipelineError> + Send + Sync + 'static
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn create(&self, spec: &StepSpec) -> Result<Box<dyn TransformEvaluator>, PipelineError> {
        let factory =
            self.factories.get(spec.kind()).ok_or_else(|| PipelineError::UnknownTransform(spec.kind().to_string()))?;
        factory(spec)
    }

    /// Kinds registrados, ordenados.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
