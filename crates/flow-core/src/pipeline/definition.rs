use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Value};

use super::SharedRegistry;
use crate::constants::ENGINE_VERSION;
use crate::errors::PipelineError;
use crate::hashing::hash_value;
use crate::transform::{StepSpec, Transform};

/// Grafo de steps en orden de construcción. Como cada input debe existir al
/// aplicar un step, el orden de inserción es topológico y el grafo es
/// acíclico por construcción.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: IndexMap<String, StepSpec>,
    shared: Arc<SharedRegistry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usa un registro compartido inyectado (p. ej. para observarlo desde un
    /// test después del run).
    pub fn with_shared(mut self, shared: Arc<SharedRegistry>) -> Self {
        self.shared = shared;
        self
    }

    /// Agrega un step con etiqueta `label` que consume `inputs`. Devuelve la
    /// etiqueta para encadenar.
    pub fn apply<T>(&mut self, label: &str, transform: T, inputs: &[&str]) -> Result<String, PipelineError>
        where T: Transform + 'static
    {
        if label.trim().is_empty() {
            return Err(PipelineError::InvalidGraph("step label must not be empty".to_string()));
        }
        if self.steps.contains_key(label) {
            return Err(PipelineError::InvalidGraph(format!("duplicate step label '{label}'")));
        }
        if let Some(missing) = inputs.iter().find(|input| !self.steps.contains_key(**input)) {
            return Err(PipelineError::InvalidGraph(format!("step '{label}' consumes unknown step '{missing}'")));
        }
        let spec = StepSpec { id: label.to_string(),
                              inputs: inputs.iter().map(|s| s.to_string()).collect(),
                              transform: Arc::new(transform) };
        self.steps.insert(label.to_string(), spec);
        Ok(label.to_string())
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepSpec> {
        self.steps.values()
    }

    pub fn step(&self, id: &str) -> Option<&StepSpec> {
        self.steps.get(id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps que consumen el output de `id`, en orden de construcción. Un
    /// step que lista el mismo input dos veces aparece dos veces.
    pub fn consumers(&self, id: &str) -> Vec<&str> {
        self.steps
            .values()
            .flat_map(|spec| spec.inputs.iter().filter(move |input| *input == id).map(move |_| spec.id.as_str()))
            .collect()
    }

    pub fn shared(&self) -> &Arc<SharedRegistry> {
        &self.shared
    }

    /// Hash determinista de la definición (ids, kinds, inputs, params).
    pub fn definition_hash(&self) -> String {
        let steps: Vec<Value> = self.steps.values().map(StepSpec::to_json).collect();
        hash_value(&json!({ "engine_version": ENGINE_VERSION, "steps": steps }))
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Transform for Named {
        fn kind(&self) -> &str {
            self.0
        }

        fn base_params(&self) -> Value {
            json!({ "name": self.0 })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn fork() -> Pipeline {
        let mut p = Pipeline::new();
        let names = p.apply("Create", Named("Create"), &[]).unwrap();
        p.apply("SendToB", Named("ParDo"), &[names.as_str()]).unwrap();
        p.apply("SendToC", Named("ParDo"), &[names.as_str()]).unwrap();
        p
    }

    #[test]
    fn fork_has_two_consumers() {
        let p = fork();
        assert_eq!(p.consumers("Create"), vec!["SendToB", "SendToC"]);
        assert!(p.consumers("SendToB").is_empty());
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn invalid_graphs_are_rejected() {
        let mut p = fork();
        assert!(matches!(p.apply("SendToB", Named("ParDo"), &["Create"]), Err(PipelineError::InvalidGraph(_))));
        assert!(matches!(p.apply("", Named("ParDo"), &["Create"]), Err(PipelineError::InvalidGraph(_))));
        assert!(matches!(p.apply("X", Named("ParDo"), &["Nope"]), Err(PipelineError::InvalidGraph(_))));
    }

    #[test]
    fn definition_hash_is_deterministic() {
        assert_eq!(fork().definition_hash(), fork().definition_hash());
        let mut other = fork();
        other.apply("Extra", Named("ParDo"), &["SendToC"]).unwrap();
        assert_ne!(fork().definition_hash(), other.definition_hash());
    }
}
