use flow_core::{EvaluatorRegistry, PipelineError, Runner};
use log::debug;

use crate::testing;
use crate::transforms;

/// Registro con todos los evaluadores de este crate.
pub fn default_registry() -> EvaluatorRegistry {
    let mut registry = EvaluatorRegistry::new();
    transforms::register_create(&mut registry);
    transforms::register_impulse(&mut registry);
    transforms::register_par_do(&mut registry);
    transforms::register_group_by_key(&mut registry);
    transforms::register_flatten(&mut registry);
    transforms::register_count(&mut registry);
    testing::register(&mut registry);
    debug!("default registry: {:?}", registry.kinds());
    registry
}

/// `flow_core::create_runner` conectado a `default_registry()`.
pub fn create_runner(name: &str) -> Result<Runner, PipelineError> {
    Ok(flow_core::create_runner(name)?.with_registry(default_registry()))
}
