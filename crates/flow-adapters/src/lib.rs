//! flow-adapters: evaluadores concretos sobre el core.
//!
//! El core sólo conoce la capacidad `TransformEvaluator` y el registro
//! kind → fábrica. Aquí viven los transforms habituales (Create, Impulse,
//! ParDo, GroupByKey, Flatten, Count), el sink de tests `Collect` y el
//! registro por defecto que los conecta.

pub mod registry;
pub mod testing;
pub mod transforms;

pub use registry::{create_runner, default_registry};
pub use transforms::{Count, Create, DoFn, Flatten, GroupByKey, Impulse, ParDo};
