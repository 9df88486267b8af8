mod count;
mod create;
mod flatten;
mod group_by_key;
mod impulse;
mod par_do;

pub use count::Count;
pub use create::Create;
pub use flatten::Flatten;
pub use group_by_key::GroupByKey;
pub use impulse::Impulse;
pub use par_do::{DoFn, ParDo};

pub(crate) use count::register as register_count;
pub(crate) use create::register as register_create;
pub(crate) use flatten::register as register_flatten;
pub(crate) use group_by_key::register as register_group_by_key;
pub(crate) use impulse::register as register_impulse;
pub(crate) use par_do::register as register_par_do;

use flow_core::{PipelineError, StepSpec};

/// Transform concreto de `spec`; un kind registrado con otro tipo es un
/// error interno.
pub(crate) fn transform_of<'a, T: 'static>(spec: &'a StepSpec) -> Result<&'a T, PipelineError> {
    spec.transform_as::<T>().ok_or_else(|| {
                                 PipelineError::Internal(format!("step '{}' of kind '{}' has an unexpected transform type",
                                                                 spec.id,
                                                                 spec.kind()))
                             })
}
