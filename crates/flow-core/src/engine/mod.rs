//! Motor de ejecución por bundles.
//!
//! - `scheduler`: coordinador de un run (readiness, retry, abort).
//! - `executor`: intento de bundle y commit en el worker.
//! - `retry`: política de reintentos configurable.
//! - `runner`: nombres de runner, estrategias y arranque del run.
//! - `result`: handle del run (`wait_until_finish`, métricas, eventos).
//! - `workers`: conteo de hilos vivos del motor.

mod executor;
mod result;
mod retry;
mod runner;
mod scheduler;
mod workers;

pub use result::{PipelineResult, PipelineState};
pub use retry::{RetryPolicy, RetryScope};
pub use runner::{create_runner, Runner, RunnerKind, SchedulingStrategy};
pub use workers::live_worker_count;
