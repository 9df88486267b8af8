//! flow-core: motor local de pipelines por bundles.
//!
//! Estado keyed transaccional (existing / partial), scheduler con protocolo
//! de reintentos y commit, y métricas committed / attempted sobre el mismo
//! límite de commit.
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod state;
pub mod transform;

pub use config::RunnerConfig;
pub use engine::{create_runner, live_worker_count, PipelineResult, PipelineState, RetryPolicy, RetryScope, Runner,
                 RunnerKind, SchedulingStrategy};
pub use errors::{PipelineError, UserCodeError};
pub use event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
pub use metrics::{MetricKey, MetricName, MetricQueryResults, MetricResult, MetricsFilter};
pub use model::{Bundle, BundleKind, Element, StateKey};
pub use pipeline::{Pipeline, SharedRegistry};
pub use state::{ExecutionContext, KeyedState, KeyedStateStore, StateTag, StepContext, WindowTag};
pub use transform::{BundleContext, EvaluatorRegistry, StepSpec, Transform, TransformEvaluator};
