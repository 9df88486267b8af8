//! Tipos de evento de un run y estructura `RunEvent`.
//!
//! Rol en el motor:
//! - El scheduler y los workers emiten eventos a un `EventStore` append-only.
//! - Los eventos son diagnóstico observable: permiten contar intentos,
//!   reintentos y commits sin inspeccionar estructuras internas.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{PipelineError, UserCodeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Primer evento de un run: fija el hash de definición.
    RunStarted { definition_hash: String, step_count: usize },
    /// Un worker tomó un bundle. No implica éxito.
    BundleStarted {
        bundle_id: Uuid,
        step_id: String,
        attempt: u32,
        elements: usize,
    },
    /// El intento terminó bien y su estado parcial ya es visible.
    BundleCommitted {
        bundle_id: Uuid,
        step_id: String,
        attempt: u32,
        outputs: usize,
        keys: usize,
    },
    /// El intento falló; su estado parcial fue descartado.
    BundleFailed {
        bundle_id: Uuid,
        step_id: String,
        attempt: u32,
        error: UserCodeError,
    },
    /// Trabajo reencolado tras un fallo (bundle completo o split).
    RetryScheduled {
        bundle_id: Uuid,
        step_id: String,
        attempt: u32,
        elements: usize,
    },
    /// Bundle nunca despachado porque el run ya estaba abortando.
    BundleAbandoned { bundle_id: Uuid, step_id: String },
    StepCompleted { step_id: String },
    RunSucceeded,
    RunFailed { error: PipelineError },
}

impl RunEventKind {
    /// Código compacto de una letra (útil en tests y logs).
    pub fn code(&self) -> &'static str {
        match self {
            RunEventKind::RunStarted { .. } => "I",
            RunEventKind::BundleStarted { .. } => "S",
            RunEventKind::BundleCommitted { .. } => "C",
            RunEventKind::BundleFailed { .. } => "X",
            RunEventKind::RetryScheduled { .. } => "R",
            RunEventKind::BundleAbandoned { .. } => "A",
            RunEventKind::StepCompleted { .. } => "D",
            RunEventKind::RunSucceeded => "F",
            RunEventKind::RunFailed { .. } => "E",
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            RunEventKind::BundleStarted { step_id, .. }
            | RunEventKind::BundleCommitted { step_id, .. }
            | RunEventKind::BundleFailed { step_id, .. }
            | RunEventKind::RetryScheduled { step_id, .. }
            | RunEventKind::BundleAbandoned { step_id, .. }
            | RunEventKind::StepCompleted { step_id } => Some(step_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>,
}
