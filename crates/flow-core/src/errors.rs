//! Errores del core.
//!
//! Dos familias conviven aquí:
//! - `UserCodeError`: fallo levantado por código de usuario (start/process/
//!   finish de un evaluador). Consume presupuesto de reintentos.
//! - `PipelineError`: error observable de un run. `UserCode` envuelve al
//!   último `UserCodeError` cuando se agotan los reintentos; `Protocol` indica
//!   una violación de invariantes en commit/discard y aborta de inmediato.

use std::any::Any;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallo de código de usuario. El mensaje se preserva tal cual hasta el
/// llamador de `wait_until_finish`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[error("{message}")]
pub struct UserCodeError {
    pub message: String,
}

impl UserCodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Convierte el payload de un panic capturado en un fallo de usuario.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(format!("panic in user code: {detail}"))
    }
}

impl From<&str> for UserCodeError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for UserCodeError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<PipelineError> for UserCodeError {
    fn from(err: PipelineError) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("step '{step_id}' failed after {attempts} attempt(s): {source}")]
    UserCode {
        step_id: String,
        attempts: u32,
        #[source]
        source: UserCodeError,
    },
    #[error("protocol violation: {0}")] Protocol(String),
    #[error("invalid pipeline graph: {0}")] InvalidGraph(String),
    #[error("no evaluator registered for transform kind '{0}'")] UnknownTransform(String),
    #[error("unknown runner: {0}")] UnknownRunner(String),
    #[error("configuration error: {0}")] Config(String),
    #[error("internal: {0}")] Internal(String),
}

impl PipelineError {
    /// Fallo de usuario original si este error proviene de reintentos
    /// agotados.
    pub fn user_error(&self) -> Option<&UserCodeError> {
        match self {
            PipelineError::UserCode { source, .. } => Some(source),
            _ => None,
        }
    }
}
