use flow_core::PipelineError;
use thiserror::Error;

/// Errores del binario de demo y de la capa de aplicación.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error del pipeline: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
}
