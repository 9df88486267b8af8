//! Política de reintentos: cota de intentos por unidad de trabajo y alcance
//! (elemento o bundle completo).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_ATTEMPTS;
use crate::errors::PipelineError;
use crate::model::Bundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryScope {
    /// Un fallo en el elemento i parte el bundle en singletons; cada
    /// elemento lleva su propia cuenta de intentos.
    #[default]
    Element,
    /// El bundle completo se reintenta como unidad.
    Bundle,
}

impl RetryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryScope::Element => "element",
            RetryScope::Bundle => "bundle",
        }
    }
}

impl fmt::Display for RetryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryScope {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "element" => Ok(RetryScope::Element),
            "bundle" => Ok(RetryScope::Bundle),
            other => Err(PipelineError::Config(format!("unknown retry scope '{other}' (expected element|bundle)"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub scope: RetryScope,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS,
               scope: RetryScope::default() }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, scope: RetryScope) -> Self {
        Self { max_attempts,
               scope }
    }

    /// `true` si `failures` fallos acumulados agotan el presupuesto.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }

    /// Reencola `bundle` tras un fallo no agotado. `failed_element` es el
    /// índice del elemento que falló, si el fallo ocurrió procesando uno.
    pub fn requeue(&self, mut bundle: Bundle, failed_element: Option<usize>) -> Vec<Bundle> {
        bundle.record_failure();
        match (self.scope, failed_element) {
            (RetryScope::Element, Some(index)) if bundle.len() > 1 => bundle.split_at_failure(index),
            _ => vec![bundle],
        }
    }
}
