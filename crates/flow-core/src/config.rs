//! Configuración del runner desde variables de entorno.
//!
//! `.env` se carga una sola vez; las variables ausentes toman el valor por
//! defecto y las presentes pero inválidas se reportan como
//! `PipelineError::Config`.

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::constants::{DEFAULT_BOUNDED_TRIE_SIZE, DEFAULT_MAX_BUNDLE_SIZE, DEFAULT_WORKERS};
use crate::engine::{RetryPolicy, RetryScope};
use crate::errors::PipelineError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // sin .env no es error
});

pub const ENV_WORKERS: &str = "BUNDLEFLOW_WORKERS";
pub const ENV_MAX_BUNDLE_SIZE: &str = "BUNDLEFLOW_MAX_BUNDLE_SIZE";
pub const ENV_MAX_ATTEMPTS: &str = "BUNDLEFLOW_MAX_ATTEMPTS";
pub const ENV_RETRY_SCOPE: &str = "BUNDLEFLOW_RETRY_SCOPE";
pub const ENV_BOUNDED_TRIE_SIZE: &str = "BUNDLEFLOW_BOUNDED_TRIE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub workers: usize,
    pub max_bundle_size: usize,
    pub retry: RetryPolicy,
    pub bounded_trie_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS,
               max_bundle_size: DEFAULT_MAX_BUNDLE_SIZE,
               retry: RetryPolicy::default(),
               bounded_trie_size: DEFAULT_BOUNDED_TRIE_SIZE }
    }
}

fn read_var<T: FromStr>(name: &str, default: T) -> Result<T, PipelineError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| PipelineError::Config(format!("{name}: invalid value '{raw}'")))
        }
        _ => Ok(default),
    }
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let scope = match env::var(ENV_RETRY_SCOPE) {
            Ok(raw) if !raw.trim().is_empty() => raw.parse::<RetryScope>()?,
            _ => defaults.retry.scope,
        };
        let cfg = Self { workers: read_var(ENV_WORKERS, defaults.workers)?,
                         max_bundle_size: read_var(ENV_MAX_BUNDLE_SIZE, defaults.max_bundle_size)?,
                         retry: RetryPolicy::new(read_var(ENV_MAX_ATTEMPTS, defaults.retry.max_attempts)?, scope),
                         bounded_trie_size: read_var(ENV_BOUNDED_TRIE_SIZE, defaults.bounded_trie_size)? };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_bundle_size(mut self, max_bundle_size: usize) -> Self {
        self.max_bundle_size = max_bundle_size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_scope(mut self, scope: RetryScope) -> Self {
        self.retry.scope = scope;
        self
    }

    pub fn with_bounded_trie_size(mut self, bounded_trie_size: usize) -> Self {
        self.bounded_trie_size = bounded_trie_size;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::Config("workers must be at least 1".to_string()));
        }
        if self.max_bundle_size == 0 {
            return Err(PipelineError::Config("max_bundle_size must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.bounded_trie_size == 0 {
            return Err(PipelineError::Config("bounded_trie_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
