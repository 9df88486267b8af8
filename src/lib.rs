//! BundleFlow Rust Library
//!
//! Este crate agrupa el motor y los transforms:
//! - Re-exporta `flow_core` (runners, estado keyed, métricas) y
//!   `flow_adapters` (Create, ParDo, GroupByKey, ...).
//! - Expone `errors` con el error de aplicación.
//! - Expone `demo` con los pipelines que usa `main.rs`.

pub mod demo;
pub mod errors;

pub use flow_adapters;
pub use flow_core;

pub use errors::AppError;
