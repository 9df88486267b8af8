//! Modelo de datos neutral del motor: elementos, keys de estado y bundles.

pub mod bundle;
pub mod element;

pub use bundle::{Bundle, BundleKind};
pub use element::{Element, StateKey};
