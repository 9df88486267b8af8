//! Construcción del grafo de steps y registro compartido de handles.

mod definition;
mod shared;

pub use definition::Pipeline;
pub use shared::SharedRegistry;
