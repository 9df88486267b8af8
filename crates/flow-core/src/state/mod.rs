//! Estado keyed transaccional.
//!
//! - `KeyedState`: mapa explícito ventana → tag → secuencia de valores.
//! - `KeyedStateStore`: estado `existing` (commiteado) de un step, con lock
//!   por key para que los commits de una misma key se serialicen y los de
//!   keys distintas no se bloqueen entre sí.
//! - `ExecutionContext` / `StepContext`: dueño de los stores del run y
//!   estado `partial` privado de cada intento de bundle.

mod context;
mod keyed_state;
mod store;

pub use context::{ExecutionContext, KeyedStateHandle, StepContext};
pub use keyed_state::{KeyedState, StateTag, WindowTag};
pub use store::KeyedStateStore;
