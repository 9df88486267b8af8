//! Constantes del motor core.
//!
//! Valores por defecto del runner y etiquetas estables compartidas entre el
//! scheduler, el store de estado y los evaluadores concretos.

/// Versión lógica del motor. Se incluye en el hash de definición del
/// pipeline para que un cambio de versión invalide los hashes previos.
pub const ENGINE_VERSION: &str = "B1.0";

/// Intentos máximos por unidad de trabajo antes de abortar el run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Hilos del pool para las estrategias con pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Elementos máximos por bundle al enrutar outputs hacia un consumidor.
pub const DEFAULT_MAX_BUNDLE_SIZE: usize = 1000;

/// Cota por defecto de un bounded trie (número de hojas).
pub const DEFAULT_BOUNDED_TRIE_SIZE: usize = 100;

/// Tag de estado donde GroupByKey acumula los valores de cada key.
pub const ELEMENTS_TAG: &str = "elements";
