use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::ELEMENTS_TAG;
use crate::model::Element;

/// Ventana a la que pertenece un valor de estado.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WindowTag {
    Global,
    Window(String),
}

/// Nombre de una celda de estado dentro de una ventana.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateTag(String);

impl StateTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag donde GroupByKey acumula los valores de la key.
    pub fn elements() -> Self {
        Self::new(ELEMENTS_TAG)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Estado de una key: ventana → tag → valores en orden de inserción.
///
/// Las lecturas nunca crean entradas; sólo `add` y `append_all` lo hacen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyedState {
    windows: IndexMap<WindowTag, IndexMap<StateTag, Vec<Element>>>,
}

impl KeyedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega `value` al final de la secuencia `window/tag`. Nunca deduplica.
    pub fn add(&mut self, window: WindowTag, tag: StateTag, value: Element) {
        self.windows.entry(window).or_default().entry(tag).or_default().push(value);
    }

    pub fn get(&self, window: &WindowTag, tag: &StateTag) -> Option<&[Element]> {
        self.windows.get(window).and_then(|tags| tags.get(tag)).map(Vec::as_slice)
    }

    pub fn windows(&self) -> impl Iterator<Item = (&WindowTag, &IndexMap<StateTag, Vec<Element>>)> {
        self.windows.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.values().all(|tags| tags.values().all(Vec::is_empty))
    }

    /// Cantidad total de valores en todas las ventanas y tags.
    pub fn value_count(&self) -> usize {
        self.windows.values().flat_map(|tags| tags.values()).map(Vec::len).sum()
    }

    /// Fusiona `delta` a continuación del estado actual: por cada ventana/tag
    /// los valores de `delta` van después de los existentes.
    pub fn append_all(&mut self, delta: KeyedState) {
        for (window, tags) in delta.windows {
            let target = self.windows.entry(window).or_default();
            for (tag, values) in tags {
                target.entry(tag).or_default().extend(values);
            }
        }
    }
}
