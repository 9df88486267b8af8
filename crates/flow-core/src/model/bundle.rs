//! Bundles: lotes de elementos destinados a un único step.
//!
//! Un bundle es la unidad de scheduling: corre completo (o falla) en un solo
//! worker. Lleva el número de intentos fallidos acumulados para que la
//! política de reintentos decida si reencolar o abortar.

use uuid::Uuid;

use super::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BundleKind {
    /// Bundle vacío entregado una vez a cada step sin inputs.
    Root,
    /// Elementos producidos por un commit upstream.
    Data,
    /// Señal: todo el input upstream del step ya hizo commit.
    InputComplete,
}

#[derive(Debug, Clone)]
pub struct Bundle {
    id: Uuid,
    step_id: String,
    kind: BundleKind,
    elements: Vec<Element>,
    failed_attempts: u32,
    retry: bool,
}

impl Bundle {
    fn with(step_id: &str, kind: BundleKind, elements: Vec<Element>) -> Self {
        Self { id: Uuid::new_v4(),
               step_id: step_id.to_string(),
               kind,
               elements,
               failed_attempts: 0,
               retry: false }
    }

    pub fn root(step_id: &str) -> Self {
        Self::with(step_id, BundleKind::Root, Vec::new())
    }

    pub fn data(step_id: &str, elements: Vec<Element>) -> Self {
        Self::with(step_id, BundleKind::Data, elements)
    }

    pub fn input_complete(step_id: &str) -> Self {
        Self::with(step_id, BundleKind::InputComplete, Vec::new())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn kind(&self) -> BundleKind {
        self.kind
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Intentos fallidos acumulados por esta unidad de trabajo.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Número (1-based) del intento que ejecutará este bundle.
    pub fn attempt(&self) -> u32 {
        self.failed_attempts + 1
    }

    /// `true` si el bundle continúa trabajo ya admitido (reintento o split).
    pub fn is_retry(&self) -> bool {
        self.retry
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_attempts += 1;
        self.retry = true;
    }

    /// Parte el bundle en singletons tras un fallo en `failed_index`. El
    /// elemento fallido conserva su cuenta de fallos; el resto arranca de cero.
    pub(crate) fn split_at_failure(self, failed_index: usize) -> Vec<Bundle> {
        let failed_attempts = self.failed_attempts;
        let step_id = self.step_id;
        self.elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| Bundle { id: Uuid::new_v4(),
                                             step_id: step_id.clone(),
                                             kind: BundleKind::Data,
                                             elements: vec![element],
                                             failed_attempts: if index == failed_index { failed_attempts } else { 0 },
                                             retry: true })
            .collect()
    }
}
