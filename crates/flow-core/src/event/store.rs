use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{RunEvent, RunEventKind};

/// Almacenamiento de eventos append-only. Compartido entre el coordinador y
/// los workers, por eso trabaja con `&self`.
pub trait EventStore: Send + Sync {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, run_id: Uuid, kind: RunEventKind) -> RunEvent;
    /// Lista eventos de un run (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Vec<RunEvent>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<HashMap<Uuid, Vec<RunEvent>>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&self, run_id: Uuid, kind: RunEventKind) -> RunEvent {
        // el log es diagnóstico: un lock envenenado no debe tumbar el run
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let vec = inner.entry(run_id).or_default();
        let ev = RunEvent { seq: vec.len() as u64,
                            run_id,
                            kind,
                            ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<RunEvent> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.get(&run_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_per_run_and_ordered() {
        let store = InMemoryEventStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(store.append_kind(a, RunEventKind::RunSucceeded).seq, 0);
        assert_eq!(store.append_kind(b, RunEventKind::RunSucceeded).seq, 0);
        assert_eq!(store.append_kind(a, RunEventKind::StepCompleted { step_id: "x".into() }).seq, 1);
        let codes: Vec<_> = store.list(a).iter().map(|e| e.kind.code()).collect();
        assert_eq!(codes, vec!["F", "D"]);
        assert!(store.list(Uuid::new_v4()).is_empty());
    }
}
