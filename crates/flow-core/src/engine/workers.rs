//! Conteo de hilos vivos del motor (coordinadores y workers de pool).

use std::sync::atomic::{AtomicUsize, Ordering};

static LIVE_WORKERS: AtomicUsize = AtomicUsize::new(0);

/// Hilos del motor vivos en el proceso. Tras `wait_until_finish` vuelve al
/// valor previo al run.
pub fn live_worker_count() -> usize {
    LIVE_WORKERS.load(Ordering::SeqCst)
}

/// Registra el hilo actual mientras el guard vive.
#[derive(Debug)]
pub(crate) struct WorkerGuard(());

impl WorkerGuard {
    pub(crate) fn register() -> Self {
        LIVE_WORKERS.fetch_add(1, Ordering::SeqCst);
        WorkerGuard(())
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        LIVE_WORKERS.fetch_sub(1, Ordering::SeqCst);
    }
}
