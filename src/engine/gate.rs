// Tue Jan 13 2026 - Alex

use crate::engine::worker::WorkerPool;
use std::sync::mpsc::channel;

/// Admission control for the controller thread.
pub struct ConcurrencyGate<'a> {
    pool: &'a WorkerPool,
}

impl<'a> ConcurrencyGate<'a> {
    pub fn new(pool: &'a WorkerPool) -> Self {
        Self { pool }
    }

    pub fn acquire(&self) {
        let (started_tx, started_rx) = channel::<()>();

        self.pool.submit_quiet(move || {
            let _ = started_tx.send(());
        });

        // A dropped sender means the pool discarded the probe while stopping;
        // either way there is nothing left to wait for.
        let _ = started_rx.recv();
    }
}
