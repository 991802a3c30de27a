// Tue Jan 13 2026 - Alex

use crate::engine::error::{TaskFailure, TaskStage};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// One-shot result slot shared between the worker that fills it and the
/// controller or reduce task that consumes it.
pub struct TaskHandle<T> {
    cell: Arc<HandleCell<T>>,
}

struct HandleCell<T> {
    state: Mutex<HandleState<T>>,
    ready: Condvar,
}

enum HandleState<T> {
    Pending,
    Ready(Result<T, TaskFailure>),
    Taken,
}

impl<T> TaskHandle<T> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(HandleCell {
                state: Mutex::new(HandleState::Pending),
                ready: Condvar::new(),
            }),
        }
    }

    /// Fills the slot. A second completion is ignored.
    pub fn complete(&self, value: Result<T, TaskFailure>) {
        let mut state = self.cell.state.lock();
        if let HandleState::Pending = *state {
            *state = HandleState::Ready(value);
            self.cell.ready.notify_all();
        }
    }

    pub fn is_done(&self) -> bool {
        !matches!(*self.cell.state.lock(), HandleState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(*self.cell.state.lock(), HandleState::Ready(Err(_)))
    }

    pub fn failure(&self) -> Option<TaskFailure> {
        match &*self.cell.state.lock() {
            HandleState::Ready(Err(failure)) => Some(failure.clone()),
            _ => None,
        }
    }

    pub fn wait_done(&self) {
        let mut state = self.cell.state.lock();
        while let HandleState::Pending = *state {
            self.cell.ready.wait(&mut state);
        }
    }

    pub fn wait(&self) -> Result<T, TaskFailure> {
        let mut state = self.cell.state.lock();
        while let HandleState::Pending = *state {
            self.cell.ready.wait(&mut state);
        }

        match std::mem::replace(&mut *state, HandleState::Taken) {
            HandleState::Ready(Ok(value)) => Ok(value),
            HandleState::Ready(Err(failure)) => {
                *state = HandleState::Ready(Err(failure.clone()));
                Err(failure)
            }
            HandleState::Taken => Err(TaskFailure::new(
                TaskStage::Fetch,
                None,
                anyhow::anyhow!("result was already consumed"),
            )),
            HandleState::Pending => unreachable!("pending state checked above"),
        }
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> Default for TaskHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.cell.state.lock() {
            HandleState::Pending => "pending",
            HandleState::Ready(Ok(_)) => "ready",
            HandleState::Ready(Err(_)) => "failed",
            HandleState::Taken => "taken",
        };
        f.debug_struct("TaskHandle").field("state", &state).finish()
    }
}
