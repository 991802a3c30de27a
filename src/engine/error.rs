// Tue Jan 13 2026 - Alex

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Traversal,
    Reduce,
    Fetch,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStage::Traversal => write!(f, "traversal"),
            TaskStage::Reduce => write!(f, "tree reduce"),
            TaskStage::Fetch => write!(f, "result fetch"),
        }
    }
}

/// A failure raised inside a pool task, captured in its handle.
#[derive(Error, Debug, Clone)]
#[error("{stage} failed{}: {cause:#}", shard_suffix(.shard))]
pub struct TaskFailure {
    stage: TaskStage,
    shard: Option<usize>,
    cause: Arc<anyhow::Error>,
}

fn shard_suffix(shard: &Option<usize>) -> String {
    match shard {
        Some(index) => format!(" on shard {}", index),
        None => String::new(),
    }
}

impl TaskFailure {
    pub fn new(stage: TaskStage, shard: Option<usize>, cause: anyhow::Error) -> Self {
        Self {
            stage,
            shard,
            cause: Arc::new(cause),
        }
    }

    pub fn from_panic(stage: TaskStage, shard: Option<usize>, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::new(stage, shard, anyhow::anyhow!("task panicked: {}", message))
    }

    pub fn stage(&self) -> TaskStage {
        self.stage
    }

    pub fn shard(&self) -> Option<usize> {
        self.shard
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Unable to set up worker pool: {0}")]
    Resource(#[source] std::io::Error),
    #[error("Initialization failed: {0:#}")]
    Initialization(anyhow::Error),
    #[error("Task failed: {0}")]
    TaskFailed(#[from] TaskFailure),
    #[error("Output error: {0}")]
    Output(#[source] std::io::Error),
}

impl EngineError {
    pub fn task_failure(&self) -> Option<&TaskFailure> {
        match self {
            EngineError::TaskFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_includes_shard_and_chain() {
        let cause = anyhow::anyhow!("disk gone").context("reading shard data");
        let failure = TaskFailure::new(TaskStage::Traversal, Some(7), cause);

        let text = failure.to_string();
        assert!(text.contains("traversal failed on shard 7"));
        assert!(text.contains("reading shard data"));
        assert!(text.contains("disk gone"));
    }

    #[test]
    fn test_panic_payload_is_preserved() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("bad input");
        let failure = TaskFailure::from_panic(TaskStage::Reduce, None, payload);

        assert_eq!(failure.stage(), TaskStage::Reduce);
        assert!(failure.to_string().contains("task panicked: bad input"));
    }

    #[test]
    fn test_engine_error_exposes_task_failure() {
        let failure = TaskFailure::new(TaskStage::Traversal, Some(1), anyhow::anyhow!("x"));
        let err = EngineError::from(failure);
        assert_eq!(err.task_failure().and_then(|f| f.shard()), Some(1));
    }
}
