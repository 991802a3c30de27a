// Tue Jan 13 2026 - Alex

pub mod error;
pub mod gate;
pub mod handle;
pub mod logic;
pub mod scheduler;
pub mod traversal;
pub mod worker;

pub use error::{EngineError, TaskFailure, TaskStage};
pub use gate::ConcurrencyGate;
pub use handle::TaskHandle;
pub use logic::{DataProvider, ShardContext, ShardLogic, TaskMemo, TreeReducible};
pub use scheduler::Scheduler;
pub use traversal::ShardTraversalTask;
pub use worker::{CompletionSignal, WorkerPool};
