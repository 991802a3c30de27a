// Tue Jan 15 2026 - Alex

pub mod config;
pub mod engine;
pub mod output;
pub mod reduce;
pub mod stats;
pub mod utils;

pub use config::{ConfigError, SchedulerConfig};
pub use engine::{
    DataProvider, EngineError, Scheduler, ShardContext, ShardLogic, TaskFailure, TaskStage,
    TreeReducible,
};
pub use output::{MemorySink, NullSink, OutputSink, ShardBuffer, WriterSink};
pub use stats::{SchedulerMonitor, StatsSnapshot};
