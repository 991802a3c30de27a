// Tue Jan 13 2026 - Alex

pub mod buffer;
pub mod merge;
pub mod sink;

pub use buffer::ShardBuffer;
pub use merge::{MergeTracker, OutputMergeCoordinator};
pub use sink::{MemorySink, NullSink, OutputSink, WriterSink};
