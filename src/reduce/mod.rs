// Wed Jan 14 2026 - Alex

pub mod task;
pub mod tree;

pub use task::{ReduceNode, ReduceTask};
pub use tree::ReduceTree;
