// Wed Jan 14 2026 - Alex

use crate::engine::error::{TaskFailure, TaskStage};
use crate::engine::handle::TaskHandle;
use crate::engine::logic::ShardLogic;
use crate::stats::StatsCollector;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

pub struct ReduceNode<T> {
    id: u64,
    lhs: TaskHandle<T>,
    rhs: TaskHandle<T>,
    combined: TaskHandle<T>,
}

impl<T: Send + 'static> ReduceNode<T> {
    pub(crate) fn new(id: u64, lhs: TaskHandle<T>, rhs: TaskHandle<T>) -> Self {
        Self {
            id,
            lhs,
            rhs,
            combined: TaskHandle::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        self.lhs.is_done() && self.rhs.is_done()
    }

    pub fn child_failure(&self) -> Option<TaskFailure> {
        self.lhs.failure().or_else(|| self.rhs.failure())
    }

    pub fn combined_handle(&self) -> TaskHandle<T> {
        self.combined.clone()
    }

    #[cfg(test)]
    pub(crate) fn lhs_for_test(&self) -> &TaskHandle<T> {
        &self.lhs
    }

    #[cfg(test)]
    pub(crate) fn rhs_for_test(&self) -> &TaskHandle<T> {
        &self.rhs
    }

    pub fn into_task<L>(self, logic: Arc<L>, stats: Arc<StatsCollector>) -> ReduceTask<L>
    where
        L: ShardLogic<Output = T>,
    {
        ReduceTask {
            node: self,
            logic,
            stats,
        }
    }
}

impl<T> std::fmt::Debug for ReduceNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReduceNode")
            .field("id", &self.id)
            .field("lhs", &self.lhs)
            .field("rhs", &self.rhs)
            .finish()
    }
}

pub struct ReduceTask<L: ShardLogic> {
    node: ReduceNode<L::Output>,
    logic: Arc<L>,
    stats: Arc<StatsCollector>,
}

impl<L: ShardLogic> ReduceTask<L> {
    pub fn run(self) {
        let start = Instant::now();
        let node = &self.node;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.combine()))
            .unwrap_or_else(|payload| Err(TaskFailure::from_panic(TaskStage::Reduce, None, payload)));

        if outcome.is_ok() {
            self.stats.record_reduce(start.elapsed());
        }

        log::trace!("Reduce node {} finished in {:?}", node.id, start.elapsed());
        node.combined.complete(outcome);
    }

    fn combine(&self) -> Result<L::Output, TaskFailure> {
        let lhs = self.node.lhs.wait()?;
        let rhs = self.node.rhs.wait()?;

        let reducer = self.logic.tree_reducible().ok_or_else(|| {
            TaskFailure::new(
                TaskStage::Reduce,
                None,
                anyhow::anyhow!("processing logic has no tree-reduce step"),
            )
        })?;

        reducer
            .tree_reduce(lhs, rhs)
            .map_err(|e| TaskFailure::new(TaskStage::Reduce, None, e))
    }
}
