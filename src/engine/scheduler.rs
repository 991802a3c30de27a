// Tue Jan 13 2026 - Alex

use crate::config::SchedulerConfig;
use crate::engine::error::EngineError;
use crate::engine::gate::ConcurrencyGate;
use crate::engine::logic::{DataProvider, ShardLogic};
use crate::engine::traversal::ShardTraversalTask;
use crate::engine::worker::WorkerPool;
use crate::output::merge::{MergeTracker, OutputMergeCoordinator};
use crate::output::sink::OutputSink;
use crate::reduce::ReduceTree;
use crate::stats::{SchedulerMonitor, StatsCollector};
use crate::utils::logging::ScopedTimer;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct Scheduler {
    config: SchedulerConfig,
    stats: Arc<StatsCollector>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            stats: Arc::new(StatsCollector::new()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn monitor(&self) -> SchedulerMonitor {
        SchedulerMonitor::new(self.stats.clone())
    }

    /// Processes every shard and returns the left-to-right fold of their
    /// results, or `None` when there were no shards.
    pub fn run<L, P, I, K>(
        &self,
        logic: Arc<L>,
        shards: I,
        provider: Arc<P>,
        sink: &mut K,
    ) -> Result<Option<L::Output>, EngineError>
    where
        L: ShardLogic,
        P: DataProvider<L::Shard, Data = L::Data>,
        I: IntoIterator<Item = L::Shard>,
        K: OutputSink + ?Sized,
    {
        let _timer = ScopedTimer::new("scheduler run");

        match self.execute(logic, shards, provider, sink) {
            Ok(result) => {
                if self.config.log_summary {
                    self.log_summary();
                }
                Ok(result)
            }
            Err(e) => {
                log::warn!("Run aborted: {}", e);
                Err(e)
            }
        }
    }

    fn execute<L, P, I, K>(
        &self,
        logic: Arc<L>,
        shards: I,
        provider: Arc<P>,
        sink: &mut K,
    ) -> Result<Option<L::Output>, EngineError>
    where
        L: ShardLogic,
        P: DataProvider<L::Shard, Data = L::Data>,
        I: IntoIterator<Item = L::Shard>,
        K: OutputSink + ?Sized,
    {
        self.config
            .validate()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        if logic.tree_reducible().is_none() {
            return Err(EngineError::Configuration(
                "processing logic does not provide a tree-reduce step".to_string(),
            ));
        }

        logic.initialize().map_err(EngineError::Initialization)?;

        let pool = WorkerPool::new(self.config.pool_size).map_err(EngineError::Resource)?;
        let signal = pool.completion_signal().clone();
        let gate = ConcurrencyGate::new(&pool);

        let mut unstarted: VecDeque<L::Shard> = shards.into_iter().collect();
        let total = unstarted.len();
        self.stats.reset(total);

        log::debug!(
            "Starting run: {} shards, {} workers, merge cap {}",
            total,
            pool.size(),
            self.config.max_outstanding_merges
        );

        let mut tree: ReduceTree<L::Output> = ReduceTree::new();
        let mut merges = OutputMergeCoordinator::new(self.stats.clone());
        let cap = self.config.max_outstanding_merges;
        let poll_interval = self.config.poll_interval();
        let mut next_index = 0usize;

        if unstarted.is_empty() {
            tree.complete();
        }

        while !unstarted.is_empty() || tree.has_pending() {
            if merges.backlog() >= cap {
                merges.flush(sink, false)?;
                while merges.backlog() >= cap {
                    merges.merge_oldest(sink)?;
                }
            }

            gate.acquire();
            let seen = signal.epoch();

            if let Some(node) = tree.take_ready()? {
                log::debug!("Submitting reduce node {}", node.id());
                let task = node.into_task(logic.clone(), self.stats.clone());
                pool.submit(move || task.run());
            } else if let Some(shard) = unstarted.pop_front() {
                let index = next_index;
                next_index += 1;

                let task = ShardTraversalTask::new(
                    index,
                    shard,
                    logic.clone(),
                    provider.clone(),
                    self.stats.clone(),
                );
                tree.add_entry(task.result_handle());
                merges.register(MergeTracker::new(index, task.output_handle()));

                log::debug!("Submitting traversal of shard {}", task.index());
                pool.submit(move || task.run());

                if unstarted.is_empty() {
                    tree.complete();
                }
            } else {
                signal.wait_past(seen, poll_interval);
                merges.flush(sink, false)?;
            }

            self.stats
                .set_queue_depths(unstarted.len(), tree.pending_count(), merges.backlog());
        }

        merges.flush(sink, true)?;
        self.stats.set_queue_depths(0, 0, merges.backlog());
        pool.shutdown();

        let result = match tree.into_root() {
            Some(root) => Some(root.wait()?),
            None => None,
        };

        logic.on_done(result.as_ref());
        sink.close().map_err(EngineError::Output)?;

        Ok(result)
    }

    fn log_summary(&self) {
        let snapshot = self.stats.snapshot();
        log::info!(
            "Processed {} shards: {} reduces, {} outputs merged ({} bytes)",
            snapshot.total_shards,
            snapshot.completed_reduces,
            snapshot.merged_outputs,
            snapshot.merged_bytes
        );
        log::info!(
            "Traversal {:.2}ms total ({:.2}ms avg), reduce {:.2}ms total ({:.2}ms avg), merge {:.2}ms total ({:.2}ms avg)",
            snapshot.total_traversal_ms,
            snapshot.avg_traversal_ms,
            snapshot.total_reduce_ms,
            snapshot.avg_reduce_ms,
            snapshot.total_merge_ms,
            snapshot.avg_merge_ms
        );
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
