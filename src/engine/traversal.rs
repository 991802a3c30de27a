// Tue Jan 13 2026 - Alex

use crate::engine::error::{TaskFailure, TaskStage};
use crate::engine::handle::TaskHandle;
use crate::engine::logic::{DataProvider, ShardContext, ShardLogic, TaskMemo};
use crate::output::buffer::ShardBuffer;
use crate::stats::StatsCollector;
use anyhow::Context;
use bytes::Bytes;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Traversal of a single shard, built on the controller and run on a worker.
pub struct ShardTraversalTask<L: ShardLogic, P> {
    index: usize,
    shard: L::Shard,
    logic: Arc<L>,
    provider: Arc<P>,
    stats: Arc<StatsCollector>,
    result: TaskHandle<L::Output>,
    output: TaskHandle<Bytes>,
}

impl<L, P> ShardTraversalTask<L, P>
where
    L: ShardLogic,
    P: DataProvider<L::Shard, Data = L::Data>,
{
    pub fn new(
        index: usize,
        shard: L::Shard,
        logic: Arc<L>,
        provider: Arc<P>,
        stats: Arc<StatsCollector>,
    ) -> Self {
        Self {
            index,
            shard,
            logic,
            provider,
            stats,
            result: TaskHandle::new(),
            output: TaskHandle::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn result_handle(&self) -> TaskHandle<L::Output> {
        self.result.clone()
    }

    pub fn output_handle(&self) -> TaskHandle<Bytes> {
        self.output.clone()
    }

    pub fn run(self) {
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.traverse()))
            .unwrap_or_else(|payload| {
                Err(TaskFailure::from_panic(TaskStage::Traversal, Some(self.index), payload))
            });

        let elapsed = start.elapsed();
        self.stats.record_traversal(elapsed, outcome.is_ok());

        match outcome {
            Ok((value, buffer)) => {
                log::trace!(
                    "Shard {} traversed in {:.2}ms ({} bytes buffered)",
                    self.index,
                    elapsed.as_secs_f64() * 1000.0,
                    buffer.len()
                );
                self.output.complete(Ok(buffer.freeze()));
                self.result.complete(Ok(value));
            }
            Err(failure) => {
                log::debug!("Shard {} failed: {}", self.index, failure);
                self.output.complete(Err(failure.clone()));
                self.result.complete(Err(failure));
            }
        }
    }

    fn traverse(&self) -> Result<(L::Output, ShardBuffer), TaskFailure> {
        let failed = |e: anyhow::Error| TaskFailure::new(TaskStage::Traversal, Some(self.index), e);

        let data = self
            .provider
            .provide(&self.shard)
            .with_context(|| format!("loading data for shard {}", self.index))
            .map_err(failed)?;

        let mut buffer = ShardBuffer::new();
        let mut memo = TaskMemo::new();

        let value = {
            let mut ctx = ShardContext::new(self.index, &self.shard, data, &mut buffer, &mut memo);
            self.logic.map(&mut ctx).map_err(failed)?
        };

        Ok((value, buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::logic::TreeReducible;

    struct Doubler;

    impl ShardLogic for Doubler {
        type Shard = u64;
        type Data = u64;
        type Output = u64;

        fn map(&self, ctx: &mut ShardContext<'_, u64, u64>) -> anyhow::Result<u64> {
            if *ctx.data() == 13 {
                anyhow::bail!("unlucky shard");
            }
            if *ctx.data() == 99 {
                panic!("exploded");
            }
            let doubled = ctx.data() * 2;
            ctx.output().push_str(&format!("[{}]", doubled));
            Ok(doubled)
        }

        fn tree_reducible(&self) -> Option<&dyn TreeReducible<u64>> {
            None
        }
    }

    fn task(shard: u64) -> ShardTraversalTask<Doubler, fn(&u64) -> anyhow::Result<u64>> {
        let provider: fn(&u64) -> anyhow::Result<u64> = |s| Ok(*s);
        ShardTraversalTask::new(0, shard, Arc::new(Doubler), Arc::new(provider), Arc::new(StatsCollector::new()))
    }

    #[test]
    fn test_successful_traversal_fills_both_handles() {
        let task = task(21);
        let result = task.result_handle();
        let output = task.output_handle();
        task.run();

        assert_eq!(result.wait().unwrap(), 42);
        assert_eq!(&output.wait().unwrap()[..], b"[42]");
    }

    #[test]
    fn test_failed_traversal_fails_both_handles() {
        let task = task(13);
        let result = task.result_handle();
        let output = task.output_handle();
        task.run();

        let err = result.wait().unwrap_err();
        assert_eq!(err.stage(), TaskStage::Traversal);
        assert!(err.to_string().contains("unlucky shard"));
        assert!(output.is_failed());
    }

    #[test]
    fn test_panicking_traversal_becomes_failure() {
        let task = task(99);
        let result = task.result_handle();
        task.run();

        assert!(result.wait().unwrap_err().to_string().contains("exploded"));
    }
}
