// Wed Jan 14 2026 - Alex

use crate::engine::error::{EngineError, TaskFailure};
use crate::engine::handle::TaskHandle;
use crate::output::sink::OutputSink;
use crate::stats::StatsCollector;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

pub struct MergeTracker {
    shard: usize,
    output: TaskHandle<Bytes>,
}

impl MergeTracker {
    pub fn new(shard: usize, output: TaskHandle<Bytes>) -> Self {
        Self { shard, output }
    }

    pub fn shard(&self) -> usize {
        self.shard
    }

    pub fn is_complete(&self) -> bool {
        self.output.is_done()
    }

    pub fn wait_for_complete(&self) {
        self.output.wait_done();
    }

    fn take_output(&self) -> Result<Bytes, TaskFailure> {
        self.output.wait()
    }
}

/// Splices per-shard buffers into the sink strictly in submission order.
pub struct OutputMergeCoordinator {
    trackers: VecDeque<MergeTracker>,
    merged: usize,
    stats: Arc<StatsCollector>,
}

impl OutputMergeCoordinator {
    pub fn new(stats: Arc<StatsCollector>) -> Self {
        Self {
            trackers: VecDeque::new(),
            merged: 0,
            stats,
        }
    }

    pub fn register(&mut self, tracker: MergeTracker) {
        debug_assert!(
            self.trackers.back().map_or(true, |last| last.shard() < tracker.shard()),
            "trackers must be registered in submission order"
        );
        self.trackers.push_back(tracker);
    }

    pub fn backlog(&self) -> usize {
        self.trackers.len()
    }

    pub fn merged_count(&self) -> usize {
        self.merged
    }

    pub fn ready_count(&self) -> usize {
        self.trackers.iter().take_while(|t| t.is_complete()).count()
    }

    /// Without `blocking`, stops at the first tracker whose traversal is still
    /// running. With `blocking`, waits for each one in turn and drains the
    /// queue. A failed traversal stops the flush and raises its failure;
    /// nothing behind it is merged.
    pub fn flush<S: OutputSink + ?Sized>(&mut self, sink: &mut S, blocking: bool) -> Result<usize, EngineError> {
        let start = Instant::now();
        let mut merged = 0;
        let mut bytes = 0u64;

        let outcome = loop {
            let complete = match self.trackers.front() {
                Some(tracker) => tracker.is_complete(),
                None => break Ok(()),
            };

            if !complete && !blocking {
                break Ok(());
            }

            match self.merge_front(sink) {
                Ok(written) => {
                    merged += 1;
                    bytes += written;
                }
                Err(e) => break Err(e),
            }
        };

        if merged > 0 {
            self.stats.record_merge(start.elapsed(), merged as u64, bytes);
            log::trace!("Merged {} shard outputs ({} bytes), blocking = {}", merged, bytes, blocking);
        }

        outcome.map(|()| merged)
    }

    pub fn merge_oldest<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> Result<bool, EngineError> {
        if self.trackers.is_empty() {
            return Ok(false);
        }

        let start = Instant::now();
        let written = self.merge_front(sink)?;
        self.stats.record_merge(start.elapsed(), 1, written);
        Ok(true)
    }

    fn merge_front<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64, EngineError> {
        let tracker = match self.trackers.front() {
            Some(tracker) => tracker,
            None => return Ok(0),
        };

        if !tracker.is_complete() {
            log::trace!("Waiting on output of shard {}", tracker.shard());
            tracker.wait_for_complete();
        }

        // A failed tracker stays queued; the run is over anyway.
        let output = tracker.take_output()?;
        let shard = tracker.shard();

        sink.append(shard, &output).map_err(EngineError::Output)?;

        self.trackers.pop_front();
        self.merged += 1;
        Ok(output.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::TaskStage;
    use crate::output::sink::MemorySink;

    fn coordinator() -> OutputMergeCoordinator {
        OutputMergeCoordinator::new(Arc::new(StatsCollector::new()))
    }

    fn tracker(shard: usize) -> (MergeTracker, TaskHandle<Bytes>) {
        let handle = TaskHandle::new();
        (MergeTracker::new(shard, handle.clone()), handle)
    }

    #[test]
    fn test_non_blocking_flush_stops_at_incomplete_head() {
        let mut merges = coordinator();
        let mut sink = MemorySink::new();
        let (t0, h0) = tracker(0);
        let (t1, h1) = tracker(1);
        merges.register(t0);
        merges.register(t1);

        h1.complete(Ok(Bytes::from_static(b"b")));
        assert_eq!(merges.flush(&mut sink, false).unwrap(), 0);
        assert_eq!(merges.backlog(), 2);
        assert_eq!(merges.ready_count(), 0);

        h0.complete(Ok(Bytes::from_static(b"a")));
        assert_eq!(merges.flush(&mut sink, false).unwrap(), 2);
        assert_eq!(sink.as_str(), Some("ab"));
        assert_eq!(merges.backlog(), 0);
    }

    #[test]
    fn test_blocking_flush_waits_for_pending_output() {
        let mut merges = coordinator();
        let mut sink = MemorySink::new();
        let (t0, h0) = tracker(0);
        merges.register(t0);

        let producer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            h0.complete(Ok(Bytes::from_static(b"late")));
        });

        assert_eq!(merges.flush(&mut sink, true).unwrap(), 1);
        producer.join().unwrap();
        assert_eq!(sink.as_str(), Some("late"));
    }

    #[test]
    fn test_failed_head_blocks_later_shards() {
        let mut merges = coordinator();
        let mut sink = MemorySink::new();
        let (t0, h0) = tracker(0);
        let (t1, h1) = tracker(1);
        let (t2, h2) = tracker(2);
        merges.register(t0);
        merges.register(t1);
        merges.register(t2);

        h0.complete(Ok(Bytes::from_static(b"a")));
        h1.complete(Err(TaskFailure::new(TaskStage::Traversal, Some(1), anyhow::anyhow!("bad"))));
        h2.complete(Ok(Bytes::from_static(b"c")));

        let err = merges.flush(&mut sink, true).unwrap_err();
        assert_eq!(err.task_failure().and_then(|f| f.shard()), Some(1));
        assert_eq!(sink.order(), &[0]);
        assert_eq!(sink.as_str(), Some("a"));
    }

    #[test]
    fn test_merge_oldest_merges_one() {
        let mut merges = coordinator();
        let mut sink = MemorySink::new();
        let (t0, h0) = tracker(0);
        let (t1, h1) = tracker(1);
        merges.register(t0);
        merges.register(t1);
        h0.complete(Ok(Bytes::from_static(b"a")));
        h1.complete(Ok(Bytes::from_static(b"b")));

        assert!(merges.merge_oldest(&mut sink).unwrap());
        assert_eq!(merges.backlog(), 1);
        assert_eq!(merges.merged_count(), 1);
        assert!(merges.merge_oldest(&mut sink).unwrap());
        assert!(!merges.merge_oldest(&mut sink).unwrap());
        assert_eq!(sink.as_str(), Some("ab"));
    }
}
