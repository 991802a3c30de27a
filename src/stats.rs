// Wed Jan 14 2026 - Alex

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct StatsCollector {
    total_shards: AtomicUsize,
    remaining_shards: AtomicUsize,
    pending_reduces: AtomicUsize,
    pending_merges: AtomicUsize,
    timings: Mutex<Timings>,
}

#[derive(Debug, Default, Clone)]
struct Timings {
    completed_traversals: u64,
    failed_traversals: u64,
    traversal_time: Duration,
    completed_reduces: u64,
    reduce_time: Duration,
    merged_outputs: u64,
    merged_bytes: u64,
    merge_passes: u64,
    merge_time: Duration,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self, total_shards: usize) {
        self.total_shards.store(total_shards, Ordering::SeqCst);
        self.remaining_shards.store(total_shards, Ordering::SeqCst);
        self.pending_reduces.store(0, Ordering::SeqCst);
        self.pending_merges.store(0, Ordering::SeqCst);
        *self.timings.lock() = Timings::default();
    }

    pub fn record_traversal(&self, elapsed: Duration, succeeded: bool) {
        let mut timings = self.timings.lock();
        timings.traversal_time += elapsed;
        if succeeded {
            timings.completed_traversals += 1;
        } else {
            timings.failed_traversals += 1;
        }
    }

    pub fn record_reduce(&self, elapsed: Duration) {
        let mut timings = self.timings.lock();
        timings.reduce_time += elapsed;
        timings.completed_reduces += 1;
    }

    pub fn record_merge(&self, elapsed: Duration, outputs: u64, bytes: u64) {
        let mut timings = self.timings.lock();
        timings.merge_time += elapsed;
        timings.merge_passes += 1;
        timings.merged_outputs += outputs;
        timings.merged_bytes += bytes;
    }

    pub fn set_queue_depths(&self, remaining_shards: usize, pending_reduces: usize, pending_merges: usize) {
        self.remaining_shards.store(remaining_shards, Ordering::SeqCst);
        self.pending_reduces.store(pending_reduces, Ordering::SeqCst);
        self.pending_merges.store(pending_merges, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let timings = self.timings.lock().clone();

        StatsSnapshot {
            total_shards: self.total_shards.load(Ordering::SeqCst),
            remaining_shards: self.remaining_shards.load(Ordering::SeqCst),
            pending_reduces: self.pending_reduces.load(Ordering::SeqCst),
            pending_merges: self.pending_merges.load(Ordering::SeqCst),
            completed_traversals: timings.completed_traversals,
            failed_traversals: timings.failed_traversals,
            completed_reduces: timings.completed_reduces,
            merged_outputs: timings.merged_outputs,
            merged_bytes: timings.merged_bytes,
            total_traversal_ms: millis(timings.traversal_time),
            avg_traversal_ms: average_millis(timings.traversal_time, timings.completed_traversals + timings.failed_traversals),
            total_reduce_ms: millis(timings.reduce_time),
            avg_reduce_ms: average_millis(timings.reduce_time, timings.completed_reduces),
            total_merge_ms: millis(timings.merge_time),
            avg_merge_ms: average_millis(timings.merge_time, timings.merge_passes),
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn average_millis(total: Duration, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        millis(total) / count as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_shards: usize,
    pub remaining_shards: usize,
    pub pending_reduces: usize,
    pub pending_merges: usize,
    pub completed_traversals: u64,
    pub failed_traversals: u64,
    pub completed_reduces: u64,
    pub merged_outputs: u64,
    pub merged_bytes: u64,
    pub total_traversal_ms: f64,
    pub avg_traversal_ms: f64,
    pub total_reduce_ms: f64,
    pub avg_reduce_ms: f64,
    pub total_merge_ms: f64,
    pub avg_merge_ms: f64,
}

impl StatsSnapshot {
    pub fn progress(&self) -> f64 {
        if self.total_shards == 0 {
            1.0
        } else {
            self.completed_traversals as f64 / self.total_shards as f64
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Clone)]
pub struct SchedulerMonitor {
    stats: Arc<StatsCollector>,
}

impl SchedulerMonitor {
    pub(crate) fn new(stats: Arc<StatsCollector>) -> Self {
        Self { stats }
    }

    pub fn total_shards(&self) -> usize {
        self.stats.total_shards.load(Ordering::SeqCst)
    }

    pub fn remaining_shards(&self) -> usize {
        self.stats.remaining_shards.load(Ordering::SeqCst)
    }

    pub fn pending_reduces(&self) -> usize {
        self.stats.pending_reduces.load(Ordering::SeqCst)
    }

    pub fn pending_merges(&self) -> usize {
        self.stats.pending_merges.load(Ordering::SeqCst)
    }

    pub fn total_traversal_time(&self) -> Duration {
        self.stats.timings.lock().traversal_time
    }

    pub fn avg_traversal_time(&self) -> Duration {
        let timings = self.stats.timings.lock();
        average(timings.traversal_time, timings.completed_traversals + timings.failed_traversals)
    }

    pub fn total_reduce_time(&self) -> Duration {
        self.stats.timings.lock().reduce_time
    }

    pub fn avg_reduce_time(&self) -> Duration {
        let timings = self.stats.timings.lock();
        average(timings.reduce_time, timings.completed_reduces)
    }

    pub fn total_merge_time(&self) -> Duration {
        self.stats.timings.lock().merge_time
    }

    /// Averaged over merge passes; one pass may append several outputs.
    pub fn avg_merge_time(&self) -> Duration {
        let timings = self.stats.timings.lock();
        average(timings.merge_time, timings.merge_passes)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        Duration::ZERO
    } else {
        total / count.min(u32::MAX as u64) as u32
    }
}
