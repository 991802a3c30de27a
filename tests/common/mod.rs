//! Shard logic shared by the integration and property tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use shard_scheduler::{
    OutputSink, SchedulerConfig, ShardContext, ShardLogic, TreeReducible,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One test shard: the text it produces and how long it takes.
#[derive(Debug, Clone)]
pub struct Piece {
    pub text: String,
    pub delay: Duration,
    pub fail: bool,
}

impl Piece {
    pub fn new(text: &str, delay_ms: u64) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::from_millis(delay_ms),
            fail: false,
        }
    }

    pub fn failing(text: &str, delay_ms: u64) -> Self {
        Self {
            fail: true,
            ..Self::new(text, delay_ms)
        }
    }
}

/// Concatenates shard texts. Not commutative, so any reordering shows up.
#[derive(Default)]
pub struct Concat {
    pub started: AtomicUsize,
    pub completion_order: Mutex<Vec<usize>>,
    pub merged: Option<Arc<AtomicUsize>>,
    pub max_unmerged: AtomicUsize,
}

impl Concat {
    /// Tracks how far traversal starts run ahead of merged output.
    pub fn watching(merged: Arc<AtomicUsize>) -> Self {
        Self {
            merged: Some(merged),
            ..Self::default()
        }
    }
}

impl ShardLogic for Concat {
    type Shard = Piece;
    type Data = ();
    type Output = String;

    fn map(&self, ctx: &mut ShardContext<'_, Piece, ()>) -> anyhow::Result<String> {
        let started = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(merged) = &self.merged {
            let unmerged = started.saturating_sub(merged.load(Ordering::SeqCst));
            self.max_unmerged.fetch_max(unmerged, Ordering::SeqCst);
        }

        let piece = ctx.shard().clone();
        thread::sleep(piece.delay);

        if piece.fail {
            anyhow::bail!("shard {} rejected", ctx.index());
        }

        ctx.output().push_str(&piece.text);
        self.completion_order.lock().push(ctx.index());
        Ok(piece.text)
    }

    fn tree_reducible(&self) -> Option<&dyn TreeReducible<String>> {
        Some(self)
    }
}

impl TreeReducible<String> for Concat {
    fn tree_reduce(&self, lhs: String, rhs: String) -> anyhow::Result<String> {
        Ok(lhs + &rhs)
    }
}

pub type Unit = fn(&Piece) -> anyhow::Result<()>;

pub fn unit_provider() -> Arc<Unit> {
    let provide: Unit = |_| Ok(());
    Arc::new(provide)
}

pub fn config(pool_size: usize) -> SchedulerConfig {
    SchedulerConfig::new()
        .with_pool_size(pool_size)
        .with_poll_interval(Duration::from_millis(5))
        .with_log_summary(false)
}

/// Sink that publishes how many segments it has accepted.
pub struct CountingSink {
    pub data: Vec<u8>,
    pub order: Vec<usize>,
    pub appended: Arc<AtomicUsize>,
}

impl CountingSink {
    pub fn new(appended: Arc<AtomicUsize>) -> Self {
        Self {
            data: Vec::new(),
            order: Vec::new(),
            appended,
        }
    }
}

impl OutputSink for CountingSink {
    fn append(&mut self, shard: usize, data: &[u8]) -> io::Result<()> {
        self.data.extend_from_slice(data);
        self.order.push(shard);
        self.appended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
