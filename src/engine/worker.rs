// Tue Jan 13 2026 - Alex

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueuedJob {
    job: Job,
    signals_completion: bool,
}

/// Fixed-size pool of worker threads fed from one FIFO queue.
pub struct WorkerPool {
    workers: Vec<Worker>,
    queue: Arc<Mutex<VecDeque<QueuedJob>>>,
    available: Arc<Condvar>,
    idle: Arc<Condvar>,
    running: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    completion: Arc<CompletionSignal>,
}

struct Worker {
    id: usize,
    thread_handle: Option<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> std::io::Result<Self> {
        let size = size.max(1);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let available = Arc::new(Condvar::new());
        let idle = Arc::new(Condvar::new());
        let running = Arc::new(AtomicBool::new(true));
        let active = Arc::new(AtomicUsize::new(0));
        let completion = Arc::new(CompletionSignal::new());

        let mut pool = Self {
            workers: Vec::with_capacity(size),
            queue,
            available,
            idle,
            running,
            active,
            completion,
        };

        for id in 0..size {
            let queue = pool.queue.clone();
            let available = pool.available.clone();
            let idle = pool.idle.clone();
            let running = pool.running.clone();
            let active = pool.active.clone();
            let completion = pool.completion.clone();

            // On spawn failure `pool` is dropped here, which stops the
            // workers that did start.
            let handle = thread::Builder::new()
                .name(format!("shard-worker-{}", id))
                .spawn(move || {
                    Worker::worker_loop(queue, available, idle, running, active, completion);
                })?;

            pool.workers.push(Worker {
                id,
                thread_handle: Some(handle),
            });
        }

        log::debug!("Started worker pool with {} threads", size);
        Ok(pool)
    }

    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(job), true);
    }

    pub(crate) fn submit_quiet<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(job), false);
    }

    fn push(&self, job: Job, signals_completion: bool) {
        let mut queue = self.queue.lock();
        queue.push_back(QueuedJob {
            job,
            signals_completion,
        });
        self.available.notify_one();
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn completion_signal(&self) -> &Arc<CompletionSignal> {
        &self.completion
    }

    pub fn shutdown(mut self) {
        self.wait_idle();
        self.stop();
    }

    fn wait_idle(&self) {
        let mut queue = self.queue.lock();
        while !queue.is_empty() || self.active.load(Ordering::SeqCst) > 0 {
            self.idle.wait_for(&mut queue, Duration::from_millis(5));
        }
    }

    fn stop(&mut self) {
        {
            let mut queue = self.queue.lock();
            let discarded = queue.len();
            queue.clear();
            if discarded > 0 {
                log::debug!("Discarded {} queued jobs on pool stop", discarded);
            }
            self.running.store(false, Ordering::SeqCst);
            self.available.notify_all();
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.thread_handle.take() {
                if handle.join().is_err() {
                    log::warn!("Worker {} exited abnormally", worker.id);
                }
            }
        }
    }
}

impl Worker {
    fn worker_loop(
        queue: Arc<Mutex<VecDeque<QueuedJob>>>,
        available: Arc<Condvar>,
        idle: Arc<Condvar>,
        running: Arc<AtomicBool>,
        active: Arc<AtomicUsize>,
        completion: Arc<CompletionSignal>,
    ) {
        loop {
            let next = {
                let mut queue_lock = queue.lock();
                loop {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(job) = queue_lock.pop_front() {
                        active.fetch_add(1, Ordering::SeqCst);
                        break job;
                    }
                    available.wait(&mut queue_lock);
                }
            };

            // Jobs convert their own panics into task failures; this guard
            // only keeps a stray panic from taking the worker down with it.
            if panic::catch_unwind(AssertUnwindSafe(next.job)).is_err() {
                log::error!("Job panicked outside of its task boundary");
            }

            active.fetch_sub(1, Ordering::SeqCst);
            if next.signals_completion {
                completion.notify();
            }

            // Wake a shutdown waiting for the pool to go idle.
            let _queue_lock = queue.lock();
            idle.notify_all();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Epoch counter bumped every time a pool job finishes.
pub struct CompletionSignal {
    epoch: Mutex<u64>,
    changed: Condvar,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self {
            epoch: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    pub fn notify(&self) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        self.changed.notify_all();
    }

    /// Waits until the epoch differs from `seen` or `timeout` elapses.
    /// Returns true if the epoch moved.
    pub fn wait_past(&self, seen: u64, timeout: Duration) -> bool {
        let mut epoch = self.epoch.lock();
        if *epoch != seen {
            return true;
        }
        self.changed.wait_for(&mut epoch, timeout);
        *epoch != seen
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
