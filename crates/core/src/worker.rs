//! Fixed-size background worker pool.
//!
//! Each session owns one pool. Tasks are fire-and-forget for production
//! callers; the returned [`TaskHandle`] exists so tests (and curious callers)
//! can observe completion. The pool is a bounded queue feeding a small set of
//! worker threads; a worker acts as supervisor for the tasks it runs, logging
//! failures and panics instead of letting them tear anything down.
//!
//! Teardown abandons outstanding work: dropping the pool closes the queue,
//! marks queued tasks as skipped, and detaches the workers; an in-flight
//! task finishes on its own and its result is discarded along with the cache
//! it would have fed.

use crate::{CoreError, CoreResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Worker threads per session.
pub const POOL_SIZE: usize = 2;

/// Maximum queued-but-unstarted tasks before submissions are rejected.
pub const QUEUE_DEPTH: usize = 16;

/// How one background task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// The task returned an error or panicked; details are in the log.
    Failed,
    /// The pool shut down before the task started.
    Skipped,
}

/// Completion signal for a submitted task.
///
/// Production callers drop this; tests wait on it.
#[derive(Debug)]
pub struct TaskHandle {
    outcome: Receiver<TaskOutcome>,
}

impl TaskHandle {
    /// Block until the task ends. `None` means the pool was torn down and the
    /// task's worker died before reporting (only possible at process exit).
    pub fn wait(&self) -> Option<TaskOutcome> {
        self.outcome.recv().ok()
    }

    /// Block until the task ends or the timeout elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskOutcome> {
        self.outcome.recv_timeout(timeout).ok()
    }
}

struct Task {
    label: String,
    job: Box<dyn FnOnce() -> CoreResult<()> + Send + 'static>,
    done: SyncSender<TaskOutcome>,
}

/// A session-scoped pool of background workers.
pub struct WorkerPool {
    queue: Option<SyncSender<Task>>,
    shutdown: Arc<AtomicBool>,
    // Handles are held only to keep ownership explicit; Drop detaches them.
    _workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start a pool with the default size and queue depth.
    pub fn new(pool_label: impl Into<String>) -> CoreResult<Self> {
        Self::with_capacity(pool_label, POOL_SIZE, QUEUE_DEPTH)
    }

    /// Start a pool with explicit worker count and queue depth.
    pub fn with_capacity(
        pool_label: impl Into<String>,
        workers: usize,
        queue_depth: usize,
    ) -> CoreResult<Self> {
        let label = pool_label.into();
        let (queue, rx) = mpsc::sync_channel::<Task>(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers.max(1));
        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let shutdown = Arc::clone(&shutdown);
            let pool = label.clone();
            let handle = thread::Builder::new()
                .name(format!("{label}-w{worker}"))
                .spawn(move || worker_loop(pool, worker, rx, shutdown))
                .map_err(CoreError::WorkerSpawn)?;
            handles.push(handle);
        }

        Ok(Self {
            queue: Some(queue),
            shutdown,
            _workers: handles,
        })
    }

    /// Submit a task. Returns a completion handle, or an error when the queue
    /// is full or the pool is shut down: a rejected task is reported, never
    /// silently dropped.
    pub fn submit<F>(&self, label: &str, job: F) -> CoreResult<TaskHandle>
    where
        F: FnOnce() -> CoreResult<()> + Send + 'static,
    {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| CoreError::PoolShutDown(label.to_string()))?;
        let (done, outcome) = mpsc::sync_channel(1);
        let task = Task {
            label: label.to_string(),
            job: Box::new(job),
            done,
        };
        match queue.try_send(task) {
            Ok(()) => Ok(TaskHandle { outcome }),
            Err(TrySendError::Full(task)) => Err(CoreError::QueueFull(task.label)),
            Err(TrySendError::Disconnected(task)) => Err(CoreError::PoolShutDown(task.label)),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Closing the queue wakes idle workers; tasks already buffered are
        // skipped by the shutdown flag rather than executed.
        self.queue.take();
    }
}

fn worker_loop(
    pool: String,
    worker: usize,
    rx: Arc<Mutex<Receiver<Task>>>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        let next = {
            let guard = rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.recv()
        };
        let Ok(Task { label, job, done }) = next else {
            break;
        };

        if shutdown.load(Ordering::SeqCst) {
            tracing::debug!(pool = %pool, task = %label, "pool shut down, skipping queued task");
            let _ = done.try_send(TaskOutcome::Skipped);
            continue;
        }

        tracing::debug!(pool = %pool, worker, task = %label, "task started");
        let outcome = match catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => {
                tracing::debug!(pool = %pool, worker, task = %label, "task completed");
                TaskOutcome::Completed
            }
            Ok(Err(err)) => {
                tracing::error!(pool = %pool, worker, task = %label, %err, "background task failed");
                TaskOutcome::Failed
            }
            Err(_) => {
                tracing::error!(pool = %pool, worker, task = %label, "background task panicked");
                TaskOutcome::Failed
            }
        };
        // Nobody waiting on the handle is the normal case.
        let _ = done.try_send(outcome);
    }
    tracing::debug!(pool = %pool, worker, "worker exiting");
}
