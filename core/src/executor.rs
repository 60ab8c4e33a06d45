//! Fixed-size background pool shared by lookups, loading and learning.
//!
//! Two kinds of work run here:
//! - fire-and-forget maintenance (`spawn`): learning and blacklist writes.
//!   These always run.
//! - superseded work (`spawn_cancellable`): main-dictionary loads. Queued
//!   tasks are dropped by `cancel_pending`.
//! - fan-out lookups (`fan_out`, `run_all`): the caller blocks until every job has
//!   reported back. Lookups are never cancelled.
//!
//! Nothing here uses `block_on`, so every method may be called from any
//! thread, including pool threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn enter(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn exit(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

pub struct BackgroundExecutor {
    runtime: Option<Runtime>,
    cancel: Mutex<CancellationToken>,
    pending: Arc<Pending>,
}

impl std::fmt::Debug for BackgroundExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundExecutor")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl BackgroundExecutor {
    /// Pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> crate::Result<Self> {
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .max_blocking_threads(threads)
            .thread_name("suggest-bg")
            .build()?;
        debug!(threads, "background pool started");
        Ok(Self {
            runtime: Some(runtime),
            cancel: Mutex::new(CancellationToken::new()),
            pending: Arc::new(Pending::default()),
        })
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queues `task`. It runs even if `cancel_pending` is called first.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue(name, None, task);
    }

    /// Queues `task`. It is skipped if `cancel_pending` runs before it starts.
    pub fn spawn_cancellable<F>(&self, name: &'static str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.token();
        self.queue(name, Some(token), task);
    }

    fn queue<F>(&self, name: &'static str, token: Option<CancellationToken>, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let pending = Arc::clone(&self.pending);
        pending.enter();
        runtime.spawn_blocking(move || {
            if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
                debug!(task = name, "dropping cancelled background task");
            } else if catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!(task = name, "background task panicked");
            }
            pending.exit();
        });
    }

    /// Dispatches every job to the pool without waiting. A job that panics
    /// yields `None` in its slot of the joined output.
    pub fn fan_out<T: Send + 'static>(&self, jobs: Vec<Box<dyn FnOnce() -> T + Send>>) -> FanOut<T> {
        let len = jobs.len();
        let Some(runtime) = &self.runtime else {
            return FanOut { rx: None, len };
        };
        let (tx, rx) = mpsc::channel();
        for (i, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            runtime.spawn_blocking(move || {
                let out = catch_unwind(AssertUnwindSafe(job));
                if out.is_err() {
                    error!(job = i, "lookup job panicked");
                }
                let _ = tx.send((i, out.ok()));
            });
        }
        FanOut { rx: Some(rx), len }
    }

    /// Runs every job on the pool and waits for all of them.
    pub fn run_all<T: Send + 'static>(&self, jobs: Vec<Box<dyn FnOnce() -> T + Send>>) -> Vec<Option<T>> {
        self.fan_out(jobs).join()
    }

    /// Drops every queued cancellable task that has not started yet.
    pub fn cancel_pending(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    pub fn pending_count(&self) -> usize {
        *self.pending.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until no background task is queued or running. Returns false
    /// on timeout.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.pending.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(pending = *count, "timed out waiting for background tasks");
                return false;
            }
            count = self
                .pending
                .idle
                .wait_timeout(count, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// Jobs in flight from `BackgroundExecutor::fan_out`.
#[derive(Debug)]
pub struct FanOut<T> {
    rx: Option<mpsc::Receiver<(usize, Option<T>)>>,
    len: usize,
}

impl<T> FanOut<T> {
    /// Blocks until every job has reported back. Results keep job order.
    pub fn join(self) -> Vec<Option<T>> {
        let mut results: Vec<Option<T>> = (0..self.len).map(|_| None).collect();
        if let Some(rx) = self.rx {
            for (i, out) in rx {
                if let Some(slot) = results.get_mut(i) {
                    *slot = out;
                }
            }
        }
        results
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        self.cancel_pending();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
