//! Detached, best-effort background work.
//!
//! Work handed to the [`Dispatcher`] is spawned onto the runtime, so it keeps
//! running when the request that triggered it is cancelled. Each task runs
//! under its own deadline and a shared concurrency limit; failures stay
//! inside the task and are only logged.
//!
//! Admission is bounded too: once `max_concurrency + max_queued` tasks are
//! outstanding, further work is dropped with a warning instead of piling up
//! behind a slow collaborator.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Upper bound on tasks running at the same time.
    pub max_concurrency: usize,
    /// Tasks allowed to wait for a running slot before new work is dropped.
    pub max_queued: usize,
    /// Deadline applied to each task independently of its caller, counted
    /// from submission so queueing time is included.
    pub deadline: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 256,
            max_queued: 1024,
            deadline: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    permits: Arc<Semaphore>,
    capacity: usize,
    deadline: Duration,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count even if the task panics.
struct InFlightGuard(Arc<Inner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let max_concurrency = config.max_concurrency.max(1);
        Self {
            inner: Arc::new(Inner {
                permits: Arc::new(Semaphore::new(max_concurrency)),
                capacity: max_concurrency.saturating_add(config.max_queued),
                deadline: config.deadline,
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Spawns `task` detached from the caller. Must be called from within a
    /// Tokio runtime.
    ///
    /// Returns `false` and drops `task` when the dispatcher is saturated.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let capacity = self.inner.capacity;
        let admitted = self
            .inner
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            });
        if admitted.is_err() {
            warn!(task = name, capacity, "dispatcher saturated, dropping background task");
            return false;
        }
        let guard = InFlightGuard(Arc::clone(&self.inner));

        tokio::spawn(async move {
            let inner = &guard.0;
            let permits = Arc::clone(&inner.permits);
            let run = async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                task.await;
            };

            match tokio::time::timeout(inner.deadline, run).await {
                Ok(()) => debug!(task = name, "background task finished"),
                Err(_) => warn!(
                    task = name,
                    deadline_ms = inner.deadline.as_millis() as u64,
                    "background task exceeded its deadline"
                ),
            }
        });
        true
    }

    /// Number of tasks spawned but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Waits until every spawned task has finished.
    pub async fn drain(&self) {
        loop {
            // Register interest before checking so a wakeup between the
            // check and the await is not lost.
            let idle = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Like [`Dispatcher::drain`] but gives up after `limit`. Returns whether
    /// all tasks finished.
    pub async fn drain_timeout(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.drain()).await.is_ok()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}
