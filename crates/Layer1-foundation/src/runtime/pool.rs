//! Worker Pool - blocking work and tracked background tasks
//!
//! Blocking closures (sync listeners, sync tool handlers, blocking plugin
//! setup) run on tokio's blocking threads, gated by a semaphore so at most
//! `size` of them run at once. Async background work is spawned through a
//! `TaskTracker` so shutdown can wait for it and cancel what is left after
//! a grace period.

use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Bounded pool shared by the event bus, the tool registry and plugins.
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    handle: Option<Handle>,
}

impl WorkerPool {
    /// Create a pool with `size` concurrent blocking slots (0 = available parallelism).
    pub fn new(size: usize) -> Self {
        let size = if size == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            size
        };

        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            handle: Handle::try_current().ok(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Token cancelled once the shutdown grace period runs out.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Number of tracked tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    fn runtime(&self) -> Result<Handle> {
        match &self.handle {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current()
                .map_err(|_| Error::Internal("no tokio runtime available".into())),
        }
    }

    /// Run a blocking closure on the pool and wait for its result.
    pub async fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::Cancelled)?;

        let handle = self.runtime()?;
        handle
            .spawn_blocking(move || {
                let _permit = permit;
                f()
            })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    Error::Internal("blocking task panicked".into())
                } else {
                    Error::Cancelled
                }
            })
    }

    /// Spawn a tracked background task.
    ///
    /// Returns `false` without spawning once the pool is shut down.
    pub fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() {
            return false;
        }

        let handle = match self.runtime() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Dropping background task");
                return false;
            }
        };

        let token = self.cancel.clone();
        self.tracker.spawn_on(
            async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = fut => {}
                }
            },
            &handle,
        );
        true
    }

    /// Stop accepting work, wait up to `grace`, then cancel what is left.
    ///
    /// Returns `true` if everything finished inside the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            debug!("Worker pool drained");
            return true;
        }

        warn!(
            in_flight = self.tracker.len(),
            grace_ms = grace.as_millis() as u64,
            "Grace period elapsed, cancelling in-flight tasks"
        );
        self.cancel.cancel();
        self.tracker.wait().await;
        false
    }
}
