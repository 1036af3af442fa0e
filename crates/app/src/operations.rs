//! Per-store tracking of in-flight asynchronous operations.
//!
//! Each store owns one [`Operations`]. Every transport call, whether awaited
//! by the caller or spawned in the background, runs under an
//! [`OperationGuard`] and races against a shared [`CancellationToken`].
//! Guards and background tasks are registered with separate [`TaskTracker`]s:
//! only guards count as in flight, while [`Operations::shutdown`] waits for
//! both, so no completion can mutate a store after its teardown has returned.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TaskTrackerToken;

use kitchenconnect_domain::error::KitchenError;

/// Cancellation token plus task trackers for one store instance.
#[derive(Debug, Default)]
pub struct Operations {
    cancel: CancellationToken,
    /// One token per live [`OperationGuard`].
    active: TaskTracker,
    /// Background tasks from [`Operations::spawn`].
    tasks: TaskTracker,
}

/// Registration of one in-flight operation. Released on drop.
#[derive(Debug)]
pub struct OperationGuard {
    cancel: CancellationToken,
    _token: TaskTrackerToken,
}

impl Operations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new operation.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::Cancelled`] once the owner has been shut down.
    pub fn begin(&self) -> Result<OperationGuard, KitchenError> {
        if self.cancel.is_cancelled() {
            return Err(KitchenError::Cancelled);
        }
        Ok(OperationGuard {
            cancel: self.cancel.clone(),
            _token: self.active.token(),
        })
    }

    /// Spawn a background operation on the current tokio runtime.
    ///
    /// The task stops at its next suspension point once the owner is shut
    /// down. It only counts as in flight while it holds an [`OperationGuard`].
    /// Returns `None` if the owner is already shut down.
    pub fn spawn<F>(&self, fut: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return None;
        }
        let cancel = self.cancel.clone();
        Some(self.tasks.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = fut => {}
            }
        }))
    }

    /// Number of live [`OperationGuard`]s, awaited and spawned alike.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Signal cancellation without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.active.close();
        self.tasks.close();
    }

    /// Cancel every outstanding operation and wait until all have finished.
    pub async fn shutdown(&self) {
        self.cancel();
        self.tasks.wait().await;
        self.active.wait().await;
    }
}

impl OperationGuard {
    /// Drive `fut` to completion unless the owner is shut down first.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::Cancelled`] when cancellation wins, otherwise
    /// whatever `fut` resolves to.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, KitchenError>
    where
        F: Future<Output = Result<T, KitchenError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(KitchenError::Cancelled),
            result = fut => result,
        }
    }

    /// Confirm the owner is still live right before committing a result.
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::Cancelled`] after shutdown has begun.
    pub fn ensure_active(&self) -> Result<(), KitchenError> {
        if self.cancel.is_cancelled() {
            Err(KitchenError::Cancelled)
        } else {
            Ok(())
        }
    }
}
