use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use herald_common::internal;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

/// Wake-only handle to a delivery worker
///
/// Cheap to clone and safe to use from any task. Waking is coalescing: while
/// a wake is already pending, further wakes are dropped. Waking a worker that
/// has stopped does nothing.
#[derive(Debug, Clone)]
pub struct WakeSignal {
    tx: mpsc::Sender<()>,
}

impl WakeSignal {
    pub(crate) const fn new(tx: mpsc::Sender<()>) -> Self {
        Self { tx }
    }

    /// Tell the worker there may be new pending entries
    pub fn wake(&self) {
        match self.tx.try_send(()) {
            Ok(()) => tracing::trace!("Delivery worker woken"),
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::trace!("Delivery worker already has a pending wake");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::debug!("Ignoring wake for a stopped delivery worker");
            }
        }
    }
}

/// Owning handle to a running delivery worker
///
/// Dropping the handle without calling [`WorkerHandle::stop`] also stops the
/// worker, but without waiting for it.
#[derive(Debug)]
pub struct WorkerHandle {
    wake: WakeSignal,
    stopped: Arc<AtomicBool>,
    stop_tx: oneshot::Sender<()>,
    ack_rx: oneshot::Receiver<()>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) const fn new(
        wake: WakeSignal,
        stopped: Arc<AtomicBool>,
        stop_tx: oneshot::Sender<()>,
        ack_rx: oneshot::Receiver<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            wake,
            stopped,
            stop_tx,
            ack_rx,
            task,
        }
    }

    /// Non-blocking, coalescing wake-up
    pub fn wake(&self) {
        self.wake.wake();
    }

    /// A wake-only handle for producers
    #[must_use]
    pub fn waker(&self) -> WakeSignal {
        self.wake.clone()
    }

    /// Stop the worker and wait until it has exited
    ///
    /// An entry that is being delivered when this is called is finished and
    /// persisted first; no new entry is started afterwards.
    pub async fn stop(self) {
        internal!("Stopping delivery worker");
        self.stopped.store(true, Ordering::Release);

        // The worker may already be gone if its task panicked
        let _ = self.stop_tx.send(());
        if self.ack_rx.await.is_err() {
            tracing::warn!("Delivery worker exited without acknowledging stop");
        }

        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Delivery worker task failed");
        }

        internal!(level = INFO, "Delivery worker stopped");
    }
}
