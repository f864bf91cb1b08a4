//! Test doubles for driving the delivery worker
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)] // Not all helpers are used by every test binary

pub mod mock_server;

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use herald_delivery::{
    MailTransport, PartialDeliveryFailure, PermanentError, TemporaryError, TransportError,
};
use herald_queue::{
    EntryId, MailingStatus, MemoryQueueStore, PersistenceError, QueueEntry, QueueStore,
};
use tokio::sync::{Notify, oneshot};

/// What the scripted transport does for one `deliver` call
#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    /// Fail the receivers at these positions
    Fail(Vec<usize>),
    /// Report every outstanding receiver as failed
    Unreachable,
}

/// One recorded `deliver` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub id: EntryId,
    /// Positions that were still undelivered when the call was made
    pub positions: Vec<usize>,
}

/// Transport that follows a script and records every call
///
/// Once the script runs out every call succeeds.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Script>>,
    attempts: Mutex<Vec<Attempt>>,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
    started: Notify,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Make the next call block until the returned sender fires
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock().unwrap() = Some(rx);
        tx
    }

    /// Resolves once a call has started
    pub async fn started(&self) {
        self.started.notified().await;
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Ids in the order they were attempted
    pub fn order(&self) -> Vec<EntryId> {
        self.attempts().into_iter().map(|a| a.id).collect()
    }
}

#[async_trait]
impl MailTransport for ScriptedTransport {
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), PartialDeliveryFailure> {
        self.started.notify_one();

        let hold = self.hold.lock().unwrap().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        self.attempts.lock().unwrap().push(Attempt {
            id: entry.id.clone().expect("worker only sees saved entries"),
            positions: entry.undelivered_positions(),
        });

        let script = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Succeed);

        match script {
            Script::Succeed => Ok(()),
            Script::Fail(positions) => {
                let mut failure = PartialDeliveryFailure::default();
                for position in positions {
                    failure.push(
                        entry,
                        position,
                        TransportError::from(PermanentError::Rejected(
                            "550 mailbox unavailable".to_string(),
                        )),
                    );
                }
                failure.into_result()
            }
            Script::Unreachable => {
                let mut failure = PartialDeliveryFailure::default();
                for position in entry.undelivered_positions() {
                    failure.push(
                        entry,
                        position,
                        TransportError::from(TemporaryError::ConnectionFailed(
                            "connection refused".to_string(),
                        )),
                    );
                }
                failure.into_result()
            }
        }
    }
}

/// Memory store that counts fetches and can be made to misbehave
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    inner: MemoryQueueStore,
    takes: AtomicUsize,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    fail_takes: AtomicBool,
    fail_saves: AtomicBool,
}

impl InstrumentedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `take_next_pending` block until the returned sender fires
    pub fn gate_next_take(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn takes(&self) -> usize {
        self.takes.load(Ordering::SeqCst)
    }

    pub fn fail_takes(&self, fail: bool) {
        self.fail_takes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Enqueue a fresh entry the way a producer would
    pub async fn enqueue(&self, receivers: &[&str]) -> EntryId {
        self.inner
            .save(QueueEntry::new(receivers.iter().copied(), "Subject", "<p>Body</p>"))
            .await
            .unwrap()
            .id
            .unwrap()
    }

    pub async fn get(&self, id: &EntryId) -> QueueEntry {
        self.inner.find(id).await.unwrap()
    }

    pub async fn has_pending(&self) -> bool {
        self.inner.take_next_pending().await.unwrap().is_some()
    }
}

#[async_trait]
impl QueueStore for InstrumentedStore {
    async fn find(&self, id: &EntryId) -> herald_queue::Result<QueueEntry> {
        self.inner.find(id).await
    }

    async fn find_page(&self, skip: usize, limit: usize) -> herald_queue::Result<Vec<QueueEntry>> {
        self.inner.find_page(skip, limit).await
    }

    async fn count(&self) -> herald_queue::Result<usize> {
        self.inner.count().await
    }

    async fn save(&self, entry: QueueEntry) -> herald_queue::Result<QueueEntry> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Internal("injected save failure".to_string()).into());
        }
        self.inner.save(entry).await
    }

    async fn take_next_pending(&self) -> herald_queue::Result<Option<QueueEntry>> {
        self.takes.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.fail_takes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Internal("injected fetch failure".to_string()).into());
        }
        self.inner.take_next_pending().await
    }
}

/// Poll `condition` until it holds, panicking after five seconds
pub async fn eventually(what: &str, mut condition: impl AsyncFnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until the entry reaches `status`
pub async fn wait_for_status(store: &InstrumentedStore, id: &EntryId, status: MailingStatus) {
    eventually(&format!("{id} to become {status}"), async || {
        store.get(id).await.status == status
    })
    .await;
}
