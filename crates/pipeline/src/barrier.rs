//! Completion barrier
//!
//! A countable wait-group with a bounded wait: the terminal event must not
//! be emitted while admitted synthesis jobs are still outstanding, but a
//! hung provider may not stall the stream forever.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Tracks outstanding jobs for one request.
#[derive(Clone)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

struct Inner {
    outstanding: Mutex<usize>,
    drained: Notify,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                outstanding: Mutex::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Register one admitted job.
    pub fn add(&self) {
        *self.inner.outstanding.lock() += 1;
    }

    /// Mark one job complete (success or failure).
    pub fn done(&self) {
        let mut outstanding = self.inner.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.inner.drained.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.lock()
    }

    /// Wait until every registered job has completed, or until `timeout`
    /// elapses. Returns true when fully drained.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let drained = async {
            loop {
                let notified = self.inner.drained.notified();
                tokio::pin!(notified);
                // register before checking, or a done() landing in between
                // is a missed wakeup
                notified.as_mut().enable();
                if *self.inner.outstanding.lock() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}
