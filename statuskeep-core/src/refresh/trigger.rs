use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Cloneable handle for asking the orchestrator to run another cycle.
///
/// Requests coalesce: however many arrive while a cycle is running, at most
/// one further cycle is queued, and it answers all of them.
#[derive(Clone, Debug, Default)]
pub struct RefreshTrigger {
    inner: Arc<TriggerState>,
}

#[derive(Debug, Default)]
struct TriggerState {
    requested: AtomicU64,
    wake: Notify,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a refresh and return its ticket. Never blocks.
    pub fn request(&self) -> u64 {
        let ticket = self.inner.requested.fetch_add(1, Ordering::SeqCst) + 1;
        // Notify keeps a single permit, which is the coalescing.
        self.inner.wake.notify_one();
        ticket
    }

    /// Highest ticket handed out so far.
    pub(crate) fn requested(&self) -> u64 {
        self.inner.requested.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait(&self) {
        self.inner.wake.notified().await;
    }
}
