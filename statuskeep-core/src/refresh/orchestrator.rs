use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::refresh::pipeline::{Collected, StatusCollector};
use crate::refresh::trigger::RefreshTrigger;
use crate::types::{RefreshPhase, StatusSnapshot};

/// Read side of the published status list.
///
/// Every value seen through a feed is a complete cycle result; a
/// half-built list is never observable.
#[derive(Clone, Debug)]
pub struct StatusFeed {
    rx: watch::Receiver<Arc<StatusSnapshot>>,
}

impl StatusFeed {
    pub fn current(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for the next publish. `None` once the orchestrator is gone.
    pub async fn changed(&mut self) -> Option<Arc<StatusSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }

    /// Current value first, then one item per publish.
    pub fn into_stream(self) -> WatchStream<Arc<StatusSnapshot>> {
        WatchStream::new(self.rx)
    }
}

/// Owns the single refresh worker.
///
/// Cycles never overlap. Requests that arrive while a cycle runs collapse
/// into one follow-up cycle. Dropping the orchestrator cancels the worker;
/// an in-flight cycle is abandoned and publishes nothing.
#[derive(Debug)]
pub struct RefreshOrchestrator {
    trigger: RefreshTrigger,
    snapshots: watch::Receiver<Arc<StatusSnapshot>>,
    phase: watch::Receiver<RefreshPhase>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl RefreshOrchestrator {
    /// Start the worker on the current tokio runtime. No cycle runs until
    /// the first request.
    pub fn spawn(collector: Arc<dyn StatusCollector>) -> Self {
        let trigger = RefreshTrigger::new();
        let (snapshot_tx, snapshots) =
            watch::channel(Arc::new(StatusSnapshot::initial()));
        let (phase_tx, phase) = watch::channel(RefreshPhase::Idle);
        let cancel = CancellationToken::new();

        let worker = RefreshWorker {
            collector,
            trigger: trigger.clone(),
            snapshot_tx,
            phase_tx,
            cancel: cancel.clone(),
            generation: 0,
        };
        let handle = tokio::spawn(worker.run());

        Self {
            trigger,
            snapshots,
            phase,
            cancel,
            worker: Some(handle),
        }
    }

    /// Handle other components use to queue refreshes.
    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Queue a refresh without waiting for it.
    pub fn request_refresh(&self) -> u64 {
        self.trigger.request()
    }

    /// Queue a refresh and wait for a cycle that started after this call.
    ///
    /// If the worker has stopped, the last published snapshot is returned.
    pub async fn refresh(&self) -> Arc<StatusSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let ticket = self.trigger.request();
        let answered = snapshots
            .wait_for(|snapshot| snapshot.covers_request >= ticket)
            .await
            .map(|snapshot| Arc::clone(&snapshot));
        match answered {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!(ticket, "refresh worker stopped before answering");
                self.current()
            }
        }
    }

    pub fn current(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn observe(&self) -> StatusFeed {
        StatusFeed {
            rx: self.snapshots.clone(),
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        *self.phase.borrow()
    }

    /// Cancel the worker and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take()
            && let Err(err) = worker.await
        {
            warn!(error = %err, "refresh worker ended abnormally");
        }
    }
}

impl Drop for RefreshOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct RefreshWorker {
    collector: Arc<dyn StatusCollector>,
    trigger: RefreshTrigger,
    snapshot_tx: watch::Sender<Arc<StatusSnapshot>>,
    phase_tx: watch::Sender<RefreshPhase>,
    cancel: CancellationToken,
    generation: u64,
}

impl RefreshWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.trigger.wait() => {}
            }

            // Everything requested up to here is answered by this cycle.
            let covers = self.trigger.requested();
            self.phase_tx.send_replace(RefreshPhase::Scanning);
            debug!(covers, "refresh cycle started");

            let collected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(covers, "refresh cycle abandoned");
                    break;
                }
                collected = self.collector.collect() => collected,
            };
            self.publish(collected, covers);
        }
        debug!("refresh worker stopped");
    }

    fn publish(&mut self, collected: Collected, covers: u64) {
        self.phase_tx.send_replace(RefreshPhase::Publishing);
        self.generation += 1;
        let snapshot = StatusSnapshot {
            generation: self.generation,
            covers_request: covers,
            items: collected.items.into(),
            access: collected.access,
            completed_at: Some(Utc::now()),
        };
        info!(
            generation = snapshot.generation,
            items = snapshot.items.len(),
            covers,
            "published statuses"
        );
        self.snapshot_tx.send_replace(Arc::new(snapshot));
        self.phase_tx.send_replace(RefreshPhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaKind, StatusItem, StatusLocation};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Semaphore, mpsc};

    /// Blocks every cycle until the test releases it.
    struct GatedCollector {
        calls: AtomicUsize,
        started: mpsc::UnboundedSender<usize>,
        gate: Semaphore,
    }

    impl GatedCollector {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<usize>) {
            let (started, rx) = mpsc::unbounded_channel();
            let collector = Arc::new(Self {
                calls: AtomicUsize::new(0),
                started,
                gate: Semaphore::new(0),
            });
            (collector, rx)
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait]
    impl StatusCollector for GatedCollector {
        async fn collect(&self) -> Collected {
            let cycle = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.started.send(cycle);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            let items = (0..3)
                .map(|n| {
                    StatusItem::new(
                        StatusLocation::File(PathBuf::from(format!(
                            "/s/cycle-{cycle}-{n}.jpg"
                        ))),
                        MediaKind::Image,
                        format!("cycle-{cycle}-{n}.jpg"),
                        false,
                    )
                })
                .collect();
            Collected {
                items,
                access: Default::default(),
            }
        }
    }

    fn cycle_of(snapshot: &StatusSnapshot) -> Vec<String> {
        snapshot
            .items
            .iter()
            .map(|item| {
                item.name.rsplit_once('-').map(|(c, _)| c.to_owned()).unwrap()
            })
            .collect()
    }

    async fn next_start(rx: &mut mpsc::UnboundedReceiver<usize>) -> usize {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("cycle should start")
            .expect("collector alive")
    }

    #[tokio::test]
    async fn refresh_returns_the_collected_list() {
        let (collector, mut started) = GatedCollector::new();
        let orchestrator = RefreshOrchestrator::spawn(collector.clone());
        assert_eq!(orchestrator.current().generation, 0);

        collector.release();
        let snapshot = orchestrator.refresh().await;
        assert_eq!(next_start(&mut started).await, 1);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.covers_request, 1);
        assert_eq!(snapshot.items.len(), 3);
        assert!(snapshot.completed_at.is_some());
        assert_eq!(orchestrator.phase(), RefreshPhase::Idle);
    }

    #[tokio::test]
    async fn requests_during_a_cycle_coalesce_into_one_more() {
        let (collector, mut started) = GatedCollector::new();
        let orchestrator = RefreshOrchestrator::spawn(collector.clone());
        let mut feed = orchestrator.observe();

        orchestrator.request_refresh();
        assert_eq!(next_start(&mut started).await, 1);
        assert_eq!(orchestrator.phase(), RefreshPhase::Scanning);

        orchestrator.request_refresh();
        orchestrator.request_refresh();
        let last = orchestrator.request_refresh();

        collector.release();
        let first = feed.changed().await.expect("first publish");
        assert_eq!(first.generation, 1);
        assert_eq!(first.covers_request, 1);

        assert_eq!(next_start(&mut started).await, 2);
        collector.release();
        let second = feed.changed().await.expect("second publish");
        assert_eq!(second.generation, 2);
        assert_eq!(second.covers_request, last);

        let third =
            tokio::time::timeout(Duration::from_millis(50), started.recv())
                .await;
        assert!(third.is_err(), "no cycle beyond the coalesced one");
        assert_eq!(collector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn published_lists_never_mix_cycles() {
        let (collector, mut started) = GatedCollector::new();
        let orchestrator = RefreshOrchestrator::spawn(collector.clone());
        let mut feed = orchestrator.observe();

        for expected in 1..=3 {
            orchestrator.request_refresh();
            assert_eq!(next_start(&mut started).await, expected);
            collector.release();
            let snapshot = feed.changed().await.expect("publish");
            let cycles = cycle_of(&snapshot);
            assert!(
                cycles.iter().all(|c| *c == format!("cycle-{expected}")),
                "{cycles:?}"
            );
        }
    }

    #[tokio::test]
    async fn refresh_waits_for_a_cycle_started_after_the_call() {
        let (collector, mut started) = GatedCollector::new();
        let orchestrator =
            Arc::new(RefreshOrchestrator::spawn(collector.clone()));

        orchestrator.request_refresh();
        assert_eq!(next_start(&mut started).await, 1);

        let waiter = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.refresh().await })
        };
        // Let the waiter take its ticket while cycle 1 is in flight.
        tokio::task::yield_now().await;
        while orchestrator.trigger.requested() < 2 {
            tokio::task::yield_now().await;
        }

        collector.release();
        assert_eq!(next_start(&mut started).await, 2);
        assert!(!waiter.is_finished());

        collector.release();
        let snapshot = waiter.await.expect("waiter task");
        assert_eq!(snapshot.generation, 2);
        assert!(
            cycle_of(&snapshot).iter().all(|c| c == "cycle-2"),
            "answered by the later cycle"
        );
    }

    #[tokio::test]
    async fn shutdown_abandons_the_in_flight_cycle() {
        let (collector, mut started) = GatedCollector::new();
        let orchestrator = RefreshOrchestrator::spawn(collector.clone());
        let mut feed = orchestrator.observe();

        orchestrator.request_refresh();
        assert_eq!(next_start(&mut started).await, 1);

        orchestrator.shutdown().await;
        collector.release();

        assert_eq!(feed.current().generation, 0);
        assert!(feed.changed().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_orchestrator_stops_the_worker() {
        let (collector, mut started) = GatedCollector::new();
        let orchestrator = RefreshOrchestrator::spawn(collector.clone());
        let mut feed = orchestrator.observe();
        let trigger = orchestrator.trigger();

        drop(orchestrator);
        trigger.request();

        assert!(feed.changed().await.is_none());
        assert!(started.try_recv().is_err());
        assert_eq!(feed.current().generation, 0);
    }

    #[tokio::test]
    async fn feed_stream_yields_current_then_updates() {
        use futures::StreamExt;

        let (collector, _started) = GatedCollector::new();
        let orchestrator = RefreshOrchestrator::spawn(collector.clone());
        let mut stream = orchestrator.observe().into_stream();

        let initial = stream.next().await.expect("initial value");
        assert_eq!(initial.generation, 0);

        collector.release();
        orchestrator.request_refresh();
        let published = stream.next().await.expect("published value");
        assert_eq!(published.generation, 1);
    }
}
