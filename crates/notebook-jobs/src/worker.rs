//! Sweep worker that garbage-collects orphan tags off the request path.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use notebook_core::defaults::{SWEEP_EVENT_CAPACITY, SWEEP_QUEUE_CAPACITY};
use notebook_core::{Error, Result};

use crate::sweeper::OrphanSweeper;

/// Configuration for the sweep worker.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Pending requests buffered before further requests are coalesced.
    pub queue_capacity: usize,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            queue_capacity: SWEEP_QUEUE_CAPACITY,
            event_capacity: SWEEP_EVENT_CAPACITY,
        }
    }
}

impl SweepConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Event emitted after each sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepEvent {
    /// A sweep finished.
    Completed { deleted: u64 },
    /// A sweep failed. It is not retried; the next scheduled sweep covers it.
    Failed { error: String },
}

/// Handle for scheduling sweeps on a running worker.
///
/// Cheap to clone; every clone talks to the same worker task.
#[derive(Clone)]
pub struct SweepHandle {
    request_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
    event_tx: broadcast::Sender<SweepEvent>,
    sweeper: Arc<dyn OrphanSweeper>,
}

impl SweepHandle {
    /// Request a sweep without waiting for it.
    ///
    /// When the queue is full the request is dropped, since a pending sweep
    /// will cover it.
    pub fn schedule(&self) {
        match self.request_tx.try_send(()) {
            Ok(()) => debug!(subsystem = "jobs", component = "sweep", "Sweep scheduled"),
            Err(TrySendError::Full(())) => {
                debug!(
                    subsystem = "jobs",
                    component = "sweep",
                    "Sweep already pending, request coalesced"
                )
            }
            Err(TrySendError::Closed(())) => {
                warn!(
                    subsystem = "jobs",
                    component = "sweep",
                    "Sweep worker is not running, request dropped"
                )
            }
        }
    }

    /// Run a sweep on the caller's task and wait for it.
    pub async fn sweep_now(&self) -> Result<u64> {
        run_sweep(self.sweeper.as_ref(), &self.event_tx).await
    }

    /// Get a receiver for sweep events.
    pub fn events(&self) -> broadcast::Receiver<SweepEvent> {
        self.event_tx.subscribe()
    }

    /// Signal the worker to stop. Pending requests are discarded.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }
}

/// Worker that runs orphan sweeps one at a time.
pub struct SweepWorker {
    sweeper: Arc<dyn OrphanSweeper>,
    config: SweepConfig,
}

impl SweepWorker {
    pub fn new(sweeper: Arc<dyn OrphanSweeper>, config: SweepConfig) -> Self {
        Self { sweeper, config }
    }

    /// Spawn the worker task and return a handle for control.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> SweepHandle {
        let (request_tx, request_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(self.config.event_capacity.max(1));

        let handle = SweepHandle {
            request_tx,
            shutdown_tx,
            event_tx: event_tx.clone(),
            sweeper: Arc::clone(&self.sweeper),
        };

        tokio::spawn(run(self.sweeper, request_rx, shutdown_rx, event_tx));

        handle
    }
}

#[instrument(skip_all)]
async fn run(
    sweeper: Arc<dyn OrphanSweeper>,
    mut request_rx: mpsc::Receiver<()>,
    mut shutdown_rx: mpsc::Receiver<()>,
    event_tx: broadcast::Sender<SweepEvent>,
) {
    info!(subsystem = "jobs", component = "sweep", "Sweep worker started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!(subsystem = "jobs", component = "sweep", "Sweep worker received shutdown signal");
                break;
            }
            request = request_rx.recv() => {
                if request.is_none() {
                    break;
                }
                // Everything queued so far is covered by this sweep.
                let mut coalesced = 0usize;
                while request_rx.try_recv().is_ok() {
                    coalesced += 1;
                }
                if coalesced > 0 {
                    debug!(subsystem = "jobs", component = "sweep", coalesced, "Coalesced sweep requests");
                }
                let _ = run_sweep(sweeper.as_ref(), &event_tx).await;
            }
        }
    }

    info!(subsystem = "jobs", component = "sweep", "Sweep worker stopped");
}

async fn run_sweep(
    sweeper: &dyn OrphanSweeper,
    event_tx: &broadcast::Sender<SweepEvent>,
) -> Result<u64> {
    let start = Instant::now();
    match sweeper.sweep_orphans().await {
        Ok(deleted) => {
            debug!(
                subsystem = "jobs",
                component = "sweep",
                op = "sweep",
                deleted,
                duration_ms = start.elapsed().as_millis() as u64,
                "Orphan sweep completed"
            );
            let _ = event_tx.send(SweepEvent::Completed { deleted });
            Ok(deleted)
        }
        Err(e) => {
            warn!(
                subsystem = "jobs",
                component = "sweep",
                op = "sweep",
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Orphan sweep failed"
            );
            let _ = event_tx.send(SweepEvent::Failed {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    struct FakeSweeper {
        entered: AtomicUsize,
        calls: AtomicUsize,
        fail: AtomicBool,
        gate: Semaphore,
    }

    impl FakeSweeper {
        fn open() -> Arc<Self> {
            Arc::new(Self {
                entered: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
            })
        }

        fn gated() -> Arc<Self> {
            Arc::new(Self {
                entered: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                gate: Semaphore::new(0),
            })
        }
    }

    #[async_trait]
    impl OrphanSweeper for FakeSweeper {
        async fn sweep_orphans(&self) -> Result<u64> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.map_err(|e| Error::Internal(e.to_string()))?;
            permit.forget();
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::Internal("boom".to_string()))
            } else {
                Ok(n as u64)
            }
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<SweepEvent>) -> SweepEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    #[test]
    fn test_sweep_config_default() {
        let config = SweepConfig::default();
        assert_eq!(config.queue_capacity, SWEEP_QUEUE_CAPACITY);
        assert_eq!(config.event_capacity, SWEEP_EVENT_CAPACITY);
    }

    #[test]
    fn test_sweep_config_builder_clamps_zero() {
        let config = SweepConfig::default()
            .with_queue_capacity(0)
            .with_event_capacity(0);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.event_capacity, 1);
    }

    #[tokio::test]
    async fn test_schedule_runs_sweep_and_publishes_completed() {
        let sweeper = FakeSweeper::open();
        let handle = SweepWorker::new(sweeper.clone(), SweepConfig::default()).start();
        let mut events = handle.events();

        handle.schedule();

        assert_eq!(next_event(&mut events).await, SweepEvent::Completed { deleted: 1 });
        assert_eq!(sweeper.calls.load(Ordering::SeqCst), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_is_published_and_not_retried() {
        let sweeper = FakeSweeper::open();
        sweeper.fail.store(true, Ordering::SeqCst);
        let handle = SweepWorker::new(sweeper.clone(), SweepConfig::default()).start();
        let mut events = handle.events();

        handle.schedule();

        match next_event(&mut events).await {
            SweepEvent::Failed { error } => assert!(error.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sweeper.calls.load(Ordering::SeqCst), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_now_runs_inline() {
        let sweeper = FakeSweeper::open();
        let handle = SweepWorker::new(sweeper.clone(), SweepConfig::default()).start();
        let mut events = handle.events();

        assert_eq!(handle.sweep_now().await.unwrap(), 1);
        assert_eq!(next_event(&mut events).await, SweepEvent::Completed { deleted: 1 });

        sweeper.fail.store(true, Ordering::SeqCst);
        assert!(handle.sweep_now().await.is_err());
    }

    #[tokio::test]
    async fn test_requests_during_a_sweep_are_coalesced() {
        let sweeper = FakeSweeper::gated();
        let config = SweepConfig::default().with_queue_capacity(4);
        let handle = SweepWorker::new(sweeper.clone(), config).start();
        let mut events = handle.events();

        handle.schedule();
        while sweeper.entered.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // The worker is blocked inside the first sweep.
        for _ in 0..20 {
            handle.schedule();
        }
        sweeper.gate.add_permits(100);

        assert!(matches!(next_event(&mut events).await, SweepEvent::Completed { .. }));
        assert!(matches!(next_event(&mut events).await, SweepEvent::Completed { .. }));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sweeper.calls.load(Ordering::SeqCst), 2);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_worker() {
        let sweeper = FakeSweeper::open();
        let handle = SweepWorker::new(sweeper.clone(), SweepConfig::default()).start();

        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Dropped once the worker has exited.
        handle.schedule();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sweeper.calls.load(Ordering::SeqCst), 0);
    }
}
