use crate::task::TaskError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Process-wide counters for batches and task outcomes.
#[derive(Default, Debug)]
pub struct Telemetry {
    batches: AtomicU64,
    tasks_started: AtomicU64,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_cancelled: AtomicU64,
    tasks_panicked: AtomicU64,
}

impl Telemetry {
    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished task. Cancellations and panics also count as failures.
    pub fn record_task_outcome(&self, outcome: &Result<String, TaskError>) {
        match outcome {
            Ok(_) => {
                self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                self.tasks_failed.fetch_add(1, Ordering::Relaxed);
                if error.is_cancellation() {
                    self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
                }
                if error.is_panic() {
                    self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_succeeded: self.tasks_succeeded.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
        }
    }

    pub fn tasks_in_flight(&self) -> u64 {
        let snapshot = self.snapshot();
        snapshot
            .tasks_started
            .saturating_sub(snapshot.tasks_succeeded.saturating_add(snapshot.tasks_failed))
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub batches: u64,
    pub tasks_started: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub tasks_cancelled: u64,
    pub tasks_panicked: u64,
}

impl TelemetrySnapshot {
    pub fn tasks_completed(&self) -> u64 {
        self.tasks_succeeded.saturating_add(self.tasks_failed)
    }
}

/// Spawns a background task that periodically logs throughput and task outcome counters.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "batchpool::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let completed_delta = current_snapshot
                        .tasks_completed()
                        .saturating_sub(last_snapshot.tasks_completed());
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        completed_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "batchpool::metrics",
                        throughput = format!("{throughput:.2}"),
                        batches = current_snapshot.batches,
                        started = current_snapshot.tasks_started,
                        succeeded = current_snapshot.tasks_succeeded,
                        failed = current_snapshot.tasks_failed,
                        cancelled = current_snapshot.tasks_cancelled,
                        panicked = current_snapshot.tasks_panicked,
                        in_flight = telemetry.tasks_in_flight(),
                        "runtime metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
