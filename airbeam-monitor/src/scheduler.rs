//! Fixed-rate polling of every configured device
//!
//! The scheduler ticks every poll interval, anchored to when it was started.
//! Each tick spawns one task per device, so a slow or failing device never
//! holds up the others or the next tick. Failures are logged and swallowed
//! per device.
//!
//! Two polls of the same device never run at once: the coordinator holds an
//! in-flight guard per device, and a tick that finds the guard taken either
//! skips that device or waits for it, depending on [`OverrunPolicy`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use airbeam_client::DeviceConfig;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::config::{MonitorConfig, OverrunPolicy};
use crate::coordinator::PollCoordinator;

/// Counters shared between the scheduler loop and its handle
#[derive(Debug, Default)]
pub struct SchedulerStats {
    ticks: AtomicU64,
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
    polls_skipped: AtomicU64,
}

impl SchedulerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn polls_succeeded(&self) -> u64 {
        self.polls_succeeded.load(Ordering::Relaxed)
    }

    pub fn polls_failed(&self) -> u64 {
        self.polls_failed.load(Ordering::Relaxed)
    }

    /// Polls skipped because the device's previous poll was still running
    pub fn polls_skipped(&self) -> u64 {
        self.polls_skipped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks: {}, polls: {} ok / {} failed / {} skipped",
            self.ticks(),
            self.polls_succeeded(),
            self.polls_failed(),
            self.polls_skipped()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Polled,
    Failed,
    Skipped,
}

/// Clears the shared running flag when the poll loop goes away.
#[derive(Debug)]
struct RunningFlag(Arc<AtomicBool>);

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Polls all devices on a fixed interval
#[derive(Debug)]
pub struct Scheduler {
    coordinator: Arc<PollCoordinator>,
    devices: Arc<Vec<DeviceConfig>>,
    interval: Duration,
    overrun: OverrunPolicy,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    /// A zero interval falls back to [`MonitorConfig::DEFAULT_POLL_INTERVAL`].
    pub fn new(
        coordinator: Arc<PollCoordinator>,
        devices: impl IntoIterator<Item = DeviceConfig>,
        interval: Duration,
        overrun: OverrunPolicy,
    ) -> Self {
        let interval = if interval.is_zero() {
            MonitorConfig::DEFAULT_POLL_INTERVAL
        } else {
            interval
        };

        Self {
            coordinator,
            devices: Arc::new(devices.into_iter().collect()),
            interval,
            overrun,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag that is set while the loop runs and cleared when it exits.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Start the polling loop on the current tokio runtime.
    ///
    /// The first tick fires one interval after this call. The loop runs until
    /// [`SchedulerHandle::shutdown`] is called or the handle is dropped.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(SchedulerStats::default());

        self.running.store(true, Ordering::SeqCst);
        let flag = RunningFlag(Arc::clone(&self.running));

        let task_stats = Arc::clone(&stats);
        let task = tokio::spawn(async move {
            let _flag = flag;
            self.run(shutdown_rx, task_stats).await;
        });

        SchedulerHandle {
            shutdown_tx,
            task,
            stats,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>, stats: Arc<SchedulerStats>) {
        info!(
            devices = self.devices.len(),
            interval_ms = self.interval.as_millis() as u64,
            "starting poll loop"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    stats.ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::spawn(Self::tick(
                        Arc::clone(&self.coordinator),
                        Arc::clone(&self.devices),
                        self.overrun,
                        Arc::clone(&stats),
                    ));
                }
            }
        }

        info!("poll loop stopped");
    }

    /// Poll every device concurrently and wait for all of them.
    async fn tick(
        coordinator: Arc<PollCoordinator>,
        devices: Arc<Vec<DeviceConfig>>,
        overrun: OverrunPolicy,
        stats: Arc<SchedulerStats>,
    ) {
        let handles: Vec<JoinHandle<PollOutcome>> = devices
            .iter()
            .map(|device| {
                tokio::spawn(Self::poll_device(
                    Arc::clone(&coordinator),
                    device.clone(),
                    overrun,
                ))
            })
            .collect();

        for result in join_all(handles).await {
            let outcome = result.unwrap_or_else(|e| {
                error!(error = %e, "device poll task panicked");
                PollOutcome::Failed
            });
            let counter = match outcome {
                PollOutcome::Polled => &stats.polls_succeeded,
                PollOutcome::Failed => &stats.polls_failed,
                PollOutcome::Skipped => &stats.polls_skipped,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn poll_device(
        coordinator: Arc<PollCoordinator>,
        device: DeviceConfig,
        overrun: OverrunPolicy,
    ) -> PollOutcome {
        let result = match overrun {
            OverrunPolicy::Skip => match coordinator.try_poll_one(&device).await {
                Some(result) => result,
                None => return PollOutcome::Skipped,
            },
            OverrunPolicy::Queue => coordinator.poll_one(&device).await,
        };

        // Failures are already logged by the coordinator.
        match result {
            Ok(_) => PollOutcome::Polled,
            Err(_) => PollOutcome::Failed,
        }
    }
}

/// Handle to a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<SchedulerStats>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop ticking and wait for the loop to exit.
    ///
    /// Polls already in flight are allowed to finish in the background.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "poll loop task failed");
        }
    }
}
