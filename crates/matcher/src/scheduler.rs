use crate::lease::{Lease, SweepLock};
use crate::sweep::LimitOrderMatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// The job name every instance contends on.
const SWEEP_JOB: &str = "limit-order-sweep";

/// Drives the limit-order sweep on a fixed interval.
///
/// This component is designed to run in a concurrent background task. Each
/// tick tries to take the shared sweep lease; whichever instance wins runs
/// the sweep while every other instance skips its tick. A sweep that fails
/// is logged and retried from scratch on the next tick; nothing here can
/// bring the scheduler down.
pub struct MatcherScheduler {
    matcher: Arc<LimitOrderMatcher>,
    lock: Arc<dyn SweepLock>,
    settings: configuration::Matcher,
}

impl MatcherScheduler {
    pub fn new(
        matcher: Arc<LimitOrderMatcher>,
        lock: Arc<dyn SweepLock>,
        settings: configuration::Matcher,
    ) -> Self {
        Self {
            matcher,
            lock,
            settings,
        }
    }

    /// Runs the periodic loop until the task is dropped.
    pub async fn start(self) {
        tracing::info!(
            interval_secs = self.settings.sweep_interval_secs,
            "starting limit-order sweep scheduler"
        );
        let mut timer = interval(Duration::from_secs(self.settings.sweep_interval_secs));
        // A slow sweep must not cause a burst of catch-up ticks.
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.run_once().await;
        }
    }

    /// One scheduled tick: take the lease, sweep, release.
    pub async fn run_once(&self) {
        let max_hold = Duration::from_secs(self.settings.lock_max_hold_secs);
        let min_hold = Duration::from_secs(self.settings.lock_min_hold_secs);

        let Some(lease) = self.lock.try_acquire(SWEEP_JOB, max_hold, min_hold).await else {
            tracing::debug!("sweep lease held elsewhere, skipping tick");
            return;
        };

        if let Err(error) = self.matcher.run_sweep().await {
            tracing::error!(%error, "sweep failed; the next tick retries from scratch");
        }
        self.release(lease).await;
    }

    async fn release(&self, lease: Lease) {
        self.lock.release(SWEEP_JOB, lease).await;
    }
}
