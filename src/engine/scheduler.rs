use std::future::Future;

use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::ReconciliationJob;
use crate::config::ScheduleConfig;

/// Fixed-interval trigger for the reconciliation job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduler {
    interval: Duration,
    initial_delay: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration, initial_delay: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            initial_delay,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.interval(), config.initial_delay())
    }

    /// Trigger sweeps until `shutdown` resolves, returning how many ran.
    ///
    /// The first sweep fires after the initial delay. Each sweep runs to
    /// completion before the next tick is awaited; ticks missed while a sweep
    /// overran are skipped, never queued.
    pub async fn run_until<F>(&self, job: &ReconciliationJob, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);
        let mut sweeps = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping after {} sweeps", sweeps);
                    break;
                }
                _ = ticker.tick() => {
                    sweeps += 1;
                    // Listing failures are retried on the next tick
                    if let Err(e) = job.run_sweep().await {
                        tracing::error!("Sweep failed: {}", e);
                    }
                }
            }
        }

        sweeps
    }
}
