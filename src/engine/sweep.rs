use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::alerts::{evaluate, message, AlertRules};
use crate::api::PriceSource;
use crate::db::{EntryUpdate, WatchStore};
use crate::error::SweepError;
use crate::models::WatchEntry;
use crate::notify::Notifier;

/// Outcome counters for one sweep
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Rows in the snapshot taken at sweep start
    pub entries: usize,
    /// Entries whose price was fetched and evaluated
    pub processed: usize,
    pub alerts_sent: usize,
    pub fetch_failures: usize,
    pub invalid_entries: usize,
    pub notify_failures: usize,
    pub write_failures: usize,
}

impl SweepReport {
    fn new(sweep_id: Uuid, started_at: DateTime<Utc>, entries: usize) -> Self {
        Self {
            sweep_id,
            started_at,
            finished_at: started_at,
            entries,
            processed: 0,
            alerts_sent: 0,
            fetch_failures: 0,
            invalid_entries: 0,
            notify_failures: 0,
            write_failures: 0,
        }
    }

    /// Per-entry failures of every kind
    pub fn failures(&self) -> usize {
        self.fetch_failures + self.invalid_entries + self.notify_failures + self.write_failures
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sweep {}: {}/{} entries processed, {} alerts sent, {} failures \
             (fetch {}, invalid {}, notify {}, write {}) in {}ms",
            self.sweep_id,
            self.processed,
            self.entries,
            self.alerts_sent,
            self.failures(),
            self.fetch_failures,
            self.invalid_entries,
            self.notify_failures,
            self.write_failures,
            (self.finished_at - self.started_at).num_milliseconds()
        )
    }
}

/// One full pass over the watch store
///
/// Listing failure aborts the sweep. Everything after that is isolated per
/// entry: a failing entry is logged, counted and skipped.
pub struct ReconciliationJob {
    store: Arc<dyn WatchStore>,
    prices: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
    rules: AlertRules,
    running: Mutex<()>,
}

impl ReconciliationJob {
    pub fn new(
        store: Arc<dyn WatchStore>,
        prices: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
        rules: AlertRules,
    ) -> Self {
        Self {
            store,
            prices,
            notifier,
            rules,
            running: Mutex::new(()),
        }
    }

    /// Run one sweep. A second call while one is in flight is refused.
    pub async fn run_sweep(&self) -> Result<SweepReport, SweepError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| SweepError::AlreadyRunning)?;

        let sweep_id = Uuid::new_v4();
        let span = tracing::info_span!("sweep", %sweep_id);

        self.sweep(sweep_id).instrument(span).await
    }

    async fn sweep(&self, sweep_id: Uuid) -> Result<SweepReport, SweepError> {
        let started_at = Utc::now();

        let entries = self.store.list_entries().await.map_err(|e| {
            tracing::error!("❌ Failed to list watch entries: {}", e);
            SweepError::Listing(e)
        })?;

        tracing::info!("🔄 Sweeping {} watch entries", entries.len());

        let mut report = SweepReport::new(sweep_id, started_at, entries.len());

        for entry in &entries {
            self.process_entry(entry, &mut report).await;
        }

        report.finished_at = Utc::now();
        tracing::info!("✅ {}", report);

        Ok(report)
    }

    async fn process_entry(&self, entry: &WatchEntry, report: &mut SweepReport) {
        let price = match self.prices.fetch(&entry.symbol).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(
                    entry_id = entry.id,
                    user_id = entry.user_id,
                    symbol = %entry.symbol,
                    error = %e,
                    "Price fetch failed, skipping entry"
                );
                report.fetch_failures += 1;
                return;
            }
        };

        let evaluation = match evaluate(entry, price, &self.rules) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::warn!(
                    entry_id = entry.id,
                    user_id = entry.user_id,
                    symbol = %entry.symbol,
                    error = %e,
                    "Invalid entry data, skipping entry"
                );
                report.invalid_entries += 1;
                return;
            }
        };

        report.processed += 1;

        tracing::debug!(
            entry_id = entry.id,
            symbol = %entry.symbol,
            price,
            alerts = evaluation.alerts.len(),
            "Evaluated entry"
        );

        // Delivery failures do not hold back the state write
        for alert in &evaluation.alerts {
            let text = message::render(alert);
            match self.notifier.send(entry.user_id, &text).await {
                Ok(()) => {
                    tracing::info!(
                        user_id = entry.user_id,
                        symbol = %entry.symbol,
                        "🔔 Alert sent"
                    );
                    report.alerts_sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        entry_id = entry.id,
                        user_id = entry.user_id,
                        symbol = %entry.symbol,
                        error = %e,
                        "Failed to deliver alert"
                    );
                    report.notify_failures += 1;
                }
            }
        }

        let update = EntryUpdate::from_transition(entry, &evaluation.next);
        match self.store.record_sweep_result(&update).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    entry_id = entry.id,
                    symbol = %entry.symbol,
                    "Entry removed during sweep, nothing written"
                );
            }
            Err(e) => {
                tracing::warn!(
                    entry_id = entry.id,
                    symbol = %entry.symbol,
                    error = %e,
                    "Failed to persist entry state"
                );
                report.write_failures += 1;
            }
        }
    }
}
