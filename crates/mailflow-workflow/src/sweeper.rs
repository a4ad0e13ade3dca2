//! Background sweeper returning expired snoozes to the inbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mailflow_store::EmailRecordStore;
use mailflow_types::WorkflowStatus;

/// How often the sweeper checks for expired snoozes.
pub const AUTO_RETURN_INTERVAL: Duration = Duration::from_secs(120);

/// Counters from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    pub found: usize,
    pub returned: usize,
    pub errors: usize,
}

/// Periodic task that moves records whose `snoozed_until` has passed back
/// to `Inbox`, which also clears the timestamp.
///
/// The sweeper never propagates errors out of its loop: a failing store
/// call is logged and the next tick tries again. A compare-exchange guard
/// skips a tick if the previous sweep is still running.
pub struct AutoReturnSweeper {
    store: Arc<dyn EmailRecordStore>,
    interval: Duration,
    shutdown_token: CancellationToken,
    sweep_in_progress: AtomicBool,
}

impl AutoReturnSweeper {
    pub fn new(store: Arc<dyn EmailRecordStore>) -> Self {
        Self::with_interval(store, AUTO_RETURN_INTERVAL)
    }

    pub fn with_interval(store: Arc<dyn EmailRecordStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            shutdown_token: CancellationToken::new(),
            sweep_in_progress: AtomicBool::new(false),
        }
    }

    /// Spawn the sweep loop. The first sweep runs after one full interval.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let sweeper = Arc::clone(self);
        info!(interval_secs = self.interval.as_secs(), "Auto-return sweeper started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweeper.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval fires immediately; swallow the first tick
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweeper.run_guarded().await;
                    }
                    _ = sweeper.shutdown_token.cancelled() => {
                        info!("Auto-return sweeper stopped");
                        return;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    async fn run_guarded(&self) {
        if self
            .sweep_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous sweep still running, skipping tick");
            return;
        }
        self.sweep_once().await;
        self.sweep_in_progress.store(false, Ordering::SeqCst);
    }

    /// One sweep pass. Per-record failures are counted and logged; the
    /// rest of the batch still goes through.
    pub async fn sweep_once(&self) -> SweepStats {
        let now = Utc::now();
        let due = match self.store.find_snoozed_due(now).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "Sweep query failed");
                return SweepStats {
                    errors: 1,
                    ..SweepStats::default()
                };
            }
        };

        let mut stats = SweepStats {
            found: due.len(),
            ..SweepStats::default()
        };
        for record in due {
            match self
                .store
                .update_status(&record.id, WorkflowStatus::Inbox)
                .await
            {
                Ok(_) => stats.returned += 1,
                Err(e) => {
                    stats.errors += 1;
                    error!(record_id = %record.id, error = %e, "Failed to return snoozed record");
                }
            }
        }

        if stats.found > 0 {
            info!(
                found = stats.found,
                returned = stats.returned,
                errors = stats.errors,
                "Returned expired snoozes to inbox"
            );
        } else {
            debug!("No expired snoozes");
        }
        stats
    }
}
