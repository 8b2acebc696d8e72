//! Reminder sweep.
//!
//! Each firing is stateless: it asks the store for unseen records older than
//! the threshold and sends one reminder per record and recipient. Sends are
//! best-effort; a failure is logged and counted, never retried. A record stays
//! eligible on later firings until it is acknowledged.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::notifier::Notifier;
use crate::store::EmailStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stale_records: usize,
    pub sends_attempted: usize,
    pub sends_succeeded: usize,
    pub sends_failed: usize,
    /// Set when the firing was dropped because another one was in progress.
    pub skipped: bool
}

impl SweepReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::new()
        }
    }

    fn complete(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }
}

pub struct ReminderSweep {
    store: Arc<dyn EmailStore>,
    notifier: Arc<dyn Notifier>,
    recipients: Vec<String>,
    stale_after: Duration,
    in_progress: Mutex<()>
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn EmailStore>,
        notifier: Arc<dyn Notifier>,
        recipients: Vec<String>,
        stale_after: Duration
    ) -> Self {
        Self {
            store,
            notifier,
            recipients,
            stale_after,
            in_progress: Mutex::new(())
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Runs one firing, or skips it if another firing has not finished.
    pub async fn run_once(&self) -> Result<SweepReport> {
        let Ok(_guard) = self.in_progress.try_lock() else {
            warn!("Previous reminder sweep still running, skipping this firing");
            metrics::counter!("email_tracker_sweeps_skipped_total").increment(1);
            return Ok(SweepReport::skipped());
        };

        metrics::counter!("email_tracker_sweeps_total").increment(1);
        let mut report = SweepReport::new();

        let stale = self.store.find_stale_unseen(self.stale_after).await?;
        report.stale_records = stale.len();

        if stale.is_empty() {
            debug!("No stale unseen emails");
            return Ok(report.complete());
        }

        if self.recipients.is_empty() {
            warn!(
                stale_records = stale.len(),
                "Stale emails found but no reminder recipients configured"
            );
            return Ok(report.complete());
        }

        for record in &stale {
            for recipient in &self.recipients {
                report.sends_attempted += 1;
                match self.notifier.send_reminder(recipient, record.id).await {
                    Ok(()) => {
                        report.sends_succeeded += 1;
                        metrics::counter!("email_tracker_reminders_sent_total").increment(1);
                    }
                    Err(e) => {
                        report.sends_failed += 1;
                        metrics::counter!("email_tracker_reminders_failed_total").increment(1);
                        error!(
                            error = %e,
                            recipient = %recipient,
                            record_id = %record.id,
                            "Failed to send reminder"
                        );
                    }
                }
            }
        }

        info!(
            stale_records = report.stale_records,
            sent = report.sends_succeeded,
            failed = report.sends_failed,
            "Reminder sweep completed"
        );

        Ok(report.complete())
    }
}
