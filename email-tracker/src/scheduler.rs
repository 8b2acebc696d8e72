use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::{Result, TrackerError};
use crate::sweep::{ReminderSweep, SweepReport};

/// Fires the reminder sweep on a cron schedule.
pub struct SweepScheduler {
    scheduler: JobScheduler,
    sweep: Arc<ReminderSweep>,
    last_report: Arc<RwLock<Option<SweepReport>>>
}

impl SweepScheduler {
    pub async fn new(sweep: Arc<ReminderSweep>, schedule: &str) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| TrackerError::Scheduler(e.to_string()))?;

        let last_report = Arc::new(RwLock::new(None));

        let sweep_clone = sweep.clone();
        let report_clone = last_report.clone();

        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let sweep = sweep_clone.clone();
            let report = report_clone.clone();
            Box::pin(async move {
                info!("Starting scheduled reminder sweep");
                match sweep.run_once().await {
                    Ok(sweep_report) if sweep_report.skipped => {}
                    Ok(sweep_report) => {
                        let mut guard = report.write().await;
                        *guard = Some(sweep_report);
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled reminder sweep failed");
                    }
                }
            })
        })
        .map_err(|e| TrackerError::Scheduler(format!("Invalid schedule '{schedule}': {e}")))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| TrackerError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            sweep,
            last_report
        })
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| TrackerError::Scheduler(e.to_string()))?;
        info!("Reminder sweep scheduler started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| TrackerError::Scheduler(e.to_string()))?;
        info!("Reminder sweep scheduler stopped");
        Ok(())
    }

    /// Runs a sweep immediately, outside the schedule. Still honours the
    /// overlap guard.
    pub async fn run_now(&self) -> Result<SweepReport> {
        let report = self.sweep.run_once().await?;
        if !report.skipped {
            let mut guard = self.last_report.write().await;
            *guard = Some(report.clone());
        }
        Ok(report)
    }

    pub async fn last_report(&self) -> Option<SweepReport> {
        self.last_report.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Notifier;
    use crate::store::InMemoryEmailStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn send_reminder(&self, _recipient: &str, _record_id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn sweep() -> Arc<ReminderSweep> {
        Arc::new(ReminderSweep::new(
            Arc::new(InMemoryEmailStore::new()),
            Arc::new(NoopNotifier),
            vec!["ops@example.com".to_string()],
            Duration::days(31)
        ))
    }

    #[tokio::test]
    async fn test_run_now_records_last_report() {
        let scheduler = SweepScheduler::new(sweep(), "0 */30 * * * *").await.unwrap();
        assert!(scheduler.last_report().await.is_none());

        let report = scheduler.run_now().await.unwrap();
        assert_eq!(report.stale_records, 0);
        assert_eq!(scheduler.last_report().await, Some(report));
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected() {
        let result = SweepScheduler::new(sweep(), "every half hour").await;
        assert!(matches!(result, Err(TrackerError::Scheduler(_))));
    }
}
