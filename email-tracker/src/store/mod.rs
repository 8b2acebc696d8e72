//! Record store for tracked emails.
//!
//! Two backends implement [`EmailStore`]: [`PgEmailStore`] for PostgreSQL
//! deployments and [`InMemoryEmailStore`] for local runs without a database.
//! Both enforce the same invariants: at most [`MAX_TRACKED_EMAILS`] records,
//! unique addresses, and a one-way `unseen` to `seen` status transition.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub use memory::InMemoryEmailStore;
pub use postgres::PgEmailStore;

use crate::error::{MAX_TRACKED_EMAILS, Result, TrackerError};
use crate::model::TrackedEmail;

#[async_trait]
pub trait EmailStore: Send + Sync {
    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<TrackedEmail>>;

    /// Creates an unseen record for `address`.
    ///
    /// Fails with `Validation` for a blank address, `LimitExceeded` when the
    /// store is full and `DuplicateKey` when the address is already tracked,
    /// checked in that order.
    async fn add(&self, address: &str) -> Result<TrackedEmail>;

    async fn count_all(&self) -> Result<i64>;

    /// Unseen records created more than `threshold_age` ago.
    async fn find_stale_unseen(&self, threshold_age: Duration) -> Result<Vec<TrackedEmail>>;

    /// Marks the record as seen. Acknowledging a seen record is a no-op that
    /// still returns the record.
    async fn acknowledge(&self, id: Uuid) -> Result<TrackedEmail>;
}

pub(crate) fn validate_address(address: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(TrackerError::Validation(
            "Email address is required".to_string()
        ));
    }
    Ok(())
}

/// Creation time before which a record counts as stale.
pub(crate) fn stale_cutoff(threshold_age: Duration) -> Result<DateTime<Utc>> {
    Utc::now().checked_sub_signed(threshold_age).ok_or_else(|| {
        TrackerError::Configuration(format!(
            "Stale threshold of {} days is out of range",
            threshold_age.num_days()
        ))
    })
}

pub(crate) fn limit_exceeded() -> TrackerError {
    TrackerError::LimitExceeded {
        max: MAX_TRACKED_EMAILS
    }
}
