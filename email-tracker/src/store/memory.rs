use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EmailStore, limit_exceeded, stale_cutoff, validate_address};
use crate::error::{MAX_TRACKED_EMAILS, Result, TrackerError};
use crate::model::{EmailStatus, TrackedEmail};

/// Process-local store.
///
/// Every mutation happens under a single write lock, so the limit check and
/// the insert in [`EmailStore::add`] cannot interleave.
#[derive(Default)]
pub struct InMemoryEmailStore {
    records: RwLock<Vec<TrackedEmail>>
}

impl InMemoryEmailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from existing records, keeping their ids, statuses and
    /// timestamps. The record limit and address uniqueness still apply.
    pub fn from_records(records: Vec<TrackedEmail>) -> Result<Self> {
        if records.len() as i64 > MAX_TRACKED_EMAILS {
            return Err(limit_exceeded());
        }
        for (i, record) in records.iter().enumerate() {
            validate_address(&record.address)?;
            if records[..i].iter().any(|r| r.address == record.address) {
                return Err(TrackerError::DuplicateKey {
                    address: record.address.clone()
                });
            }
        }
        Ok(Self {
            records: RwLock::new(records)
        })
    }
}

#[async_trait]
impl EmailStore for InMemoryEmailStore {
    async fn list_all(&self) -> Result<Vec<TrackedEmail>> {
        let mut records = self.records.read().await.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn add(&self, address: &str) -> Result<TrackedEmail> {
        validate_address(address)?;

        let mut records = self.records.write().await;
        if records.len() as i64 >= MAX_TRACKED_EMAILS {
            return Err(limit_exceeded());
        }
        if records.iter().any(|r| r.address == address) {
            return Err(TrackerError::DuplicateKey {
                address: address.to_string()
            });
        }

        let record = TrackedEmail::new(address);
        records.push(record.clone());
        Ok(record)
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(self.records.read().await.len() as i64)
    }

    async fn find_stale_unseen(&self, threshold_age: Duration) -> Result<Vec<TrackedEmail>> {
        let cutoff = stale_cutoff(threshold_age)?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.is_stale(cutoff))
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, id: Uuid) -> Result<TrackedEmail> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TrackerError::NotFound { id: id.to_string() })?;
        record.status = EmailStatus::Seen;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn aged(address: &str, days: i64, status: EmailStatus) -> TrackedEmail {
        let mut record = TrackedEmail::new(address);
        record.created_at = Utc::now() - Duration::days(days);
        record.status = status;
        record
    }

    #[tokio::test]
    async fn test_add_enforces_limit() {
        let store = InMemoryEmailStore::new();
        for address in ["a@example.com", "b@example.com", "c@example.com"] {
            store.add(address).await.unwrap();
        }

        let err = store.add("d@example.com").await.unwrap_err();
        assert!(matches!(err, TrackerError::LimitExceeded { max: 3 }));
        assert_eq!(store.count_all().await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_respect_limit() {
        let store = Arc::new(InMemoryEmailStore::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add(&format!("user{i}@example.com")).await })
            })
            .collect();

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(TrackerError::LimitExceeded { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}")
            }
        }

        assert_eq!(accepted, 3);
        assert_eq!(rejected, 7);
        assert_eq!(store.count_all().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_limit_checked_before_duplicate() {
        let store = InMemoryEmailStore::new();
        for address in ["a@example.com", "b@example.com", "c@example.com"] {
            store.add(address).await.unwrap();
        }

        let err = store.add("a@example.com").await.unwrap_err();
        assert!(matches!(err, TrackerError::LimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_leaves_existing_record() {
        let store = InMemoryEmailStore::new();
        let original = store.add("a@example.com").await.unwrap();
        store.acknowledge(original.id).await.unwrap();

        let err = store.add("a@example.com").await.unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateKey { .. }));

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, original.id);
        assert_eq!(records[0].status, EmailStatus::Seen);
    }

    #[tokio::test]
    async fn test_duplicate_is_case_sensitive() {
        let store = InMemoryEmailStore::new();
        store.add("a@example.com").await.unwrap();
        assert!(store.add("A@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_address_rejected() {
        let store = InMemoryEmailStore::new();
        let err = store.add("  ").await.unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let store = InMemoryEmailStore::from_records(vec![
            aged("old@example.com", 20, EmailStatus::Unseen),
            aged("new@example.com", 1, EmailStatus::Unseen),
            aged("mid@example.com", 5, EmailStatus::Unseen),
        ])
        .unwrap();

        let addresses: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.address)
            .collect();
        assert_eq!(
            addresses,
            vec!["new@example.com", "mid@example.com", "old@example.com"]
        );
    }

    #[tokio::test]
    async fn test_acknowledge_is_idempotent() {
        let store = InMemoryEmailStore::new();
        let record = store.add("a@example.com").await.unwrap();

        let first = store.acknowledge(record.id).await.unwrap();
        let second = store.acknowledge(record.id).await.unwrap();
        assert_eq!(first.status, EmailStatus::Seen);
        assert_eq!(second.status, EmailStatus::Seen);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_id() {
        let store = InMemoryEmailStore::new();
        let record = store.add("a@example.com").await.unwrap();

        let err = store.acknowledge(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { .. }));

        let records = store.list_all().await.unwrap();
        assert_eq!(records[0].id, record.id);
        assert_eq!(records[0].status, EmailStatus::Unseen);
    }

    #[tokio::test]
    async fn test_find_stale_unseen() {
        let stale = aged("stale@example.com", 32, EmailStatus::Unseen);
        let store = InMemoryEmailStore::from_records(vec![
            stale.clone(),
            aged("fresh@example.com", 10, EmailStatus::Unseen),
            aged("seen@example.com", 90, EmailStatus::Seen),
        ])
        .unwrap();

        let found = store.find_stale_unseen(Duration::days(31)).await.unwrap();
        assert_eq!(found, vec![stale]);
    }

    #[tokio::test]
    async fn test_find_stale_unseen_out_of_range_threshold() {
        let store = InMemoryEmailStore::new();
        store.add("a@example.com").await.unwrap();

        let err = store
            .find_stale_unseen(Duration::days(100_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Configuration(_)));
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let result = InMemoryEmailStore::from_records(vec![
            TrackedEmail::new("a@example.com"),
            TrackedEmail::new("a@example.com"),
        ]);
        assert!(matches!(result, Err(TrackerError::DuplicateKey { .. })));
    }

    #[test]
    fn test_from_records_rejects_overflow() {
        let records = (0..4)
            .map(|i| TrackedEmail::new(format!("user{i}@example.com")))
            .collect();
        assert!(matches!(
            InMemoryEmailStore::from_records(records),
            Err(TrackerError::LimitExceeded { .. })
        ));
    }
}
