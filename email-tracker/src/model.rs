//! Tracked email record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Acknowledgment status of a tracked email.
///
/// The only legal transition is `Unseen` to `Seen`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Unseen,
    Seen
}

/// One monitored email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEmail {
    pub id: Uuid,
    pub address: String,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>
}

impl TrackedEmail {
    /// Creates a fresh, unseen record stamped with the current time.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
            status: EmailStatus::Unseen,
            created_at: Utc::now()
        }
    }

    /// True when the record is unseen and was created strictly before `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == EmailStatus::Unseen && self.created_at < cutoff
    }
}

/// Request body for `POST /emails`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEmailRequest {
    #[serde(default)]
    pub address: Option<String>
}

/// Response body for a successful `POST /emails`.
#[derive(Debug, Serialize)]
pub struct CreatedEmailResponse {
    pub message: String,
    pub email: TrackedEmail
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    #[test]
    fn test_new_record_is_unseen() {
        let email = TrackedEmail::new("alice@example.com");
        assert_eq!(email.status, EmailStatus::Unseen);
        assert_eq!(email.address, "alice@example.com");
    }

    #[test]
    fn test_status_string_forms() {
        assert_eq!(EmailStatus::Seen.to_string(), "seen");
        assert_eq!(EmailStatus::from_str("unseen").unwrap(), EmailStatus::Unseen);
        assert!(EmailStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let email = TrackedEmail::new("bob@example.com");
        let json = serde_json::to_value(&email).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["status"], "unseen");
    }

    #[test]
    fn test_is_stale() {
        let now = Utc::now();
        let mut email = TrackedEmail::new("carol@example.com");
        email.created_at = now - Duration::days(32);
        assert!(email.is_stale(now - Duration::days(31)));

        email.created_at = now - Duration::days(10);
        assert!(!email.is_stale(now - Duration::days(31)));

        email.created_at = now - Duration::days(90);
        email.status = EmailStatus::Seen;
        assert!(!email.is_stale(now - Duration::days(31)));
    }

    #[test]
    fn test_request_without_address() {
        let req: NewEmailRequest = serde_json::from_str("{}").unwrap();
        assert!(req.address.is_none());
    }
}
