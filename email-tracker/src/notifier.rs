//! Outbound reminder emails.

use async_trait::async_trait;
use mail_send::SmtpClientBuilder;
use mail_send::mail_builder::MessageBuilder;
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::error::Result;

const SENDER_NAME: &str = "Email Tracker";

/// Delivers acknowledgment reminders.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one reminder about `record_id` to `recipient`.
    async fn send_reminder(&self, recipient: &str, record_id: Uuid) -> Result<()>;
}

/// Builds the acknowledgment link for a record.
pub fn acknowledgment_link(base_url: &str, record_id: Uuid) -> String {
    format!("{}/acknowledge/{record_id}", base_url.trim_end_matches('/'))
}

/// Rendered reminder content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String
}

impl ReminderMessage {
    pub fn render(base_url: &str, record_id: Uuid) -> Self {
        let link = acknowledgment_link(base_url, record_id);
        Self {
            subject: "Reminder: a tracked email is still unacknowledged".to_string(),
            text_body: format!(
                "A tracked email has not been acknowledged for over a month.\n\n\
                 Open the link below to acknowledge it:\n{link}\n"
            ),
            html_body: format!(
                "<p>A tracked email has not been acknowledged for over a month.</p>\
                 <p><a href=\"{link}\">Acknowledge it here</a></p>"
            )
        }
    }
}

/// SMTP-backed notifier.
///
/// Opens one connection per message; transport timeouts are left to the
/// SMTP client.
pub struct SmtpNotifier {
    smtp: SmtpConfig,
    base_url: String
}

impl SmtpNotifier {
    pub fn new(smtp: SmtpConfig, base_url: impl Into<String>) -> Self {
        Self {
            smtp,
            base_url: base_url.into()
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_reminder(&self, recipient: &str, record_id: Uuid) -> Result<()> {
        let content = ReminderMessage::render(&self.base_url, record_id);
        let message = MessageBuilder::new()
            .from((SENDER_NAME, self.smtp.sender()))
            .to(recipient)
            .subject(content.subject)
            .text_body(content.text_body)
            .html_body(content.html_body);

        SmtpClientBuilder::new(self.smtp.host.as_str(), self.smtp.port)
            .implicit_tls(self.smtp.port == 465)
            .credentials((self.smtp.username.as_str(), self.smtp.password.as_str()))
            .connect()
            .await?
            .send(message)
            .await?;

        tracing::info!(recipient, record_id = %record_id, "Reminder sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledgment_link() {
        let id = Uuid::new_v4();
        assert_eq!(
            acknowledgment_link("https://tracker.example.com", id),
            format!("https://tracker.example.com/acknowledge/{id}")
        );
    }

    #[test]
    fn test_acknowledgment_link_trims_trailing_slash() {
        let id = Uuid::new_v4();
        assert_eq!(
            acknowledgment_link("https://tracker.example.com/", id),
            format!("https://tracker.example.com/acknowledge/{id}")
        );
    }

    #[test]
    fn test_reminder_bodies_contain_link() {
        let id = Uuid::new_v4();
        let message = ReminderMessage::render("http://localhost:8080", id);
        let link = format!("http://localhost:8080/acknowledge/{id}");
        assert!(message.text_body.contains(&link));
        assert!(message.html_body.contains(&link));
        assert!(!message.subject.is_empty());
    }
}
