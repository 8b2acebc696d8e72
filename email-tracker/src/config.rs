//! Configuration for the email tracker.
//!
//! Loaded from environment variables following 12-factor app principles.
//!
//! ## Environment Variables
//! - `DATABASE_URL`: PostgreSQL URL. When unset, records live in memory.
//! - `HOST` / `PORT`: listen address (default `0.0.0.0:8080`)
//! - `MAX_CONNECTIONS`: database pool size (default 10)
//! - `BASE_URL`: public URL used to build acknowledgment links
//! - `SMTP_HOST` / `SMTP_PORT`: mail relay (default `smtp.gmail.com:587`)
//! - `SMTP_USER` / `SMTP_PASSWORD`: mail transport credentials
//! - `SMTP_FROM`: sender address (default `SMTP_USER`)
//! - `RECIPIENT_1` .. `RECIPIENT_3`: reminder recipients
//! - `SWEEP_SCHEDULE`: six-field cron expression (default every 30 minutes)
//! - `STALE_AFTER_DAYS`: age after which unseen records get reminders (default 31)
//! - `ENABLE_SWEEP`: run the reminder scheduler (default true)

use chrono::Duration;
use std::env;

use crate::error::{Result, TrackerError};

/// Maximum number of reminder recipients.
pub const MAX_RECIPIENTS: usize = 3;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SWEEP_SCHEDULE: &str = "0 */30 * * * *";
const DEFAULT_STALE_AFTER_DAYS: i64 = 31;
/// Upper bound for `STALE_AFTER_DAYS` (one hundred years).
pub const MAX_STALE_AFTER_DAYS: i64 = 36_500;

/// SMTP transport settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new()
        }
    }
}

impl SmtpConfig {
    /// Whether credentials have been supplied.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Sender address, falling back to the login user.
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// PostgreSQL connection URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    /// Public base URL for acknowledgment links.
    pub base_url: String,
    pub smtp: SmtpConfig,
    /// Reminder recipients, at most [`MAX_RECIPIENTS`].
    pub recipients: Vec<String>,
    pub sweep_schedule: String,
    pub stale_after_days: i64,
    pub enable_sweep: bool
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: 10,
            base_url: format!("http://localhost:{DEFAULT_PORT}"),
            smtp: SmtpConfig::default(),
            recipients: Vec::new(),
            sweep_schedule: DEFAULT_SWEEP_SCHEDULE.to_string(),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            enable_sweep: true
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|v| v.parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None
    }
}

fn flag_var(key: &str, default: bool) -> bool {
    let Some(value) = non_empty_var(key) else {
        return default;
    };
    parse_flag(&value).unwrap_or_else(|| {
        tracing::warn!(key, value = %value, default, "Unrecognized boolean, using default");
        default
    })
}

impl TrackerConfig {
    /// Creates a new configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let port = parse_var("PORT").unwrap_or(DEFAULT_PORT);

        let recipients = (1..=MAX_RECIPIENTS)
            .filter_map(|i| non_empty_var(&format!("RECIPIENT_{i}")))
            .collect();

        let config = Self {
            database_url: non_empty_var("DATABASE_URL"),
            host: non_empty_var("HOST").unwrap_or(defaults.host),
            port,
            max_connections: parse_var("MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            base_url: non_empty_var("BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            smtp: SmtpConfig {
                host: non_empty_var("SMTP_HOST").unwrap_or(defaults.smtp.host),
                port: parse_var("SMTP_PORT").unwrap_or(defaults.smtp.port),
                username: non_empty_var("SMTP_USER").unwrap_or_default(),
                password: non_empty_var("SMTP_PASSWORD").unwrap_or_default(),
                from: non_empty_var("SMTP_FROM").unwrap_or_default()
            },
            recipients,
            sweep_schedule: non_empty_var("SWEEP_SCHEDULE").unwrap_or(defaults.sweep_schedule),
            stale_after_days: parse_var("STALE_AFTER_DAYS").unwrap_or(defaults.stale_after_days),
            enable_sweep: flag_var("ENABLE_SWEEP", defaults.enable_sweep)
        };

        config.validate()?;
        Ok(config)
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::default()
    }

    /// Age after which an unseen record is considered stale.
    ///
    /// Saturates at `Duration::MAX` for day counts chrono cannot represent;
    /// `validate` rejects those before they get here.
    pub fn stale_after(&self) -> Duration {
        Duration::try_days(self.stale_after_days).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_STALE_AFTER_DAYS).contains(&self.stale_after_days) {
            return Err(TrackerError::Configuration(format!(
                "STALE_AFTER_DAYS must be between 1 and {MAX_STALE_AFTER_DAYS}"
            )));
        }
        if self.recipients.len() > MAX_RECIPIENTS {
            return Err(TrackerError::Configuration(format!(
                "At most {MAX_RECIPIENTS} recipients may be configured"
            )));
        }
        if self.enable_sweep && !self.recipients.is_empty() && !self.smtp.has_credentials() {
            return Err(TrackerError::Configuration(
                "SMTP_USER and SMTP_PASSWORD are required when recipients are configured"
                    .to_string()
            ));
        }
        Ok(())
    }
}

/// Builder for `TrackerConfig`.
#[derive(Default)]
pub struct TrackerConfigBuilder {
    config: TrackerConfig
}

impl TrackerConfigBuilder {
    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    #[must_use]
    pub fn smtp(mut self, smtp: SmtpConfig) -> Self {
        self.config.smtp = smtp;
        self
    }

    #[must_use]
    pub fn recipient(mut self, address: impl Into<String>) -> Self {
        self.config.recipients.push(address.into());
        self
    }

    #[must_use]
    pub fn sweep_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.config.sweep_schedule = schedule.into();
        self
    }

    #[must_use]
    pub fn stale_after_days(mut self, days: i64) -> Self {
        self.config.stale_after_days = days;
        self
    }

    #[must_use]
    pub fn enable_sweep(mut self, enable: bool) -> Self {
        self.config.enable_sweep = enable;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<TrackerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
