//! # Email Tracker
//!
//! Tracks up to three email addresses until someone acknowledges them, and
//! periodically mails reminders with an acknowledgment link for any address
//! left unacknowledged for too long.
//!
//! ## Endpoints
//!
//! - `GET /emails` - All tracked emails, newest first
//! - `POST /emails` - Track a new address (`{"address": "..."}`)
//! - `GET /acknowledge/{id}` - Marks a tracked email as seen (HTML)
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Prometheus metrics endpoint
//!
//! ## Reminder Sweep
//!
//! A cron-scheduled job looks for unseen records older than the configured
//! threshold (31 days by default) and sends one reminder per record to each
//! configured recipient. Firings never overlap: a firing that starts while the
//! previous one is still sending is skipped.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod notifier;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod state;
pub mod store;
pub mod sweep;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use server::TrackerServer;
pub use state::AppState;
