//! Application state shared by the HTTP handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::store::{EmailStore, InMemoryEmailStore, PgEmailStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EmailStore>,
    pub config: Arc<TrackerConfig>,
    /// Renders the Prometheus exposition; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>
}

impl AppState {
    /// Connects the configured store.
    ///
    /// With a database URL the PostgreSQL schema is created if missing;
    /// without one, records are kept in memory for the process lifetime.
    pub async fn new(config: TrackerConfig) -> Result<Self> {
        let store: Arc<dyn EmailStore> = match &config.database_url {
            Some(url) => {
                let store = PgEmailStore::connect(url, config.max_connections).await?;
                store.initialize_schema().await?;
                tracing::info!("Connected to PostgreSQL store");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, tracked emails will be kept in memory");
                Arc::new(InMemoryEmailStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }

    /// Creates application state from an existing store (useful for testing).
    #[must_use]
    pub fn with_store(store: Arc<dyn EmailStore>, config: TrackerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            metrics: None
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
