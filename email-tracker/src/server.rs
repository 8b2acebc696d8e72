//! Server setup and lifecycle for the email tracker.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::notifier::SmtpNotifier;
use crate::routes::create_router;
use crate::scheduler::SweepScheduler;
use crate::state::AppState;
use crate::sweep::ReminderSweep;

pub struct TrackerServer {
    state: Arc<AppState>,
    scheduler: Option<SweepScheduler>
}

impl TrackerServer {
    /// Creates a new server instance with the given configuration.
    pub async fn new(config: TrackerConfig) -> Result<Self> {
        let state = Arc::new(AppState::new(config).await?);
        Self::with_state(state).await
    }

    /// Creates a server instance from an existing `AppState`, wiring the
    /// SMTP notifier and the sweep scheduler from its configuration.
    pub async fn with_state(state: Arc<AppState>) -> Result<Self> {
        let config = &state.config;

        let scheduler = if config.enable_sweep {
            let notifier = Arc::new(SmtpNotifier::new(
                config.smtp.clone(),
                config.base_url.clone()
            ));
            let sweep = Arc::new(ReminderSweep::new(
                state.store.clone(),
                notifier,
                config.recipients.clone(),
                config.stale_after()
            ));
            if sweep.recipients().is_empty() {
                tracing::warn!("No reminder recipients configured, sweeps will only log");
            }
            Some(SweepScheduler::new(sweep, &config.sweep_schedule).await?)
        } else {
            tracing::info!("Reminder sweep disabled by configuration");
            None
        };

        Ok(Self { state, scheduler })
    }

    /// Runs the HTTP server and the sweep scheduler.
    ///
    /// This method blocks until the server is shut down (e.g., via Ctrl+C).
    pub async fn run(mut self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.state.config.host, self.state.config.port)
            .parse()
            .map_err(|e| TrackerError::Configuration(format!("Invalid address: {e}")))?;

        if let Some(scheduler) = &self.scheduler {
            scheduler.start().await?;
        }

        let router = create_router(self.state.clone());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TrackerError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!(%addr, base_url = %self.state.config.base_url, "Email tracker starting");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| TrackerError::Server(format!("Server error: {e}")))?;

        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop().await?;
        }

        tracing::info!("Email tracker stopped");
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn scheduler(&self) -> Option<&SweepScheduler> {
        self.scheduler.as_ref()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Entry point for running the server from environment variables.
pub async fn run_from_env() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    let config = TrackerConfig::from_env()?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TrackerError::Server(format!("Failed to install metrics recorder: {e}")))?;

    let state = AppState::new(config).await?.with_metrics(metrics);
    let server = TrackerServer::with_state(Arc::new(state)).await?;
    server.run().await
}
