//! HTTP request handlers for the email tracker.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse}
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::model::{CreatedEmailResponse, NewEmailRequest, TrackedEmail};
use crate::state::AppState;

const ACK_OK_HTML: &str = "<!DOCTYPE html><html><body>\
    <h1>Thank you!</h1><p>The email has been acknowledged.</p>\
    </body></html>";

const ACK_NOT_FOUND_HTML: &str = "<!DOCTYPE html><html><body>\
    <h1>Link not found</h1><p>This acknowledgment link does not match any tracked email.</p>\
    </body></html>";

const ACK_ERROR_HTML: &str = "<!DOCTYPE html><html><body>\
    <h1>Something went wrong</h1><p>The email could not be acknowledged. Please try again later.</p>\
    </body></html>";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<i64>
}

/// Health check endpoint.
///
/// Returns 200 if the store answers a count query.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.count_all().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                store: "connected".to_string(),
                tracked: Some(count)
            })
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    store: "disconnected".to_string(),
                    tracked: None
                })
            )
        }
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::OK, String::new())
    }
}

/// GET /emails
pub async fn list_emails(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TrackedEmail>>> {
    let emails = state.store.list_all().await?;
    tracing::debug!(count = emails.len(), "Listing tracked emails");
    Ok(Json(emails))
}

/// POST /emails
pub async fn add_email(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<NewEmailRequest>, JsonRejection>
) -> Result<(StatusCode, Json<CreatedEmailResponse>)> {
    let Json(request) = payload.map_err(|e| TrackerError::Validation(e.body_text()))?;
    let address = request
        .address
        .ok_or_else(|| TrackerError::Validation("Email address is required".to_string()))?;

    let email = state.store.add(&address).await.inspect_err(|e| {
        if e.is_client_error() {
            tracing::info!(error = %e, "Rejected new tracked email");
        }
    })?;

    tracing::info!(id = %email.id, "Tracked email added");

    Ok((
        StatusCode::CREATED,
        Json(CreatedEmailResponse {
            message: "Email added successfully".to_string(),
            email
        })
    ))
}

/// GET /acknowledge/{id}
///
/// Target of the link in reminder emails. Always answers with HTML since it
/// is opened in a browser.
pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        tracing::debug!(id = %id, "Acknowledgment for malformed id");
        return (StatusCode::NOT_FOUND, Html(ACK_NOT_FOUND_HTML));
    };

    match state.store.acknowledge(id).await {
        Ok(email) => {
            tracing::info!(id = %email.id, "Tracked email acknowledged");
            (StatusCode::OK, Html(ACK_OK_HTML))
        }
        Err(TrackerError::NotFound { .. }) => (StatusCode::NOT_FOUND, Html(ACK_NOT_FOUND_HTML)),
        Err(e) => {
            tracing::error!(error = %e, id = %id, "Failed to acknowledge tracked email");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(ACK_ERROR_HTML))
        }
    }
}
