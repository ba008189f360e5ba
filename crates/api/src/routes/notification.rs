//! Notification route.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use slack_common::error::AppError;
use slack_common::types::NotificationRequest;
use slack_engine::coordinator::NotifyOutcome;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notification", post(send_notification))
}

/// POST /api/notification: post a message, or wait for the build it names to
/// finish and post then.
///
/// The body is parsed as JSON whatever the `Content-Type` says. Responds 200
/// once a message was delivered, 204 when a build monitor was started and 400
/// for anything the caller got wrong or the webhook rejected.
async fn send_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let request: NotificationRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Error parsing request: {}", e)))?;

    let outcome = state.coordinator.notify(request).await?;
    if let NotifyOutcome::Accepted(handle) = &outcome {
        tracing::debug!(monitor_id = %handle.id, "Notification deferred to build monitor");
    }

    StatusCode::from_u16(outcome.status_code()).map_err(|e| AppError::Internal(e.to_string()))
}
