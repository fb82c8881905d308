use crate::errors::AppError;
use crate::handlers::AppState;
use crate::webhook_models::{FormSubmission, PendingCall};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

/// Form ingress webhook
///
/// Receives enquiry forms from the third-party form service. The submission
/// is turned into a call prefill tagged `pending_call` and kept for the
/// voice agent to pick up by session id.
///
/// Responds 400 when `call_session_id` is missing.
pub async fn form_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FormSubmission>,
) -> Result<(StatusCode, Json<PendingCall>), AppError> {
    tracing::info!("Received form webhook");

    let pending = payload.into_pending_call(Utc::now())?;
    tracing::info!(
        "Form accepted for call session {} (enquiry: {:?})",
        pending.call_session_id,
        pending.enquiry_type
    );

    state
        .pending_calls
        .insert(pending.call_session_id.clone(), pending.clone())
        .await;

    Ok((StatusCode::OK, Json(pending)))
}

/// Looks up the prefill recorded for a call session.
pub async fn get_pending_call(
    State(state): State<Arc<AppState>>,
    Path(call_session_id): Path<String>,
) -> Result<Json<PendingCall>, AppError> {
    state
        .pending_calls
        .get(&call_session_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("No pending call for session {}", call_session_id))
        })
}
