use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::handlers::extract::AppJson;
use crate::models::{FanOutReport, NewMessage, NotificationEvent};
use crate::state::AppState;

// POST /api/notifications/messages
pub async fn new_message(
    State(state): State<Arc<AppState>>,
    AppJson(message): AppJson<NewMessage>,
) -> Result<Json<FanOutReport>, AppError> {
    if message.recipient_id.trim().is_empty() {
        return Err(AppError::Validation("recipient_id is required".to_string()));
    }
    let report = state
        .notifier
        .notify(&NotificationEvent::NewMessage(message))
        .await?;

    let batches = report.relay_batches + report.multicast_batches;
    if batches > 0 && report.failed_batches == batches {
        return Err(AppError::Push(format!("all {batches} push batches failed")));
    }
    Ok(Json(report))
}
