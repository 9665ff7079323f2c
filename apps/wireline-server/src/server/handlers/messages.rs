use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::super::errors::AppError;
use super::super::messaging::service;
use super::super::state::AppState;
use super::super::types::{MessageResponse, OutboundFrame, SendMessageRequest};
use super::auth::authenticate;

pub(crate) async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let message = service::send(&state, &caller.username, &payload.recipient_username, &payload.text)
        .await?;

    let response = MessageResponse::from(&message);
    let frame = OutboundFrame::NewMessage(response.clone());
    if let Ok(frame_payload) = serde_json::to_string(&frame) {
        state
            .connections
            .send_personal(&message.recipient_username, frame_payload)
            .await;
    }

    Ok(Json(response))
}

pub(crate) async fn list_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let messages = service::list_pending(&state, &caller.username).await;
    Ok(Json(messages.iter().map(MessageResponse::from).collect()))
}

/// Acknowledges delivery of a message. Only the recipient may acknowledge;
/// the message row is deleted on success.
pub(crate) async fn mark_delivered(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let existing = service::find_pending(&state, &message_id)
        .await
        .ok_or(AppError::MessageNotFound)?;
    if existing.recipient_username != caller.username {
        return Err(AppError::NotAuthorized);
    }
    let message = service::mark_delivered(&state, &message_id).await?;

    let frame = OutboundFrame::MessageDelivered {
        message_id: message.id.clone(),
    };
    if let Ok(payload) = serde_json::to_string(&frame) {
        state
            .connections
            .send_personal(&message.sender_username, payload)
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}
