use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::auth::credentials::{bearer_token, decode_access_token};
use super::errors::AppError;
use super::messaging::service as messaging;
use super::state::AppState;
use super::types::{GatewayAuthQuery, InboundFrame, MessageResponse, OutboundFrame};

const POLICY_VIOLATION_CLOSE_CODE: u16 = 1008;
const PING_INTERVAL: Duration = Duration::from_secs(20);

pub(crate) async fn gateway_ws(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<GatewayAuthQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let token = query
        .token
        .or_else(|| bearer_token(&headers).map(ToOwned::to_owned));

    Ok(ws.on_upgrade(move |socket| async move {
        handle_connection(state, socket, username, token).await;
    }))
}

async fn handle_connection(
    state: AppState,
    mut socket: WebSocket,
    path_username: String,
    token: Option<String>,
) {
    let Some(token) = token else {
        close_with_policy_violation(socket).await;
        return;
    };
    let Ok(subject) = decode_access_token(&state, &token) else {
        close_with_policy_violation(socket).await;
        return;
    };
    if subject != path_username {
        close_with_policy_violation(socket).await;
        return;
    }
    let username = subject;

    let outbound_rx = state.connections.register(&username).await;
    tracing::info!(event = "realtime.connect", username = %username);

    if let Err(error) = flush_pending_messages(&state, &mut socket, &username).await {
        tracing::warn!(event = "realtime.flush_failed", username = %username, error = %error);
        state.connections.unregister(&username).await;
        return;
    }

    let (sink, mut stream) = socket.split();
    let send_task = tokio::spawn(run_send_task(sink, outbound_rx));

    while let Some(incoming) = stream.next().await {
        let message = match incoming {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(event = "realtime.recv_error", username = %username, error = %error);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if let Err(error) = handle_inbound_frame(&state, &username, &text).await {
                    tracing::warn!(event = "realtime.bad_frame", username = %username, error = %error);
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    send_task.abort();
    state.connections.unregister(&username).await;
    tracing::info!(event = "realtime.disconnect", username = %username);
}

async fn flush_pending_messages(
    state: &AppState,
    socket: &mut WebSocket,
    username: &str,
) -> Result<(), axum::Error> {
    for message in messaging::list_pending(state, username).await {
        let frame = OutboundFrame::NewMessage(MessageResponse::from(&message));
        let Ok(payload) = serde_json::to_string(&frame) else {
            continue;
        };
        if socket.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
        let _ = messaging::mark_delivered(state, &message.id).await;
    }
    Ok(())
}

async fn handle_inbound_frame(
    state: &AppState,
    username: &str,
    raw: &str,
) -> Result<(), serde_json::Error> {
    let frame: InboundFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(error) => {
            tracing::warn!(event = "realtime.decode_failed", username = %username, error = %error);
            return Ok(());
        }
    };

    match frame {
        InboundFrame::Ping => {
            let pong = serde_json::to_string(&OutboundFrame::Pong).unwrap_or_default();
            state.connections.send_personal(username, pong).await;
        }
        InboundFrame::MessageDelivered { message_id } => {
            if let Some(existing) = messaging::find_pending(state, &message_id).await {
                if existing.recipient_username == username {
                    if let Ok(message) = messaging::mark_delivered(state, &message_id).await {
                        let ack = OutboundFrame::MessageDelivered {
                            message_id: message.id,
                        };
                        if let Ok(payload) = serde_json::to_string(&ack) {
                            state
                                .connections
                                .send_personal(&message.sender_username, payload)
                                .await;
                        }
                    }
                }
            }
        }
        InboundFrame::TypingIndicator { recipient, is_typing } => {
            let relay = OutboundFrame::TypingIndicator {
                sender: username.to_string(),
                is_typing,
            };
            if let Ok(payload) = serde_json::to_string(&relay) {
                state.connections.send_personal(&recipient, payload).await;
            }
        }
    }

    Ok(())
}

async fn run_send_task(
    mut sink: futures_util::stream::SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            payload = outbound_rx.recv() => {
                match payload {
                    Some(payload) => {
                        if sink.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

async fn close_with_policy_violation(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: POLICY_VIOLATION_CLOSE_CODE,
            reason: "policy violation".into(),
        })))
        .await;
}
