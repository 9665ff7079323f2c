use serde::{Deserialize, Serialize};

use super::state::{FriendRequestRecord, FriendRequestStatus, PendingMessageRecord, UserRecord};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub username: String,
    pub display_name: String,
    pub last_seen: chrono::DateTime<chrono::Utc>,
}

impl From<&UserRecord> for UserPublic {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            last_seen: user.last_seen,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendFriendRequestRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestCreatedResponse {
    pub id: String,
    pub sender_username: String,
    pub recipient_username: String,
    pub status: FriendRequestStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RespondAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct RespondToFriendRequestRequest {
    pub request_id: String,
    pub action: RespondAction,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestResponse {
    pub id: String,
    pub sender_username: String,
    pub recipient_username: String,
    pub status: FriendRequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&FriendRequestRecord> for FriendRequestResponse {
    fn from(request: &FriendRequestRecord) -> Self {
        Self {
            id: request.id.clone(),
            sender_username: request.sender_username.clone(),
            recipient_username: request.recipient_username.clone(),
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_username: String,
    pub text: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct MessageResponse {
    pub id: String,
    pub sender_username: String,
    pub recipient_username: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&PendingMessageRecord> for MessageResponse {
    fn from(message: &PendingMessageRecord) -> Self {
        Self {
            id: message.id.clone(),
            sender_username: message.sender_username.clone(),
            recipient_username: message.recipient_username.clone(),
            text: message.text.clone(),
            created_at: message.created_at,
        }
    }
}

/// Inbound realtime frames, matched on `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundFrame {
    Ping,
    MessageDelivered { message_id: String },
    TypingIndicator { recipient: String, is_typing: bool },
}

/// Outbound realtime frames, matched on `type`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundFrame {
    NewMessage(MessageResponse),
    MessageDelivered { message_id: String },
    TypingIndicator { sender: String, is_typing: bool },
    Pong,
}

#[derive(Debug, Deserialize)]
pub struct GatewayAuthQuery {
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_new_message_matches_documented_wire_shape() {
        let frame = OutboundFrame::NewMessage(MessageResponse {
            id: "01H".into(),
            sender_username: "alice".into(),
            recipient_username: "bob".into(),
            text: "hi".into(),
            created_at: chrono::Utc::now(),
        });
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "new_message");
        assert_eq!(value["data"]["sender_username"], "alice");
    }

    #[test]
    fn outbound_pong_has_no_data_payload_beyond_type() {
        let value = serde_json::to_value(OutboundFrame::Pong).unwrap();
        assert_eq!(value["type"], "pong");
    }

    #[test]
    fn inbound_message_delivered_parses_from_flat_frame() {
        let json = serde_json::json!({"type": "message_delivered", "data": {"message_id": "01H"}});
        let frame: InboundFrame = serde_json::from_value(json).unwrap();
        assert!(matches!(frame, InboundFrame::MessageDelivered { message_id } if message_id == "01H"));
    }
}
