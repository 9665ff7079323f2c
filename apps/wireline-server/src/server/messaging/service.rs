use sqlx::Row;

use super::super::errors::AppError;
use super::super::social::service::are_friends;
use super::super::state::{AppState, PendingMessageRecord};

pub const MIN_MESSAGE_LEN: usize = 1;
pub const MAX_MESSAGE_LEN: usize = 4000;

fn validate_text(text: &str) -> Result<(), AppError> {
    let len = text.chars().count();
    if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&len) {
        return Err(AppError::Validation(vec![format!(
            "message text must be between {MIN_MESSAGE_LEN} and {MAX_MESSAGE_LEN} characters"
        )]));
    }
    Ok(())
}

/// Persists a message for later delivery. Requires `sender` and `recipient`
/// to already be friends; the check and the insert are not wrapped in a
/// single transaction in in-memory mode since both operate under the
/// process-wide lock ordering already enforced by `AppState`'s maps, but the
/// database path uses a transaction so a concurrent un-friend cannot race
/// the insert.
pub async fn send(
    state: &AppState,
    sender: &str,
    recipient: &str,
    text: &str,
) -> Result<PendingMessageRecord, AppError> {
    validate_text(text)?;

    if super::super::auth::service::find_user_by_username(state, recipient)
        .await
        .is_none()
    {
        return Err(AppError::UserNotFound);
    }
    if !are_friends(state, sender, recipient).await {
        return Err(AppError::NotAuthorized);
    }

    let id = ulid::Ulid::new().to_string();
    let created_at = chrono::Utc::now();
    let record = PendingMessageRecord {
        id: id.clone(),
        sender_username: sender.to_string(),
        recipient_username: recipient.to_string(),
        text: text.to_string(),
        created_at,
    };

    if let Some(pool) = &state.db_pool {
        sqlx::query(
            "INSERT INTO pending_messages (id, sender_username, recipient_username, text, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&id)
        .bind(sender)
        .bind(recipient)
        .bind(text)
        .bind(created_at)
        .execute(pool)
        .await?;
    } else {
        state
            .pending_messages
            .write()
            .await
            .insert(id, record.clone());
    }

    Ok(record)
}

/// Looks up a buffered message without deleting it, so the recipient check
/// at the transport boundary can run before the at-least-once ack commits.
pub async fn find_pending(state: &AppState, message_id: &str) -> Option<PendingMessageRecord> {
    if let Some(pool) = &state.db_pool {
        let row = sqlx::query(
            "SELECT id, sender_username, recipient_username, text, created_at
             FROM pending_messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(pool)
        .await
        .ok()??;
        return Some(PendingMessageRecord {
            id: row.get("id"),
            sender_username: row.get("sender_username"),
            recipient_username: row.get("recipient_username"),
            text: row.get("text"),
            created_at: row.get("created_at"),
        });
    }
    state.pending_messages.read().await.get(message_id).cloned()
}

/// Lists a recipient's buffered messages in FIFO (creation) order.
pub async fn list_pending(state: &AppState, recipient: &str) -> Vec<PendingMessageRecord> {
    if let Some(pool) = &state.db_pool {
        let rows = sqlx::query(
            "SELECT id, sender_username, recipient_username, text, created_at
             FROM pending_messages WHERE recipient_username = $1 ORDER BY created_at",
        )
        .bind(recipient)
        .fetch_all(pool)
        .await
        .unwrap_or_default();
        return rows
            .into_iter()
            .map(|row| PendingMessageRecord {
                id: row.get("id"),
                sender_username: row.get("sender_username"),
                recipient_username: row.get("recipient_username"),
                text: row.get("text"),
                created_at: row.get("created_at"),
            })
            .collect();
    }

    let mut messages: Vec<_> = state
        .pending_messages
        .read()
        .await
        .values()
        .filter(|message| message.recipient_username == recipient)
        .cloned()
        .collect();
    messages.sort_by_key(|message| message.created_at);
    messages
}

/// Deletes a buffered message, acknowledging its delivery. At-least-once
/// delivery: the caller treats a repeat ack for an already-deleted id as a
/// `MESSAGE_NOT_FOUND`, which transports should tolerate as a no-op.
pub async fn mark_delivered(
    state: &AppState,
    message_id: &str,
) -> Result<PendingMessageRecord, AppError> {
    if let Some(pool) = &state.db_pool {
        let row = sqlx::query(
            "DELETE FROM pending_messages WHERE id = $1
             RETURNING id, sender_username, recipient_username, text, created_at",
        )
        .bind(message_id)
        .fetch_optional(pool)
        .await?;
        let row = row.ok_or(AppError::MessageNotFound)?;
        return Ok(PendingMessageRecord {
            id: row.get("id"),
            sender_username: row.get("sender_username"),
            recipient_username: row.get("recipient_username"),
            text: row.get("text"),
            created_at: row.get("created_at"),
        });
    }

    state
        .pending_messages
        .write()
        .await
        .remove(message_id)
        .ok_or(AppError::MessageNotFound)
}
