use sqlx::{Postgres, Transaction};

const CREATE_PENDING_MESSAGES_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS pending_messages (
    id TEXT PRIMARY KEY,
    sender_username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    recipient_username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    text TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)";
const CREATE_PENDING_MESSAGES_RECIPIENT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_pending_messages_recipient ON pending_messages(recipient_username, created_at)";

pub(crate) async fn apply(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_PENDING_MESSAGES_TABLE_SQL)
        .execute(&mut **tx)
        .await?;
    sqlx::query(CREATE_PENDING_MESSAGES_RECIPIENT_INDEX_SQL)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
