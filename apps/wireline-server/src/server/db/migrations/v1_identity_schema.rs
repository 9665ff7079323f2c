use sqlx::{Postgres, Transaction};

const CREATE_USERS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    last_seen TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    hashed_refresh_token TEXT,
    refresh_token_expires_at TIMESTAMPTZ
)";
const CREATE_USERS_EMAIL_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)";

pub(crate) async fn apply(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_USERS_TABLE_SQL).execute(&mut **tx).await?;
    sqlx::query(CREATE_USERS_EMAIL_INDEX_SQL)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
