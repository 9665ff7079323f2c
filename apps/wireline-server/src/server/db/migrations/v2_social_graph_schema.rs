use sqlx::{Postgres, Transaction};

const CREATE_FRIENDSHIPS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS friendships (
    user1 TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    user2 TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL,
    CHECK (user1 < user2),
    PRIMARY KEY (user1, user2)
)";
const CREATE_FRIEND_REQUESTS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS friend_requests (
    id TEXT PRIMARY KEY,
    sender_username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    recipient_username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    status TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CHECK (sender_username <> recipient_username),
    UNIQUE (sender_username, recipient_username)
)";
const CREATE_FRIEND_REQUESTS_SENDER_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_friend_requests_sender ON friend_requests(sender_username)";
const CREATE_FRIEND_REQUESTS_RECIPIENT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_friend_requests_recipient ON friend_requests(recipient_username)";

pub(crate) async fn apply(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_FRIENDSHIPS_TABLE_SQL)
        .execute(&mut **tx)
        .await?;
    sqlx::query(CREATE_FRIEND_REQUESTS_TABLE_SQL)
        .execute(&mut **tx)
        .await?;
    sqlx::query(CREATE_FRIEND_REQUESTS_SENDER_INDEX_SQL)
        .execute(&mut **tx)
        .await?;
    sqlx::query(CREATE_FRIEND_REQUESTS_RECIPIENT_INDEX_SQL)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        CREATE_FRIENDSHIPS_TABLE_SQL, CREATE_FRIEND_REQUESTS_RECIPIENT_INDEX_SQL,
        CREATE_FRIEND_REQUESTS_SENDER_INDEX_SQL, CREATE_FRIEND_REQUESTS_TABLE_SQL,
    };

    #[test]
    fn social_graph_schema_statements_define_required_tables_and_indexes() {
        assert!(CREATE_FRIENDSHIPS_TABLE_SQL.contains("CREATE TABLE IF NOT EXISTS friendships"));
        assert!(CREATE_FRIENDSHIPS_TABLE_SQL.contains("CHECK (user1 < user2)"));
        assert!(CREATE_FRIEND_REQUESTS_TABLE_SQL
            .contains("CREATE TABLE IF NOT EXISTS friend_requests"));
        assert!(CREATE_FRIEND_REQUESTS_TABLE_SQL
            .contains("CHECK (sender_username <> recipient_username)"));
        assert!(CREATE_FRIEND_REQUESTS_TABLE_SQL
            .contains("UNIQUE (sender_username, recipient_username)"));
        assert!(CREATE_FRIEND_REQUESTS_SENDER_INDEX_SQL.contains("idx_friend_requests_sender"));
        assert!(
            CREATE_FRIEND_REQUESTS_RECIPIENT_INDEX_SQL.contains("idx_friend_requests_recipient")
        );
    }
}
