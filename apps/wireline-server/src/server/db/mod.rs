pub(crate) mod migrations;

use super::errors::AppError;
use super::state::AppState;

const SCHEMA_INIT_LOCK_ID: i64 = 0x5749_5245_4c49_4e45;

/// Applies every schema migration, guarded by a Postgres advisory lock so
/// concurrently starting replicas don't race each other. A no-op when the
/// state has no database pool (in-memory mode). Idempotent: safe to call on
/// every startup.
pub(crate) async fn ensure_schema(state: &AppState) -> Result<(), AppError> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };
    let pool = pool.clone();

    state
        .db_init
        .get_or_try_init(|| async move {
            let mut tx = pool.begin().await?;
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(SCHEMA_INIT_LOCK_ID)
                .execute(&mut *tx)
                .await?;

            migrations::v1_identity_schema::apply(&mut tx).await?;
            migrations::v2_social_graph_schema::apply(&mut tx).await?;
            migrations::v3_message_schema::apply(&mut tx).await?;

            tx.commit().await?;
            Ok::<(), sqlx::Error>(())
        })
        .await
        .map_err(|error| {
            tracing::error!(event = "db.init", error = %error);
            AppError::DbError
        })?;

    Ok(())
}
