use sqlx::Row;

use wireline_core::Username;

use super::super::errors::AppError;
use super::super::state::{AppState, UserRecord};
use super::credentials::{
    hash_password, issue_tokens, mint_access_token, refresh_token_owner, verify_password,
    verify_refresh_token, IssuedTokens, PasswordPolicy,
};
use super::super::db;

pub struct RegisteredUser {
    pub username: String,
    pub display_name: String,
    pub tokens: IssuedTokens,
}

fn validate_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub async fn register(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
    display_name: &str,
) -> Result<RegisteredUser, AppError> {
    db::ensure_schema(state).await?;

    let username = Username::parse(username).map_err(|_| AppError::UsernameTooShort)?;
    let policy = PasswordPolicy::from_config(state.config());
    if !policy.is_acceptable(password) {
        return Err(AppError::WeakPassword);
    }
    if !validate_email(email) {
        return Err(AppError::Validation(vec!["invalid email address".into()]));
    }

    let hashed_password = hash_password(password).map_err(|_| AppError::Unexpected)?;
    let now = chrono::Utc::now();

    if let Some(pool) = &state.db_pool {
        let existing_username = sqlx::query("SELECT 1 FROM users WHERE username = $1")
            .bind(username.as_str())
            .fetch_optional(pool)
            .await?;
        if existing_username.is_some() {
            return Err(AppError::UsernameExists);
        }
        let existing_email = sqlx::query("SELECT 1 FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        if existing_email.is_some() {
            return Err(AppError::EmailExists);
        }

        let mut tx = pool.begin().await?;
        let tokens = issue_tokens(state, username.as_str()).map_err(|_| AppError::Unexpected)?;
        let refresh_token_expires_at =
            super::credentials::refresh_token_expires_at(state.config());

        sqlx::query(
            "INSERT INTO users
                (username, display_name, email, hashed_password, last_seen, created_at,
                 hashed_refresh_token, refresh_token_expires_at)
             VALUES ($1, $2, $3, $4, $5, $5, $6, $7)",
        )
        .bind(username.as_str())
        .bind(display_name)
        .bind(email)
        .bind(&hashed_password)
        .bind(now)
        .bind(&tokens.refresh_token_hash)
        .bind(refresh_token_expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        return Ok(RegisteredUser {
            username: username.into_string(),
            display_name: display_name.to_string(),
            tokens,
        });
    }

    let mut users = state.users.write().await;
    if users.contains_key(username.as_str()) {
        return Err(AppError::UsernameExists);
    }
    if users.values().any(|user| user.email == email) {
        return Err(AppError::EmailExists);
    }

    let tokens = issue_tokens(state, username.as_str()).map_err(|_| AppError::Unexpected)?;
    let refresh_token_expires_at = super::credentials::refresh_token_expires_at(state.config());

    users.insert(
        username.as_str().to_string(),
        UserRecord {
            username: username.as_str().to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            hashed_password,
            last_seen: now,
            created_at: now,
            hashed_refresh_token: Some(tokens.refresh_token_hash.clone()),
            refresh_token_expires_at: Some(refresh_token_expires_at),
        },
    );

    Ok(RegisteredUser {
        username: username.into_string(),
        display_name: display_name.to_string(),
        tokens,
    })
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<RegisteredUser, AppError> {
    db::ensure_schema(state).await?;

    let record = find_user_by_email(state, email).await;
    let Some(record) = record else {
        verify_password(&state.dummy_password_hash, password);
        return Err(AppError::EmailNotFound);
    };

    if !verify_password(&record.hashed_password, password) {
        return Err(AppError::InvalidCredentials);
    }

    let now = chrono::Utc::now();
    let tokens = issue_tokens(state, &record.username).map_err(|_| AppError::Unexpected)?;
    let refresh_token_expires_at = super::credentials::refresh_token_expires_at(state.config());

    if let Some(pool) = &state.db_pool {
        sqlx::query(
            "UPDATE users SET last_seen = $2, hashed_refresh_token = $3, refresh_token_expires_at = $4
             WHERE username = $1",
        )
        .bind(&record.username)
        .bind(now)
        .bind(&tokens.refresh_token_hash)
        .bind(refresh_token_expires_at)
        .execute(pool)
        .await?;
    } else {
        let mut users = state.users.write().await;
        if let Some(user) = users.get_mut(&record.username) {
            user.last_seen = now;
            user.hashed_refresh_token = Some(tokens.refresh_token_hash.clone());
            user.refresh_token_expires_at = Some(refresh_token_expires_at);
        }
    }

    Ok(RegisteredUser {
        username: record.username,
        display_name: record.display_name,
        tokens,
    })
}

/// Mints a new access token from a still-valid refresh token. The refresh
/// token itself is not rotated: it remains valid for subsequent calls until
/// its own expiry.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<String, AppError> {
    let username = refresh_token_owner(refresh_token).ok_or(AppError::AuthenticationError)?;
    let record = find_user_by_username(state, username)
        .await
        .ok_or(AppError::AuthenticationError)?;

    let (Some(stored_hash), Some(expires_at)) =
        (&record.hashed_refresh_token, record.refresh_token_expires_at)
    else {
        return Err(AppError::AuthenticationError);
    };
    if expires_at < chrono::Utc::now() {
        return Err(AppError::AuthenticationError);
    }
    if !verify_refresh_token(stored_hash, refresh_token) {
        return Err(AppError::AuthenticationError);
    }

    mint_access_token(state, &record.username).map_err(|_| AppError::AuthenticationError)
}

pub async fn resolve_bearer(state: &AppState, access_token: &str) -> Result<UserRecord, AppError> {
    let username = super::credentials::decode_access_token(state, access_token)
        .map_err(|_| AppError::AuthenticationError)?;
    let record = find_user_by_username(state, &username)
        .await
        .ok_or(AppError::AuthenticationError)?;

    let now = chrono::Utc::now();
    if let Some(pool) = &state.db_pool {
        sqlx::query("UPDATE users SET last_seen = $2 WHERE username = $1")
            .bind(&record.username)
            .bind(now)
            .execute(pool)
            .await?;
    } else {
        let mut users = state.users.write().await;
        if let Some(user) = users.get_mut(&record.username) {
            user.last_seen = now;
        }
    }

    Ok(record)
}

pub(crate) async fn find_user_by_username(state: &AppState, username: &str) -> Option<UserRecord> {
    if let Some(pool) = &state.db_pool {
        let row = sqlx::query(
            "SELECT username, display_name, email, hashed_password, last_seen, created_at,
                    hashed_refresh_token, refresh_token_expires_at
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .ok()??;
        return Some(row_to_user(&row));
    }
    state.users.read().await.get(username).cloned()
}

pub(crate) async fn find_user_by_email(state: &AppState, email: &str) -> Option<UserRecord> {
    if let Some(pool) = &state.db_pool {
        let row = sqlx::query(
            "SELECT username, display_name, email, hashed_password, last_seen, created_at,
                    hashed_refresh_token, refresh_token_expires_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .ok()??;
        return Some(row_to_user(&row));
    }
    state
        .users
        .read()
        .await
        .values()
        .find(|user| user.email == email)
        .cloned()
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        username: row.get("username"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        hashed_password: row.get("hashed_password"),
        last_seen: row.get("last_seen"),
        created_at: row.get("created_at"),
        hashed_refresh_token: row.get("hashed_refresh_token"),
        refresh_token_expires_at: row.get("refresh_token_expires_at"),
    }
}
