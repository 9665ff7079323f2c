use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::super::auth::credentials::bearer_token;
use super::super::auth::service::{self, RegisteredUser};
use super::super::errors::AppError;
use super::super::state::AppState;
use super::super::types::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};

fn token_response(user: RegisteredUser) -> TokenResponse {
    TokenResponse {
        access_token: user.tokens.access_token,
        refresh_token: user.tokens.refresh_token,
        token_type: "bearer",
        username: user.username,
        display_name: user.display_name,
    }
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let user = service::register(
        &state,
        &payload.username,
        &payload.email,
        &payload.password,
        &payload.display_name,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(token_response(user))))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = service::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(token_response(user)))
}

pub(crate) async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access_token = service::refresh(&state, &payload.refresh_token).await?;
    Ok(Json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": payload.refresh_token,
        "token_type": "bearer",
    })))
}

/// Resolves the bearer token on `headers` to the calling user, or fails
/// with `AUTHENTICATION_ERROR`.
pub(crate) async fn authenticate(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<super::super::state::UserRecord, AppError> {
    let token = bearer_token(headers).ok_or(AppError::AuthenticationError)?;
    service::resolve_bearer(state, token).await
}
