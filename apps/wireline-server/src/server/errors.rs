use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Every failure mode the domain layer can produce, mapped to the HTTP
/// adapter's `{detail, status_code, error_code, errors}` body shape.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication failed")]
    AuthenticationError,
    #[error("no account with that email address")]
    EmailNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("username is already taken")]
    UsernameExists,
    #[error("email is already registered")]
    EmailExists,
    #[error("password does not meet strength requirements")]
    WeakPassword,
    #[error("username is too short")]
    UsernameTooShort,
    #[error("user not found")]
    UserNotFound,
    #[error("users are already friends")]
    FriendshipAlreadyExists,
    #[error("a friend request already exists")]
    FriendRequestAlreadyExists,
    #[error("friend request not found")]
    FriendRequestNotFound,
    #[error("friend request is not in a state that allows this action")]
    InvalidFriendRequestState,
    #[error("cannot send a friend request to yourself")]
    CannotFriendSelf,
    #[error("not authorized to perform this action")]
    NotAuthorized,
    #[error("message not found")]
    MessageNotFound,
    #[error("database error")]
    DbError,
    #[error("unexpected error")]
    Unexpected,
    #[error("validation error")]
    Validation(Vec<String>),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationError => StatusCode::UNAUTHORIZED,
            Self::EmailNotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UsernameExists => StatusCode::CONFLICT,
            Self::EmailExists => StatusCode::CONFLICT,
            Self::WeakPassword => StatusCode::BAD_REQUEST,
            Self::UsernameTooShort => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::FriendshipAlreadyExists => StatusCode::CONFLICT,
            Self::FriendRequestAlreadyExists => StatusCode::CONFLICT,
            Self::FriendRequestNotFound => StatusCode::NOT_FOUND,
            Self::InvalidFriendRequestState => StatusCode::BAD_REQUEST,
            Self::CannotFriendSelf => StatusCode::BAD_REQUEST,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::MessageNotFound => StatusCode::NOT_FOUND,
            Self::DbError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::AuthenticationError => Some("AUTHENTICATION_ERROR"),
            Self::EmailNotFound => Some("EMAIL_NOT_FOUND"),
            Self::InvalidCredentials => Some("INVALID_CREDENTIALS"),
            Self::UsernameExists => Some("USERNAME_EXISTS"),
            Self::EmailExists => Some("EMAIL_EXISTS"),
            Self::WeakPassword => Some("WEAK_PASSWORD"),
            Self::UsernameTooShort => Some("USERNAME_TOO_SHORT"),
            Self::UserNotFound => Some("USER_NOT_FOUND"),
            Self::FriendshipAlreadyExists => Some("FRIENDSHIP_ALREADY_EXISTS"),
            Self::FriendRequestAlreadyExists => Some("FRIEND_REQUEST_ALREADY_EXISTS"),
            Self::FriendRequestNotFound => Some("FRIEND_REQUEST_NOT_FOUND"),
            Self::InvalidFriendRequestState => Some("INVALID_FRIEND_REQUEST_STATE"),
            Self::CannotFriendSelf => Some("CANNOT_FRIEND_SELF"),
            Self::NotAuthorized => Some("NOT_AUTHORIZED"),
            Self::MessageNotFound => Some("MESSAGE_NOT_FOUND"),
            Self::DbError => Some("DB_ERROR"),
            Self::Unexpected => Some("UNEXPECTED_ERROR"),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let detail = self.to_string();
        let errors = match &self {
            Self::Validation(messages) => Some(Value::from(messages.clone())),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(event = "http.error", error_code = error_code.unwrap_or("-"), detail = %detail);
        } else {
            tracing::warn!(event = "http.error", error_code = error_code.unwrap_or("-"), detail = %detail);
        }

        (
            status,
            Json(ErrorBody {
                detail,
                status_code: status.as_u16(),
                error_code,
                errors,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        tracing::error!(event = "db.query", error = %error);
        Self::DbError
    }
}

/// Installs a JSON-formatted `tracing` subscriber honoring `RUST_LOG`,
/// defaulting to `info` when unset.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .with_span_list(true)
        .init();
}
