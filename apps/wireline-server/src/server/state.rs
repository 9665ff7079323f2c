use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use argon2::Argon2;
use pasetors::keys::SymmetricKey;
use pasetors::version4::V4;
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{OnceCell, RwLock};

use super::auth::credentials::hash_password;
use super::config::AppConfig;
use super::connection::ConnectionManager;

/// Non-secret, fixed context string mixed into the token-key KDF so the
/// derivation is specific to this use (distinct from, say, hashing the same
/// string as a password) even though `SECRET_KEY` itself is expected to carry
/// all the entropy.
const TOKEN_KEY_KDF_SALT: &[u8] = b"wireline-token-key-v1---";

/// Deterministically derives 32 bytes of PASETO key material from a
/// configured secret so that tokens minted before a restart remain valid
/// after one, as long as `SECRET_KEY` doesn't change.
fn derive_token_key(secret: &str) -> anyhow::Result<SymmetricKey<V4>> {
    let mut key_bytes = [0_u8; 32];
    Argon2::default()
        .hash_password_into(secret.as_bytes(), TOKEN_KEY_KDF_SALT, &mut key_bytes)
        .map_err(|e| anyhow::anyhow!("token key derivation failed: {e}"))?;
    SymmetricKey::<V4>::from(&key_bytes)
        .map_err(|e| anyhow::anyhow!("token key init failed: {e}"))
}

/// A user row, mirrored between Postgres and the in-memory fallback store.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub hashed_password: String,
    pub last_seen: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub hashed_refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FriendRequestRecord {
    pub id: String,
    pub sender_username: String,
    pub recipient_username: String,
    pub status: FriendRequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug)]
pub struct PendingMessageRecord {
    pub id: String,
    pub sender_username: String,
    pub recipient_username: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Shared application state.
///
/// When `db_pool` is `Some`, every service function executes SQL against
/// Postgres. When it is `None`, the same service functions operate against
/// the in-memory maps below, which keeps integration tests free of a live
/// database dependency.
#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) db_pool: Option<PgPool>,
    pub(crate) db_init: Arc<OnceCell<()>>,
    pub(crate) users: Arc<RwLock<HashMap<String, UserRecord>>>,
    pub(crate) friend_requests: Arc<RwLock<HashMap<String, FriendRequestRecord>>>,
    pub(crate) friendships: Arc<RwLock<std::collections::HashSet<(String, String)>>>,
    pub(crate) pending_messages: Arc<RwLock<HashMap<String, PendingMessageRecord>>>,
    pub(crate) token_key: Arc<SymmetricKey<V4>>,
    pub(crate) dummy_password_hash: Arc<String>,
    pub connections: ConnectionManager,
}

impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let token_key = match &config.secret_key {
            Some(secret) => derive_token_key(secret)?,
            None => {
                tracing::warn!(
                    event = "state.token_key_random",
                    "SECRET_KEY unset; generating a random token key for this process, \
                     outstanding tokens will not survive a restart"
                );
                let mut key_bytes = [0_u8; 32];
                OsRng.fill_bytes(&mut key_bytes);
                SymmetricKey::<V4>::from(&key_bytes)
                    .map_err(|e| anyhow::anyhow!("token key init failed: {e}"))?
            }
        };
        let dummy_password_hash = hash_password("wireline-dummy-password")
            .map_err(|e| anyhow::anyhow!("dummy hash init failed: {e}"))?;

        let db_pool = config.database_url.as_ref().map(|database_url| {
            PgPoolOptions::new()
                .max_connections(10)
                .connect_lazy(database_url)
        });
        let db_pool = db_pool.transpose()?;

        Ok(Self {
            config: Arc::new(config.clone()),
            db_pool,
            db_init: Arc::new(OnceCell::new()),
            users: Arc::new(RwLock::new(HashMap::new())),
            friend_requests: Arc::new(RwLock::new(HashMap::new())),
            friendships: Arc::new(RwLock::new(std::collections::HashSet::new())),
            pending_messages: Arc::new(RwLock::new(HashMap::new())),
            token_key: Arc::new(token_key),
            dummy_password_hash: Arc::new(dummy_password_hash),
            connections: ConnectionManager::new(config.gateway_outbound_queue),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
