use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GATEWAY_OUTBOUND_QUEUE: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_SEARCH_QUERY_CHARS: usize = 3;
pub const MAX_SEARCH_RESULTS: usize = 20;

/// Application configuration, assembled once at startup from the environment.
///
/// Mirrors the subset of runtime knobs a deployment actually needs to set;
/// everything else (timeouts, queue depth) is a fixed default.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub secret_key: Option<String>,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub request_timeout: Duration,
    pub gateway_outbound_queue: usize,
    pub require_special_char_in_password: bool,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    pub cors_methods: Vec<String>,
    pub cors_headers: Vec<String>,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 3000,
            database_url: None,
            secret_key: None,
            access_token_expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            refresh_token_expire_days: DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            gateway_outbound_queue: DEFAULT_GATEWAY_OUTBOUND_QUEUE,
            require_special_char_in_password: false,
            cors_enabled: false,
            cors_origins: Vec::new(),
            cors_methods: Vec::new(),
            cors_headers: Vec::new(),
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(default.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(default.port),
            database_url: std::env::var("DATABASE_URL").ok(),
            secret_key: std::env::var("SECRET_KEY").ok(),
            access_token_expire_minutes: std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(default.access_token_expire_minutes),
            refresh_token_expire_days: std::env::var("REFRESH_TOKEN_EXPIRE_DAYS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(default.refresh_token_expire_days),
            cors_enabled: std::env::var("CORS_ENABLED")
                .ok()
                .map(|value| value == "true" || value == "1")
                .unwrap_or(default.cors_enabled),
            cors_origins: split_env_list("CORS_ORIGINS"),
            cors_methods: split_env_list("CORS_METHODS"),
            cors_headers: split_env_list("CORS_HEADERS"),
            debug: std::env::var("DEBUG")
                .ok()
                .map(|value| value == "true" || value == "1")
                .unwrap_or(default.debug),
            ..default
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], self.port)))
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs((self.access_token_expire_minutes.max(0) as u64) * 60)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs((self.refresh_token_expire_days.max(0) as u64) * 24 * 60 * 60)
    }
}

fn split_env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
