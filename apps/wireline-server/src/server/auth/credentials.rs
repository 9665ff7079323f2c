use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::token::UntrustedToken;
use pasetors::{local, Local};

use super::super::config::AppConfig;
use super::super::state::AppState;

/// Password acceptance rules. The base policy only enforces a minimum
/// length; `require_special_char` is an opt-in tightening read from
/// configuration.
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_special_char: bool,
}

impl PasswordPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_length: super::super::config::MIN_PASSWORD_LEN,
            require_special_char: config.require_special_char_in_password,
        }
    }

    pub fn is_acceptable(&self, password: &str) -> bool {
        if password.chars().count() < self.min_length {
            return false;
        }
        if self.require_special_char && !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
            return false;
        }
        true
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash failed: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(stored_hash: &str, supplied_password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(supplied_password.as_bytes(), &parsed)
        .is_ok()
}

/// Refresh tokens are hashed with the same adaptive verifier as passwords
/// before being persisted, rather than a fast digest, so a leaked database
/// dump cannot be brute-forced any faster than the password table.
pub fn hash_refresh_token(token: &str) -> anyhow::Result<String> {
    hash_password(token)
}

pub fn verify_refresh_token(stored_hash: &str, supplied_token: &str) -> bool {
    verify_password(stored_hash, supplied_token)
}

pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_hash: String,
}

/// Mints a PASETO v4.local access token carrying `sub = username`.
pub fn mint_access_token(state: &AppState, username: &str) -> anyhow::Result<String> {
    let ttl = state.config().access_token_ttl();
    let mut claims = Claims::new_expires_in(&ttl)
        .map_err(|e| anyhow::anyhow!("claims init failed: {e}"))?;
    claims
        .subject(username)
        .map_err(|e| anyhow::anyhow!("claim sub failed: {e}"))?;

    local::encrypt(&state.token_key, &claims, None, None)
        .map_err(|e| anyhow::anyhow!("access token mint failed: {e}"))
}

/// Mints a fresh access/refresh token pair for `username`.
///
/// The refresh token is `{username}.{secret}`: unlike a plain random opaque
/// value, the username prefix lets `refresh` locate the owning row without
/// a separate session table, the same role the teacher's `session_id`
/// prefix plays for its session-table design.
pub fn issue_tokens(state: &AppState, username: &str) -> anyhow::Result<IssuedTokens> {
    let access_token = mint_access_token(state, username)?;

    let secret = ulid::Ulid::new().to_string();
    let refresh_token = format!("{username}.{secret}");
    let refresh_token_hash = hash_refresh_token(&refresh_token)?;

    Ok(IssuedTokens {
        access_token,
        refresh_token,
        refresh_token_hash,
    })
}

/// Extracts the username prefix from a `{username}.{secret}` refresh token,
/// without validating the secret.
pub fn refresh_token_owner(refresh_token: &str) -> Option<&str> {
    refresh_token.split_once('.').map(|(username, _)| username)
}

/// Decodes and validates an access token, returning the `sub` claim (the
/// username) on success.
pub fn decode_access_token(state: &AppState, token: &str) -> anyhow::Result<String> {
    let untrusted = UntrustedToken::<Local, pasetors::version4::V4>::try_from(token)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let validation_rules = ClaimsValidationRules::new();
    let trusted = local::decrypt(&state.token_key, &untrusted, &validation_rules, None, None)
        .map_err(|e| anyhow::anyhow!("token decrypt failed: {e}"))?;
    let claims = trusted
        .payload_claims()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("token claims missing"))?;
    let subject = claims
        .get_claim("sub")
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow::anyhow!("token subject missing"))?;
    Ok(subject.to_string())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?;
    header.to_str().ok()?.strip_prefix("Bearer ")
}

pub fn refresh_token_expires_at(
    config: &AppConfig,
) -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
        + chrono::Duration::from_std(config.refresh_token_ttl()).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password(&hash, "correct horse battery staple"));
        assert!(!verify_password(&hash, "wrong password"));
    }

    #[test]
    fn refresh_token_hash_uses_adaptive_verifier() {
        let hash = hash_refresh_token("some-opaque-refresh-token").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_refresh_token(&hash, "some-opaque-refresh-token"));
        assert!(!verify_refresh_token(&hash, "a-different-token"));
    }

    #[test]
    fn password_policy_enforces_minimum_length() {
        let policy = PasswordPolicy {
            min_length: 8,
            require_special_char: false,
        };
        assert!(!policy.is_acceptable("short1"));
        assert!(policy.is_acceptable("longenough1"));
    }

    #[test]
    fn password_policy_can_require_special_char() {
        let policy = PasswordPolicy {
            min_length: 8,
            require_special_char: true,
        };
        assert!(!policy.is_acceptable("plainletters1"));
        assert!(policy.is_acceptable("letters1!"));
    }

    #[test]
    fn bearer_token_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn refresh_token_owner_reads_username_prefix() {
        assert_eq!(refresh_token_owner("alice.01hz"), Some("alice"));
        assert_eq!(refresh_token_owner("no-dot-here"), None);
    }

    #[test]
    fn access_tokens_survive_a_restart_when_secret_key_is_configured() {
        let config = AppConfig {
            secret_key: Some(String::from("this-is-a-shared-secret")),
            ..AppConfig::default()
        };
        let first_run = AppState::new(&config).unwrap();
        let token = mint_access_token(&first_run, "alice").unwrap();

        let second_run = AppState::new(&config).unwrap();
        let subject = decode_access_token(&second_run, &token).unwrap();
        assert_eq!(subject, "alice");
    }

    #[test]
    fn a_different_secret_key_cannot_decode_the_token() {
        let minted_with = AppConfig {
            secret_key: Some(String::from("secret-one")),
            ..AppConfig::default()
        };
        let decoded_with = AppConfig {
            secret_key: Some(String::from("secret-two")),
            ..AppConfig::default()
        };
        let token = mint_access_token(&AppState::new(&minted_with).unwrap(), "alice").unwrap();
        assert!(decode_access_token(&AppState::new(&decoded_with).unwrap(), &token).is_err());
    }
}
