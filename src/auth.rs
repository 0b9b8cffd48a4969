use crate::errors::AppError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const GUEST_PREFIX: &str = "guest-";
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Constant-time comparison against a stored hash. An empty hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    if stored_hash.is_empty() {
        return false;
    }
    let candidate = hash_password(password);
    candidate.len() == stored_hash.len()
        && candidate
            .as_bytes()
            .iter()
            .zip(stored_hash.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Trims and checks a requested username. Usernames double as file names.
pub fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(AppError::bad_request(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::bad_request(
            "username may only contain letters, digits, '_' and '-'",
        ));
    }
    if username.to_ascii_lowercase().starts_with(GUEST_PREFIX) {
        return Err(AppError::bad_request("usernames starting with 'guest-' are reserved"));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn guest_username() -> String {
    let bytes: [u8; 6] = rand::random();
    format!("{GUEST_PREFIX}{}", hex::encode(bytes))
}

fn new_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Tokens older than this no longer resolve.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct SessionEntry {
    username: String,
    issued: Instant,
}

/// Bearer token → username. Lives only as long as the process; tokens expire
/// `ttl` after they are issued and are pruned whenever a new one is issued.
#[derive(Clone)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl Sessions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    pub async fn issue(&self, username: &str) -> String {
        let token = new_token();
        let mut table = self.inner.write().await;
        table.retain(|_, entry| entry.issued.elapsed() < self.ttl);
        table.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                issued: Instant::now(),
            },
        );
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<String> {
        self.inner
            .read()
            .await
            .get(token)
            .filter(|entry| entry.issued.elapsed() < self.ttl)
            .map(|entry| entry.username.clone())
    }

    pub async fn revoke(&self, token: &str) {
        self.inner.write().await.remove(token);
    }

    /// Drops every session belonging to `username`.
    pub async fn revoke_user(&self, username: &str) {
        self.inner
            .write()
            .await
            .retain(|_, entry| entry.username != username);
    }

    /// Number of tokens held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let username = state
            .sessions
            .resolve(token)
            .await
            .ok_or_else(|| AppError::unauthorized("session expired or invalid"))?;

        Ok(Self {
            token: token.to_string(),
            username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn verify_matches_only_the_right_password() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        assert!(!verify_password("", ""));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn username_rules() {
        assert_eq!(validate_username("  dana_k ").unwrap(), "dana_k");
        assert!(validate_username("").is_err());
        assert!(validate_username("../etc").is_err());
        assert!(validate_username("a b").is_err());
        assert!(validate_username("Guest-123").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn guest_names_are_prefixed_and_distinct() {
        let a = guest_username();
        let b = guest_username();
        assert!(a.starts_with(GUEST_PREFIX));
        assert_eq!(a.len(), GUEST_PREFIX.len() + 12);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn sessions_issue_resolve_revoke() {
        let sessions = Sessions::default();
        let first = sessions.issue("dana").await;
        let second = sessions.issue("dana").await;
        assert_eq!(sessions.resolve(&first).await.as_deref(), Some("dana"));

        sessions.revoke(&first).await;
        assert!(sessions.resolve(&first).await.is_none());
        assert!(sessions.resolve(&second).await.is_some());

        sessions.revoke_user("dana").await;
        assert!(sessions.resolve(&second).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_stop_resolving_and_are_pruned() {
        let sessions = Sessions::with_ttl(Duration::ZERO);
        let stale = sessions.issue("dana").await;
        assert!(sessions.resolve(&stale).await.is_none());

        sessions.issue("dana").await;
        sessions.issue("sam").await;
        assert_eq!(sessions.len().await, 1);

        let live = Sessions::with_ttl(Duration::from_secs(60));
        let token = live.issue("dana").await;
        live.issue("sam").await;
        assert_eq!(live.len().await, 2);
        assert_eq!(live.resolve(&token).await.as_deref(), Some("dana"));
    }
}
