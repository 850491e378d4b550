//! Credentials, bearer sessions, and the auth middleware.
//!
//! Passwords are stored as Argon2id PHC strings with a random salt. A
//! successful register or login issues a random 32-character hex token that
//! maps to the username until logout, expiry, or process exit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;

use crate::error::ApiError;
use crate::state::AppState;

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// Hash a password into a salted PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check `password` against a stored PHC string. Malformed records never match.
pub fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored credential is not a valid PHC string");
            false
        }
    }
}

struct Session {
    username: String,
    issued_at: Instant,
}

/// In-memory token -> username map.
///
/// Tokens expire `ttl` after issue and each user keeps at most
/// `max_per_user` live tokens; issuing one more drops that user's oldest.
/// Expired tokens are swept on every issue.
#[derive(Clone)]
pub struct SessionStore {
    tokens: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
    max_per_user: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(Duration::from_secs(24 * 60 * 60), 5)
    }
}

fn lock_err<T>(e: PoisonError<T>) -> ApiError {
    ApiError::Internal(format!("session lock poisoned: {}", e))
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, max_per_user: usize) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_per_user: max_per_user.max(1),
        }
    }

    /// Issue a new token for `username`.
    pub fn create(&self, username: &str) -> Result<String, ApiError> {
        let mut tokens = self.tokens.lock().map_err(lock_err)?;
        let ttl = self.ttl;
        tokens.retain(|_, s| s.issued_at.elapsed() < ttl);

        let mut owned: Vec<(Instant, String)> = tokens
            .iter()
            .filter(|(_, s)| s.username == username)
            .map(|(t, s)| (s.issued_at, t.clone()))
            .collect();
        if owned.len() >= self.max_per_user {
            owned.sort();
            let excess = owned.len() + 1 - self.max_per_user;
            for (_, token) in owned.into_iter().take(excess) {
                tokens.remove(&token);
            }
            tracing::debug!(user = %username, dropped = excess, "Dropped oldest sessions");
        }

        let token = generate_token();
        tokens.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                issued_at: Instant::now(),
            },
        );
        Ok(token)
    }

    /// The username behind `token`, if it is live. An expired token is removed.
    pub fn resolve(&self, token: &str) -> Result<Option<String>, ApiError> {
        let mut tokens = self.tokens.lock().map_err(lock_err)?;
        match tokens.get(token) {
            Some(s) if s.issued_at.elapsed() < self.ttl => Ok(Some(s.username.clone())),
            Some(_) => {
                tokens.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Drop `token`. Returns whether it was present.
    pub fn revoke(&self, token: &str) -> Result<bool, ApiError> {
        let mut tokens = self.tokens.lock().map_err(lock_err)?;
        Ok(tokens.remove(token).is_some())
    }

    /// Number of stored tokens, expired ones included until the next sweep.
    pub fn len(&self) -> Result<usize, ApiError> {
        Ok(self.tokens.lock().map_err(lock_err)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len()? == 0)
    }
}

/// The caller identified by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub token: String,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Middleware that validates Bearer token authentication.
///
/// Extracts the token from `Authorization: Bearer <token>`, resolves it to a
/// username and attaches an [`AuthUser`] extension. Returns 401 if the
/// header is missing or the token is unknown or expired.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(value) = req.headers().get("authorization") else {
        return unauthorized("Missing Authorization header");
    };
    let Ok(value_str) = value.to_str() else {
        return unauthorized("Invalid Authorization header encoding");
    };
    let Some(token) = value_str.strip_prefix("Bearer ") else {
        return unauthorized("Invalid bearer token");
    };
    let token = token.to_string();

    match state.sessions.resolve(&token) {
        Ok(Some(username)) => {
            req.extensions_mut().insert(AuthUser { username, token });
            next.run(req).await
        }
        Ok(None) => unauthorized("Invalid bearer token"),
        Err(e) => e.into_response(),
    }
}
