//! Route handlers for the Parley HTTP API.
//!
//! Each handler extracts parameters from the request, calls into the
//! repositories or the chat orchestrator, and returns JSON responses.

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / Response types
// =============================================================================

/// Request body for POST /register and POST /login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Response body for a successful register or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub username: String,
    pub token: String,
}

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Alternating question and reply entries, oldest first.
    pub messages: Vec<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub started_at: String,
    pub store: String,
}

const MAX_USERNAME_LEN: usize = 64;

/// Usernames become part of store keys, which the lookup grammar reads as a
/// single whitespace-free token.
fn validate_credentials(req: &CredentialsRequest) -> Result<(), ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }
    if req.username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "username exceeds {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if req.username.chars().any(char::is_whitespace) {
        return Err(ApiError::BadRequest(
            "username must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        store: state.store_backend.to_string(),
    })
}

/// POST /register - create a user and open a session.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    validate_credentials(&req)?;

    if state.users.exists(&req.username).await? {
        return Err(ApiError::Conflict(format!(
            "User '{}' already exists",
            req.username
        )));
    }

    let credential = auth::hash_password(&req.password)?;
    state
        .users
        .set_credential(&req.username, &credential)
        .await?;
    let token = state.sessions.create(&req.username)?;

    tracing::info!(user = %req.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            username: req.username,
            token,
        }),
    ))
}

/// POST /login - verify credentials and open a session.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let stored = state.users.get_credential(&req.username).await?;
    let valid = stored
        .as_deref()
        .is_some_and(|phc| auth::verify_password(phc, &req.password));
    if !valid {
        tracing::info!(user = %req.username, "Login rejected");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state.sessions.create(&req.username)?;
    tracing::info!(user = %req.username, "User logged in");

    Ok(Json(SessionResponse {
        username: req.username,
        token,
    }))
}

/// POST /logout - revoke the caller's token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke(&user.token)?;
    tracing::info!(user = %user.username, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat - run one conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .chat
        .handle_message(&req.message, &user.username, &user.username)
        .await?;
    Ok(Json(ChatResponse { response }))
}

/// GET /history - the caller's stored conversation.
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.chat.history(&user.username).await?;
    Ok(Json(HistoryResponse { messages }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}
