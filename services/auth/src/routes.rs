//! Authentication service routes

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use guard::RequestMeta;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::AppState;

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Build the guard's view of a request from the peer address and the
/// `X-Forwarded-For` headers
pub fn request_meta(peer: SocketAddr, headers: &HeaderMap) -> RequestMeta {
    let meta = RequestMeta::new(peer.ip().to_canonical().to_string());

    let forwarded: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    if forwarded.is_empty() {
        meta
    } else {
        meta.with_forwarded_for(forwarded.join(","))
    }
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let meta = request_meta(peer, &headers);

    if let Some(expiry) = state.ban_guard.ban_expiry(&meta).await {
        let retry_after = (expiry - Utc::now()).num_seconds().max(1) as u64;
        warn!(
            "Rejected login from banned client {}",
            state.ban_guard.resolve_client_ip(&meta)
        );
        return Err(AuthError::Banned { retry_after });
    }

    info!("Login attempt for user: {}", payload.username);

    if !state
        .credentials
        .verify(&payload.username, &payload.password)
    {
        if let Err(e) = state.ban_guard.handle_failed_login(&meta).await {
            error!("Failed to record failed login: {}", e);
        }
        return Err(AuthError::Unauthorized);
    }

    // Deny the login if the clean slate cannot be persisted
    state
        .ban_guard
        .handle_successful_login(&meta)
        .await
        .map_err(|e| {
            error!("Failed to record successful login: {}", e);
            AuthError::InternalServerError
        })?;

    let response = LoginResponse {
        message: "Logged in".to_string(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Too many failed attempts from this client
    #[error("Too many failed login attempts, retry in {retry_after} seconds")]
    Banned { retry_after: u64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        match self {
            AuthError::Banned { retry_after } => (
                StatusCode::FORBIDDEN,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            AuthError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
        }
    }
}
